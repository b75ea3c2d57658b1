//! # Retry-Fetch
//!
//! Wraps the host [`HttpClient`] with bounded retries, a per-attempt timeout
//! and cooperative cancellation. The HTTP bridge performs exactly one attempt
//! per call; every retry decision lives here.
//!
//! Two policies are in use:
//! - **generic**: linear backoff (`retry_step × attempt`), short timeout.
//!   Used for search, stream resolution, blob bodies and cover art.
//! - **conversion**: fixed backoff, long timeout. Used for the download
//!   conversion endpoint, which is slow and rate limited.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{HttpClient, HttpRequest, HttpResponse, HttpStreamResponse};
use core_runtime::config::NetworkConfig;
use core_runtime::logging::redact_url;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::{PlaybackError, Result};

/// Delay inserted between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `step × n` after the n-th failed attempt.
    Linear(Duration),
    /// The same delay after every failed attempt.
    Fixed(Duration),
}

impl Backoff {
    /// Delay to wait after attempt number `attempt` (1-based) failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Linear(step) => step.saturating_mul(attempt),
            Backoff::Fixed(delay) => delay,
        }
    }
}

/// Retry policy for a single logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff: Backoff,
}

impl FetchPolicy {
    pub fn generic(config: &NetworkConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            attempt_timeout: config.request_timeout,
            backoff: Backoff::Linear(config.retry_step),
        }
    }

    pub fn conversion(config: &NetworkConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            attempt_timeout: config.conversion_timeout,
            backoff: Backoff::Fixed(config.conversion_retry_delay),
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::generic(&NetworkConfig::default())
    }
}

/// Retrying front-end over the host HTTP bridge.
#[derive(Clone)]
pub struct RetryFetch {
    client: Arc<dyn HttpClient>,
}

impl RetryFetch {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    /// Performs a buffered request.
    ///
    /// Non-success statuses count as failed attempts. On exhaustion the last
    /// failure is reported as [`PlaybackError::Network`]; cancellation aborts
    /// immediately with [`PlaybackError::Cancelled`].
    #[instrument(skip(self, request, policy, cancel), fields(url = %redact_url(&request.url)))]
    pub async fn fetch(
        &self,
        request: HttpRequest,
        policy: &FetchPolicy,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        self.with_retry(policy, cancel, || {
            let client = Arc::clone(&self.client);
            let request = request.clone();
            async move {
                let response = client.execute(request).await.map_err(|e| e.to_string())?;
                if response.is_success() {
                    Ok(response)
                } else {
                    Err(format!("HTTP {}", response.status))
                }
            }
        })
        .await
    }

    /// Performs a streaming request.
    ///
    /// The attempt timeout covers the time until response headers arrive;
    /// reading the body is left to the caller.
    #[instrument(skip(self, request, policy, cancel), fields(url = %redact_url(&request.url)))]
    pub async fn fetch_stream(
        &self,
        request: HttpRequest,
        policy: &FetchPolicy,
        cancel: &CancellationToken,
    ) -> Result<HttpStreamResponse> {
        self.with_retry(policy, cancel, || {
            let client = Arc::clone(&self.client);
            let request = request.clone();
            async move {
                let response = client
                    .execute_stream(request)
                    .await
                    .map_err(|e| e.to_string())?;
                if response.is_success() {
                    Ok(response)
                } else {
                    Err(format!("HTTP {}", response.status))
                }
            }
        })
        .await
    }

    async fn with_retry<T, F, Fut>(
        &self,
        policy: &FetchPolicy,
        cancel: &CancellationToken,
        mut attempt_fn: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, String>>,
    {
        let max_attempts = policy.max_attempts.max(1);
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(PlaybackError::Cancelled);
            }

            debug!(attempt, max_attempts, "Sending request");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PlaybackError::Cancelled),
                outcome = tokio::time::timeout(policy.attempt_timeout, attempt_fn()) => outcome,
            };

            match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(message)) => {
                    warn!(attempt, max_attempts, error = %message, "Request attempt failed");
                    last_error = message;
                }
                Err(_) => {
                    warn!(attempt, max_attempts, timeout = ?policy.attempt_timeout, "Request attempt timed out");
                    last_error = format!("timed out after {:?}", policy.attempt_timeout);
                }
            }

            if attempt < max_attempts {
                let delay = policy.backoff.delay_after(attempt);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(PlaybackError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        Err(PlaybackError::Network {
            attempts: max_attempts,
            message: last_error,
        })
    }
}
