//! # Blob Downloader
//!
//! Streams a remote audio file fully into memory while reporting progress.
//!
//! When the server announces a content length, progress is the exact
//! fraction of bytes received. Otherwise a simulated progress ticks up every
//! 500 ms from 10 % in 5 % steps, stopping short of 95 %, so the UI still
//! moves for chunked responses. Either way a final `1.0` is reported once the
//! body has been read completely.

use std::time::Duration;

use bridge_traits::HttpRequest;
use bytes::{Bytes, BytesMut};
use core_runtime::logging::redact_url;
use futures::StreamExt;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::{PlaybackError, Result};
use crate::fetch::{FetchPolicy, RetryFetch};

/// Interval between simulated progress ticks.
pub const SIMULATED_TICK: Duration = Duration::from_millis(500);

const SIMULATED_START_PERCENT: u32 = 10;
const SIMULATED_STEP_PERCENT: u32 = 5;
/// Simulated progress never reaches this value.
const SIMULATED_CEILING_PERCENT: u32 = 95;

/// Upper bound on the buffer pre-allocated from a Content-Length header.
const MAX_PREALLOC: u64 = 32 * 1024 * 1024;

/// Converts received byte counts and timer ticks into progress reports.
///
/// Reported values are monotonically non-decreasing and never exceed `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressTracker {
    Exact { total: u64, last: f64 },
    Simulated { percent: u32 },
}

impl ProgressTracker {
    pub fn new(content_length: Option<u64>) -> Self {
        match content_length {
            Some(total) if total > 0 => ProgressTracker::Exact { total, last: 0.0 },
            _ => ProgressTracker::Simulated {
                percent: SIMULATED_START_PERCENT,
            },
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, ProgressTracker::Simulated { .. })
    }

    /// Value reported before the first chunk, if any.
    pub fn initial(&self) -> Option<f64> {
        match self {
            ProgressTracker::Exact { .. } => None,
            ProgressTracker::Simulated { percent } => Some(*percent as f64 / 100.0),
        }
    }

    /// Records the running byte count. Only exact trackers report here.
    pub fn on_bytes(&mut self, received: u64) -> Option<f64> {
        match self {
            ProgressTracker::Exact { total, last } => {
                let fraction = (received as f64 / *total as f64).min(1.0);
                if fraction > *last {
                    *last = fraction;
                    Some(fraction)
                } else {
                    None
                }
            }
            ProgressTracker::Simulated { .. } => None,
        }
    }

    /// Advances simulated progress by one step.
    pub fn tick(&mut self) -> Option<f64> {
        match self {
            ProgressTracker::Simulated { percent } => {
                let next = *percent + SIMULATED_STEP_PERCENT;
                if next < SIMULATED_CEILING_PERCENT {
                    *percent = next;
                    Some(next as f64 / 100.0)
                } else {
                    None
                }
            }
            ProgressTracker::Exact { .. } => None,
        }
    }

    /// Terminal report. `None` only when an exact tracker already hit `1.0`.
    pub fn finish(&mut self) -> Option<f64> {
        match self {
            ProgressTracker::Exact { last, .. } if *last >= 1.0 => None,
            ProgressTracker::Exact { last, .. } => {
                *last = 1.0;
                Some(1.0)
            }
            ProgressTracker::Simulated { percent } => {
                *percent = 100;
                Some(1.0)
            }
        }
    }
}

/// Downloads whole audio files into memory.
#[derive(Clone)]
pub struct BlobDownloader {
    fetch: RetryFetch,
}

impl BlobDownloader {
    pub fn new(fetch: RetryFetch) -> Self {
        Self { fetch }
    }

    /// Downloads `url` and returns the complete body.
    ///
    /// Cancelling mid-stream discards the partial data and returns
    /// [`PlaybackError::Cancelled`]. A transport error while reading the
    /// body is not retried.
    #[instrument(skip(self, policy, cancel, on_progress), fields(url = %redact_url(url)))]
    pub async fn download(
        &self,
        url: &str,
        policy: &FetchPolicy,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn(f64) + Send + Sync),
    ) -> Result<Bytes> {
        let response = self
            .fetch
            .fetch_stream(HttpRequest::get(url), policy, cancel)
            .await?;

        let mut tracker = ProgressTracker::new(response.content_length);
        if let Some(progress) = tracker.initial() {
            on_progress(progress);
        }

        let capacity = response.content_length.unwrap_or(0).min(MAX_PREALLOC) as usize;
        let mut buffer = BytesMut::with_capacity(capacity);
        let mut body = response.body;
        let mut ticker = interval_at(Instant::now() + SIMULATED_TICK, SIMULATED_TICK);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(received = buffer.len(), "Download cancelled, discarding partial data");
                    return Err(PlaybackError::Cancelled);
                }
                chunk = body.next() => match chunk {
                    Some(Ok(bytes)) => {
                        buffer.extend_from_slice(&bytes);
                        if let Some(progress) = tracker.on_bytes(buffer.len() as u64) {
                            on_progress(progress);
                        }
                    }
                    Some(Err(err)) => {
                        return Err(PlaybackError::Network {
                            attempts: 1,
                            message: format!("body read failed: {err}"),
                        });
                    }
                    None => break,
                },
                _ = ticker.tick(), if tracker.is_simulated() => {
                    if let Some(progress) = tracker.tick() {
                        on_progress(progress);
                    }
                }
            }
        }

        if let Some(progress) = tracker.finish() {
            on_progress(progress);
        }

        debug!(bytes = buffer.len(), "Download complete");
        Ok(buffer.freeze())
    }
}
