//! # Core Configuration Module
//!
//! Provides configuration management for the music client core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding every bridge and setting the core needs. It fails fast when a
//! required capability is missing, with a message that says how to provide it.
//!
//! ## Required Dependencies
//!
//! - `database_path` - SQLite file backing the offline store
//! - `MediaOutput` - The host's audio output; there is no default
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - desktop default: reqwest
//! - `NetworkMonitor` - desktop default: TCP reachability probe
//! - `SettingsStore` - session persistence is disabled when absent
//!
//! Defaults are only injected with the `desktop-shims` feature. Without it a
//! missing `HttpClient` or `NetworkMonitor` is a `CapabilityMissing` error.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, NetworkConfig};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/offline.db")
//!     .media_output(Arc::new(MyAudioElement::new()))
//!     .network(NetworkConfig::default())
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, MediaOutput, NetworkMonitor, SettingsStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default capacity of the event broadcast channel
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

/// Core configuration for the music client.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database holding offline songs
    pub database_path: PathBuf,

    /// HTTP client for search, resolution and downloads
    pub http_client: Arc<dyn HttpClient>,

    /// Connectivity probe consulted before remote resolution
    pub network_monitor: Arc<dyn NetworkMonitor>,

    /// The single audio output slot
    pub media_output: Arc<dyn MediaOutput>,

    /// Key-value store for session persistence (optional)
    pub settings_store: Option<Arc<dyn SettingsStore>>,

    /// Retry and timeout settings
    pub network: NetworkConfig,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("http_client", &"HttpClient { ... }")
            .field("network_monitor", &"NetworkMonitor { ... }")
            .field("media_output", &"MediaOutput { ... }")
            .field(
                "settings_store",
                &self.settings_store.as_ref().map(|_| "SettingsStore { ... }"),
            )
            .field("network", &self.network)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

/// Retry, backoff and timeout settings for outbound requests.
///
/// Two policies are derived from this: the generic one (search, stream
/// resolution, cover art) backs off linearly by `retry_step × attempt`, the
/// conversion one (download resolution) waits a fixed
/// `conversion_retry_delay` between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Attempts per request, including the first
    pub max_attempts: u32,
    /// Per-attempt timeout for generic requests
    pub request_timeout: Duration,
    /// Linear backoff step for generic requests
    pub retry_step: Duration,
    /// Per-attempt timeout for conversion requests
    pub conversion_timeout: Duration,
    /// Fixed delay between conversion attempts
    pub conversion_retry_delay: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            request_timeout: Duration::from_secs(20),
            retry_step: Duration::from_secs(1),
            conversion_timeout: Duration::from_secs(25),
            conversion_retry_delay: Duration::from_secs(25),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        if self.request_timeout.is_zero() || self.conversion_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeouts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        self.network.validate()
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Other hosts: inject a platform-native adapter."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_network_monitor() -> Result<Arc<dyn NetworkMonitor>> {
    Ok(Arc::new(bridge_desktop::DesktopNetworkMonitor::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_network_monitor() -> Result<Arc<dyn NetworkMonitor>> {
    Err(Error::CapabilityMissing {
        capability: "NetworkMonitor".to_string(),
        message: "No connectivity probe provided. \
                 Desktop: enable the 'desktop-shims' feature to use DesktopNetworkMonitor. \
                 Web: inject a navigator.onLine based monitor."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    media_output: Option<Arc<dyn MediaOutput>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    network: Option<NetworkConfig>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the path of the offline store database.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .database_path("/path/to/offline.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the network monitor implementation.
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Sets the audio output (required).
    pub fn media_output(mut self, output: Arc<dyn MediaOutput>) -> Self {
        self.media_output = Some(output);
        self
    }

    /// Sets the settings store used for session persistence.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Overrides retry and timeout settings.
    ///
    /// Default: 3 attempts, 20s/25s per-attempt timeouts, 1s linear and 25s
    /// fixed backoff.
    pub fn network(mut self, network: NetworkConfig) -> Self {
        self.network = Some(network);
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: 256
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the configuration, injecting platform defaults where allowed.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when the database path is missing or a value is
    ///   out of range
    /// - [`Error::CapabilityMissing`] when a required bridge has no
    ///   implementation and no default is available
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let media_output = self.media_output.ok_or_else(|| Error::CapabilityMissing {
            capability: "MediaOutput".to_string(),
            message: "No audio output provided. The host must inject its media \
                     element adapter via .media_output()."
                .to_string(),
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let network_monitor = match self.network_monitor {
            Some(monitor) => monitor,
            None => provide_default_network_monitor()?,
        };

        let config = CoreConfig {
            database_path,
            http_client,
            network_monitor,
            media_output,
            settings_store: self.settings_store,
            network: self.network.unwrap_or_default(),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        tracing::debug!(
            database_path = ?config.database_path,
            session_persistence = config.settings_store.is_some(),
            max_attempts = config.network.max_attempts,
            "Core configuration built"
        );
        Ok(config)
    }
}
