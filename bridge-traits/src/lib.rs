//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host.
//!
//! ## Overview
//!
//! This crate defines the contract between the music client core and the
//! host environment. Every capability the core needs but cannot provide on
//! its own (network transport, connectivity probing, audio output, small
//! key-value preferences) is expressed as a trait here.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Single-attempt HTTP requests, buffered or streamed
//! - [`NetworkMonitor`](network::NetworkMonitor) - Online/offline detection
//!
//! ### Media
//! - [`MediaOutput`](media::MediaOutput) - The host audio element the core drives
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences (session persistence)
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! let media = config.media_output
//!     .ok_or_else(|| CoreError::CapabilityMissing {
//!         capability: "MediaOutput".to_string(),
//!         message: "No audio output provided. Inject the host media adapter.".to_string(),
//!     })?;
//! ```
//!
//! ## Retry Policy
//!
//! `HttpClient` implementations perform exactly one attempt per call. Retry,
//! per-attempt timeouts and cancellation belong to the core so that every
//! host gets the same behaviour.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support concurrent usage
//! across async tasks.

pub mod error;
pub mod http;
pub mod media;
pub mod network;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse, HttpStreamResponse};
pub use media::{AudioSource, MediaEvent, MediaOutput};
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use storage::SettingsStore;
pub use time::{Clock, SystemClock};
