//! # YouTube Music Providers
//!
//! Maps the third-party search and conversion services onto the core's
//! provider traits.
//!
//! ## Overview
//!
//! This module provides:
//! - [`DeliriusVideoSearch`]: video search with view counts
//! - [`DeliriusTrackSearch`]: track search (no view counts)
//! - [`YtdlpStreamResolver`]: single stream URL for on-demand playback
//! - [`AgatzConversionResolver`]: MP3 renditions of several qualities for
//!   downloads
//!
//! All requests go through [`core_playback::RetryFetch`], so retries,
//! timeouts and cancellation behave the same as everywhere else in the core.

pub mod error;
pub mod resolvers;
pub mod search;
pub mod types;

pub use error::{ProviderError, Result};
pub use resolvers::{AgatzConversionResolver, YtdlpStreamResolver};
pub use search::{DeliriusTrackSearch, DeliriusVideoSearch};
