//! # Playback & Download Module
//!
//! Turns search results and offline songs into audio on the host's media
//! output, and saves songs for offline playback.
//!
//! ## Overview
//!
//! This module handles:
//! - Retrying HTTP fetches with per-attempt timeouts and cancellation
//! - Streaming downloads into memory with progress reporting
//! - The play queue (shuffle, repeat, append/replace)
//! - Source resolution with offline fallback
//! - Download jobs with cancellation
//! - The player session that ties these together
//!
//! Concrete search and conversion services plug in through the traits in
//! [`providers`].

pub mod download;
pub mod downloads;
pub mod error;
pub mod fetch;
pub mod providers;
pub mod queue;
pub mod resolver;
pub mod session;
pub mod track;

pub use download::{BlobDownloader, ProgressTracker};
pub use downloads::{DownloadManager, DownloadRequest};
pub use error::{PlaybackError, Result};
pub use fetch::{Backoff, FetchPolicy, RetryFetch};
pub use providers::{ResolvedSource, SearchProvider, SearchResult, SourceResolver, StreamCandidate};
pub use queue::QueueEngine;
pub use resolver::{PlaybackResolver, ResolverState};
pub use session::{format_time, PlaybackOutcome, PlayerSession, SessionSnapshot, TrackSnapshot};
pub use track::{SourceStrategy, TrackReference};
