//! # Playback Error Types
//!
//! Error taxonomy shared by fetching, downloading, queueing and playback.

use core_library::LibraryError;
use thiserror::Error;

/// Errors that can occur during playback and download operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Network Errors
    // ========================================================================
    /// Every attempt failed (transport error, timeout or non-success status).
    #[error("Network error after {attempts} attempt(s): {message}")]
    Network { attempts: u32, message: String },

    /// The caller cancelled the operation. Never retried.
    #[error("Operation cancelled")]
    Cancelled,

    /// A provider answered, but the payload was not usable.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// No playable or downloadable URL could be derived for the track.
    #[error("Could not resolve source for {video_id}: {reason}")]
    Resolution { video_id: String, reason: String },

    /// The device is offline and the track has no local copy.
    #[error("Offline and no local copy of {0}")]
    Offline(String),

    /// The media output rejected the source or a transport command.
    #[error("Media output error: {0}")]
    MediaOutput(String),

    // ========================================================================
    // Storage Errors
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(#[from] LibraryError),

    // ========================================================================
    // Queue Errors
    // ========================================================================
    #[error("Queue is empty")]
    EmptyQueue,

    #[error("Queue index {index} out of range (length {len})")]
    InvalidIndex { index: usize, len: usize },

    // ========================================================================
    // Download Errors
    // ========================================================================
    #[error("Song already downloaded: {0}")]
    AlreadyDownloaded(String),

    #[error("Download already in progress: {0}")]
    DownloadInProgress(String),
}

impl PlaybackError {
    pub fn resolution(video_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            video_id: video_id.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if repeating the operation might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlaybackError::Network { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PlaybackError::Cancelled)
    }

    /// Returns `true` when the Offline Store is in its degraded mode.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, PlaybackError::Storage(err) if err.is_unavailable())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_are_retryable() {
        let network = PlaybackError::Network {
            attempts: 3,
            message: "HTTP 503".into(),
        };
        assert!(network.is_retryable());
        assert!(!PlaybackError::Cancelled.is_retryable());
        assert!(!PlaybackError::resolution("abc", "no url").is_retryable());
        assert!(!PlaybackError::EmptyQueue.is_retryable());
    }

    #[test]
    fn store_unavailable_is_detected_through_wrapper() {
        let err: PlaybackError = LibraryError::Unavailable("blocked".into()).into();
        assert!(err.is_store_unavailable());
        assert!(!PlaybackError::Cancelled.is_store_unavailable());
    }

    #[test]
    fn display_includes_attempt_count() {
        let err = PlaybackError::Network {
            attempts: 3,
            message: "timed out".into(),
        };
        assert_eq!(
            err.to_string(),
            "Network error after 3 attempt(s): timed out"
        );
    }
}
