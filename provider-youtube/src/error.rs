//! Error types for the YouTube providers

use core_playback::PlaybackError;
use thiserror::Error;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The endpoint answered, but flagged the request as failed
    #[error("{endpoint} rejected the request: {message}")]
    Rejected {
        endpoint: &'static str,
        message: String,
    },

    /// Failed to parse the response body
    #[error("Failed to parse {endpoint} response: {message}")]
    ParseError {
        endpoint: &'static str,
        message: String,
    },

    /// Retries, timeouts and cancellation from the fetch layer
    #[error(transparent)]
    Fetch(#[from] PlaybackError),
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    pub(crate) fn parse(endpoint: &'static str, err: serde_json::Error) -> Self {
        ProviderError::ParseError {
            endpoint,
            message: err.to_string(),
        }
    }

    /// Converts into a resolution failure for `video_id`, keeping fetch
    /// errors (network, cancellation) as they are.
    pub fn into_resolution(self, video_id: &str) -> PlaybackError {
        match self {
            ProviderError::Fetch(err) => err,
            other => PlaybackError::resolution(video_id, other.to_string()),
        }
    }
}

impl From<ProviderError> for PlaybackError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Fetch(err) => err,
            other => PlaybackError::InvalidResponse(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_pass_through() {
        let err: PlaybackError = ProviderError::Fetch(PlaybackError::Cancelled).into();
        assert!(err.is_cancelled());
    }

    #[test]
    fn rejections_become_resolution_errors() {
        let err = ProviderError::Rejected {
            endpoint: "ytmp3",
            message: "status 500".into(),
        }
        .into_resolution("abc");
        match err {
            PlaybackError::Resolution { video_id, reason } => {
                assert_eq!(video_id, "abc");
                assert!(reason.contains("status 500"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
