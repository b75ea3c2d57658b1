use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// The query was empty after sanitizing; no request was made.
    #[error("Invalid search query: {0:?}")]
    InvalidQuery(String),

    #[error("Song not found in the offline library: {0}")]
    NotDownloaded(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether the error came from a cancelled operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Playback(e) if e.is_cancelled())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
