//! Media Output Abstraction
//!
//! The single audio-output slot the core drives. The host owns the actual
//! decoder and device; the core only hands it a source and issues transport
//! commands. State changes flow back as [`MediaEvent`]s, which the host
//! forwards to the player session.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// Default MIME type for downloaded audio
pub const AUDIO_MPEG: &str = "audio/mpeg";

/// A playable audio source
#[derive(Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Fully buffered audio held in memory (offline songs).
    Blob { data: Bytes, mime_type: String },
    /// A remote URL the output streams from.
    Remote { url: String },
}

impl AudioSource {
    pub fn blob(data: Bytes) -> Self {
        Self::Blob {
            data,
            mime_type: AUDIO_MPEG.to_string(),
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self::Remote { url: url.into() }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Blob { .. })
    }
}

impl fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blob { data, mime_type } => f
                .debug_struct("Blob")
                .field("len", &data.len())
                .field("mime_type", mime_type)
                .finish(),
            Self::Remote { url } => f.debug_struct("Remote").field("url", url).finish(),
        }
    }
}

/// Notifications emitted by the media output
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Playback position moved. `duration` is unknown until metadata loads.
    TimeUpdate {
        position: Duration,
        duration: Option<Duration>,
    },
    /// The loaded source played to its natural end.
    Ended,
    Playing,
    Paused,
    /// The output rejected or failed to decode the source.
    Error(String),
}

/// Host audio output
///
/// `load` replaces whatever was loaded before. `play` may fail when the
/// output rejects the source; the core treats that the same as a
/// resolution failure.
#[async_trait]
pub trait MediaOutput: Send + Sync {
    async fn load(&self, source: AudioSource) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn seek(&self, position: Duration) -> Result<()>;

    /// Unload the current source and go silent.
    async fn stop(&self) -> Result<()>;

    /// Whether the output is currently paused (or idle).
    fn is_paused(&self) -> bool;

    /// Duration of the loaded source, once known.
    fn duration(&self) -> Option<Duration>;
}
