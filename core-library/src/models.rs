//! Offline library models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Provider-assigned video identifier, unique per song
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for VideoId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A downloaded song
///
/// Written once when a download completes and never updated afterwards.
#[derive(Clone, PartialEq, Eq, FromRow)]
pub struct OfflineSong {
    pub video_id: VideoId,
    pub title: String,
    pub thumbnail_url: String,
    /// Audio bytes (audio/mpeg)
    pub audio: Vec<u8>,
    /// Cover image bytes, absent when the thumbnail could not be fetched
    pub cover: Option<Vec<u8>>,
    pub duration_label: String,
    /// Unix epoch milliseconds
    pub downloaded_at: i64,
}

impl OfflineSong {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.video_id.0.trim().is_empty() {
            return Err("video_id cannot be empty".to_string());
        }
        if self.audio.is_empty() {
            return Err("audio cannot be empty".to_string());
        }
        Ok(())
    }

    /// Case-insensitive substring match on the title
    pub fn title_matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(&needle.to_lowercase())
    }

    pub fn downloaded_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.downloaded_at)
    }
}

impl fmt::Debug for OfflineSong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineSong")
            .field("video_id", &self.video_id)
            .field("title", &self.title)
            .field("thumbnail_url", &self.thumbnail_url)
            .field("audio_len", &self.audio.len())
            .field("cover_len", &self.cover.as_ref().map(Vec::len))
            .field("duration_label", &self.duration_label)
            .field("downloaded_at", &self.downloaded_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(title: &str) -> OfflineSong {
        OfflineSong {
            video_id: VideoId::new("abc123"),
            title: title.to_string(),
            thumbnail_url: "https://i.ytimg.com/vi/abc123/hq.jpg".to_string(),
            audio: vec![1, 2, 3],
            cover: None,
            duration_label: "3:45".to_string(),
            downloaded_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_title_matches_ignores_case() {
        let s = song("Bohemian Rhapsody");
        assert!(s.title_matches("rhap"));
        assert!(s.title_matches("BOHEMIAN"));
        assert!(s.title_matches(""));
        assert!(!s.title_matches("queen"));
    }

    #[test]
    fn test_validate() {
        assert!(song("ok").validate().is_ok());

        let mut empty_audio = song("x");
        empty_audio.audio.clear();
        assert!(empty_audio.validate().is_err());

        let mut blank_id = song("x");
        blank_id.video_id = VideoId::new("  ");
        assert!(blank_id.validate().is_err());
    }

    #[test]
    fn test_debug_omits_blob_bytes() {
        let rendered = format!("{:?}", song("x"));
        assert!(rendered.contains("audio_len: 3"));
    }

    #[test]
    fn test_downloaded_at_utc() {
        let ts = song("x").downloaded_at_utc().unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }
}
