//! Track references held by the play queue.

use bridge_traits::AudioSource;
use bytes::Bytes;
use core_library::{OfflineSong, VideoId};
use core_runtime::events::SourceKind;
use serde::{Deserialize, Serialize};

use crate::providers::SearchResult;

/// How a queue entry obtains its audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceStrategy {
    /// Resolve a stream URL when the entry becomes current.
    StreamOnDemand,
    /// Audio is held locally by the Offline Store.
    Cached,
}

/// A queue entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackReference {
    pub video_id: VideoId,
    pub title: String,
    pub thumbnail_url: String,
    pub duration_label: String,
    /// Cover art, present for offline songs that stored one.
    pub cover: Option<Bytes>,
    /// Resolved audio, filled lazily for streamed entries.
    pub audio_source: Option<AudioSource>,
    pub strategy: SourceStrategy,
}

impl TrackReference {
    pub fn new(video_id: impl Into<VideoId>, title: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            title: title.into(),
            thumbnail_url: String::new(),
            duration_label: String::new(),
            cover: None,
            audio_source: None,
            strategy: SourceStrategy::StreamOnDemand,
        }
    }

    pub fn from_search(result: &SearchResult) -> Self {
        Self {
            video_id: result.id.clone(),
            title: result.title.clone(),
            thumbnail_url: result.thumbnail_url.clone(),
            duration_label: result.duration_label.clone(),
            cover: None,
            audio_source: None,
            strategy: SourceStrategy::StreamOnDemand,
        }
    }

    pub fn from_offline(song: OfflineSong) -> Self {
        let mut track = Self {
            video_id: song.video_id.clone(),
            title: song.title.clone(),
            thumbnail_url: song.thumbnail_url.clone(),
            duration_label: song.duration_label.clone(),
            cover: None,
            audio_source: None,
            strategy: SourceStrategy::StreamOnDemand,
        };
        track.attach_offline(song);
        track
    }

    /// Switches the entry to the locally stored copy.
    pub fn attach_offline(&mut self, song: OfflineSong) {
        self.cover = song.cover.map(Bytes::from);
        self.audio_source = Some(AudioSource::blob(Bytes::from(song.audio)));
        self.strategy = SourceStrategy::Cached;
    }

    pub fn has_local_source(&self) -> bool {
        self.audio_source.as_ref().is_some_and(AudioSource::is_local)
    }

    /// Cached stream URL from an earlier resolution.
    pub fn remote_url(&self) -> Option<&str> {
        match &self.audio_source {
            Some(AudioSource::Remote { url }) => Some(url),
            _ => None,
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        if self.has_local_source() {
            SourceKind::Local
        } else {
            SourceKind::Remote
        }
    }
}

impl From<&SearchResult> for TrackReference {
    fn from(result: &SearchResult) -> Self {
        Self::from_search(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str) -> OfflineSong {
        OfflineSong {
            video_id: VideoId::from(id),
            title: format!("Song {id}"),
            thumbnail_url: "https://img/1.jpg".into(),
            audio: vec![1, 2, 3],
            cover: Some(vec![9]),
            duration_label: "3:00".into(),
            downloaded_at: 1,
        }
    }

    #[test]
    fn offline_tracks_are_cached_with_blob_source() {
        let track = TrackReference::from_offline(song("a"));
        assert_eq!(track.strategy, SourceStrategy::Cached);
        assert!(track.has_local_source());
        assert_eq!(track.cover.as_deref(), Some(&[9u8][..]));
        assert_eq!(track.source_kind(), SourceKind::Local);
    }

    #[test]
    fn search_results_stream_on_demand() {
        let result = SearchResult {
            id: VideoId::from("v1"),
            title: "Title".into(),
            thumbnail_url: "t".into(),
            duration_label: "1:00".into(),
            view_count: 5,
        };
        let track = TrackReference::from(&result);
        assert_eq!(track.strategy, SourceStrategy::StreamOnDemand);
        assert!(track.audio_source.is_none());
        assert!(track.remote_url().is_none());
    }
}
