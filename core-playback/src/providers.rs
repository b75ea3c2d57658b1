//! Provider contracts
//!
//! The core never talks to a concrete search or conversion service directly.
//! Provider crates map their wire formats onto these traits at the boundary.

use async_trait::async_trait;
use core_library::VideoId;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{PlaybackError, Result};

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: VideoId,
    pub title: String,
    pub thumbnail_url: String,
    /// Human-readable duration such as `3:45`.
    pub duration_label: String,
    /// Zero when the provider does not report views.
    pub view_count: u64,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, cancel: &CancellationToken) -> Result<Vec<SearchResult>>;
}

/// One downloadable or streamable rendition of a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCandidate {
    /// Numeric quality (bitrate) when the provider reports one.
    pub quality: Option<u32>,
    pub url: String,
}

/// Candidates returned by a [`SourceResolver`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSource {
    pub candidates: Vec<StreamCandidate>,
}

impl ResolvedSource {
    pub fn single(url: impl Into<String>) -> Self {
        Self {
            candidates: vec![StreamCandidate {
                quality: None,
                url: url.into(),
            }],
        }
    }

    /// Picks the highest-quality candidate with a usable URL.
    ///
    /// Ties keep the earlier candidate. Candidates without a quality rank
    /// below any numeric one.
    pub fn best(&self, video_id: &VideoId) -> Result<&StreamCandidate> {
        let mut best: Option<&StreamCandidate> = None;
        for candidate in self.candidates.iter().filter(|c| !c.url.trim().is_empty()) {
            match best {
                Some(current) if candidate.quality <= current.quality => {}
                _ => best = Some(candidate),
            }
        }
        best.ok_or_else(|| PlaybackError::resolution(video_id.as_str(), "no candidate with a URL"))
    }
}

/// Turns a video id into playable or downloadable URLs.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<ResolvedSource>;
}
