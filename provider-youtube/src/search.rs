//! Search providers backed by the Delirius API

use async_trait::async_trait;
use bridge_traits::HttpRequest;
use core_library::VideoId;
use core_playback::{FetchPolicy, RetryFetch, SearchProvider, SearchResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::{ProviderError, Result};
use crate::types::{TrackSearchItem, VideoSearchResponse};

/// Delirius API base URL
pub const DELIRIUS_API_BASE: &str = "https://delirius-apiofc.vercel.app";

const VIDEO_ENDPOINT: &str = "ytsearch";
const TRACK_ENDPOINT: &str = "searchtrack";

/// Video search (`/search/ytsearch`), the main search surface.
pub struct DeliriusVideoSearch {
    fetch: RetryFetch,
    policy: FetchPolicy,
    base_url: String,
}

impl DeliriusVideoSearch {
    pub fn new(fetch: RetryFetch, policy: FetchPolicy) -> Self {
        Self {
            fetch,
            policy,
            base_url: DELIRIUS_API_BASE.to_string(),
        }
    }

    /// Points the provider at another host (mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search/{}?q={}",
            self.base_url,
            VIDEO_ENDPOINT,
            urlencoding::encode(query)
        )
    }

    async fn run(&self, query: &str, cancel: &CancellationToken) -> Result<Vec<SearchResult>> {
        let response = self
            .fetch
            .fetch(HttpRequest::get(self.search_url(query)), &self.policy, cancel)
            .await?;
        let parsed: VideoSearchResponse = serde_json::from_slice(&response.body)
            .map_err(|e| ProviderError::parse(VIDEO_ENDPOINT, e))?;

        if !parsed.status {
            return Err(ProviderError::Rejected {
                endpoint: VIDEO_ENDPOINT,
                message: "status=false".to_string(),
            });
        }

        Ok(parsed
            .data
            .into_iter()
            .map(|item| SearchResult {
                id: VideoId::new(item.video_id),
                title: item.title,
                thumbnail_url: item.thumbnail,
                duration_label: item.duration,
                view_count: item
                    .views
                    .as_ref()
                    .and_then(|v| v.leading_integer())
                    .unwrap_or(0),
            })
            .collect())
    }
}

#[async_trait]
impl SearchProvider for DeliriusVideoSearch {
    fn name(&self) -> &'static str {
        "delirius-ytsearch"
    }

    #[instrument(skip(self, cancel))]
    async fn search(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> core_playback::Result<Vec<SearchResult>> {
        let results = self.run(query, cancel).await?;
        info!(count = results.len(), "Video search complete");
        Ok(results)
    }
}

/// Track search (`/search/searchtrack`). Results carry no view counts and
/// always stream on demand.
pub struct DeliriusTrackSearch {
    fetch: RetryFetch,
    policy: FetchPolicy,
    base_url: String,
}

impl DeliriusTrackSearch {
    pub fn new(fetch: RetryFetch, policy: FetchPolicy) -> Self {
        Self {
            fetch,
            policy,
            base_url: DELIRIUS_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search/{}?q={}",
            self.base_url,
            TRACK_ENDPOINT,
            urlencoding::encode(query)
        )
    }

    async fn run(&self, query: &str, cancel: &CancellationToken) -> Result<Vec<SearchResult>> {
        let response = self
            .fetch
            .fetch(HttpRequest::get(self.search_url(query)), &self.policy, cancel)
            .await?;
        let items: Vec<TrackSearchItem> = serde_json::from_slice(&response.body)
            .map_err(|e| ProviderError::parse(TRACK_ENDPOINT, e))?;
        debug!(count = items.len(), "Parsed track search response");

        Ok(items
            .into_iter()
            .map(|item| SearchResult {
                id: VideoId::new(item.id),
                title: item.title,
                thumbnail_url: item.image,
                duration_label: item.duration.map(|d| d.label).unwrap_or_default(),
                view_count: 0,
            })
            .collect())
    }
}

#[async_trait]
impl SearchProvider for DeliriusTrackSearch {
    fn name(&self) -> &'static str {
        "delirius-searchtrack"
    }

    #[instrument(skip(self, cancel))]
    async fn search(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> core_playback::Result<Vec<SearchResult>> {
        let results = self.run(query, cancel).await?;
        info!(count = results.len(), "Track search complete");
        Ok(results)
    }
}
