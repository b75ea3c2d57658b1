//! Source resolvers
//!
//! - [`YtdlpStreamResolver`] returns one stream URL, used when an entry
//!   becomes current and has no local copy.
//! - [`AgatzConversionResolver`] converts the video to MP3 and returns every
//!   rendition; the download manager keeps the best quality.

use async_trait::async_trait;
use bridge_traits::HttpRequest;
use core_library::VideoId;
use core_playback::{FetchPolicy, ResolvedSource, RetryFetch, SourceResolver, StreamCandidate};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::{ProviderError, Result};
use crate::types::{ConversionResponse, StreamResponse};

/// Stream API base URL
pub const YTDLP_API_BASE: &str = "https://ytdlpyton.nvlgroup.my.id";

/// Conversion API base URL
pub const AGATZ_API_BASE: &str = "https://api.agatz.xyz";

const STREAM_ENDPOINT: &str = "download/audio";
const CONVERSION_ENDPOINT: &str = "ytmp3";

fn watch_url(video_id: &VideoId) -> String {
    format!("https://youtube.com/watch?v={}", video_id)
}

/// Stream URL resolver. Uses the generic fetch policy.
pub struct YtdlpStreamResolver {
    fetch: RetryFetch,
    policy: FetchPolicy,
    base_url: String,
}

impl YtdlpStreamResolver {
    pub fn new(fetch: RetryFetch, policy: FetchPolicy) -> Self {
        Self {
            fetch,
            policy,
            base_url: YTDLP_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request_url(&self, video_id: &VideoId) -> String {
        format!(
            "{}/{}?url={}&mode=Url",
            self.base_url,
            STREAM_ENDPOINT,
            urlencoding::encode(&watch_url(video_id))
        )
    }

    async fn run(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<ResolvedSource> {
        let request = HttpRequest::get(self.request_url(video_id)).accept_json();
        let response = self.fetch.fetch(request, &self.policy, cancel).await?;
        let parsed: StreamResponse = serde_json::from_slice(&response.body)
            .map_err(|e| ProviderError::parse(STREAM_ENDPOINT, e))?;

        match parsed.download_url {
            Some(url) if parsed.status == "Success" && !url.trim().is_empty() => {
                Ok(ResolvedSource::single(url))
            }
            _ => Err(ProviderError::Rejected {
                endpoint: STREAM_ENDPOINT,
                message: format!("status {:?} without a download URL", parsed.status),
            }),
        }
    }
}

#[async_trait]
impl SourceResolver for YtdlpStreamResolver {
    fn name(&self) -> &'static str {
        "ytdlp-stream"
    }

    #[instrument(skip(self, cancel), fields(video_id = %video_id))]
    async fn resolve(
        &self,
        video_id: &VideoId,
        cancel: &CancellationToken,
    ) -> core_playback::Result<ResolvedSource> {
        self.run(video_id, cancel)
            .await
            .map_err(|e| e.into_resolution(video_id.as_str()))
    }
}

/// MP3 conversion resolver. Uses the conversion fetch policy.
pub struct AgatzConversionResolver {
    fetch: RetryFetch,
    policy: FetchPolicy,
    base_url: String,
}

impl AgatzConversionResolver {
    pub fn new(fetch: RetryFetch, policy: FetchPolicy) -> Self {
        Self {
            fetch,
            policy,
            base_url: AGATZ_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request_url(&self, video_id: &VideoId) -> String {
        format!(
            "{}/api/{}?url={}",
            self.base_url,
            CONVERSION_ENDPOINT,
            watch_url(video_id)
        )
    }

    async fn run(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<ResolvedSource> {
        let response = self
            .fetch
            .fetch(HttpRequest::get(self.request_url(video_id)), &self.policy, cancel)
            .await?;
        let parsed: ConversionResponse = serde_json::from_slice(&response.body)
            .map_err(|e| ProviderError::parse(CONVERSION_ENDPOINT, e))?;

        if parsed.status != 200 || parsed.data.is_empty() {
            return Err(ProviderError::Rejected {
                endpoint: CONVERSION_ENDPOINT,
                message: format!("status {} with {} rendition(s)", parsed.status, parsed.data.len()),
            });
        }

        let candidates: Vec<StreamCandidate> = parsed
            .data
            .into_iter()
            .filter_map(|item| {
                let url = item.download_url?;
                let quality = item
                    .quality
                    .as_ref()
                    .and_then(|q| q.leading_integer())
                    .and_then(|q| u32::try_from(q).ok());
                Some(StreamCandidate { quality, url })
            })
            .collect();
        debug!(count = candidates.len(), "Conversion renditions");

        Ok(ResolvedSource { candidates })
    }
}

#[async_trait]
impl SourceResolver for AgatzConversionResolver {
    fn name(&self) -> &'static str {
        "agatz-ytmp3"
    }

    #[instrument(skip(self, cancel), fields(video_id = %video_id))]
    async fn resolve(
        &self,
        video_id: &VideoId,
        cancel: &CancellationToken,
    ) -> core_playback::Result<ResolvedSource> {
        self.run(video_id, cancel)
            .await
            .map_err(|e| e.into_resolution(video_id.as_str()))
    }
}
