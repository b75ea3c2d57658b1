//! # Download Manager
//!
//! Saves songs into the Offline Store for offline playback.
//!
//! Each download runs as a job keyed by video id:
//! 1. resolve candidates through the conversion resolver and pick the best,
//! 2. stream the audio into memory with progress events,
//! 3. fetch the cover art (optional, failures are logged),
//! 4. persist the song with the download timestamp.
//!
//! A job can be cancelled at any point. Nothing is persisted for a cancelled
//! or failed job, and the job entry is removed on every exit path.

use std::collections::HashMap;
use std::sync::Arc;

use bridge_traits::{Clock, HttpRequest};
use core_library::{LibraryError, OfflineSong, OfflineStore, VideoId};
use core_runtime::events::{
    CoreEvent, DownloadEvent, EventBus, EventSeverity, LibraryEvent,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::download::BlobDownloader;
use crate::error::{PlaybackError, Result};
use crate::fetch::{FetchPolicy, RetryFetch};
use crate::providers::{SearchResult, SourceResolver};
use crate::track::TrackReference;

/// Metadata needed to save a song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub video_id: VideoId,
    pub title: String,
    pub thumbnail_url: String,
    pub duration_label: String,
}

impl From<&SearchResult> for DownloadRequest {
    fn from(result: &SearchResult) -> Self {
        Self {
            video_id: result.id.clone(),
            title: result.title.clone(),
            thumbnail_url: result.thumbnail_url.clone(),
            duration_label: result.duration_label.clone(),
        }
    }
}

impl From<&TrackReference> for DownloadRequest {
    fn from(track: &TrackReference) -> Self {
        Self {
            video_id: track.video_id.clone(),
            title: track.title.clone(),
            thumbnail_url: track.thumbnail_url.clone(),
            duration_label: track.duration_label.clone(),
        }
    }
}

#[derive(Debug)]
struct DownloadJob {
    cancel: CancellationToken,
    progress: f64,
}

type JobMap = Arc<Mutex<HashMap<VideoId, DownloadJob>>>;

/// Removes the job entry when the download future completes or is dropped.
struct JobGuard {
    jobs: JobMap,
    video_id: VideoId,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.jobs.lock().remove(&self.video_id);
    }
}

pub struct DownloadManager {
    conversion: Arc<dyn SourceResolver>,
    fetch: RetryFetch,
    downloader: BlobDownloader,
    store: OfflineStore,
    events: EventBus,
    clock: Arc<dyn Clock>,
    generic_policy: FetchPolicy,
    jobs: JobMap,
}

impl DownloadManager {
    pub fn new(
        conversion: Arc<dyn SourceResolver>,
        fetch: RetryFetch,
        store: OfflineStore,
        events: EventBus,
        clock: Arc<dyn Clock>,
        generic_policy: FetchPolicy,
    ) -> Self {
        Self {
            conversion,
            downloader: BlobDownloader::new(fetch.clone()),
            fetch,
            store,
            events,
            clock,
            generic_policy,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Downloads and stores a song.
    ///
    /// Refused before any network activity when the store is unavailable,
    /// the song is already stored, or a job for it is running.
    #[instrument(skip(self, request), fields(video_id = %request.video_id))]
    pub async fn download(&self, request: DownloadRequest) -> Result<OfflineSong> {
        if !self.store.is_available() {
            let reason = self
                .store
                .unavailable_reason()
                .unwrap_or_else(|| "store unavailable".to_string());
            return Err(LibraryError::Unavailable(reason).into());
        }
        let cancel = {
            let mut jobs = self.jobs.lock();
            if jobs.contains_key(&request.video_id) {
                return Err(PlaybackError::DownloadInProgress(
                    request.video_id.to_string(),
                ));
            }
            let cancel = CancellationToken::new();
            jobs.insert(
                request.video_id.clone(),
                DownloadJob {
                    cancel: cancel.clone(),
                    progress: 0.0,
                },
            );
            cancel
        };
        let _guard = JobGuard {
            jobs: Arc::clone(&self.jobs),
            video_id: request.video_id.clone(),
        };
        // The job is claimed before the store lookup so a concurrent request
        // can never pass both checks.
        if self.store.contains(&request.video_id).await? {
            return Err(PlaybackError::AlreadyDownloaded(request.video_id.to_string()));
        }

        info!(title = %request.title, "Download started");
        self.emit(CoreEvent::Download(DownloadEvent::Started {
            video_id: request.video_id.to_string(),
            title: request.title.clone(),
        }));

        let result = self.run_job(&request, &cancel).await;
        let video_id = request.video_id.to_string();

        match &result {
            Ok(song) => {
                info!(bytes = song.audio.len(), "Download completed");
                self.emit(CoreEvent::Download(DownloadEvent::Completed {
                    video_id: video_id.clone(),
                }));
                self.emit(CoreEvent::Library(LibraryEvent::SongSaved {
                    video_id,
                    title: song.title.clone(),
                }));
            }
            Err(PlaybackError::Cancelled) => {
                info!("Download cancelled");
                self.emit(CoreEvent::Download(DownloadEvent::Cancelled { video_id }));
            }
            Err(err) => {
                warn!(error = %err, "Download failed");
                self.emit(CoreEvent::Download(DownloadEvent::Failed {
                    video_id,
                    message: err.to_string(),
                }));
                self.emit(CoreEvent::notify(
                    EventSeverity::Error,
                    format!("Download of \"{}\" failed", request.title),
                ));
            }
        }

        result
    }

    async fn run_job(
        &self,
        request: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<OfflineSong> {
        let resolved = self.conversion.resolve(&request.video_id, cancel).await?;
        let best = resolved.best(&request.video_id)?;
        debug!(quality = ?best.quality, "Selected download candidate");

        let on_progress = |progress: f64| self.record_progress(&request.video_id, progress);
        let audio = self
            .downloader
            .download(&best.url, &self.generic_policy, cancel, &on_progress)
            .await?;

        let cover = self.fetch_cover(&request.thumbnail_url, cancel).await?;

        // The cancel may have landed after the last await point.
        if cancel.is_cancelled() {
            return Err(PlaybackError::Cancelled);
        }

        let song = OfflineSong {
            video_id: request.video_id.clone(),
            title: request.title.clone(),
            thumbnail_url: request.thumbnail_url.clone(),
            audio: audio.to_vec(),
            cover,
            duration_label: request.duration_label.clone(),
            downloaded_at: self.clock.unix_timestamp_millis(),
        };
        self.store.put(&song).await?;
        Ok(song)
    }

    /// Cover art is optional; only cancellation is propagated.
    async fn fetch_cover(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<u8>>> {
        if url.trim().is_empty() {
            return Ok(None);
        }
        match self
            .fetch
            .fetch(HttpRequest::get(url), &self.generic_policy, cancel)
            .await
        {
            Ok(response) => Ok(Some(response.body.to_vec())),
            Err(PlaybackError::Cancelled) => Err(PlaybackError::Cancelled),
            Err(err) => {
                warn!(error = %err, "Cover download failed, storing song without cover");
                Ok(None)
            }
        }
    }

    fn record_progress(&self, video_id: &VideoId, progress: f64) {
        if let Some(job) = self.jobs.lock().get_mut(video_id) {
            job.progress = progress;
        }
        self.emit(CoreEvent::Download(DownloadEvent::Progress {
            video_id: video_id.to_string(),
            progress,
        }));
    }

    /// Signals the job for `video_id` to stop. Returns `false` if none runs.
    pub fn cancel(&self, video_id: &VideoId) -> bool {
        match self.jobs.lock().get(video_id) {
            Some(job) => {
                job.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every running job.
    pub fn cancel_all(&self) {
        for job in self.jobs.lock().values() {
            job.cancel.cancel();
        }
    }

    /// Last reported progress of a running job.
    pub fn progress(&self, video_id: &VideoId) -> Option<f64> {
        self.jobs.lock().get(video_id).map(|job| job.progress)
    }

    pub fn is_downloading(&self, video_id: &VideoId) -> bool {
        self.jobs.lock().contains_key(video_id)
    }

    /// Video ids of running jobs, sorted.
    pub fn active_downloads(&self) -> Vec<VideoId> {
        let mut ids: Vec<VideoId> = self.jobs.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.events.emit(event);
    }
}
