//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges from a [`CoreConfig`] (HTTP,
//! connectivity, media output, settings) together with the Offline Store and
//! the YouTube providers into a single [`CoreService`]. Hosts build a config,
//! call [`CoreService::bootstrap`], subscribe to events and drive the player
//! through the returned handle.
//!
//! ```no_run
//! # async fn example(media: std::sync::Arc<dyn bridge_traits::MediaOutput>) -> core_service::Result<()> {
//! use core_runtime::config::CoreConfig;
//! use core_service::CoreService;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/tmp/ytmusic/offline.db")
//!     .media_output(media)
//!     .build()?;
//! let core = CoreService::bootstrap(config).await?;
//!
//! let results = core.search_videos("daft punk").await?;
//! core.play_results(&results, 0, true).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod query;

pub use error::{CoreError, Result};
pub use query::{export_file_name, sanitize_query, MAX_QUERY_CHARS};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::{Clock, MediaEvent, SettingsStore, SystemClock};
use core_library::{OfflineSong, OfflineStore, VideoId};
use core_playback::{
    DownloadManager, DownloadRequest, FetchPolicy, PlaybackOutcome, PlaybackResolver,
    PlayerSession, RetryFetch, SearchProvider, SearchResult, SessionSnapshot, SourceResolver,
    TrackReference,
};
use core_runtime::config::{CoreConfig, NetworkConfig};
use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream, LibraryEvent};
use parking_lot::Mutex;
use provider_youtube::{
    AgatzConversionResolver, DeliriusTrackSearch, DeliriusVideoSearch, YtdlpStreamResolver,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Settings key holding the JSON queue snapshot.
pub const SESSION_SNAPSHOT_KEY: &str = "session.snapshot";
/// Settings key holding the last video search query.
pub const LAST_VIDEO_QUERY_KEY: &str = "session.last_video_query";
/// Settings key holding the last track search query.
pub const LAST_TRACK_QUERY_KEY: &str = "session.last_track_query";

/// The two search surfaces of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSurface {
    /// Main video search.
    Videos,
    /// Track search.
    Tracks,
}

/// Search and resolution services the core talks to.
#[derive(Clone)]
pub struct Providers {
    pub video_search: Arc<dyn SearchProvider>,
    pub track_search: Arc<dyn SearchProvider>,
    /// Used for playback.
    pub stream_resolver: Arc<dyn SourceResolver>,
    /// Used for downloads.
    pub conversion_resolver: Arc<dyn SourceResolver>,
}

impl Providers {
    /// The public YouTube endpoints, sharing one retrying fetcher.
    pub fn youtube(fetch: &RetryFetch, network: &NetworkConfig) -> Self {
        let generic = FetchPolicy::generic(network);
        let conversion = FetchPolicy::conversion(network);
        Self {
            video_search: Arc::new(DeliriusVideoSearch::new(fetch.clone(), generic)),
            track_search: Arc::new(DeliriusTrackSearch::new(fetch.clone(), generic)),
            stream_resolver: Arc::new(YtdlpStreamResolver::new(fetch.clone(), generic)),
            conversion_resolver: Arc::new(AgatzConversionResolver::new(fetch.clone(), conversion)),
        }
    }
}

/// Last query of each search surface, persisted with the session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LastQueries {
    pub videos: Option<String>,
    pub tracks: Option<String>,
}

#[derive(Default)]
struct SearchSlots {
    queries: LastQueries,
    videos: Option<CancellationToken>,
    tracks: Option<CancellationToken>,
}

struct ServiceInner {
    events: EventBus,
    store: OfflineStore,
    player: PlayerSession,
    downloads: DownloadManager,
    providers: Providers,
    settings: Option<Arc<dyn SettingsStore>>,
    search: Mutex<SearchSlots>,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

impl CoreService {
    /// Opens the Offline Store and wires the YouTube providers.
    ///
    /// A store that cannot be opened does not fail the bootstrap: the
    /// service runs online-only and emits `StoreUnavailable`.
    #[instrument(skip(config), fields(database_path = ?config.database_path))]
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        let fetch = RetryFetch::new(config.http_client.clone());
        let providers = Providers::youtube(&fetch, &config.network);
        Self::bootstrap_with(config, providers, Arc::new(SystemClock)).await
    }

    /// Like [`bootstrap`](Self::bootstrap) with caller-supplied providers
    /// and clock.
    pub async fn bootstrap_with(
        config: CoreConfig,
        providers: Providers,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let (store, degraded) = OfflineStore::open_or_degrade(&config.database_path).await;
        let service = Self::with_store(config, store, providers, clock);
        if let Some(err) = degraded {
            service.emit(CoreEvent::Library(LibraryEvent::StoreUnavailable {
                message: err.to_string(),
            }));
            service.emit(CoreEvent::notify(
                EventSeverity::Warning,
                "Offline library unavailable, downloads are disabled",
            ));
        }
        info!(store_available = service.inner.store.is_available(), "Core service ready");
        Ok(service)
    }

    /// Assembles the service around an already opened store.
    pub fn with_store(
        config: CoreConfig,
        store: OfflineStore,
        providers: Providers,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        let fetch = RetryFetch::new(config.http_client.clone());

        let resolver = PlaybackResolver::new(
            providers.stream_resolver.clone(),
            config.network_monitor.clone(),
            store.clone(),
        );
        let player = PlayerSession::new(
            resolver,
            config.media_output.clone(),
            store.clone(),
            events.clone(),
        );
        let downloads = DownloadManager::new(
            providers.conversion_resolver.clone(),
            fetch,
            store.clone(),
            events.clone(),
            clock,
            FetchPolicy::generic(&config.network),
        );

        Self {
            inner: Arc::new(ServiceInner {
                events,
                store,
                player,
                downloads,
                providers,
                settings: config.settings_store,
                search: Mutex::new(SearchSlots::default()),
            }),
        }
    }

    // ========================================================================
    // Handles
    // ========================================================================

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    /// Transport controls and queue state.
    pub fn player(&self) -> &PlayerSession {
        &self.inner.player
    }

    /// Download jobs and their progress.
    pub fn downloads(&self) -> &DownloadManager {
        &self.inner.downloads
    }

    pub fn is_store_available(&self) -> bool {
        self.inner.store.is_available()
    }

    pub fn last_queries(&self) -> LastQueries {
        self.inner.search.lock().queries.clone()
    }

    // ========================================================================
    // Search
    // ========================================================================

    pub async fn search_videos(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search(SearchSurface::Videos, query).await
    }

    pub async fn search_tracks(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search(SearchSurface::Tracks, query).await
    }

    /// Sanitizes `query` and runs it on `surface`.
    ///
    /// A newer search on the same surface cancels this one, which then
    /// fails with a cancelled error.
    #[instrument(skip(self, query))]
    pub async fn search(&self, surface: SearchSurface, query: &str) -> Result<Vec<SearchResult>> {
        let cleaned = sanitize_query(query);
        if cleaned.is_empty() {
            return Err(CoreError::InvalidQuery(query.to_string()));
        }

        let cancel = CancellationToken::new();
        let provider = {
            let mut guard = self.inner.search.lock();
            let slots = &mut *guard;
            let (slot, last) = match surface {
                SearchSurface::Videos => (&mut slots.videos, &mut slots.queries.videos),
                SearchSurface::Tracks => (&mut slots.tracks, &mut slots.queries.tracks),
            };
            if let Some(previous) = slot.replace(cancel.clone()) {
                previous.cancel();
            }
            *last = Some(cleaned.clone());
            match surface {
                SearchSurface::Videos => self.inner.providers.video_search.clone(),
                SearchSurface::Tracks => self.inner.providers.track_search.clone(),
            }
        };

        debug!(provider = provider.name(), query = %cleaned, "Searching");
        let results = provider.search(&cleaned, &cancel).await?;
        Ok(results)
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Queues search results and plays from `start_index`.
    pub async fn play_results(
        &self,
        results: &[SearchResult],
        start_index: usize,
        replace: bool,
    ) -> Result<PlaybackOutcome> {
        let tracks: Vec<TrackReference> = results.iter().map(TrackReference::from).collect();
        Ok(self.inner.player.build_and_play(tracks, start_index, replace).await?)
    }

    /// Queues the whole offline library and plays from `video_id`.
    pub async fn play_offline_library(&self, video_id: Option<&VideoId>) -> Result<PlaybackOutcome> {
        Ok(self.inner.player.play_offline_library(video_id).await?)
    }

    /// Forwards a media output notification to the player.
    pub async fn handle_media_event(&self, event: MediaEvent) -> Result<PlaybackOutcome> {
        Ok(self.inner.player.handle_media_event(event).await?)
    }

    // ========================================================================
    // Offline library
    // ========================================================================

    pub async fn download(&self, result: &SearchResult) -> Result<OfflineSong> {
        let was_available = self.inner.store.is_available();
        let outcome = self.inner.downloads.download(DownloadRequest::from(result)).await;
        if was_available {
            if let Some(reason) = self.inner.store.unavailable_reason() {
                self.emit(CoreEvent::Library(LibraryEvent::StoreUnavailable { message: reason }));
            }
        }
        Ok(outcome?)
    }

    pub fn cancel_download(&self, video_id: &VideoId) -> bool {
        self.inner.downloads.cancel(video_id)
    }

    /// Whether the song is stored. Always `false` while the store is
    /// unavailable.
    pub async fn is_downloaded(&self, video_id: &VideoId) -> Result<bool> {
        if !self.inner.store.is_available() {
            return Ok(false);
        }
        Ok(self.inner.store.contains(video_id).await?)
    }

    /// Stored songs, optionally filtered by a case-insensitive title match.
    /// A filter that sanitizes to nothing lists everything.
    pub async fn list_offline(&self, filter: Option<&str>) -> Result<Vec<OfflineSong>> {
        let filter = filter.map(sanitize_query).filter(|f| !f.is_empty());
        Ok(self.inner.store.list_all(filter.as_deref()).await?)
    }

    #[instrument(skip(self), fields(video_id = %video_id))]
    pub async fn delete_offline(&self, video_id: &VideoId) -> Result<bool> {
        let removed = self.inner.store.delete(video_id).await?;
        if removed {
            self.emit(CoreEvent::Library(LibraryEvent::SongDeleted {
                video_id: video_id.to_string(),
            }));
        }
        Ok(removed)
    }

    /// Writes a stored song's audio into `dir` and returns the file path.
    #[instrument(skip(self, dir), fields(video_id = %video_id))]
    pub async fn export_song(&self, video_id: &VideoId, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let song = self
            .inner
            .store
            .get(video_id)
            .await?
            .ok_or_else(|| CoreError::NotDownloaded(video_id.to_string()))?;

        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(export_file_name(&song.title));
        tokio::fs::write(&path, &song.audio).await?;

        info!(path = ?path, bytes = song.audio.len(), "Exported song");
        Ok(path)
    }

    // ========================================================================
    // Session persistence
    // ========================================================================

    /// Saves the queue snapshot and last queries. Returns `false` when the
    /// host provided no settings store.
    #[instrument(skip(self))]
    pub async fn save_session(&self) -> Result<bool> {
        let Some(settings) = &self.inner.settings else {
            return Ok(false);
        };

        let snapshot = self.inner.player.snapshot();
        settings
            .set_string(SESSION_SNAPSHOT_KEY, &serde_json::to_string(&snapshot)?)
            .await?;

        let queries = self.last_queries();
        for (key, value) in [
            (LAST_VIDEO_QUERY_KEY, queries.videos),
            (LAST_TRACK_QUERY_KEY, queries.tracks),
        ] {
            match value {
                Some(query) => settings.set_string(key, &query).await?,
                None => settings.delete(key).await?,
            }
        }

        debug!(tracks = snapshot.tracks.len(), "Session saved");
        Ok(true)
    }

    /// Restores the saved queue and last queries.
    ///
    /// With `resume`, playback restarts at the saved entry and its outcome
    /// is returned. A corrupt snapshot is discarded.
    #[instrument(skip(self))]
    pub async fn restore_session(&self, resume: bool) -> Result<Option<PlaybackOutcome>> {
        let Some(settings) = &self.inner.settings else {
            return Ok(None);
        };

        let videos = settings.get_string(LAST_VIDEO_QUERY_KEY).await?;
        let tracks = settings.get_string(LAST_TRACK_QUERY_KEY).await?;
        self.inner.search.lock().queries = LastQueries { videos, tracks };

        let Some(raw) = settings.get_string(SESSION_SNAPSHOT_KEY).await? else {
            return Ok(None);
        };
        let snapshot: SessionSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "Discarding unreadable session snapshot");
                settings.delete(SESSION_SNAPSHOT_KEY).await?;
                return Ok(None);
            }
        };

        self.inner.player.restore(snapshot).await;
        info!(tracks = self.inner.player.tracks().len(), "Session restored");

        match self.inner.player.current_index() {
            Some(index) if resume => Ok(Some(self.inner.player.jump_to(index).await?)),
            _ => Ok(None),
        }
    }

    /// Cancels running downloads and saves the session.
    pub async fn shutdown(&self) -> Result<()> {
        self.inner.downloads.cancel_all();
        {
            let slots = self.inner.search.lock();
            for token in [&slots.videos, &slots.tracks].into_iter().flatten() {
                token.cancel();
            }
        }
        self.save_session().await?;
        Ok(())
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.inner.events.emit(event);
    }
}
