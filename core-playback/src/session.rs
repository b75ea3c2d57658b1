//! # Player Session
//!
//! Drives the single playback slot: owns the queue, resolves the current
//! entry, hands sources to the media output and reacts to its events.
//!
//! ## Superseding
//!
//! Every transport action (play, next, previous, jump, track end) starts a
//! new *transition*: under the session lock it mutates the queue, bumps a
//! generation counter and cancels the token of the previous transition.
//! A resolution that finishes for an older generation is discarded, so a
//! slow lookup can never overwrite a newer user choice.
//!
//! ## Skipping
//!
//! When the current entry cannot be resolved or played, the session emits a
//! failure, advances, and tries the next entry. The loop is bounded by the
//! queue length; reaching the end stops playback with `Exhausted`.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{MediaEvent, MediaOutput};
use core_library::{OfflineStore, VideoId};
use core_runtime::events::{
    CoreEvent, EventBus, EventSeverity, PlaybackEvent, QueueEvent, SourceKind,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{PlaybackError, Result};
use crate::queue::QueueEngine;
use crate::resolver::{PlaybackResolver, ResolverState};
use crate::track::{SourceStrategy, TrackReference};

/// Result of a transport action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The entry at `index` is now playing.
    Playing { video_id: VideoId, index: usize },
    /// No entry from the current position onwards could be played.
    Exhausted,
    /// A newer transport action took over before this one finished.
    Superseded,
    /// Nothing changed (e.g. `next` on the last entry).
    Unchanged,
}

/// Serializable queue layout without any audio data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Entries in insertion order.
    pub tracks: Vec<TrackSnapshot>,
    /// Play order as indices into `tracks`.
    #[serde(default)]
    pub order: Vec<usize>,
    pub current_index: Option<usize>,
    pub shuffle: bool,
    pub repeat: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub video_id: VideoId,
    pub title: String,
    pub thumbnail_url: String,
    pub duration_label: String,
    pub strategy: SourceStrategy,
}

impl From<&TrackReference> for TrackSnapshot {
    fn from(track: &TrackReference) -> Self {
        Self {
            video_id: track.video_id.clone(),
            title: track.title.clone(),
            thumbnail_url: track.thumbnail_url.clone(),
            duration_label: track.duration_label.clone(),
            strategy: track.strategy,
        }
    }
}

impl From<TrackSnapshot> for TrackReference {
    fn from(snapshot: TrackSnapshot) -> Self {
        Self {
            video_id: snapshot.video_id,
            title: snapshot.title,
            thumbnail_url: snapshot.thumbnail_url,
            duration_label: snapshot.duration_label,
            cover: None,
            audio_source: None,
            strategy: SourceStrategy::StreamOnDemand,
        }
    }
}

struct SessionState {
    queue: QueueEngine,
    generation: u64,
    inflight: CancellationToken,
}

impl SessionState {
    /// Starts a new transition, cancelling whatever was in flight.
    fn begin_transition(&mut self) -> (u64, CancellationToken) {
        self.inflight.cancel();
        self.generation += 1;
        self.inflight = CancellationToken::new();
        (self.generation, self.inflight.clone())
    }
}

pub struct PlayerSession {
    state: Mutex<SessionState>,
    resolver: PlaybackResolver,
    media: Arc<dyn MediaOutput>,
    store: OfflineStore,
    events: EventBus,
}

impl PlayerSession {
    pub fn new(
        resolver: PlaybackResolver,
        media: Arc<dyn MediaOutput>,
        store: OfflineStore,
        events: EventBus,
    ) -> Self {
        Self::with_queue(QueueEngine::new(), resolver, media, store, events)
    }

    pub fn with_queue(
        queue: QueueEngine,
        resolver: PlaybackResolver,
        media: Arc<dyn MediaOutput>,
        store: OfflineStore,
        events: EventBus,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState {
                queue,
                generation: 0,
                inflight: CancellationToken::new(),
            }),
            resolver,
            media,
            store,
            events,
        }
    }

    // ========================================================================
    // Queue building
    // ========================================================================

    /// Loads `tracks` into the queue and starts playing at `start_index`.
    ///
    /// Entries already in the Offline Store switch to their local copy
    /// before loading. See [`QueueEngine::load`] for `replace`.
    #[instrument(skip(self, tracks), fields(count = tracks.len()))]
    pub async fn build_and_play(
        &self,
        mut tracks: Vec<TrackReference>,
        start_index: usize,
        replace: bool,
    ) -> Result<PlaybackOutcome> {
        self.attach_offline_copies(&mut tracks).await;
        let added = tracks.len();

        let (generation, cancel) = {
            let mut state = self.state.lock();
            let position = state.queue.load(tracks, start_index, replace)?;
            let length = state.queue.len();
            if replace {
                self.emit(CoreEvent::Queue(QueueEvent::Replaced {
                    length,
                    current_index: position,
                }));
            } else {
                self.emit(CoreEvent::Queue(QueueEvent::Appended { added, length }));
            }
            state.begin_transition()
        };

        self.play_from_current(generation, cancel).await
    }

    /// Replaces the queue with every stored song and plays from `video_id`
    /// (or the first song when it is absent or not stored).
    #[instrument(skip(self))]
    pub async fn play_offline_library(&self, video_id: Option<&VideoId>) -> Result<PlaybackOutcome> {
        let songs = self.store.list_all(None).await?;
        if songs.is_empty() {
            return Err(PlaybackError::EmptyQueue);
        }

        let start_index = video_id
            .and_then(|id| songs.iter().position(|song| &song.video_id == id))
            .unwrap_or(0);
        let tracks: Vec<TrackReference> =
            songs.into_iter().map(TrackReference::from_offline).collect();

        info!(count = tracks.len(), start_index, "Playing offline library");
        self.build_and_play(tracks, start_index, true).await
    }

    async fn attach_offline_copies(&self, tracks: &mut [TrackReference]) {
        if !self.store.is_available() {
            return;
        }
        for track in tracks.iter_mut().filter(|t| !t.has_local_source()) {
            match self.store.get(&track.video_id).await {
                Ok(Some(song)) => track.attach_offline(song),
                Ok(None) => {}
                Err(err) => {
                    warn!(video_id = %track.video_id, error = %err, "Offline lookup failed")
                }
            }
        }
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Plays the next entry. A no-op on the last entry.
    pub async fn next(&self) -> Result<PlaybackOutcome> {
        let transition = {
            let mut state = self.state.lock();
            if state.queue.advance() {
                Some(state.begin_transition())
            } else {
                None
            }
        };
        match transition {
            Some((generation, cancel)) => self.play_from_current(generation, cancel).await,
            None => {
                self.emit(CoreEvent::notify(EventSeverity::Info, "End of queue"));
                Ok(PlaybackOutcome::Unchanged)
            }
        }
    }

    /// Plays the previous entry. A no-op on the first entry.
    pub async fn previous(&self) -> Result<PlaybackOutcome> {
        let transition = {
            let mut state = self.state.lock();
            if state.queue.retreat() {
                Some(state.begin_transition())
            } else {
                None
            }
        };
        match transition {
            Some((generation, cancel)) => self.play_from_current(generation, cancel).await,
            None => Ok(PlaybackOutcome::Unchanged),
        }
    }

    /// Plays the entry at `index` (play order).
    pub async fn jump_to(&self, index: usize) -> Result<PlaybackOutcome> {
        let (generation, cancel) = {
            let mut state = self.state.lock();
            state.queue.set_current(index)?;
            state.begin_transition()
        };
        self.play_from_current(generation, cancel).await
    }

    /// Pauses or resumes. Starts the current entry if nothing is loaded.
    ///
    /// Returns `true` when the slot is playing afterwards.
    pub async fn toggle_play_pause(&self) -> Result<bool> {
        if self.state.lock().queue.is_empty() {
            return Err(PlaybackError::EmptyQueue);
        }

        match self.resolver.state() {
            ResolverState::Playing { video_id } | ResolverState::Ready { video_id } => {
                if self.media.is_paused() {
                    self.media.play().await.map_err(media_error)?;
                    self.resolver.mark_playing(&video_id);
                    Ok(true)
                } else {
                    self.media.pause().await.map_err(media_error)?;
                    Ok(false)
                }
            }
            _ => {
                let (generation, cancel) = self.state.lock().begin_transition();
                let outcome = self.play_from_current(generation, cancel).await?;
                Ok(matches!(outcome, PlaybackOutcome::Playing { .. }))
            }
        }
    }

    pub async fn seek(&self, position: Duration) -> Result<()> {
        self.media.seek(position).await.map_err(media_error)
    }

    /// Seeks to a fraction (`0.0..=1.0`) of the loaded track's duration.
    /// Ignored while the duration is unknown.
    pub async fn seek_fraction(&self, fraction: f64) -> Result<()> {
        let Some(duration) = self.media.duration() else {
            debug!("Seek ignored, duration unknown");
            return Ok(());
        };
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.seek(duration.mul_f64(fraction)).await
    }

    pub fn toggle_shuffle(&self) -> bool {
        let enabled = self.state.lock().queue.toggle_shuffle();
        info!(enabled, "Shuffle toggled");
        self.emit(CoreEvent::Queue(QueueEvent::ShuffleChanged { enabled }));
        enabled
    }

    pub fn toggle_repeat(&self) -> bool {
        let enabled = self.state.lock().queue.toggle_repeat();
        info!(enabled, "Repeat toggled");
        self.emit(CoreEvent::Queue(QueueEvent::RepeatChanged { enabled }));
        enabled
    }

    /// Stops playback and cancels any pending resolution.
    pub async fn stop(&self) -> Result<()> {
        self.state.lock().begin_transition();
        self.media.stop().await.map_err(media_error)?;
        self.resolver.reset();
        self.emit(CoreEvent::Playback(PlaybackEvent::Stopped));
        Ok(())
    }

    // ========================================================================
    // Media events
    // ========================================================================

    /// Reacts to a notification from the media output.
    pub async fn handle_media_event(&self, event: MediaEvent) -> Result<PlaybackOutcome> {
        match event {
            MediaEvent::TimeUpdate { position, duration } => {
                self.emit(CoreEvent::Playback(PlaybackEvent::Progress {
                    position_ms: position.as_millis() as u64,
                    duration_ms: duration.map(|d| d.as_millis() as u64),
                }));
                Ok(PlaybackOutcome::Unchanged)
            }
            MediaEvent::Playing => {
                if let Some(video_id) = self.current_video_id() {
                    self.emit(CoreEvent::Playback(PlaybackEvent::Resumed {
                        video_id: video_id.to_string(),
                    }));
                }
                Ok(PlaybackOutcome::Unchanged)
            }
            MediaEvent::Paused => {
                if let Some(video_id) = self.current_video_id() {
                    self.emit(CoreEvent::Playback(PlaybackEvent::Paused {
                        video_id: video_id.to_string(),
                    }));
                }
                Ok(PlaybackOutcome::Unchanged)
            }
            MediaEvent::Ended => self.on_track_ended().await,
            MediaEvent::Error(message) => self.on_media_error(message).await,
        }
    }

    async fn on_track_ended(&self) -> Result<PlaybackOutcome> {
        let (repeat, current) = {
            let state = self.state.lock();
            (
                state.queue.is_repeat(),
                state
                    .queue
                    .current()
                    .map(|t| t.video_id.clone())
                    .zip(state.queue.current_index()),
            )
        };
        let Some((video_id, index)) = current else {
            return Ok(PlaybackOutcome::Unchanged);
        };

        if repeat {
            debug!(video_id = %video_id, "Repeating track");
            let restarted = match self.media.seek(Duration::ZERO).await {
                Ok(()) => self.media.play().await,
                Err(err) => Err(err),
            };
            match restarted {
                Ok(()) => {
                    self.emit(CoreEvent::Playback(PlaybackEvent::Restarted {
                        video_id: video_id.to_string(),
                    }));
                    return Ok(PlaybackOutcome::Playing { video_id, index });
                }
                Err(err) => {
                    let (generation, cancel) = self.state.lock().begin_transition();
                    self.report_failure(&video_id, &media_error(err).to_string());
                    return self.skip_after_failure(generation, cancel).await;
                }
            }
        }

        let transition = {
            let mut state = self.state.lock();
            if state.queue.advance() {
                Some(state.begin_transition())
            } else {
                None
            }
        };
        match transition {
            Some((generation, cancel)) => self.play_from_current(generation, cancel).await,
            None => self.finish_exhausted().await,
        }
    }

    async fn on_media_error(&self, message: String) -> Result<PlaybackOutcome> {
        let (generation, cancel) = {
            let mut state = self.state.lock();
            let Some(entry) = state.queue.current_entry() else {
                return Ok(PlaybackOutcome::Unchanged);
            };
            // A dead stream URL must not be reused.
            state.queue.clear_remote_source(entry);
            state.begin_transition()
        };
        match self.current_video_id() {
            Some(video_id) => {
                self.report_failure(&video_id, &message);
                self.skip_after_failure(generation, cancel).await
            }
            None => Ok(PlaybackOutcome::Unchanged),
        }
    }

    // ========================================================================
    // Resolution loop
    // ========================================================================

    async fn play_from_current(
        &self,
        generation: u64,
        cancel: CancellationToken,
    ) -> Result<PlaybackOutcome> {
        let max_attempts = self.state.lock().queue.len();

        for _ in 0..max_attempts {
            let (track, index, entry) = {
                let state = self.state.lock();
                if state.generation != generation {
                    return Ok(PlaybackOutcome::Superseded);
                }
                match (
                    state.queue.current(),
                    state.queue.current_index(),
                    state.queue.current_entry(),
                ) {
                    (Some(track), Some(index), Some(entry)) => (track.clone(), index, entry),
                    _ => return Err(PlaybackError::EmptyQueue),
                }
            };

            self.emit(CoreEvent::Playback(PlaybackEvent::Resolving {
                video_id: track.video_id.to_string(),
                index,
            }));
            self.emit(CoreEvent::Queue(QueueEvent::IndexChanged {
                index,
                video_id: track.video_id.to_string(),
            }));

            match self.start_track(&track, entry, generation, &cancel).await {
                Ok(Some(source_kind)) => {
                    info!(video_id = %track.video_id, index, "Playback started");
                    self.emit(CoreEvent::Playback(PlaybackEvent::Started {
                        video_id: track.video_id.to_string(),
                        title: track.title.clone(),
                        source: source_kind,
                    }));
                    return Ok(PlaybackOutcome::Playing {
                        video_id: track.video_id,
                        index,
                    });
                }
                Ok(None) | Err(PlaybackError::Cancelled) => {
                    debug!(video_id = %track.video_id, "Resolution superseded");
                    return Ok(PlaybackOutcome::Superseded);
                }
                Err(err) => {
                    if self.state.lock().generation != generation {
                        return Ok(PlaybackOutcome::Superseded);
                    }
                    self.report_failure(&track.video_id, &err.to_string());
                    let advanced = {
                        let mut state = self.state.lock();
                        if state.generation != generation {
                            return Ok(PlaybackOutcome::Superseded);
                        }
                        state.queue.advance()
                    };
                    if !advanced {
                        return self.finish_exhausted().await;
                    }
                }
            }
        }

        self.finish_exhausted().await
    }

    /// Resolves, loads and plays one entry.
    ///
    /// `Ok(None)` means a newer transition took over.
    async fn start_track(
        &self,
        track: &TrackReference,
        entry: usize,
        generation: u64,
        cancel: &CancellationToken,
    ) -> Result<Option<SourceKind>> {
        let source = self.resolver.resolve(track, cancel).await?;
        let kind = if source.is_local() {
            SourceKind::Local
        } else {
            SourceKind::Remote
        };

        {
            let mut state = self.state.lock();
            if state.generation != generation {
                return Ok(None);
            }
            state.queue.set_audio_source(entry, source.clone());
        }

        self.media.load(source).await.map_err(media_error)?;
        if self.state.lock().generation != generation {
            return Ok(None);
        }
        self.media.play().await.map_err(media_error)?;

        if self.state.lock().generation != generation {
            return Ok(None);
        }
        self.resolver.mark_playing(&track.video_id);
        Ok(Some(kind))
    }

    async fn skip_after_failure(
        &self,
        generation: u64,
        cancel: CancellationToken,
    ) -> Result<PlaybackOutcome> {
        let advanced = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return Ok(PlaybackOutcome::Superseded);
            }
            state.queue.advance()
        };
        if advanced {
            self.play_from_current(generation, cancel).await
        } else {
            self.finish_exhausted().await
        }
    }

    async fn finish_exhausted(&self) -> Result<PlaybackOutcome> {
        info!("Queue exhausted");
        if let Err(err) = self.media.stop().await {
            warn!(error = %err, "Media output failed to stop");
        }
        self.emit(CoreEvent::Playback(PlaybackEvent::Stopped));
        self.emit(CoreEvent::Queue(QueueEvent::Exhausted));
        self.emit(CoreEvent::notify(
            EventSeverity::Warning,
            "No more playable songs in the queue",
        ));
        Ok(PlaybackOutcome::Exhausted)
    }

    fn report_failure(&self, video_id: &VideoId, message: &str) {
        warn!(video_id = %video_id, error = %message, "Track failed, skipping");
        self.resolver.mark_failed(video_id, message);
        self.emit(CoreEvent::Playback(PlaybackEvent::Failed {
            video_id: video_id.to_string(),
            message: message.to_string(),
        }));
        self.emit(CoreEvent::notify(
            EventSeverity::Warning,
            "Could not play the song, skipping to the next one",
        ));
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn current_track(&self) -> Option<TrackReference> {
        self.state.lock().queue.current().cloned()
    }

    pub fn current_video_id(&self) -> Option<VideoId> {
        self.state.lock().queue.current().map(|t| t.video_id.clone())
    }

    pub fn current_index(&self) -> Option<usize> {
        self.state.lock().queue.current_index()
    }

    /// Tracks in play order.
    pub fn tracks(&self) -> Vec<TrackReference> {
        self.state.lock().queue.tracks().cloned().collect()
    }

    pub fn is_shuffle(&self) -> bool {
        self.state.lock().queue.is_shuffle()
    }

    pub fn is_repeat(&self) -> bool {
        self.state.lock().queue.is_repeat()
    }

    pub fn resolver_state(&self) -> ResolverState {
        self.resolver.state()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            tracks: state
                .queue
                .original_order()
                .iter()
                .map(TrackSnapshot::from)
                .collect(),
            order: state.queue.play_order().to_vec(),
            current_index: state.queue.current_index(),
            shuffle: state.queue.is_shuffle(),
            repeat: state.queue.is_repeat(),
        }
    }

    /// Rebuilds the queue from a snapshot without starting playback.
    ///
    /// Cached entries get their blob back from the Offline Store; entries
    /// whose song is gone fall back to streaming.
    pub async fn restore(&self, snapshot: SessionSnapshot) {
        let mut tracks: Vec<TrackReference> =
            snapshot.tracks.into_iter().map(TrackReference::from).collect();
        self.attach_offline_copies(&mut tracks).await;

        let order = (!snapshot.order.is_empty()).then_some(snapshot.order);
        let length = tracks.len();
        let mut state = self.state.lock();
        state.begin_transition();
        state.queue.restore(
            tracks,
            order,
            snapshot.current_index.unwrap_or(0),
            snapshot.shuffle,
            snapshot.repeat,
        );
        if let Some(current_index) = state.queue.current_index() {
            self.emit(CoreEvent::Queue(QueueEvent::Replaced {
                length,
                current_index,
            }));
        }
        self.resolver.reset();
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.events.emit(event);
    }
}

fn media_error(err: bridge_traits::BridgeError) -> PlaybackError {
    PlaybackError::MediaOutput(err.to_string())
}

/// Formats seconds as `m:ss`. Non-finite or negative input renders `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
