//! # Playback Resolver
//!
//! Turns the current queue entry into something the media output can load.
//!
//! Order of preference:
//! 1. a local blob already on the entry,
//! 2. a copy in the Offline Store (downloaded after the queue was built),
//! 3. a stream URL cached on the entry, while online,
//! 4. a fresh stream URL from the [`SourceResolver`], while online.
//!
//! Offline with no local copy fails immediately without touching the network.

use std::sync::Arc;

use bridge_traits::{AudioSource, NetworkMonitor};
use core_library::{OfflineStore, VideoId};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::{PlaybackError, Result};
use crate::providers::SourceResolver;
use crate::track::TrackReference;

/// State of the single playback slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverState {
    Idle,
    Resolving { video_id: VideoId },
    Ready { video_id: VideoId },
    Playing { video_id: VideoId },
    Failed { video_id: VideoId, reason: String },
}

struct Slot {
    state: ResolverState,
    /// Bumped by every `resolve` call; only the latest may settle the state.
    attempt: u64,
}

pub struct PlaybackResolver {
    streams: Arc<dyn SourceResolver>,
    network: Arc<dyn NetworkMonitor>,
    store: OfflineStore,
    slot: Mutex<Slot>,
}

impl PlaybackResolver {
    pub fn new(
        streams: Arc<dyn SourceResolver>,
        network: Arc<dyn NetworkMonitor>,
        store: OfflineStore,
    ) -> Self {
        Self {
            streams,
            network,
            store,
            slot: Mutex::new(Slot {
                state: ResolverState::Idle,
                attempt: 0,
            }),
        }
    }

    pub fn state(&self) -> ResolverState {
        self.slot.lock().state.clone()
    }

    /// Resolves `track` to a playable source and moves to `Ready`.
    ///
    /// On failure the state becomes `Failed`; cancellation returns to `Idle`.
    /// A resolution overtaken by a newer `resolve` call leaves the state alone.
    #[instrument(skip(self, track, cancel), fields(video_id = %track.video_id))]
    pub async fn resolve(
        &self,
        track: &TrackReference,
        cancel: &CancellationToken,
    ) -> Result<AudioSource> {
        let attempt = {
            let mut slot = self.slot.lock();
            slot.attempt += 1;
            slot.state = ResolverState::Resolving {
                video_id: track.video_id.clone(),
            };
            slot.attempt
        };

        let result = self.resolve_inner(track, cancel).await;
        let settled = match &result {
            Ok(_) => ResolverState::Ready {
                video_id: track.video_id.clone(),
            },
            Err(PlaybackError::Cancelled) => ResolverState::Idle,
            Err(err) => ResolverState::Failed {
                video_id: track.video_id.clone(),
                reason: err.to_string(),
            },
        };

        let mut slot = self.slot.lock();
        if slot.attempt == attempt {
            slot.state = settled;
        }
        result
    }

    async fn resolve_inner(
        &self,
        track: &TrackReference,
        cancel: &CancellationToken,
    ) -> Result<AudioSource> {
        if let Some(source) = track.audio_source.as_ref().filter(|s| s.is_local()) {
            debug!("Using local blob");
            return Ok(source.clone());
        }

        match self.store.get(&track.video_id).await {
            Ok(Some(song)) => {
                debug!("Found offline copy");
                return Ok(AudioSource::blob(song.audio.into()));
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "Offline store lookup failed, falling back to streaming"),
        }

        if !self.network.is_connected().await {
            return Err(PlaybackError::Offline(track.video_id.to_string()));
        }

        if let Some(url) = track.remote_url() {
            debug!("Reusing cached stream URL");
            return Ok(AudioSource::remote(url));
        }

        let resolved = self.streams.resolve(&track.video_id, cancel).await?;
        let best = resolved.best(&track.video_id)?;
        debug!(resolver = self.streams.name(), "Stream URL resolved");
        Ok(AudioSource::remote(best.url.clone()))
    }

    pub fn mark_playing(&self, video_id: &VideoId) {
        self.set_state(ResolverState::Playing {
            video_id: video_id.clone(),
        });
    }

    pub fn mark_failed(&self, video_id: &VideoId, reason: impl Into<String>) {
        self.set_state(ResolverState::Failed {
            video_id: video_id.clone(),
            reason: reason.into(),
        });
    }

    pub fn reset(&self) {
        self.set_state(ResolverState::Idle);
    }

    fn set_state(&self, state: ResolverState) {
        self.slot.lock().state = state;
    }
}
