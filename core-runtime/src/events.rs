//! # Event Bus System
//!
//! Typed events between the core and the presentation layer, carried over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The core never calls into UI code. Every state change a UI cares about
//! (queue position, resolution progress, download progress, short-lived
//! notifications) is published here and consumed by whoever subscribes.
//!
//! ```text
//! ┌────────────────┐   emit   ┌───────────┐  subscribe  ┌──────────────┐
//! │ Player Session ├─────────>│           ├────────────>│ UI / host    │
//! └────────────────┘          │ EventBus  │             └──────────────┘
//! ┌────────────────┐   emit   │ (broadcast│  subscribe  ┌──────────────┐
//! │ Download Mgr   ├─────────>│  channel) ├────────────>│ Logger, etc. │
//! └────────────────┘          └───────────┘             └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, QueueEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut sub = bus.subscribe();
//!
//! bus.emit(CoreEvent::Queue(QueueEvent::ShuffleChanged { enabled: true })).ok();
//! assert!(matches!(sub.recv().await, Ok(CoreEvent::Queue(_))));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: every sender was dropped; treat as shutdown.
//!
//! Emitting with no subscribers returns an error which core components
//! ignore: a headless session is valid.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

pub use crate::config::DEFAULT_EVENT_BUFFER_SIZE;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Queue(QueueEvent),
    Download(DownloadEvent),
    Library(LibraryEvent),
    /// Short-lived, non-blocking message for the user.
    Notification {
        message: String,
        level: EventSeverity,
    },
}

impl CoreEvent {
    /// Convenience constructor for [`CoreEvent::Notification`].
    pub fn notify(level: EventSeverity, message: impl Into<String>) -> Self {
        CoreEvent::Notification {
            message: message.into(),
            level,
        }
    }

    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Queue(e) => e.description(),
            CoreEvent::Download(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
            CoreEvent::Notification { message, .. } => message,
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Notification { level, .. } => *level,
            CoreEvent::Playback(PlaybackEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Download(DownloadEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Library(LibraryEvent::StoreUnavailable { .. }) => EventSeverity::Warning,
            CoreEvent::Queue(QueueEvent::Exhausted) => EventSeverity::Info,
            CoreEvent::Download(DownloadEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::SongDeleted { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Where the audio for a started track comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// Offline blob from the local store
    Local,
    /// Remote stream URL
    Remote,
}

/// Events describing the single playback slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The entry at `index` is being turned into a playable source.
    Resolving { video_id: String, index: usize },
    Started {
        video_id: String,
        title: String,
        source: SourceKind,
    },
    Paused { video_id: String },
    Resumed { video_id: String },
    /// Repeat mode restarted the track from zero.
    Restarted { video_id: String },
    Progress {
        position_ms: u64,
        duration_ms: Option<u64>,
    },
    /// The track could not be resolved or played; the queue skips past it.
    Failed { video_id: String, message: String },
    Stopped,
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Resolving { .. } => "Resolving audio source",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Restarted { .. } => "Track restarted",
            PlaybackEvent::Progress { .. } => "Playback position updated",
            PlaybackEvent::Failed { .. } => "Track failed to play",
            PlaybackEvent::Stopped => "Playback stopped",
        }
    }
}

// ============================================================================
// Queue Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueueEvent {
    /// The queue was cleared and loaded with new entries.
    Replaced { length: usize, current_index: usize },
    /// Entries were appended to the existing queue.
    Appended { added: usize, length: usize },
    IndexChanged { index: usize, video_id: String },
    ShuffleChanged { enabled: bool },
    RepeatChanged { enabled: bool },
    /// Playback ran past the last entry.
    Exhausted,
}

impl QueueEvent {
    fn description(&self) -> &str {
        match self {
            QueueEvent::Replaced { .. } => "Queue replaced",
            QueueEvent::Appended { .. } => "Tracks added to queue",
            QueueEvent::IndexChanged { .. } => "Now playing changed",
            QueueEvent::ShuffleChanged { .. } => "Shuffle toggled",
            QueueEvent::RepeatChanged { .. } => "Repeat toggled",
            QueueEvent::Exhausted => "End of queue",
        }
    }
}

// ============================================================================
// Download Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    Started { video_id: String, title: String },
    /// Fraction in `[0, 1]`. Simulated progress stays below 0.95 until the
    /// final 1.0.
    Progress { video_id: String, progress: f64 },
    Completed { video_id: String },
    Cancelled { video_id: String },
    Failed { video_id: String, message: String },
}

impl DownloadEvent {
    fn description(&self) -> &str {
        match self {
            DownloadEvent::Started { .. } => "Download started",
            DownloadEvent::Progress { .. } => "Download progress",
            DownloadEvent::Completed { .. } => "Download completed",
            DownloadEvent::Cancelled { .. } => "Download cancelled",
            DownloadEvent::Failed { .. } => "Download failed",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    SongSaved { video_id: String, title: String },
    SongDeleted { video_id: String },
    /// The offline store could not be opened; the session is online-only.
    StoreUnavailable { message: String },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::SongSaved { .. } => "Song saved offline",
            LibraryEvent::SongDeleted { .. } => "Offline song deleted",
            LibraryEvent::StoreUnavailable { .. } => "Offline storage unavailable",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning is cheap and every clone publishes into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers that fall behind by more than `capacity` events receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with predicate filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let downloads_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Download(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
