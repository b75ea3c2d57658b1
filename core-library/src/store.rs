//! Offline store with graceful degradation
//!
//! Wraps an [`OfflineSongRepository`]. When the database could not be opened,
//! or a later call fails at the database layer, the store runs in
//! "unavailable" mode for the rest of the session:
//! lookups answer "absent" so playback falls back to streaming, and writes
//! fail with [`LibraryError::Unavailable`] so downloads are refused up front.

use crate::error::{LibraryError, Result};
use crate::models::{OfflineSong, VideoId};
use crate::repositories::{OfflineSongRepository, SqliteOfflineSongRepository};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

enum Backend {
    Available(Arc<dyn OfflineSongRepository>),
    Unavailable(String),
}

/// The single offline store of a session
///
/// Clones share one backend, so a degradation seen through any clone
/// applies to all of them.
#[derive(Clone)]
pub struct OfflineStore {
    backend: Arc<RwLock<Backend>>,
}

impl OfflineStore {
    pub fn new(repository: Arc<dyn OfflineSongRepository>) -> Self {
        Self::with_backend(Backend::Available(repository))
    }

    /// A store that refuses writes and reports every song as absent
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::with_backend(Backend::Unavailable(reason.into()))
    }

    fn with_backend(backend: Backend) -> Self {
        Self {
            backend: Arc::new(RwLock::new(backend)),
        }
    }

    /// Open the SQLite store at `path`, degrading instead of failing
    ///
    /// Returns the store and, when it degraded, the error that caused it.
    pub async fn open_or_degrade(path: impl Into<PathBuf>) -> (Self, Option<LibraryError>) {
        let path = path.into();
        match SqliteOfflineSongRepository::open(&path).await {
            Ok(repo) => (Self::new(Arc::new(repo)), None),
            Err(e) => {
                warn!(error = %e, path = ?path, "Offline store unavailable, continuing online-only");
                (Self::unavailable(e.to_string()), Some(e))
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(*self.backend.read(), Backend::Available(_))
    }

    /// Why the store is unavailable, if it is
    pub fn unavailable_reason(&self) -> Option<String> {
        match &*self.backend.read() {
            Backend::Available(_) => None,
            Backend::Unavailable(reason) => Some(reason.clone()),
        }
    }

    /// Switch to unavailable mode for the rest of the session.
    ///
    /// Returns `false` when the store was already unavailable.
    pub fn degrade(&self, reason: impl Into<String>) -> bool {
        let mut backend = self.backend.write();
        if matches!(*backend, Backend::Unavailable(_)) {
            return false;
        }
        let reason = reason.into();
        warn!(reason = %reason, "Offline store degraded, continuing online-only");
        *backend = Backend::Unavailable(reason);
        true
    }

    fn repository(&self) -> Option<Arc<dyn OfflineSongRepository>> {
        match &*self.backend.read() {
            Backend::Available(repo) => Some(Arc::clone(repo)),
            Backend::Unavailable(_) => None,
        }
    }

    fn require_repository(&self) -> Result<Arc<dyn OfflineSongRepository>> {
        match &*self.backend.read() {
            Backend::Available(repo) => Ok(Arc::clone(repo)),
            Backend::Unavailable(reason) => Err(LibraryError::Unavailable(reason.clone())),
        }
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_storage_failure() {
                self.degrade(err.to_string());
            }
        }
        result
    }

    pub async fn get(&self, video_id: &VideoId) -> Result<Option<OfflineSong>> {
        match self.repository() {
            Some(repo) => self.observe(repo.get(video_id).await),
            None => Ok(None),
        }
    }

    pub async fn contains(&self, video_id: &VideoId) -> Result<bool> {
        match self.repository() {
            Some(repo) => self.observe(repo.contains(video_id).await),
            None => Ok(false),
        }
    }

    pub async fn put(&self, song: &OfflineSong) -> Result<()> {
        let repo = self.require_repository()?;
        self.observe(repo.put(song).await)
    }

    pub async fn delete(&self, video_id: &VideoId) -> Result<bool> {
        let repo = self.require_repository()?;
        self.observe(repo.delete(video_id).await)
    }

    pub async fn list_all(&self, title_filter: Option<&str>) -> Result<Vec<OfflineSong>> {
        let repo = self.require_repository()?;
        self.observe(repo.list_all(title_filter).await)
    }
}

impl std::fmt::Debug for OfflineStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineStore")
            .field("available", &self.is_available())
            .field("unavailable_reason", &self.unavailable_reason())
            .finish()
    }
}
