//! Offline store behaviour across available and degraded modes

use async_trait::async_trait;
use core_library::{
    LibraryError, OfflineSong, OfflineSongRepository, OfflineStore, Result,
    SqliteOfflineSongRepository, VideoId,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Reads work; every write fails at the database layer.
#[derive(Default)]
struct BrokenWrites {
    reads: AtomicUsize,
}

#[async_trait]
impl OfflineSongRepository for BrokenWrites {
    async fn get(&self, _video_id: &VideoId) -> Result<Option<OfflineSong>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }

    async fn put(&self, _song: &OfflineSong) -> Result<()> {
        Err(LibraryError::Database(sqlx::Error::PoolClosed))
    }

    async fn delete(&self, _video_id: &VideoId) -> Result<bool> {
        Ok(false)
    }

    async fn list_all(&self, _title_filter: Option<&str>) -> Result<Vec<OfflineSong>> {
        Ok(Vec::new())
    }

    async fn contains(&self, _video_id: &VideoId) -> Result<bool> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }
}

fn song(id: &str, title: &str, downloaded_at: i64) -> OfflineSong {
    OfflineSong {
        video_id: VideoId::new(id),
        title: title.to_string(),
        thumbnail_url: String::new(),
        audio: vec![1, 2, 3, 4],
        cover: None,
        duration_label: "2:10".to_string(),
        downloaded_at,
    }
}

async fn memory_store() -> OfflineStore {
    let repo = SqliteOfflineSongRepository::in_memory().await.unwrap();
    OfflineStore::new(Arc::new(repo))
}

#[tokio::test]
async fn available_store_round_trips_records() {
    let store = memory_store().await;
    assert!(store.is_available());

    store.put(&song("v1", "One", 1)).await.unwrap();
    store.put(&song("v2", "Two", 2)).await.unwrap();

    assert!(store.contains(&VideoId::new("v1")).await.unwrap());
    assert_eq!(
        store.get(&VideoId::new("v2")).await.unwrap().unwrap().title,
        "Two"
    );

    let listed = store.list_all(Some("o")).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].video_id, VideoId::new("v2"));

    assert!(store.delete(&VideoId::new("v1")).await.unwrap());
    assert_eq!(store.list_all(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn degraded_store_reads_absent_and_refuses_writes() {
    let store = OfflineStore::unavailable("disk full");
    assert!(!store.is_available());
    assert_eq!(store.unavailable_reason().as_deref(), Some("disk full"));

    assert!(store.get(&VideoId::new("v1")).await.unwrap().is_none());
    assert!(!store.contains(&VideoId::new("v1")).await.unwrap());

    let err = store.put(&song("v1", "One", 1)).await.unwrap_err();
    assert!(err.is_unavailable());
    assert!(matches!(
        store.delete(&VideoId::new("v1")).await,
        Err(LibraryError::Unavailable(_))
    ));
    assert!(store.list_all(None).await.is_err());
}

#[tokio::test]
async fn database_failure_degrades_every_handle() {
    let repo = Arc::new(BrokenWrites::default());
    let store = OfflineStore::new(repo.clone());
    let other = store.clone();

    assert!(store.contains(&VideoId::new("v1")).await.is_ok());
    let err = store.put(&song("v1", "One", 1)).await.unwrap_err();
    assert!(matches!(err, LibraryError::Database(_)));

    assert!(!other.is_available());
    assert!(other.unavailable_reason().unwrap().contains("Database error"));
    assert!(other.put(&song("v1", "One", 1)).await.unwrap_err().is_unavailable());
    assert!(other.get(&VideoId::new("v1")).await.unwrap().is_none());
    assert_eq!(repo.reads.load(Ordering::SeqCst), 1);

    assert!(!store.degrade("again"));
}

#[test]
fn only_storage_layer_errors_degrade() {
    assert!(LibraryError::Database(sqlx::Error::PoolClosed).is_storage_failure());
    assert!(LibraryError::Migration("v2".into()).is_storage_failure());
    assert!(!LibraryError::InvalidInput {
        field: "title".into(),
        message: "empty".into(),
    }
    .is_storage_failure());
    assert!(!LibraryError::Unavailable("off".into()).is_storage_failure());
}

#[tokio::test]
async fn open_or_degrade_reports_cause() {
    // A directory path cannot be opened as a SQLite file
    let (store, cause) = OfflineStore::open_or_degrade(std::env::temp_dir()).await;
    assert!(!store.is_available());
    assert!(cause.is_some());
}

#[tokio::test]
async fn open_or_degrade_creates_file_store() {
    let dir = std::env::temp_dir().join(format!("offline-store-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();

    let (store, cause) = OfflineStore::open_or_degrade(dir.join("offline.db")).await;
    assert!(cause.is_none());
    store.put(&song("v1", "Persisted", 5)).await.unwrap();
    drop(store);

    let (reopened, _) = OfflineStore::open_or_degrade(dir.join("offline.db")).await;
    assert!(reopened.contains(&VideoId::new("v1")).await.unwrap());

    let _ = std::fs::remove_dir_all(dir);
}
