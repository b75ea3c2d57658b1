//! Offline song repository trait and implementation

use crate::db::{create_pool, create_test_pool, DatabaseConfig};
use crate::error::{LibraryError, Result};
use crate::models::{OfflineSong, VideoId};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Offline song repository interface
#[async_trait]
pub trait OfflineSongRepository: Send + Sync {
    /// Find a song by video id
    async fn get(&self, video_id: &VideoId) -> Result<Option<OfflineSong>>;

    /// Insert or overwrite a song
    ///
    /// # Errors
    /// Returns error if validation fails or the write fails. A failed write
    /// leaves no partial row behind.
    async fn put(&self, song: &OfflineSong) -> Result<()>;

    /// Delete a song
    ///
    /// # Returns
    /// - `Ok(true)` if a row was deleted
    /// - `Ok(false)` if no song had that id
    async fn delete(&self, video_id: &VideoId) -> Result<bool>;

    /// All songs, newest download first, optionally filtered by a
    /// case-insensitive substring of the title
    async fn list_all(&self, title_filter: Option<&str>) -> Result<Vec<OfflineSong>>;

    /// Whether a song exists, without loading its blobs
    async fn contains(&self, video_id: &VideoId) -> Result<bool>;
}

/// SQLite implementation of OfflineSongRepository
pub struct SqliteOfflineSongRepository {
    pool: SqlitePool,
}

impl SqliteOfflineSongRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `path`
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let pool = create_pool(DatabaseConfig::new(path)).await?;
        Ok(Self::new(pool))
    }

    /// In-memory repository for tests
    pub async fn in_memory() -> Result<Self> {
        Ok(Self::new(create_test_pool().await?))
    }
}

#[async_trait]
impl OfflineSongRepository for SqliteOfflineSongRepository {
    async fn get(&self, video_id: &VideoId) -> Result<Option<OfflineSong>> {
        let song = query_as::<_, OfflineSong>("SELECT * FROM offline_songs WHERE video_id = ?")
            .bind(video_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(song)
    }

    #[instrument(skip(self, song), fields(video_id = %song.video_id))]
    async fn put(&self, song: &OfflineSong) -> Result<()> {
        song.validate().map_err(|e| LibraryError::InvalidInput {
            field: "OfflineSong".to_string(),
            message: e,
        })?;

        query(
            r#"
            INSERT INTO offline_songs (
                video_id, title, thumbnail_url, audio, cover,
                duration_label, downloaded_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(video_id) DO UPDATE SET
                title = excluded.title,
                thumbnail_url = excluded.thumbnail_url,
                audio = excluded.audio,
                cover = excluded.cover,
                duration_label = excluded.duration_label,
                downloaded_at = excluded.downloaded_at
            "#,
        )
        .bind(&song.video_id)
        .bind(&song.title)
        .bind(&song.thumbnail_url)
        .bind(&song.audio)
        .bind(&song.cover)
        .bind(&song.duration_label)
        .bind(song.downloaded_at)
        .execute(&self.pool)
        .await?;

        debug!(bytes = song.audio.len(), "Stored offline song");
        Ok(())
    }

    async fn delete(&self, video_id: &VideoId) -> Result<bool> {
        let result = query("DELETE FROM offline_songs WHERE video_id = ?")
            .bind(video_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self, title_filter: Option<&str>) -> Result<Vec<OfflineSong>> {
        let songs = query_as::<_, OfflineSong>(
            "SELECT * FROM offline_songs ORDER BY downloaded_at DESC, video_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        // SQLite LIKE/lower() only fold ASCII, so filtering happens here
        let songs = match title_filter.map(str::trim).filter(|f| !f.is_empty()) {
            Some(needle) => songs
                .into_iter()
                .filter(|song| song.title_matches(needle))
                .collect(),
            None => songs,
        };

        Ok(songs)
    }

    async fn contains(&self, video_id: &VideoId) -> Result<bool> {
        let row: Option<(i64,)> = query_as("SELECT 1 FROM offline_songs WHERE video_id = ?")
            .bind(video_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str, title: &str, downloaded_at: i64) -> OfflineSong {
        OfflineSong {
            video_id: VideoId::new(id),
            title: title.to_string(),
            thumbnail_url: format!("https://i.ytimg.com/vi/{}/hq.jpg", id),
            audio: vec![0xFF, 0xFB, 0x90],
            cover: Some(vec![0x89, 0x50]),
            duration_label: "4:01".to_string(),
            downloaded_at,
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let repo = SqliteOfflineSongRepository::in_memory().await.unwrap();
        let original = song("a1", "First", 10);

        repo.put(&original).await.unwrap();

        let found = repo.get(&VideoId::new("a1")).await.unwrap();
        assert_eq!(found, Some(original));
        assert!(repo.get(&VideoId::new("zz")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let repo = SqliteOfflineSongRepository::in_memory().await.unwrap();
        repo.put(&song("a1", "First", 10)).await.unwrap();

        let mut replacement = song("a1", "First (remaster)", 20);
        replacement.cover = None;
        repo.put(&replacement).await.unwrap();

        let all = repo.list_all(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "First (remaster)");
        assert_eq!(all[0].cover, None);
    }

    #[tokio::test]
    async fn test_put_rejects_invalid_song() {
        let repo = SqliteOfflineSongRepository::in_memory().await.unwrap();
        let mut bad = song("a1", "Empty", 1);
        bad.audio.clear();

        let err = repo.put(&bad).await.unwrap_err();
        assert!(matches!(err, LibraryError::InvalidInput { .. }));
        assert!(!repo.contains(&VideoId::new("a1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = SqliteOfflineSongRepository::in_memory().await.unwrap();
        repo.put(&song("a1", "First", 10)).await.unwrap();

        assert!(repo.delete(&VideoId::new("a1")).await.unwrap());
        assert!(!repo.delete(&VideoId::new("a1")).await.unwrap());
        assert!(!repo.contains(&VideoId::new("a1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_all_newest_first() {
        let repo = SqliteOfflineSongRepository::in_memory().await.unwrap();
        repo.put(&song("old", "Old", 100)).await.unwrap();
        repo.put(&song("new", "New", 300)).await.unwrap();
        repo.put(&song("mid", "Mid", 200)).await.unwrap();

        let ids: Vec<String> = repo
            .list_all(None)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.video_id.0)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_list_all_filters_title_case_insensitively() {
        let repo = SqliteOfflineSongRepository::in_memory().await.unwrap();
        repo.put(&song("a", "Café del Mar", 1)).await.unwrap();
        repo.put(&song("b", "Night Drive", 2)).await.unwrap();
        repo.put(&song("c", "CAFÉ Society", 3)).await.unwrap();

        let titles: Vec<String> = repo
            .list_all(Some("café"))
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["CAFÉ Society", "Café del Mar"]);

        assert_eq!(repo.list_all(Some("   ")).await.unwrap().len(), 3);
        assert!(repo.list_all(Some("jazz")).await.unwrap().is_empty());
    }
}
