//! Repository layer for the offline store

mod offline_song;

pub use offline_song::{OfflineSongRepository, SqliteOfflineSongRepository};
