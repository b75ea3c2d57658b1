//! # Offline Library Module
//!
//! Owns the offline store: downloaded songs with their audio and cover blobs,
//! indexed by download time.
//!
//! ## Overview
//!
//! - SQLite pool setup and embedded migrations ([`db`])
//! - Record model ([`models::OfflineSong`])
//! - Repository trait and SQLite implementation ([`repositories`])
//! - [`OfflineStore`], which adds the degraded "unavailable" mode used when
//!   the database cannot be opened or fails later in the session

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

pub use error::{LibraryError, Result};
pub use models::{OfflineSong, VideoId};
pub use repositories::{OfflineSongRepository, SqliteOfflineSongRepository};
pub use store::OfflineStore;
