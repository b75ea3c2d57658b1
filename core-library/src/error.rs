use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    /// The offline store is off; the session runs online-only.
    #[error("Offline storage unavailable: {0}")]
    Unavailable(String),
}

impl LibraryError {
    /// Whether this error means offline storage is off for the whole session
    /// rather than a single failed call.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, LibraryError::Unavailable(_))
    }

    /// Failures of the storage layer itself, as opposed to bad input.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, LibraryError::Database(_) | LibraryError::Migration(_))
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
