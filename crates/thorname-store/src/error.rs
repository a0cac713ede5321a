//! Error types for the store module.

use thiserror::Error;

use thorname_core::CoreError;

/// Errors that can occur during event log operations.
///
/// Every variant is a genuine data-source fault. "No rows" is never an
/// error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Event rejected before it reached the log.
    #[error("invalid event: {0}")]
    InvalidEvent(#[from] CoreError),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Attempt to move the current height backwards.
    #[error("height regression: current {current}, attempted {attempted}")]
    HeightRegression { current: i64, attempted: i64 },

    /// An in-process lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// Blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    TaskJoin(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
