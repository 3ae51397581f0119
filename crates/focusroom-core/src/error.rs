//! Core error types for focusroom-core.
//!
//! Most failures in the timer never reach the caller: settings are coerced,
//! unreadable records fall back to defaults and notification problems are
//! only logged. What remains is storage plumbing, surfaced through these
//! types so the CLI can report it.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Unknown settings key passed to string-based access
    #[error("Unknown settings key: {0}")]
    UnknownSettingsKey(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Data directory could not be determined or created
    #[error("Data directory unavailable at {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Completion notification errors. Logged by the dispatcher, never
/// propagated to the engine.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The mapped sound file is not installed
    #[error("Sound asset not found: {0}")]
    AssetMissing(PathBuf),

    /// No audio player could be launched
    #[error("Failed to launch audio player: {0}")]
    Player(#[source] std::io::Error),

    /// The desktop notification service rejected the request
    #[error("Desktop notification failed: {0}")]
    Desktop(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
