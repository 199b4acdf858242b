//! Core error types for studygram-core.
//!
//! Two kinds matter to callers of the accrual path: `InvalidInput`, raised
//! before anything is persisted, and `StoreUnavailable`, raised when the
//! stats store cannot be read or written. Neither is retried internally.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studygram-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Rejected input (bad minutes, malformed dates, illegal timer command)
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Stats store or session log could not be read or written
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, CoreError::InvalidInput(_))
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, CoreError::StoreUnavailable(_))
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Session length must be a positive number of minutes
    #[error("Session minutes must be greater than zero (got {minutes})")]
    NonPositiveMinutes { minutes: i64 },

    /// A date string was not a normalized `YYYY-MM-DD` calendar date
    #[error("Malformed date for '{field}': {value:?} (expected YYYY-MM-DD)")]
    MalformedDate { field: String, value: String },

    /// `yesterday` must be exactly one calendar day before `today`
    #[error("'{yesterday}' is not the day before '{today}'")]
    InconsistentDays { today: String, yesterday: String },

    /// Timer command not allowed in the current state
    #[error("Cannot {command} while timer is {state}")]
    IllegalTransition { command: String, state: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg)
                if code.code == rusqlite::ErrorCode::DatabaseBusy
                    || code.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::StoreUnavailable(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_and_locked_map_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(DatabaseError::from(err), DatabaseError::Locked));
    }

    #[test]
    fn sqlite_errors_surface_as_store_unavailable() {
        let err: CoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(err.is_store_unavailable());
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn validation_messages_name_the_field() {
        let err = ValidationError::MalformedDate {
            field: "today".into(),
            value: "2024-1-10".into(),
        };
        assert!(err.to_string().contains("today"));
        assert!(err.to_string().contains("2024-1-10"));
    }
}
