//! # Briefly - Research briefing store
//!
//! Persistence and pattern-learning layer for AI-generated research briefings.
//!
//! Briefly provides:
//! - SQLite-backed storage for briefings, their cards and sources
//! - Feedback recording against whole briefings or single cards
//! - Per-topic feedback patterns, a running favorability signal
//! - A process-wide database handle with write-through persistence
//! - Retention housekeeping and bookmarks

pub mod briefing;
pub mod feedback;
pub mod storage;
pub mod handle;
pub mod store;
pub mod housekeeping;
pub mod export;
pub mod output;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use briefing::{Briefing, BriefingCard, CreateBriefing, NewCard, NewSource, Source, SourceKind};
pub use feedback::{Feedback, FeedbackPattern, FeedbackStats, NewFeedback, RecordedFeedback};
pub use handle::{close_database, get_database, init_database, save_database};
pub use storage::Database;

/// Result type alias for Briefly operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Briefly operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database not initialized; call init_database first")]
    NotInitialized,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Storage error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        if is_decode_failure(&err) {
            return Error::StorageUnavailable(format!("malformed row: {}", err));
        }
        if let rusqlite::Error::SqliteFailure(code, message) = &err {
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
                let message = message.clone().unwrap_or_else(|| err.to_string());
                return Error::ForeignKeyViolation(message);
            }
            if matches!(
                code.code,
                rusqlite::ErrorCode::NotADatabase | rusqlite::ErrorCode::DatabaseCorrupt
            ) {
                return Error::StorageUnavailable(err.to_string());
            }
        }
        Error::Storage(err)
    }
}

fn is_decode_failure(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::InvalidColumnIndex(_)
            | rusqlite::Error::InvalidColumnName(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_errors_become_storage_unavailable() {
        let err: Error = rusqlite::Error::InvalidColumnIndex(7).into();
        assert!(matches!(err, Error::StorageUnavailable(_)));
    }

    #[test]
    fn test_other_sqlite_errors_stay_storage() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Storage(_)));
    }
}
