//! Error Classifier
//!
//! Sorts dataset store failures into queries the store rejected and
//! stores that could not serve the query at all.

use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The store ran but refused the query (syntax, unknown column, write attempt)
    Rejected,
    /// The store could not be reached or used (busy, locked, corrupt, I/O)
    Unavailable,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Rejected => write!(f, "Rejected"),
            FailureKind::Unavailable => write!(f, "Unavailable"),
        }
    }
}

/// A failed execution attempt. Its display form is the text handed to
/// the answer composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFailure {
    pub kind: FailureKind,
    pub sql: String,
    pub message: String,
}

impl QueryFailure {
    pub fn rejected(sql: &str, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Rejected,
            sql: sql.to_string(),
            message: message.into(),
        }
    }

    pub fn unavailable(sql: &str, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Unavailable,
            sql: sql.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Execution failed on sql '{}': {}", self.sql, self.message)
    }
}

impl std::error::Error for QueryFailure {}

pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a SQLite error raised while running `sql`.
    pub fn classify(&self, sql: &str, error: &rusqlite::Error) -> QueryFailure {
        let message = error.to_string();
        match error {
            rusqlite::Error::SqliteFailure(inner, _) if is_store_fault(inner.code) => {
                QueryFailure::unavailable(sql, message)
            }
            _ => QueryFailure::rejected(sql, message),
        }
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn is_store_fault(code: ErrorCode) -> bool {
    matches!(
        code,
        ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::CannotOpen
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::NotADatabase
            | ErrorCode::SystemIoFailure
            | ErrorCode::OutOfMemory
            | ErrorCode::DiskFull
            | ErrorCode::PermissionDenied
            | ErrorCode::FileLockingProtocolFailed
            | ErrorCode::NoLargeFileSupport
    )
}
