//! Query execution against the dataset store

pub mod error_classifier;
pub mod result;
pub mod sqlite_engine;

pub use error_classifier::{ErrorClassifier, FailureKind, QueryFailure};
pub use result::QueryTable;
pub use sqlite_engine::{QueryStore, SqliteStore};
