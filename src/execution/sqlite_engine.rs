//! SQLite Execution Engine
//!
//! Runs generated queries against the RetailX dataset. Connections are
//! switched to `query_only` so a generated statement can read but never
//! modify the store.

use crate::dataset;
use crate::error::{AssistantError, Result};
use crate::execution::error_classifier::{ErrorClassifier, QueryFailure};
use crate::execution::result::QueryTable;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// A store that can run a query string and return rows or a failure.
pub trait QueryStore: Send + Sync {
    fn run_query(&self, sql: &str) -> std::result::Result<QueryTable, QueryFailure>;
}

pub struct SqliteStore {
    db: Mutex<Connection>,
    location: String,
    classifier: ErrorClassifier,
}

impl SqliteStore {
    /// Open an existing database file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AssistantError::Dataset(format!(
                "Database file {} not found. Run `retailx init-db` first.",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| AssistantError::Dataset(format!("Failed to open database: {}", e)))?;

        Self::from_connection(conn, path.display().to_string())
    }

    /// In-memory store seeded with the sample data.
    pub fn in_memory_with_sample_data() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        dataset::load_sample_data(&mut conn)?;
        Self::from_connection(conn, ":memory:".to_string())
    }

    fn from_connection(conn: Connection, location: String) -> Result<Self> {
        conn.execute_batch("PRAGMA query_only = ON;")?;
        info!("Dataset store ready at {}", location);
        Ok(Self {
            db: Mutex::new(conn),
            location,
            classifier: ErrorClassifier::new(),
        })
    }
}

impl QueryStore for SqliteStore {
    fn run_query(&self, sql: &str) -> std::result::Result<QueryTable, QueryFailure> {
        let db = self
            .db
            .lock()
            .map_err(|_| QueryFailure::unavailable(sql, "dataset connection is poisoned"))?;

        if is_blank_query(sql) {
            return Err(QueryFailure::rejected(sql, "empty query"));
        }

        let classify = |e: rusqlite::Error| self.classifier.classify(sql, &e);

        let mut stmt = db.prepare(sql).map_err(classify)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut cursor = stmt.query([]).map_err(classify)?;
        let mut rows = Vec::new();
        while let Some(row) = cursor.next().map_err(classify)? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(value_to_json(row.get_ref(idx).map_err(classify)?));
            }
            rows.push(values);
        }

        debug!("Query on {} returned {} rows", self.location, rows.len());
        Ok(QueryTable::new(columns, rows))
    }
}

/// True when `sql` holds nothing but whitespace, semicolons and comments.
fn is_blank_query(sql: &str) -> bool {
    let mut rest = sql;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ';');
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.find('\n').map_or("", |i| &after[i + 1..]);
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.find("*/").map_or("", |i| &after[i + 2..]);
        } else {
            return rest.is_empty();
        }
    }
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => serde_json::Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}
