//! Persistent storage of game analyses, keyed by game id.
//!
//! Two backends are provided: [`JsonDirStore`] writes one JSON document per
//! game into a directory, [`SqliteStore`] keeps them in a SQLite table.
//! Neither overwrites an existing record.

mod json;
mod sqlite;

pub use json::JsonDirStore;
pub use sqlite::SqliteStore;

use thiserror::Error;

use crate::record::GameAnalysis;

/// Errors that can occur when reading or writing a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A record could not be encoded or decoded.
    #[error("malformed record {id}: {source}")]
    Malformed {
        /// Game id of the record.
        id: String,
        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// Database error.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The game id cannot be used as a key.
    #[error("invalid game id: {0:?}")]
    InvalidId(String),
    /// A previous writer panicked while holding the connection.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Key-value store of [`GameAnalysis`] records.
///
/// Implementations tolerate concurrent writers to distinct keys. `put` never
/// replaces an existing record.
pub trait GameStore: Send + Sync {
    /// Returns true if a record for `id` exists.
    fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Loads the record for `id`, if any.
    fn get(&self, id: &str) -> Result<Option<GameAnalysis>, StoreError>;

    /// Persists a record. A record that already exists is left untouched.
    fn put(&self, analysis: &GameAnalysis) -> Result<(), StoreError>;

    /// Loads every record.
    fn list_all(&self) -> Result<Vec<GameAnalysis>, StoreError>;
}
