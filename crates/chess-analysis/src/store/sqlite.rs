use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{GameStore, StoreError};
use crate::record::GameAnalysis;

/// SQLite-backed store. Each record is kept as a JSON document in the
/// `analyses` table, next to its id and end time.
///
/// # Example
///
/// ```ignore
/// let store = SqliteStore::open("data/analyses.db")?;
/// store.put(&analysis)?;
/// assert!(store.exists(analysis.id())?);
/// ```
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a SQLite database at the given path.
    ///
    /// `":memory:"` opens a private in-memory database. The schema is
    /// initialized on first open.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or if schema
    /// initialization fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS analyses (
                id TEXT PRIMARY KEY,
                end_time INTEGER NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn decode(id: &str, body: &str) -> Result<GameAnalysis, StoreError> {
        serde_json::from_str(body).map_err(|source| StoreError::Malformed {
            id: id.to_string(),
            source,
        })
    }
}

impl GameStore for SqliteStore {
    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM analyses WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn get(&self, id: &str) -> Result<Option<GameAnalysis>, StoreError> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row("SELECT body FROM analyses WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        body.map(|body| Self::decode(id, &body)).transpose()
    }

    fn put(&self, analysis: &GameAnalysis) -> Result<(), StoreError> {
        let body = serde_json::to_string(analysis).map_err(|source| StoreError::Malformed {
            id: analysis.id().to_string(),
            source,
        })?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO analyses (id, end_time, body, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                analysis.id(),
                analysis.game.end_time,
                body,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<GameAnalysis>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, body FROM analyses ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut analyses = Vec::new();
        for row in rows {
            let (id, body) = row?;
            analyses.push(Self::decode(&id, &body)?);
        }
        Ok(analyses)
    }
}
