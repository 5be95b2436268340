//! SQLite-backed local store.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{LocalStore, ResourceKey, Storable, StoreError};
use crate::error::{safe_call, DatabaseErrorProcessor};
use crate::result::LoadResult;

/// SQLite-based store implementation.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open the store at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open (or create) the store at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// A store that lives only as long as this value.
  pub fn in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::with_connection(conn)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("waka").join("cache.db"))
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn with_conn<T, F>(&self, f: F) -> LoadResult<T>
  where
    F: FnOnce(&Connection) -> std::result::Result<LoadResult<T>, StoreError>,
  {
    safe_call(&DatabaseErrorProcessor, || -> std::result::Result<LoadResult<T>, StoreError> {
      let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
      f(&conn)
    })
  }
}

/// Schema for store tables.
const STORE_SCHEMA: &str = r#"
-- Latest copy of each resource (serialized JSON)
CREATE TABLE IF NOT EXISTS entries (
    key_hash TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    description TEXT NOT NULL,
    data BLOB NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Append-only history (rank snapshots)
CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key_hash TEXT NOT NULL,
    kind TEXT NOT NULL,
    data BLOB NOT NULL,
    recorded_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_history_key ON history(key_hash, kind);
"#;

impl LocalStore for SqliteStore {
  fn get<T: Storable>(&self, key: &ResourceKey) -> LoadResult<T> {
    self.with_conn(|conn| {
      let data: Option<Vec<u8>> = conn
        .query_row(
          "SELECT data FROM entries WHERE key_hash = ? AND kind = ?",
          params![key.cache_hash(), T::kind()],
          |row| row.get(0),
        )
        .optional()?;

      match data {
        Some(data) => Ok(LoadResult::values(serde_json::from_slice(&data)?)),
        None => Ok(LoadResult::Empty),
      }
    })
  }

  fn put<T: Storable>(&self, key: &ResourceKey, value: &T) -> LoadResult<usize> {
    self.with_conn(|conn| {
      let data = serde_json::to_vec(value)?;
      let written = conn.execute(
        "INSERT OR REPLACE INTO entries (key_hash, kind, description, data, stored_at)
         VALUES (?, ?, ?, ?, datetime('now'))",
        params![key.cache_hash(), T::kind(), key.description(), data],
      )?;
      Ok(LoadResult::values(written))
    })
  }

  fn clear(&self, key: &ResourceKey) -> LoadResult<bool> {
    self.with_conn(|conn| {
      let removed = conn.execute(
        "DELETE FROM entries WHERE key_hash = ?",
        params![key.cache_hash()],
      )?;
      Ok(LoadResult::values(removed > 0))
    })
  }

  fn record<T: Storable>(&self, key: &ResourceKey, value: &T) -> LoadResult<usize> {
    self.with_conn(|conn| {
      let data = serde_json::to_vec(value)?;
      let written = conn.execute(
        "INSERT INTO history (key_hash, kind, data, recorded_at)
         VALUES (?, ?, ?, datetime('now'))",
        params![key.cache_hash(), T::kind(), data],
      )?;
      Ok(LoadResult::values(written))
    })
  }

  fn history<T: Storable>(&self, key: &ResourceKey) -> LoadResult<Vec<T>> {
    self.with_conn(|conn| {
      let mut stmt = conn.prepare(
        "SELECT data FROM history WHERE key_hash = ? AND kind = ? ORDER BY id",
      )?;

      let rows = stmt
        .query_map(params![key.cache_hash(), T::kind()], |row| {
          row.get::<_, Vec<u8>>(0)
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

      let values = rows
        .iter()
        .map(|data| serde_json::from_slice(data))
        .collect::<std::result::Result<Vec<T>, _>>()?;

      Ok(LoadResult::from_vec(values))
    })
  }
}
