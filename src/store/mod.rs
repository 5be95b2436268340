//! Local persistence for fetched resources.
//!
//! This module provides a keyed store that:
//! - Holds the latest copy of each logical resource (user, projects, ...)
//! - Appends history rows for data that is tracked over time (ranks)
//! - Reports every outcome as a [`LoadResult`], never as a raw error

mod key;
mod memory;
mod sqlite;

use serde::{de::DeserializeOwned, Serialize};

use crate::model::{PrivateLeaderboard, Project, RankSnapshot, Stats, TotalRecord, User};
use crate::result::LoadResult;

pub use key::ResourceKey;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Values that can be written to a [`LocalStore`].
pub trait Storable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Type name stored next to each row; reads only match rows of the same kind.
  fn kind() -> &'static str;
}

/// Keyed local store for cached resources.
pub trait LocalStore: Send + Sync {
  /// The stored value for `key`, or `Empty` if there is none.
  fn get<T: Storable>(&self, key: &ResourceKey) -> LoadResult<T>;

  /// Insert or replace the value for `key`. Yields the number of rows written.
  fn put<T: Storable>(&self, key: &ResourceKey, value: &T) -> LoadResult<usize>;

  /// Remove the value for `key`. Yields whether anything was removed.
  fn clear(&self, key: &ResourceKey) -> LoadResult<bool>;

  /// Append `value` to the history kept for `key`.
  fn record<T: Storable>(&self, key: &ResourceKey, value: &T) -> LoadResult<usize>;

  /// All history recorded for `key`, oldest first.
  fn history<T: Storable>(&self, key: &ResourceKey) -> LoadResult<Vec<T>>;
}

/// Errors raised inside store implementations before they are classified.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("sqlite: {0}")]
  Sqlite(#[from] rusqlite::Error),
  #[error("serialization: {0}")]
  Serde(#[from] serde_json::Error),
  #[error("store lock poisoned")]
  Poisoned,
}

/// Either store, picked at startup from configuration.
pub enum AnyStore {
  Sqlite(SqliteStore),
  Memory(MemoryStore),
}

impl LocalStore for AnyStore {
  fn get<T: Storable>(&self, key: &ResourceKey) -> LoadResult<T> {
    match self {
      AnyStore::Sqlite(store) => store.get(key),
      AnyStore::Memory(store) => store.get(key),
    }
  }

  fn put<T: Storable>(&self, key: &ResourceKey, value: &T) -> LoadResult<usize> {
    match self {
      AnyStore::Sqlite(store) => store.put(key, value),
      AnyStore::Memory(store) => store.put(key, value),
    }
  }

  fn clear(&self, key: &ResourceKey) -> LoadResult<bool> {
    match self {
      AnyStore::Sqlite(store) => store.clear(key),
      AnyStore::Memory(store) => store.clear(key),
    }
  }

  fn record<T: Storable>(&self, key: &ResourceKey, value: &T) -> LoadResult<usize> {
    match self {
      AnyStore::Sqlite(store) => store.record(key, value),
      AnyStore::Memory(store) => store.record(key, value),
    }
  }

  fn history<T: Storable>(&self, key: &ResourceKey) -> LoadResult<Vec<T>> {
    match self {
      AnyStore::Sqlite(store) => store.history(key),
      AnyStore::Memory(store) => store.history(key),
    }
  }
}

// ============================================================================
// Storable implementations
// ============================================================================

impl Storable for User {
  fn kind() -> &'static str {
    "user"
  }
}

impl Storable for TotalRecord {
  fn kind() -> &'static str {
    "total_record"
  }
}

impl Storable for Stats {
  fn kind() -> &'static str {
    "stats"
  }
}

impl Storable for RankSnapshot {
  fn kind() -> &'static str {
    "rank_snapshot"
  }
}

impl<T: Storable> Storable for Vec<T> {
  fn kind() -> &'static str {
    // Lists of different element types never share a key.
    "list"
  }
}

impl Storable for Project {
  fn kind() -> &'static str {
    "project"
  }
}

impl Storable for PrivateLeaderboard {
  fn kind() -> &'static str {
    "private_leaderboard"
  }
}
