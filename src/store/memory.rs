//! In-process store used when persistence is disabled.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{LocalStore, ResourceKey, Storable, StoreError};
use crate::error::{safe_call, DatabaseErrorProcessor};
use crate::result::LoadResult;

#[derive(Default)]
struct Tables {
  entries: HashMap<String, (&'static str, Value)>,
  history: HashMap<String, Vec<(&'static str, Value)>>,
}

/// Store that keeps everything in memory. Values go through JSON like the
/// SQLite store, so reads return exactly what a persistent store would.
#[derive(Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn with_tables<T, F>(&self, f: F) -> LoadResult<T>
  where
    F: FnOnce(&mut Tables) -> Result<LoadResult<T>, StoreError>,
  {
    safe_call(&DatabaseErrorProcessor, || -> Result<LoadResult<T>, StoreError> {
      let mut tables = self.tables.lock().map_err(|_| StoreError::Poisoned)?;
      f(&mut tables)
    })
  }
}

impl LocalStore for MemoryStore {
  fn get<T: Storable>(&self, key: &ResourceKey) -> LoadResult<T> {
    self.with_tables(|tables| match tables.entries.get(&key.cache_hash()) {
      Some((kind, value)) if *kind == T::kind() => {
        Ok(LoadResult::values(serde_json::from_value(value.clone())?))
      }
      _ => Ok(LoadResult::Empty),
    })
  }

  fn put<T: Storable>(&self, key: &ResourceKey, value: &T) -> LoadResult<usize> {
    self.with_tables(|tables| {
      let value = serde_json::to_value(value)?;
      tables.entries.insert(key.cache_hash(), (T::kind(), value));
      Ok(LoadResult::values(1))
    })
  }

  fn clear(&self, key: &ResourceKey) -> LoadResult<bool> {
    self.with_tables(|tables| {
      let removed = tables.entries.remove(&key.cache_hash());
      Ok(LoadResult::values(removed.is_some()))
    })
  }

  fn record<T: Storable>(&self, key: &ResourceKey, value: &T) -> LoadResult<usize> {
    self.with_tables(|tables| {
      let value = serde_json::to_value(value)?;
      tables
        .history
        .entry(key.cache_hash())
        .or_default()
        .push((T::kind(), value));
      Ok(LoadResult::values(1))
    })
  }

  fn history<T: Storable>(&self, key: &ResourceKey) -> LoadResult<Vec<T>> {
    self.with_tables(|tables| {
      let values = tables
        .history
        .get(&key.cache_hash())
        .map(|rows| {
          rows
            .iter()
            .filter(|(kind, _)| *kind == T::kind())
            .map(|(_, value)| serde_json::from_value(value.clone()))
            .collect::<Result<Vec<T>, _>>()
        })
        .transpose()?
        .unwrap_or_default();
      Ok(LoadResult::from_vec(values))
    })
  }
}
