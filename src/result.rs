//! The result type returned by every load operation.

use crate::error::Error;

/// Outcome of loading a resource from the cache, the network, or both.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult<T> {
  /// Work is in flight; no data yet.
  Loading,
  /// Data is available. `error` is set only when the data is stale because
  /// the refresh that should have replaced it failed.
  Values { data: T, error: Option<Error> },
  /// The operation succeeded but produced no data.
  Empty,
  /// The operation failed and there is nothing to fall back to.
  Failure(Error),
}

impl<T> LoadResult<T> {
  pub fn values(data: T) -> Self {
    LoadResult::Values { data, error: None }
  }

  /// Previously cached data delivered alongside the refresh error.
  pub fn stale(data: T, error: Error) -> Self {
    LoadResult::Values {
      data,
      error: Some(error),
    }
  }

  pub fn from_option(data: Option<T>) -> Self {
    match data {
      Some(data) => Self::values(data),
      None => LoadResult::Empty,
    }
  }

  /// `Values` or `Empty`.
  pub fn is_success(&self) -> bool {
    matches!(self, LoadResult::Values { .. } | LoadResult::Empty)
  }

  pub fn is_failure(&self) -> bool {
    matches!(self, LoadResult::Failure(_))
  }

  pub fn is_stale(&self) -> bool {
    matches!(self, LoadResult::Values { error: Some(_), .. })
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      LoadResult::Values { data, .. } => Some(data),
      _ => None,
    }
  }

  pub fn into_data(self) -> Option<T> {
    match self {
      LoadResult::Values { data, .. } => Some(data),
      _ => None,
    }
  }

  /// The failure, or the refresh error attached to stale data.
  pub fn error(&self) -> Option<&Error> {
    match self {
      LoadResult::Values { error, .. } => error.as_ref(),
      LoadResult::Failure(error) => Some(error),
      LoadResult::Loading | LoadResult::Empty => None,
    }
  }

  pub fn map<U, F>(self, f: F) -> LoadResult<U>
  where
    F: FnOnce(T) -> U,
  {
    match self {
      LoadResult::Loading => LoadResult::Loading,
      LoadResult::Values { data, error } => LoadResult::Values {
        data: f(data),
        error,
      },
      LoadResult::Empty => LoadResult::Empty,
      LoadResult::Failure(error) => LoadResult::Failure(error),
    }
  }

  /// Collapse into a std `Result`, dropping the stale marker.
  pub fn into_result(self) -> Result<Option<T>, Error> {
    match self {
      LoadResult::Values { data, .. } => Ok(Some(data)),
      LoadResult::Loading | LoadResult::Empty => Ok(None),
      LoadResult::Failure(error) => Err(error),
    }
  }
}

impl<T> LoadResult<Vec<T>> {
  /// An empty list is `Empty`.
  pub fn from_vec(data: Vec<T>) -> Self {
    if data.is_empty() {
      LoadResult::Empty
    } else {
      Self::values(data)
    }
  }
}

impl<T> From<Error> for LoadResult<T> {
  fn from(error: Error) -> Self {
    LoadResult::Failure(error)
  }
}
