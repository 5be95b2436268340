//! Cache-then-refresh orchestration for a single resource.
//!
//! A [`Loader`] owns five strategies:
//!
//! - `cache`: read the resource from the local store
//! - `remote`: fetch it from the network
//! - `expired`: decide whether cached data must be refreshed
//! - `update`: write fetched data through to the local store
//! - `clear`: drop the local copy when the remote has nothing
//!
//! Every strategy has a no-op default, so an unconfigured loader resolves to
//! `Empty` instead of failing.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, warn};

use crate::error::Error;
use crate::result::LoadResult;

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, LoadResult<T>> + Send + Sync>;
type ExpiredFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type UpdateFn<R> = Arc<dyn Fn(R) -> BoxFuture<'static, LoadResult<()>> + Send + Sync>;
type ClearFn = Arc<dyn Fn() -> BoxFuture<'static, LoadResult<bool>> + Send + Sync>;

/// Serves a resource from the cache unless it is stale, refreshing from the
/// network and writing through on success.
///
/// `T` is the cached type, `R` the type the remote returns.
pub struct Loader<T, R = T> {
  name: String,
  cache: FetchFn<T>,
  remote: FetchFn<R>,
  expired: ExpiredFn<T>,
  update: UpdateFn<R>,
  clear: ClearFn,
}

impl<T, R> Loader<T, R>
where
  T: Send + 'static,
  R: Send + 'static,
{
  pub fn builder(name: impl Into<String>) -> LoaderBuilder<T, R> {
    LoaderBuilder::new(name)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Run one full cache/refresh pass.
  ///
  /// 1. Read the cache. Fresh data is returned as is.
  /// 2. Stale data or a miss triggers a remote fetch.
  /// 3. Remote data is written through and the cache is read again.
  /// 4. A remote `Empty` clears the local copy.
  /// 5. Failures fall back to the stale data when there is any.
  pub async fn execute(&self) -> LoadResult<T> {
    let fallback = match (self.cache)().await {
      LoadResult::Values { data, error } => {
        if !(self.expired)(&data) {
          debug!(loader = %self.name, "cache fresh");
          return LoadResult::Values { data, error };
        }
        debug!(loader = %self.name, "cache expired");
        Some(data)
      }
      LoadResult::Failure(error) => {
        debug!(loader = %self.name, %error, "cache read failed");
        None
      }
      LoadResult::Empty | LoadResult::Loading => {
        debug!(loader = %self.name, "cache miss");
        None
      }
    };

    self.refresh(fallback).await
  }

  /// A stream that yields `Loading` followed by the result of [`execute`].
  ///
  /// [`execute`]: Loader::execute
  pub fn observe(&self) -> BoxStream<'static, LoadResult<T>> {
    let loader = self.clone();
    stream::once(async { LoadResult::Loading })
      .chain(stream::once(async move { loader.execute().await }))
      .boxed()
  }

  async fn refresh(&self, fallback: Option<T>) -> LoadResult<T> {
    match (self.remote)().await {
      LoadResult::Values { data, .. } => match (self.update)(data).await {
        LoadResult::Failure(error) => {
          debug!(loader = %self.name, %error, "cache update failed");
          Self::fall_back(fallback, error)
        }
        _ => {
          debug!(loader = %self.name, "cache updated, re-reading");
          (self.cache)().await
        }
      },
      LoadResult::Empty => {
        debug!(loader = %self.name, "remote empty, clearing cache");
        self.clear_local().await;
        LoadResult::Empty
      }
      LoadResult::Failure(error) => {
        debug!(loader = %self.name, %error, "remote fetch failed");
        Self::fall_back(fallback, error)
      }
      LoadResult::Loading => LoadResult::from_option(fallback),
    }
  }

  async fn clear_local(&self) {
    match (self.clear)().await {
      LoadResult::Values { data: true, .. } => {}
      LoadResult::Failure(error) => {
        warn!(loader = %self.name, %error, "failed to clear cached data");
      }
      _ => {
        warn!(loader = %self.name, "clearing cached data removed nothing");
      }
    }
  }

  fn fall_back(fallback: Option<T>, error: Error) -> LoadResult<T> {
    match fallback {
      Some(data) => LoadResult::stale(data, error),
      None => LoadResult::Failure(error),
    }
  }
}

impl<T, R> Clone for Loader<T, R> {
  fn clone(&self) -> Self {
    Self {
      name: self.name.clone(),
      cache: Arc::clone(&self.cache),
      remote: Arc::clone(&self.remote),
      expired: Arc::clone(&self.expired),
      update: Arc::clone(&self.update),
      clear: Arc::clone(&self.clear),
    }
  }
}

impl<T, R> Default for Loader<T, R>
where
  T: Send + 'static,
  R: Send + 'static,
{
  fn default() -> Self {
    LoaderBuilder::new("default").build()
  }
}

impl<T, R> std::fmt::Debug for Loader<T, R> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Loader").field("name", &self.name).finish()
  }
}

/// Collects the strategies for a [`Loader`]. Anything not set keeps its
/// no-op default.
pub struct LoaderBuilder<T, R = T> {
  name: String,
  cache: FetchFn<T>,
  remote: FetchFn<R>,
  expired: ExpiredFn<T>,
  update: UpdateFn<R>,
  clear: ClearFn,
}

impl<T, R> LoaderBuilder<T, R>
where
  T: Send + 'static,
  R: Send + 'static,
{
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      cache: Arc::new(|| async { LoadResult::<T>::Empty }.boxed()),
      remote: Arc::new(|| async { LoadResult::<R>::Empty }.boxed()),
      expired: Arc::new(|_: &T| true),
      update: Arc::new(|_: R| async { LoadResult::values(()) }.boxed()),
      clear: Arc::new(|| async { LoadResult::values(true) }.boxed()),
    }
  }

  pub fn cache<F, Fut>(mut self, f: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LoadResult<T>> + Send + 'static,
  {
    self.cache = Arc::new(move || f().boxed());
    self
  }

  pub fn remote<F, Fut>(mut self, f: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LoadResult<R>> + Send + 'static,
  {
    self.remote = Arc::new(move || f().boxed());
    self
  }

  pub fn expired<F>(mut self, f: F) -> Self
  where
    F: Fn(&T) -> bool + Send + Sync + 'static,
  {
    self.expired = Arc::new(f);
    self
  }

  pub fn update<F, Fut>(mut self, f: F) -> Self
  where
    F: Fn(R) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LoadResult<()>> + Send + 'static,
  {
    self.update = Arc::new(move |data: R| f(data).boxed());
    self
  }

  pub fn clear<F, Fut>(mut self, f: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LoadResult<bool>> + Send + 'static,
  {
    self.clear = Arc::new(move || f().boxed());
    self
  }

  pub fn build(self) -> Loader<T, R> {
    Loader {
      name: self.name,
      cache: self.cache,
      remote: self.remote,
      expired: self.expired,
      update: self.update,
      clear: self.clear,
    }
  }
}
