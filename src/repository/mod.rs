//! Repositories serving each resource through a [`Loader`] over the local
//! store and the remote API.

mod client;
mod leaderboards;
mod projects;
mod users;

use futures::future::{ready, Ready};
use std::future::Future;
use std::sync::Arc;

use crate::loader::{Loader, LoaderBuilder};
use crate::rate_limiter::RateLimiter;
use crate::result::LoadResult;
use crate::store::{LocalStore, ResourceKey, Storable};

pub use client::WakaClient;
pub use leaderboards::LeaderboardRepository;
pub use projects::ProjectRepository;
pub use users::UserRepository;

/// Loader for `key` that reads from `store`, refreshes through `remote` once
/// the rate limiter says the key is due, and writes fetched data back.
///
/// A successful write marks the key in the rate limiter.
fn cached_loader<S, T, F, Fut>(
  store: &Arc<S>,
  limiter: &Arc<RateLimiter>,
  key: ResourceKey,
  remote: F,
) -> LoaderBuilder<T>
where
  S: LocalStore + 'static,
  T: Storable,
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = LoadResult<T>> + Send + 'static,
{
  let name = key.description();
  let rate_key = key.rate_key();
  let key = Arc::new(key);

  let (s, k) = (Arc::clone(store), Arc::clone(&key));
  let cache = move || ready(s.get::<T>(&k));

  let (l, rk) = (Arc::clone(limiter), rate_key.clone());
  let expired = move |_: &T| l.should_fetch(&rk);

  let (s, l) = (Arc::clone(store), Arc::clone(limiter));
  let update = move |data: T| {
    let written = match s.put(&key, &data) {
      LoadResult::Failure(error) => LoadResult::Failure(error),
      _ => {
        l.mark(&rate_key);
        LoadResult::values(())
      }
    };
    ready(written)
  };

  Loader::builder(name)
    .cache(cache)
    .remote(remote)
    .expired(expired)
    .update(update)
}

/// Clear strategy removing `key` from `store`.
fn clear_key<S>(store: &Arc<S>, key: ResourceKey) -> impl Fn() -> Ready<LoadResult<bool>> + Send + Sync + 'static
where
  S: LocalStore + 'static,
{
  let store = Arc::clone(store);
  move || ready(store.clear(&key))
}
