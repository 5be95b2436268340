use std::sync::Arc;

use super::{cached_loader, clear_key};
use crate::loader::Loader;
use crate::model::{Project, Stats, StatsRange};
use crate::rate_limiter::RateLimiter;
use crate::remote::RemoteDataSource;
use crate::result::LoadResult;
use crate::store::{LocalStore, ResourceKey};

/// Projects and coding stats of the signed-in user.
pub struct ProjectRepository<S> {
  store: Arc<S>,
  remote: Arc<dyn RemoteDataSource>,
  limiter: Arc<RateLimiter>,
  projects: Loader<Vec<Project>>,
}

impl<S: LocalStore + 'static> ProjectRepository<S> {
  pub fn new(store: Arc<S>, remote: Arc<dyn RemoteDataSource>, limiter: Arc<RateLimiter>) -> Self {
    let r = Arc::clone(&remote);
    let projects = cached_loader(&store, &limiter, ResourceKey::Projects, move || {
      let r = Arc::clone(&r);
      async move { r.projects().await }
    })
    .clear(clear_key(&store, ResourceKey::Projects))
    .build();

    Self {
      store,
      remote,
      limiter,
      projects,
    }
  }

  pub async fn projects(&self) -> LoadResult<Vec<Project>> {
    self.projects.execute().await
  }

  /// Stats for `range`. Each range is cached and rate limited on its own.
  pub async fn stats(&self, range: StatsRange) -> LoadResult<Stats> {
    self.stats_loader(range).execute().await
  }

  fn stats_loader(&self, range: StatsRange) -> Loader<Stats> {
    let r = Arc::clone(&self.remote);
    cached_loader(
      &self.store,
      &self.limiter,
      ResourceKey::Stats { range },
      move || {
        let r = Arc::clone(&r);
        async move { r.stats(range).await }
      },
    )
    .build()
  }
}
