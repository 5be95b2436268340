use futures::stream::BoxStream;
use std::sync::Arc;
use tracing::{info, warn};

use super::cached_loader;
use crate::loader::Loader;
use crate::model::{TotalRecord, User};
use crate::rate_limiter::RateLimiter;
use crate::remote::{RemoteDataSource, Session};
use crate::result::LoadResult;
use crate::store::{LocalStore, ResourceKey};

/// The signed-in user and their all-time total.
pub struct UserRepository<S> {
  store: Arc<S>,
  remote: Arc<dyn RemoteDataSource>,
  session: Arc<dyn Session>,
  limiter: Arc<RateLimiter>,
  current_user: Loader<User>,
  total_record: Loader<TotalRecord>,
}

impl<S: LocalStore + 'static> UserRepository<S> {
  pub fn new(
    store: Arc<S>,
    remote: Arc<dyn RemoteDataSource>,
    session: Arc<dyn Session>,
    limiter: Arc<RateLimiter>,
  ) -> Self {
    let r = Arc::clone(&remote);
    let current_user = cached_loader(&store, &limiter, ResourceKey::CurrentUser, move || {
      let r = Arc::clone(&r);
      async move { r.current_user().await }
    })
    .build();

    let r = Arc::clone(&remote);
    let total_record = cached_loader(&store, &limiter, ResourceKey::TotalRecord, move || {
      let r = Arc::clone(&r);
      async move { r.total_record().await }
    })
    .build();

    Self {
      store,
      remote,
      session,
      limiter,
      current_user,
      total_record,
    }
  }

  pub async fn current_user(&self) -> LoadResult<User> {
    self.current_user.execute().await
  }

  pub fn observe_current_user(&self) -> BoxStream<'static, LoadResult<User>> {
    self.current_user.observe()
  }

  /// Fetch the user now, ignoring the refresh window.
  pub async fn refresh_current_user(&self) -> LoadResult<User> {
    self.limiter.reset(&ResourceKey::CurrentUser.rate_key());
    self.current_user.execute().await
  }

  pub async fn total_record(&self) -> LoadResult<TotalRecord> {
    self.total_record.execute().await
  }

  /// Revoke the token, sign the session out and drop every cached resource
  /// of the account along with its refresh window.
  ///
  /// Local state is cleared even when revocation fails; the revocation
  /// outcome is returned.
  pub async fn logout(&self) -> LoadResult<()> {
    let revoked = self.remote.revoke_token().await;
    match &revoked {
      LoadResult::Failure(error) => warn!(%error, "token revocation failed"),
      LoadResult::Empty => info!("credentials are not revocable, signing out locally"),
      _ => info!("access token revoked"),
    }

    self.session.invalidate();

    // Nothing cached for this account may outlive the session
    for key in ResourceKey::user_scoped() {
      if let LoadResult::Failure(error) = self.store.clear(&key) {
        warn!(resource = %key.description(), %error, "failed to clear cached data");
      }
      self.limiter.reset(&key.rate_key());
    }

    revoked
  }
}
