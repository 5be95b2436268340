use std::sync::Arc;
use tracing::{debug, warn};

use super::{cached_loader, clear_key};
use crate::loader::Loader;
use crate::model::{Leaders, PrivateLeaderboard, RankSnapshot};
use crate::rate_limiter::RateLimiter;
use crate::remote::RemoteDataSource;
use crate::result::LoadResult;
use crate::store::{LocalStore, ResourceKey};

/// Board name used for snapshots of the public leaderboard.
pub const PUBLIC_BOARD: &str = "public";

/// Public and private leaderboards.
///
/// Leaderboard pages always come from the network. When a page includes the
/// user's own entry, a [`RankSnapshot`] is appended to the store's history.
pub struct LeaderboardRepository<S> {
  store: Arc<S>,
  remote: Arc<dyn RemoteDataSource>,
  private_leaderboards: Loader<Vec<PrivateLeaderboard>>,
}

impl<S: LocalStore + 'static> LeaderboardRepository<S> {
  pub fn new(store: Arc<S>, remote: Arc<dyn RemoteDataSource>, limiter: Arc<RateLimiter>) -> Self {
    let r = Arc::clone(&remote);
    let private_leaderboards = cached_loader(
      &store,
      &limiter,
      ResourceKey::PrivateLeaderboards,
      move || {
        let r = Arc::clone(&r);
        async move { r.private_leaderboards().await }
      },
    )
    .clear(clear_key(&store, ResourceKey::PrivateLeaderboards))
    .build();

    Self {
      store,
      remote,
      private_leaderboards,
    }
  }

  pub async fn public_leaders(&self, language: Option<&str>, page: u32) -> LoadResult<Leaders> {
    let leaders = self.remote.public_leaders(language, page).await;
    self.snapshot(PUBLIC_BOARD, language, &leaders);
    leaders
  }

  pub async fn private_leaderboards(&self) -> LoadResult<Vec<PrivateLeaderboard>> {
    self.private_leaderboards.execute().await
  }

  pub async fn private_leaders(&self, id: &str, page: u32) -> LoadResult<Leaders> {
    let leaders = self.remote.private_leaders(id, page).await;
    self.snapshot(id, None, &leaders);
    leaders
  }

  /// Every rank recorded on `board` (for `language`, if given), oldest first,
  /// whichever pages they were seen on.
  pub fn rank_history(&self, board: &str, language: Option<&str>) -> LoadResult<Vec<RankSnapshot>> {
    self.store.history(&history_key(board, language))
  }

  // Best effort: a failed write never affects the page returned to the caller.
  fn snapshot(&self, board: &str, language: Option<&str>, leaders: &LoadResult<Leaders>) {
    let Some(snapshot) = leaders
      .data()
      .and_then(|l| RankSnapshot::from_leaders(board, l))
    else {
      return;
    };

    match self.store.record(&history_key(board, language), &snapshot) {
      LoadResult::Failure(error) => {
        warn!(board, %error, "failed to record rank snapshot");
      }
      _ => debug!(board, rank = snapshot.rank, "recorded rank snapshot"),
    }
  }
}

fn history_key(board: &str, language: Option<&str>) -> ResourceKey {
  ResourceKey::RankHistory {
    board: board.to_string(),
    language: language.map(String::from),
  }
}
