use color_eyre::Result;
use std::sync::Arc;
use tracing::debug;

use super::{LeaderboardRepository, ProjectRepository, UserRepository};
use crate::config::Config;
use crate::model::{
  Leaders, PrivateLeaderboard, Project, RankSnapshot, Stats, StatsRange, TotalRecord, User,
};
use crate::rate_limiter::RateLimiter;
use crate::remote::{ApiClient, RemoteDataSource, Session, StaticSession};
use crate::result::LoadResult;
use crate::store::{AnyStore, LocalStore, MemoryStore, SqliteStore};

/// Entry point composing the repositories over one store, one remote and
/// one rate limiter.
pub struct WakaClient<S = AnyStore> {
  session: Arc<dyn Session>,
  users: UserRepository<S>,
  projects: ProjectRepository<S>,
  leaderboards: LeaderboardRepository<S>,
}

impl WakaClient<AnyStore> {
  /// Build the real stack: SQLite (or in-memory) store, HTTP client and a
  /// session from the environment.
  pub fn from_config(config: &Config) -> Result<Self> {
    let store = if config.cache.persist {
      let path = match &config.cache.path {
        Some(path) => path.clone(),
        None => SqliteStore::default_path()?,
      };
      debug!(path = %path.display(), "opening cache");
      AnyStore::Sqlite(SqliteStore::open_at(&path)?)
    } else {
      AnyStore::Memory(MemoryStore::new())
    };

    let session: Arc<dyn Session> = Arc::new(StaticSession::new(config.credentials()));
    let remote = ApiClient::new(&config.api, Arc::clone(&session))?;
    let limiter = RateLimiter::new(config.cache_ttl());

    Ok(Self::new(
      Arc::new(store),
      Arc::new(remote),
      session,
      Arc::new(limiter),
    ))
  }
}

impl<S: LocalStore + 'static> WakaClient<S> {
  pub fn new(
    store: Arc<S>,
    remote: Arc<dyn RemoteDataSource>,
    session: Arc<dyn Session>,
    limiter: Arc<RateLimiter>,
  ) -> Self {
    Self {
      users: UserRepository::new(
        Arc::clone(&store),
        Arc::clone(&remote),
        Arc::clone(&session),
        Arc::clone(&limiter),
      ),
      projects: ProjectRepository::new(
        Arc::clone(&store),
        Arc::clone(&remote),
        Arc::clone(&limiter),
      ),
      leaderboards: LeaderboardRepository::new(store, remote, limiter),
      session,
    }
  }

  pub fn is_authorized(&self) -> bool {
    self.session.is_authorized()
  }

  // ==========================================================================
  // Users
  // ==========================================================================

  pub async fn current_user(&self) -> LoadResult<User> {
    self.users.current_user().await
  }

  pub async fn refresh_current_user(&self) -> LoadResult<User> {
    self.users.refresh_current_user().await
  }

  pub async fn total_record(&self) -> LoadResult<TotalRecord> {
    self.users.total_record().await
  }

  pub async fn logout(&self) -> LoadResult<()> {
    self.users.logout().await
  }

  // ==========================================================================
  // Projects
  // ==========================================================================

  pub async fn projects(&self) -> LoadResult<Vec<Project>> {
    self.projects.projects().await
  }

  pub async fn stats(&self, range: StatsRange) -> LoadResult<Stats> {
    self.projects.stats(range).await
  }

  // ==========================================================================
  // Leaderboards
  // ==========================================================================

  pub async fn public_leaders(&self, language: Option<&str>, page: u32) -> LoadResult<Leaders> {
    self.leaderboards.public_leaders(language, page).await
  }

  pub async fn private_leaderboards(&self) -> LoadResult<Vec<PrivateLeaderboard>> {
    self.leaderboards.private_leaderboards().await
  }

  pub async fn private_leaders(&self, id: &str, page: u32) -> LoadResult<Leaders> {
    self.leaderboards.private_leaders(id, page).await
  }

  pub fn rank_history(&self, board: &str, language: Option<&str>) -> LoadResult<Vec<RankSnapshot>> {
    self.leaderboards.rank_history(board, language)
  }

  pub fn users(&self) -> &UserRepository<S> {
    &self.users
  }
}
