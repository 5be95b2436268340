//! Network access to the time-tracking API.

pub mod api_types;
mod client;
mod session;

use async_trait::async_trait;

use crate::model::{Leaders, PrivateLeaderboard, Project, Stats, StatsRange, TotalRecord, User};
use crate::result::LoadResult;

pub use client::{ApiClient, RemoteError};
pub use session::{Credentials, Session, StaticSession};

/// Remote operations the repositories depend on.
///
/// Implementations never fail with a raw error: transport and protocol
/// problems arrive as `LoadResult::Failure`, and "nothing there" as `Empty`.
#[async_trait]
pub trait RemoteDataSource: Send + Sync {
  async fn current_user(&self) -> LoadResult<User>;

  async fn total_record(&self) -> LoadResult<TotalRecord>;

  async fn projects(&self) -> LoadResult<Vec<Project>>;

  async fn stats(&self, range: StatsRange) -> LoadResult<Stats>;

  async fn public_leaders(&self, language: Option<&str>, page: u32) -> LoadResult<Leaders>;

  async fn private_leaderboards(&self) -> LoadResult<Vec<PrivateLeaderboard>>;

  async fn private_leaders(&self, id: &str, page: u32) -> LoadResult<Leaders>;

  /// Revoke the session's token on the server.
  async fn revoke_token(&self) -> LoadResult<()>;
}
