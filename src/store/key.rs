//! Identity of the logical resources kept in the local store.

use sha2::{Digest, Sha256};

use crate::model::StatsRange;

/// A logical resource. One stored value (and one rate-limit window) per key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKey {
  /// The authenticated user
  CurrentUser,
  /// Total time logged since account creation
  TotalRecord,
  /// All projects of the current user
  Projects,
  /// Stats over a time range
  Stats { range: StatsRange },
  /// The private leaderboards the user belongs to
  PrivateLeaderboards,
  /// The user's recorded ranks on one board, across all pages
  RankHistory {
    board: String,
    language: Option<String>,
  },
}

impl ResourceKey {
  /// Every cached resource that belongs to the signed-in account.
  pub fn user_scoped() -> Vec<ResourceKey> {
    let mut keys = vec![Self::CurrentUser, Self::TotalRecord, Self::Projects];
    keys.extend(StatsRange::ALL.map(|range| Self::Stats { range }));
    keys.push(Self::PrivateLeaderboards);
    keys
  }

  /// Stable, fixed-length key used for storage rows.
  pub fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.canonical().as_bytes());
    hex::encode(hasher.finalize())
  }

  /// Key used to track refresh times in the rate limiter.
  pub fn rate_key(&self) -> String {
    self.canonical()
  }

  pub fn description(&self) -> String {
    match self {
      Self::CurrentUser => "current user".to_string(),
      Self::TotalRecord => "all-time total".to_string(),
      Self::Projects => "projects".to_string(),
      Self::Stats { range } => format!("stats for {}", range),
      Self::PrivateLeaderboards => "private leaderboards".to_string(),
      Self::RankHistory { board, language } => match language {
        Some(l) => format!("{} {} rank history", board, l.trim()),
        None => format!("{} rank history", board),
      },
    }
  }

  fn canonical(&self) -> String {
    match self {
      Self::CurrentUser => "current_user".to_string(),
      Self::TotalRecord => "total_record".to_string(),
      Self::Projects => "projects".to_string(),
      Self::Stats { range } => format!("stats:{}", range),
      Self::PrivateLeaderboards => "private_leaderboards".to_string(),
      Self::RankHistory { board, language } => format!(
        "rank_history:{}:{}",
        board.trim(),
        language.as_deref().map(normalize_language).unwrap_or_default()
      ),
    }
  }
}

/// Languages are matched case-insensitively by the API.
fn normalize_language(language: &str) -> String {
  language.trim().to_lowercase()
}
