//! Domain types handed to callers and persisted in the local store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub username: Option<String>,
  pub display_name: String,
  pub full_name: Option<String>,
  pub email: Option<String>,
  pub photo: Option<String>,
  pub timezone: Option<String>,
  pub last_project: Option<String>,
  pub created_at: Option<DateTime<Utc>>,
}

/// A tracked project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
  pub id: String,
  pub name: String,
  pub repository: Option<String>,
  pub badge: Option<String>,
  pub last_heartbeat_at: Option<DateTime<Utc>>,
  pub created_at: Option<DateTime<Utc>>,
}

/// Total time logged since the account was created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalRecord {
  pub total_seconds: f64,
  pub text: String,
  pub daily_average: f64,
  pub is_up_to_date: bool,
  pub percent_calculated: u8,
}

/// Time windows the stats endpoint understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsRange {
  Last7Days,
  Last30Days,
  Last6Months,
  LastYear,
  AllTime,
}

impl StatsRange {
  pub const ALL: [StatsRange; 5] = [
    StatsRange::Last7Days,
    StatsRange::Last30Days,
    StatsRange::Last6Months,
    StatsRange::LastYear,
    StatsRange::AllTime,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      StatsRange::Last7Days => "last_7_days",
      StatsRange::Last30Days => "last_30_days",
      StatsRange::Last6Months => "last_6_months",
      StatsRange::LastYear => "last_year",
      StatsRange::AllTime => "all_time",
    }
  }
}

impl fmt::Display for StatsRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for StatsRange {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_lowercase().replace('-', "_");
    StatsRange::ALL
      .into_iter()
      .find(|r| r.as_str() == normalized)
      .ok_or_else(|| {
        format!(
          "unknown range '{}', expected one of: {}",
          s,
          StatsRange::ALL.map(|r| r.as_str()).join(", ")
        )
      })
  }
}

/// One row of a stats breakdown (a language, editor, project, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatItem {
  pub name: String,
  pub total_seconds: f64,
  pub percent: f64,
  pub text: String,
}

/// Coding activity over a [`StatsRange`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
  pub range: StatsRange,
  pub total_seconds: f64,
  pub daily_average: f64,
  pub human_readable_total: String,
  pub is_up_to_date: bool,
  pub languages: Vec<StatItem>,
  pub projects: Vec<StatItem>,
  pub editors: Vec<StatItem>,
  pub operating_systems: Vec<StatItem>,
}

/// A user as shown on a leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderUser {
  pub id: String,
  pub username: Option<String>,
  pub display_name: String,
  pub photo: Option<String>,
}

/// One leaderboard entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leader {
  pub rank: u32,
  pub total_seconds: f64,
  pub daily_average: f64,
  pub human_readable_total: String,
  pub user: LeaderUser,
}

/// A page of a leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaders {
  pub language: Option<String>,
  pub range: Option<String>,
  pub page: u32,
  pub total_pages: u32,
  /// The authenticated user's own entry, when ranked
  pub current_user: Option<Leader>,
  pub leaders: Vec<Leader>,
}

/// A private leaderboard the user belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateLeaderboard {
  pub id: String,
  pub name: String,
  pub members_count: u32,
  pub time_range: Option<String>,
  pub created_at: Option<DateTime<Utc>>,
}

/// The user's rank on a leaderboard at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankSnapshot {
  /// Which board the rank belongs to
  pub board: String,
  pub language: Option<String>,
  pub rank: u32,
  pub total_seconds: f64,
  pub recorded_at: DateTime<Utc>,
}

impl RankSnapshot {
  /// Snapshot the current user's entry, if the page has one.
  pub fn from_leaders(board: impl Into<String>, leaders: &Leaders) -> Option<Self> {
    leaders.current_user.as_ref().map(|me| RankSnapshot {
      board: board.into(),
      language: leaders.language.clone(),
      rank: me.rank,
      total_seconds: me.total_seconds,
      recorded_at: Utc::now(),
    })
  }
}
