//! Serde-deserializable types matching API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::model::{
  Leader, LeaderUser, Leaders, PrivateLeaderboard, Project, StatItem, Stats, StatsRange,
  TotalRecord, User,
};

// ============================================================================
// Envelopes
// ============================================================================

/// Most endpoints wrap their payload in `{"data": ...}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  pub data: T,
}

/// Error bodies look like `{"error": "..."}` or `{"errors": ["..."]}`.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  pub error: Option<String>,
  #[serde(default)]
  pub errors: Vec<Value>,
  pub message: Option<String>,
}

impl ApiErrorBody {
  /// Best human-readable message in an error response, if any.
  pub fn parse(body: &[u8]) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_slice(body).ok()?;
    parsed
      .error
      .or(parsed.message)
      .or_else(|| {
        let joined = parsed
          .errors
          .iter()
          .map(|e| match e {
            Value::String(s) => s.clone(),
            other => other.to_string(),
          })
          .collect::<Vec<_>>()
          .join("; ");
        (!joined.is_empty()).then_some(joined)
      })
  }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub id: String,
  pub username: Option<String>,
  pub display_name: Option<String>,
  pub full_name: Option<String>,
  pub email: Option<String>,
  pub photo: Option<String>,
  pub timezone: Option<String>,
  pub last_project: Option<String>,
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTotalRecord {
  #[serde(default)]
  pub total_seconds: f64,
  #[serde(default)]
  pub text: String,
  #[serde(default)]
  pub daily_average: f64,
  #[serde(default)]
  pub is_up_to_date: bool,
  #[serde(default)]
  pub percent_calculated: u8,
}

// ============================================================================
// Projects and stats
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiRepository {
  pub html_url: Option<String>,
  pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiProject {
  pub id: String,
  pub name: String,
  pub repository: Option<ApiRepository>,
  pub badge: Option<Value>,
  pub last_heartbeat_at: Option<DateTime<Utc>>,
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiStatItem {
  pub name: String,
  #[serde(default)]
  pub total_seconds: f64,
  #[serde(default)]
  pub percent: f64,
  #[serde(default)]
  pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiStats {
  #[serde(default)]
  pub total_seconds: f64,
  #[serde(default)]
  pub daily_average: f64,
  #[serde(default)]
  pub human_readable_total: String,
  #[serde(default)]
  pub is_up_to_date: bool,
  #[serde(default)]
  pub languages: Vec<ApiStatItem>,
  #[serde(default)]
  pub projects: Vec<ApiStatItem>,
  #[serde(default)]
  pub editors: Vec<ApiStatItem>,
  #[serde(default)]
  pub operating_systems: Vec<ApiStatItem>,
}

// ============================================================================
// Leaderboards
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiRunningTotal {
  #[serde(default)]
  pub total_seconds: f64,
  #[serde(default)]
  pub daily_average: f64,
  #[serde(default)]
  pub human_readable_total: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiLeaderUser {
  pub id: String,
  pub username: Option<String>,
  pub display_name: Option<String>,
  pub photo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiLeader {
  pub rank: u32,
  pub running_total: ApiRunningTotal,
  pub user: ApiLeaderUser,
}

/// Paginated leaderboard page. Not enveloped like the other endpoints: the
/// list is `data` and paging sits next to it.
#[derive(Debug, Deserialize)]
pub struct ApiLeadersPage {
  #[serde(default)]
  pub data: Vec<ApiLeader>,
  pub current_user: Option<ApiLeader>,
  pub language: Option<String>,
  // Either a label or an object with a `text`/`name` field
  pub range: Option<Value>,
  #[serde(default = "first_page")]
  pub page: u32,
  #[serde(default)]
  pub total_pages: u32,
}

fn first_page() -> u32 {
  1
}

#[derive(Debug, Deserialize)]
pub struct ApiPrivateLeaderboard {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub members_count: u32,
  pub time_range: Option<String>,
  pub created_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiUser> for User {
  fn from(u: ApiUser) -> Self {
    // Users without a display name fall back to their username
    let display_name = u
      .display_name
      .or_else(|| u.username.clone())
      .or_else(|| u.full_name.clone())
      .unwrap_or_default();

    User {
      id: u.id,
      username: u.username,
      display_name,
      full_name: u.full_name,
      email: u.email,
      photo: u.photo,
      timezone: u.timezone,
      last_project: u.last_project,
      created_at: u.created_at,
    }
  }
}

impl From<ApiTotalRecord> for TotalRecord {
  fn from(t: ApiTotalRecord) -> Self {
    TotalRecord {
      total_seconds: t.total_seconds,
      text: t.text,
      daily_average: t.daily_average,
      is_up_to_date: t.is_up_to_date,
      percent_calculated: t.percent_calculated,
    }
  }
}

impl From<ApiProject> for Project {
  fn from(p: ApiProject) -> Self {
    Project {
      id: p.id,
      name: p.name,
      repository: p.repository.and_then(|r| r.html_url.or(r.url)),
      badge: p.badge.as_ref().and_then(extract_label),
      last_heartbeat_at: p.last_heartbeat_at,
      created_at: p.created_at,
    }
  }
}

impl From<ApiStatItem> for StatItem {
  fn from(i: ApiStatItem) -> Self {
    StatItem {
      name: i.name,
      total_seconds: i.total_seconds,
      percent: i.percent,
      text: i.text,
    }
  }
}

impl ApiStats {
  /// The response does not echo the range reliably, so the caller supplies it.
  pub fn into_stats(self, range: StatsRange) -> Stats {
    fn items(v: Vec<ApiStatItem>) -> Vec<StatItem> {
      v.into_iter().map(StatItem::from).collect()
    }

    Stats {
      range,
      total_seconds: self.total_seconds,
      daily_average: self.daily_average,
      human_readable_total: self.human_readable_total,
      is_up_to_date: self.is_up_to_date,
      languages: items(self.languages),
      projects: items(self.projects),
      editors: items(self.editors),
      operating_systems: items(self.operating_systems),
    }
  }
}

impl From<ApiLeader> for Leader {
  fn from(l: ApiLeader) -> Self {
    let user = l.user;
    Leader {
      rank: l.rank,
      total_seconds: l.running_total.total_seconds,
      daily_average: l.running_total.daily_average,
      human_readable_total: l.running_total.human_readable_total,
      user: LeaderUser {
        display_name: user
          .display_name
          .or_else(|| user.username.clone())
          .unwrap_or_default(),
        id: user.id,
        username: user.username,
        photo: user.photo,
      },
    }
  }
}

impl From<ApiLeadersPage> for Leaders {
  fn from(p: ApiLeadersPage) -> Self {
    Leaders {
      language: p.language,
      range: p.range.as_ref().and_then(extract_label),
      page: p.page,
      total_pages: p.total_pages,
      current_user: p.current_user.map(Leader::from),
      leaders: p.data.into_iter().map(Leader::from).collect(),
    }
  }
}

impl From<ApiPrivateLeaderboard> for PrivateLeaderboard {
  fn from(b: ApiPrivateLeaderboard) -> Self {
    PrivateLeaderboard {
      id: b.id,
      name: b.name,
      members_count: b.members_count,
      time_range: b.time_range,
      created_at: b.created_at,
    }
  }
}

/// Pull a display label out of a field that is sometimes a plain string and
/// sometimes an object.
fn extract_label(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Object(map) => ["text", "name", "url"]
      .iter()
      .find_map(|k| map.get(*k).and_then(|v| v.as_str()).map(String::from)),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_user_envelope() {
    let body = r#"{"data": {
      "id": "u1",
      "username": "ada",
      "display_name": null,
      "email": "ada@example.com",
      "timezone": "Europe/London",
      "created_at": "2020-01-02T03:04:05Z"
    }}"#;

    let envelope: Envelope<ApiUser> = serde_json::from_str(body).unwrap();
    let user = User::from(envelope.data);
    assert_eq!(user.display_name, "ada");
    assert_eq!(user.email.as_deref(), Some("ada@example.com"));
    assert!(user.created_at.is_some());
  }

  #[test]
  fn test_leaders_page() {
    let body = r#"{
      "data": [
        {"rank": 1, "running_total": {"total_seconds": 100.0, "daily_average": 10.0,
          "human_readable_total": "1 min"}, "user": {"id": "a", "display_name": "A"}}
      ],
      "current_user": {"rank": 40, "running_total": {"total_seconds": 5.0},
        "user": {"id": "me", "username": "me"}},
      "language": "Rust",
      "range": {"text": "Last 7 Days", "start_date": "2024-01-01"},
      "page": 2,
      "total_pages": 9
    }"#;

    let page: ApiLeadersPage = serde_json::from_str(body).unwrap();
    let leaders = Leaders::from(page);
    assert_eq!(leaders.page, 2);
    assert_eq!(leaders.range.as_deref(), Some("Last 7 Days"));
    assert_eq!(leaders.leaders[0].user.display_name, "A");
    let me = leaders.current_user.unwrap();
    assert_eq!(me.rank, 40);
    assert_eq!(me.user.display_name, "me");
  }

  #[test]
  fn test_project_repository_and_badge() {
    let body = r#"{"id": "p1", "name": "waka",
      "repository": {"html_url": "https://example.com/waka"},
      "badge": {"url": "https://example.com/badge.svg"}}"#;
    let project = Project::from(serde_json::from_str::<ApiProject>(body).unwrap());
    assert_eq!(project.repository.as_deref(), Some("https://example.com/waka"));
    assert_eq!(project.badge.as_deref(), Some("https://example.com/badge.svg"));
  }

  #[test]
  fn test_error_body_messages() {
    assert_eq!(
      ApiErrorBody::parse(br#"{"error": "Not found."}"#).as_deref(),
      Some("Not found.")
    );
    assert_eq!(
      ApiErrorBody::parse(br#"{"errors": ["a", "b"]}"#).as_deref(),
      Some("a; b")
    );
    assert_eq!(ApiErrorBody::parse(b"<html>"), None);
    assert_eq!(ApiErrorBody::parse(b"{}"), None);
  }
}
