use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use waka::error::{codes, Error, ErrorProcessor, NetworkErrorProcessor};
use waka::model::{
  Leader, LeaderUser, Leaders, PrivateLeaderboard, Project, Stats, StatsRange, TotalRecord, User,
};
use waka::rate_limiter::{ManualClock, RateLimiter};
use waka::remote::{Credentials, RemoteDataSource, Session, StaticSession};
use waka::store::{LocalStore, MemoryStore, ResourceKey};
use waka::{LoadResult, WakaClient};

const TTL: Duration = Duration::from_secs(5 * 60);

/// Remote whose answers are set by the test, counting calls per operation.
struct FakeRemote {
  user: Mutex<LoadResult<User>>,
  total: Mutex<LoadResult<TotalRecord>>,
  projects: Mutex<LoadResult<Vec<Project>>>,
  leaders: Mutex<LoadResult<Leaders>>,
  boards: Mutex<LoadResult<Vec<PrivateLeaderboard>>>,
  revoke: Mutex<LoadResult<()>>,
  calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeRemote {
  fn new() -> Self {
    Self {
      user: Mutex::new(LoadResult::Empty),
      total: Mutex::new(LoadResult::Empty),
      projects: Mutex::new(LoadResult::Empty),
      leaders: Mutex::new(LoadResult::Empty),
      boards: Mutex::new(LoadResult::Empty),
      revoke: Mutex::new(LoadResult::values(())),
      calls: Mutex::new(HashMap::new()),
    }
  }

  fn calls(&self, name: &str) -> usize {
    self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
  }

  fn answer<T: Clone>(&self, name: &'static str, slot: &Mutex<LoadResult<T>>) -> LoadResult<T> {
    *self.calls.lock().unwrap().entry(name).or_default() += 1;
    slot.lock().unwrap().clone()
  }
}

#[async_trait]
impl RemoteDataSource for FakeRemote {
  async fn current_user(&self) -> LoadResult<User> {
    self.answer("current_user", &self.user)
  }

  async fn total_record(&self) -> LoadResult<TotalRecord> {
    self.answer("total_record", &self.total)
  }

  async fn projects(&self) -> LoadResult<Vec<Project>> {
    self.answer("projects", &self.projects)
  }

  async fn stats(&self, range: StatsRange) -> LoadResult<Stats> {
    *self.calls.lock().unwrap().entry("stats").or_default() += 1;
    LoadResult::values(stats(range))
  }

  async fn public_leaders(&self, _language: Option<&str>, _page: u32) -> LoadResult<Leaders> {
    self.answer("public_leaders", &self.leaders)
  }

  async fn private_leaderboards(&self) -> LoadResult<Vec<PrivateLeaderboard>> {
    self.answer("private_leaderboards", &self.boards)
  }

  async fn private_leaders(&self, _id: &str, _page: u32) -> LoadResult<Leaders> {
    self.answer("private_leaders", &self.leaders)
  }

  async fn revoke_token(&self) -> LoadResult<()> {
    self.answer("revoke_token", &self.revoke)
  }
}

struct Harness {
  client: WakaClient<MemoryStore>,
  store: Arc<MemoryStore>,
  remote: Arc<FakeRemote>,
  session: Arc<StaticSession>,
  clock: Arc<ManualClock>,
}

fn harness() -> Harness {
  let store = Arc::new(MemoryStore::new());
  let remote = Arc::new(FakeRemote::new());
  let session = Arc::new(StaticSession::new(Some(Credentials::Bearer("token".into()))));
  let clock = Arc::new(ManualClock::new());
  let limiter = Arc::new(RateLimiter::with_clock(TTL, clock.clone()));

  let client = WakaClient::new(store.clone(), remote.clone(), session.clone(), limiter);
  Harness {
    client,
    store,
    remote,
    session,
    clock,
  }
}

fn user(name: &str) -> User {
  User {
    id: "u1".into(),
    username: Some(name.to_lowercase()),
    display_name: name.into(),
    full_name: None,
    email: None,
    photo: None,
    timezone: None,
    last_project: None,
    created_at: None,
  }
}

fn stats(range: StatsRange) -> Stats {
  Stats {
    range,
    total_seconds: 3600.0,
    daily_average: 600.0,
    human_readable_total: "1 hr".into(),
    is_up_to_date: true,
    languages: vec![],
    projects: vec![],
    editors: vec![],
    operating_systems: vec![],
  }
}

fn board(id: &str) -> PrivateLeaderboard {
  PrivateLeaderboard {
    id: id.into(),
    name: format!("Board {}", id),
    members_count: 3,
    time_range: None,
    created_at: None,
  }
}

fn leader(rank: u32, id: &str) -> Leader {
  Leader {
    rank,
    total_seconds: 100.0,
    daily_average: 10.0,
    human_readable_total: "1 min".into(),
    user: LeaderUser {
      id: id.into(),
      username: None,
      display_name: id.into(),
      photo: None,
    },
  }
}

fn leaders(me: Option<Leader>) -> Leaders {
  Leaders {
    language: Some("Rust".into()),
    range: None,
    page: 1,
    total_pages: 1,
    current_user: me,
    leaders: vec![leader(1, "top")],
  }
}

fn timeout() -> Error {
  NetworkErrorProcessor.on_error(codes::TIMEOUT, "timed out")
}

#[tokio::test]
async fn test_user_is_served_from_cache_within_ttl() {
  let h = harness();
  *h.remote.user.lock().unwrap() = LoadResult::values(user("Ada"));

  assert_eq!(h.client.current_user().await, LoadResult::values(user("Ada")));
  assert_eq!(h.client.current_user().await, LoadResult::values(user("Ada")));
  assert_eq!(h.remote.calls("current_user"), 1);

  h.clock.advance(TTL + Duration::from_secs(60));
  *h.remote.user.lock().unwrap() = LoadResult::values(user("Grace"));

  assert_eq!(h.client.current_user().await, LoadResult::values(user("Grace")));
  assert_eq!(h.remote.calls("current_user"), 2);
}

#[tokio::test]
async fn test_failed_refresh_keeps_cached_user() {
  let h = harness();
  *h.remote.user.lock().unwrap() = LoadResult::values(user("Ada"));
  h.client.current_user().await;

  h.clock.advance(TTL * 2);
  *h.remote.user.lock().unwrap() = LoadResult::Failure(timeout());

  let result = h.client.current_user().await;
  assert_eq!(result, LoadResult::stale(user("Ada"), timeout()));
  assert!(result.is_stale());
}

#[tokio::test]
async fn test_failure_without_cache_is_surfaced() {
  let h = harness();
  *h.remote.total.lock().unwrap() = LoadResult::Failure(timeout());

  let result = h.client.total_record().await;
  assert_eq!(result.error().map(Error::code), Some(codes::TIMEOUT));
  assert!(result.data().is_none());
}

#[tokio::test]
async fn test_refresh_ignores_rate_limit() {
  let h = harness();
  *h.remote.user.lock().unwrap() = LoadResult::values(user("Ada"));
  h.client.current_user().await;

  *h.remote.user.lock().unwrap() = LoadResult::values(user("Grace"));
  assert_eq!(
    h.client.refresh_current_user().await,
    LoadResult::values(user("Grace"))
  );
  assert_eq!(h.remote.calls("current_user"), 2);
}

#[tokio::test]
async fn test_stats_ranges_are_cached_independently() {
  let h = harness();

  assert_eq!(
    h.client.stats(StatsRange::Last7Days).await,
    LoadResult::values(stats(StatsRange::Last7Days))
  );
  assert_eq!(
    h.client.stats(StatsRange::AllTime).await,
    LoadResult::values(stats(StatsRange::AllTime))
  );
  h.client.stats(StatsRange::Last7Days).await;

  assert_eq!(h.remote.calls("stats"), 2);
}

#[tokio::test]
async fn test_empty_remote_clears_private_leaderboards() {
  let h = harness();
  *h.remote.boards.lock().unwrap() = LoadResult::values(vec![board("a"), board("b")]);

  let boards = h.client.private_leaderboards().await;
  assert_eq!(boards.data().map(Vec::len), Some(2));

  h.clock.advance(TTL * 2);
  *h.remote.boards.lock().unwrap() = LoadResult::Empty;

  assert_eq!(h.client.private_leaderboards().await, LoadResult::Empty);
  assert_eq!(
    h.store
      .get::<Vec<PrivateLeaderboard>>(&ResourceKey::PrivateLeaderboards),
    LoadResult::Empty
  );
}

#[tokio::test]
async fn test_empty_project_list_is_empty() {
  let h = harness();
  assert_eq!(h.client.projects().await, LoadResult::Empty);
  assert_eq!(h.remote.calls("projects"), 1);
}

#[tokio::test]
async fn test_leaders_are_never_cached_but_ranks_are_recorded() {
  let h = harness();

  *h.remote.leaders.lock().unwrap() = LoadResult::values(leaders(Some(leader(42, "me"))));
  h.client.public_leaders(Some("Rust"), 1).await;
  h.client.public_leaders(Some("Rust"), 1).await;
  assert_eq!(h.remote.calls("public_leaders"), 2);

  let history = h.client.rank_history("public", Some("rust")).into_data().unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0].board, "public");
  assert_eq!(history[0].rank, 42);

  // Pages without the user's entry leave no trace
  *h.remote.leaders.lock().unwrap() = LoadResult::values(leaders(None));
  h.client.private_leaders("team", 1).await;
  assert_eq!(h.client.rank_history("team", None), LoadResult::Empty);
}

#[tokio::test]
async fn test_rank_history_spans_pages() {
  let h = harness();

  *h.remote.leaders.lock().unwrap() = LoadResult::values(leaders(Some(leader(7, "me"))));
  h.client.private_leaders("team", 1).await;
  *h.remote.leaders.lock().unwrap() = LoadResult::values(leaders(Some(leader(5, "me"))));
  h.client.private_leaders("team", 3).await;

  let ranks: Vec<u32> = h
    .client
    .rank_history("team", None)
    .into_data()
    .unwrap()
    .into_iter()
    .map(|s| s.rank)
    .collect();
  assert_eq!(ranks, vec![7, 5]);
  assert_eq!(h.client.rank_history("public", None), LoadResult::Empty);
}

#[tokio::test]
async fn test_logout_signs_out_and_drops_cached_user() {
  let h = harness();
  *h.remote.user.lock().unwrap() = LoadResult::values(user("Ada"));
  h.client.current_user().await;

  assert_eq!(h.client.logout().await, LoadResult::values(()));
  assert_eq!(h.remote.calls("revoke_token"), 1);
  assert!(!h.session.is_authorized());
  assert!(!h.client.is_authorized());
  assert_eq!(
    h.store.get::<User>(&ResourceKey::CurrentUser),
    LoadResult::Empty
  );

  // The rate limit window was reset along with the cache
  h.client.current_user().await;
  assert_eq!(h.remote.calls("current_user"), 2);
}

#[tokio::test]
async fn test_logout_drops_every_cached_resource() {
  let h = harness();
  let project = Project {
    id: "p1".into(),
    name: "private-project".into(),
    repository: None,
    badge: None,
    last_heartbeat_at: None,
    created_at: None,
  };
  *h.remote.projects.lock().unwrap() = LoadResult::values(vec![project]);
  *h.remote.boards.lock().unwrap() = LoadResult::values(vec![board("a")]);
  assert!(h.client.projects().await.is_success());
  assert!(h.client.stats(StatsRange::LastYear).await.is_success());
  assert!(h.client.private_leaderboards().await.is_success());

  h.client.logout().await;

  assert_eq!(h.store.get::<Vec<Project>>(&ResourceKey::Projects), LoadResult::Empty);
  assert_eq!(
    h.store.get::<Stats>(&ResourceKey::Stats {
      range: StatsRange::LastYear
    }),
    LoadResult::Empty
  );
  assert_eq!(
    h.store
      .get::<Vec<PrivateLeaderboard>>(&ResourceKey::PrivateLeaderboards),
    LoadResult::Empty
  );

  // Signed out, the remote refuses; nothing from the old account comes back
  let unauthorized = NetworkErrorProcessor.on_error(codes::UNAUTHORIZED, "not signed in");
  *h.remote.projects.lock().unwrap() = LoadResult::Failure(unauthorized.clone());
  assert_eq!(h.client.projects().await, LoadResult::Failure(unauthorized));
  assert_eq!(h.remote.calls("projects"), 2);
}

#[tokio::test]
async fn test_logout_clears_locally_when_revocation_fails() {
  let h = harness();
  *h.remote.revoke.lock().unwrap() = LoadResult::Failure(timeout());

  assert!(h.client.logout().await.is_failure());
  assert!(!h.session.is_authorized());
}

#[tokio::test]
async fn test_observe_user_reports_loading_first() {
  use futures::StreamExt;

  let h = harness();
  *h.remote.user.lock().unwrap() = LoadResult::values(user("Ada"));

  let states: Vec<_> = h.client.users().observe_current_user().collect().await;
  assert_eq!(states, vec![LoadResult::Loading, LoadResult::values(user("Ada"))]);
}
