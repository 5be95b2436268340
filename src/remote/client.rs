use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::api_types::{
  ApiErrorBody, ApiLeadersPage, ApiPrivateLeaderboard, ApiProject, ApiStats, ApiTotalRecord,
  ApiUser, Envelope,
};
use super::session::{Credentials, Session};
use super::RemoteDataSource;
use crate::config::ApiConfig;
use crate::error::{
  codes, safe_operation, Error, ErrorProcessor, HttpStatusError, NetworkErrorProcessor,
};
use crate::model::{Leaders, PrivateLeaderboard, Project, Stats, StatsRange, TotalRecord, User};
use crate::result::LoadResult;

/// Failures raised while talking to the API, before classification.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
  #[error("{0}")]
  Http(#[from] reqwest::Error),
  #[error("{0}")]
  Status(#[from] HttpStatusError),
  #[error("{0}")]
  Decode(#[from] serde_json::Error),
  #[error("{0}")]
  Url(#[from] url::ParseError),
}

/// HTTP client for the time-tracking API
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
  revoke_url: Url,
  session: Arc<dyn Session>,
}

impl ApiClient {
  pub fn new(config: &ApiConfig, session: Arc<dyn Session>) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!("waka/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Self::with_http_client(config, session, http)
  }

  /// Use a preconfigured `reqwest::Client`.
  pub fn with_http_client(
    config: &ApiConfig,
    session: Arc<dyn Session>,
    http: reqwest::Client,
  ) -> Result<Self> {
    let base_url = Url::parse(config.url.trim())
      .map_err(|e| eyre!("Invalid API url {}: {}", config.url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("Invalid API url {}: not a base url", config.url));
    }
    let revoke_url = Url::parse(config.revoke_url.trim())
      .map_err(|e| eyre!("Invalid revoke url {}: {}", config.revoke_url, e))?;

    Ok(Self {
      http,
      base_url,
      revoke_url,
      session,
    })
  }

  fn authorize(&self) -> std::result::Result<Credentials, Error> {
    self
      .session
      .credentials()
      .ok_or_else(|| NetworkErrorProcessor.on_error(codes::UNAUTHORIZED, "not signed in"))
  }

  /// Authorized GET of the endpoint under the base url made of `path`
  /// segments, converting the decoded payload with `convert`.
  async fn fetch<A, T, F>(&self, path: &[&str], query: &[(&str, String)], convert: F) -> LoadResult<T>
  where
    A: DeserializeOwned,
    F: FnOnce(A) -> LoadResult<T>,
  {
    let credentials = match self.authorize() {
      Ok(credentials) => credentials,
      Err(error) => return LoadResult::Failure(error),
    };

    safe_operation(&NetworkErrorProcessor, async {
      let payload: A = self.get_json(&credentials, path, query).await?;
      Ok::<_, RemoteError>(convert(payload))
    })
    .await
  }

  async fn get_json<A: DeserializeOwned>(
    &self,
    credentials: &Credentials,
    path: &[&str],
    query: &[(&str, String)],
  ) -> std::result::Result<A, RemoteError> {
    let mut url = self.endpoint(path)?;

    let mut pairs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_str())).collect();
    if let Credentials::ApiKey(key) = credentials {
      pairs.push(("api_key", key.as_str()));
    }
    if !pairs.is_empty() {
      url.query_pairs_mut().extend_pairs(pairs);
    }

    let mut request = self.http.get(url);
    if let Credentials::Bearer(token) = credentials {
      request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
      return Err(status_error(status, &body).into());
    }

    Ok(serde_json::from_slice(&body)?)
  }
}

impl ApiClient {
  /// Append `segments` to the base path. Each segment is percent-encoded
  /// whole, so `/`, `?` and `#` inside one cannot change the route.
  fn endpoint(&self, segments: &[&str]) -> std::result::Result<Url, RemoteError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }
}

/// Build the error for a non-2xx response, preferring the server's message.
fn status_error(status: StatusCode, body: &[u8]) -> HttpStatusError {
  let message = ApiErrorBody::parse(body).unwrap_or_else(|| {
    status
      .canonical_reason()
      .unwrap_or("request failed")
      .to_string()
  });

  HttpStatusError {
    status: status.as_u16(),
    message,
  }
}

#[async_trait]
impl RemoteDataSource for ApiClient {
  async fn current_user(&self) -> LoadResult<User> {
    self
      .fetch(&["users", "current"], &[], |e: Envelope<ApiUser>| {
        LoadResult::values(User::from(e.data))
      })
      .await
  }

  async fn total_record(&self) -> LoadResult<TotalRecord> {
    self
      .fetch(
        &["users", "current", "all_time_since_today"],
        &[],
        |e: Envelope<ApiTotalRecord>| LoadResult::values(TotalRecord::from(e.data)),
      )
      .await
  }

  async fn projects(&self) -> LoadResult<Vec<Project>> {
    self
      .fetch(&["users", "current", "projects"], &[], |e: Envelope<Vec<ApiProject>>| {
        LoadResult::from_vec(e.data.into_iter().map(Project::from).collect())
      })
      .await
  }

  async fn stats(&self, range: StatsRange) -> LoadResult<Stats> {
    self
      .fetch(&["users", "current", "stats", range.as_str()], &[], |e: Envelope<ApiStats>| {
        LoadResult::values(e.data.into_stats(range))
      })
      .await
  }

  async fn public_leaders(&self, language: Option<&str>, page: u32) -> LoadResult<Leaders> {
    let mut query = Vec::new();
    if let Some(language) = language {
      query.push(("language", language.to_string()));
    }
    query.push(("page", page.to_string()));

    self
      .fetch(&["leaders"], &query, |p: ApiLeadersPage| leaders_page(p))
      .await
  }

  async fn private_leaderboards(&self) -> LoadResult<Vec<PrivateLeaderboard>> {
    self
      .fetch(
        &["users", "current", "leaderboards"],
        &[],
        |e: Envelope<Vec<ApiPrivateLeaderboard>>| {
          LoadResult::from_vec(e.data.into_iter().map(PrivateLeaderboard::from).collect())
        },
      )
      .await
  }

  async fn private_leaders(&self, id: &str, page: u32) -> LoadResult<Leaders> {
    // Dot segments would be dropped from the path, addressing the board list
    if matches!(id.trim(), "" | "." | "..") {
      let message = format!("invalid leaderboard id '{}'", id);
      return LoadResult::Failure(NetworkErrorProcessor.on_error(codes::BAD_REQUEST, &message));
    }

    let query = [("page", page.to_string())];
    self
      .fetch(&["users", "current", "leaderboards", id], &query, |p: ApiLeadersPage| leaders_page(p))
      .await
  }

  async fn revoke_token(&self) -> LoadResult<()> {
    let token = match self.authorize() {
      Ok(Credentials::Bearer(token)) => token,
      // API keys are not revocable from a client
      Ok(Credentials::ApiKey(_)) => return LoadResult::Empty,
      Err(error) => return LoadResult::Failure(error),
    };

    safe_operation(&NetworkErrorProcessor, async {
      let response = self
        .http
        .post(self.revoke_url.clone())
        .json(&serde_json::json!({ "token": token }))
        .send()
        .await?;

      let status = response.status();
      if !status.is_success() {
        let body = response.bytes().await?;
        return Err(RemoteError::from(status_error(status, &body)));
      }
      Ok(LoadResult::values(()))
    })
    .await
  }
}

/// A page with no entries counts as empty.
fn leaders_page(page: ApiLeadersPage) -> LoadResult<Leaders> {
  let leaders = Leaders::from(page);
  if leaders.leaders.is_empty() {
    LoadResult::Empty
  } else {
    LoadResult::values(leaders)
  }
}
