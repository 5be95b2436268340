//! Authorization state consulted before every remote call.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// How requests are authorized.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
  /// Secret API key, sent as the `api_key` query parameter
  ApiKey(String),
  /// OAuth access token, sent as a bearer token
  Bearer(String),
}

impl Credentials {
  pub fn secret(&self) -> &str {
    match self {
      Credentials::ApiKey(secret) | Credentials::Bearer(secret) => secret,
    }
  }
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Credentials::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
      Credentials::Bearer(_) => f.write_str("Bearer(<redacted>)"),
    }
  }
}

/// Current authorization state.
pub trait Session: Send + Sync {
  fn credentials(&self) -> Option<Credentials>;

  /// Drop the credentials; later calls are unauthorized.
  fn invalidate(&self);

  fn is_authorized(&self) -> bool {
    self.credentials().is_some()
  }

  fn access_token(&self) -> Option<String> {
    self.credentials().map(|c| c.secret().to_string())
  }
}

/// Session holding credentials known up front (environment, config).
#[derive(Debug, Default)]
pub struct StaticSession {
  credentials: Mutex<Option<Credentials>>,
}

impl StaticSession {
  pub fn new(credentials: Option<Credentials>) -> Self {
    // Blank secrets count as signed out.
    let credentials = credentials.filter(|c| !c.secret().trim().is_empty());
    Self {
      credentials: Mutex::new(credentials),
    }
  }
}

impl Session for StaticSession {
  fn credentials(&self) -> Option<Credentials> {
    self
      .credentials
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  fn invalidate(&self) {
    *self
      .credentials
      .lock()
      .unwrap_or_else(PoisonError::into_inner) = None;
  }
}
