//! Typed error taxonomy shared by the network and database layers.
//!
//! Every failure that crosses a collaborator boundary is translated into an
//! [`Error`] by an [`ErrorProcessor`]. Codes are stable: HTTP-derived variants
//! carry their status code, client-side failures use the negative codes in
//! [`codes`].

use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::future::Future;

use tracing::debug;

use crate::result::LoadResult;

/// Stable numeric codes for errors that have no HTTP status.
pub mod codes {
  pub const BAD_REQUEST: i32 = 400;
  pub const UNAUTHORIZED: i32 = 401;
  pub const FORBIDDEN: i32 = 403;
  pub const NOT_FOUND: i32 = 404;
  pub const TIMEOUT: i32 = 408;
  pub const TOO_MANY_REQUESTS: i32 = 429;
  pub const INTERNAL_SERVER: i32 = 500;
  pub const UNAVAILABLE: i32 = 503;

  pub const NO_NETWORK: i32 = -1;
  pub const UNKNOWN_HOST: i32 = -2;
  pub const SERIALIZATION: i32 = -3;
  pub const SOCKET_TIMEOUT: i32 = -4;
  pub const PROTOCOL: i32 = -5;
  pub const HTTP: i32 = -6;

  pub const DATABASE_UNKNOWN: i32 = -100;
}

// ============================================================================
// Error taxonomy
// ============================================================================

/// A failure surfaced to callers, either from the network or the local store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
  #[error(transparent)]
  Network(#[from] NetworkError),
  #[error(transparent)]
  Database(#[from] DatabaseError),
}

impl Error {
  pub fn code(&self) -> i32 {
    match self {
      Error::Network(e) => e.code(),
      Error::Database(e) => e.code(),
    }
  }

  pub fn message(&self) -> &str {
    match self {
      Error::Network(e) => e.message(),
      Error::Database(e) => e.message(),
    }
  }
}

impl From<InternalError> for Error {
  fn from(e: InternalError) -> Self {
    Error::Network(NetworkError::Internal(e))
  }
}

/// Errors derived from HTTP status codes, plus client-side [`InternalError`]s.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
  #[error("bad request: {message}")]
  BadRequest { message: String },
  #[error("unauthorized: {message}")]
  Unauthorized { message: String },
  #[error("forbidden: {message}")]
  Forbidden {
    message: String,
    /// OAuth scopes the server reported as missing, if any
    missing_scopes: BTreeSet<String>,
  },
  #[error("not found: {message}")]
  NotFound { message: String },
  #[error("request timed out: {message}")]
  Timeout { message: String },
  #[error("too many requests: {message}")]
  TooManyRequests { message: String },
  #[error("internal server error: {message}")]
  InternalServer { message: String },
  #[error("service unavailable: {message}")]
  Unavailable { message: String },
  #[error("unexpected response ({code}): {message}")]
  Unknown { code: i32, message: String },
  #[error(transparent)]
  Internal(#[from] InternalError),
}

impl NetworkError {
  pub fn code(&self) -> i32 {
    match self {
      Self::BadRequest { .. } => codes::BAD_REQUEST,
      Self::Unauthorized { .. } => codes::UNAUTHORIZED,
      Self::Forbidden { .. } => codes::FORBIDDEN,
      Self::NotFound { .. } => codes::NOT_FOUND,
      Self::Timeout { .. } => codes::TIMEOUT,
      Self::TooManyRequests { .. } => codes::TOO_MANY_REQUESTS,
      Self::InternalServer { .. } => codes::INTERNAL_SERVER,
      Self::Unavailable { .. } => codes::UNAVAILABLE,
      Self::Unknown { code, .. } => *code,
      Self::Internal(e) => e.code(),
    }
  }

  pub fn message(&self) -> &str {
    match self {
      Self::BadRequest { message }
      | Self::Unauthorized { message }
      | Self::Forbidden { message, .. }
      | Self::NotFound { message }
      | Self::Timeout { message }
      | Self::TooManyRequests { message }
      | Self::InternalServer { message }
      | Self::Unavailable { message }
      | Self::Unknown { message, .. } => message,
      Self::Internal(e) => e.message(),
    }
  }
}

/// Failures that happen on the client before or instead of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
  #[error("no network connection: {message}")]
  NoNetwork { message: String },
  #[error("unknown host: {message}")]
  UnknownHost { message: String },
  #[error("malformed response: {message}")]
  Serialization { message: String },
  #[error("socket timeout: {message}")]
  SocketTimeout { message: String },
  #[error("protocol error: {message}")]
  Protocol { message: String },
  #[error("http client error: {message}")]
  Http { message: String },
}

impl InternalError {
  pub fn code(&self) -> i32 {
    match self {
      Self::NoNetwork { .. } => codes::NO_NETWORK,
      Self::UnknownHost { .. } => codes::UNKNOWN_HOST,
      Self::Serialization { .. } => codes::SERIALIZATION,
      Self::SocketTimeout { .. } => codes::SOCKET_TIMEOUT,
      Self::Protocol { .. } => codes::PROTOCOL,
      Self::Http { .. } => codes::HTTP,
    }
  }

  pub fn message(&self) -> &str {
    match self {
      Self::NoNetwork { message }
      | Self::UnknownHost { message }
      | Self::Serialization { message }
      | Self::SocketTimeout { message }
      | Self::Protocol { message }
      | Self::Http { message } => message,
    }
  }
}

/// Local store failures. Intentionally opaque.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatabaseError {
  #[error("local store error ({code}): {message}")]
  Unknown { code: i32, message: String },
}

impl DatabaseError {
  pub fn code(&self) -> i32 {
    match self {
      Self::Unknown { code, .. } => *code,
    }
  }

  pub fn message(&self) -> &str {
    match self {
      Self::Unknown { message, .. } => message,
    }
  }
}

/// A non-2xx HTTP response, raised inside the network layer and classified
/// by [`NetworkErrorProcessor`] through its status code.
#[derive(Debug, Clone, thiserror::Error)]
#[error("HTTP {status}: {message}")]
pub struct HttpStatusError {
  pub status: u16,
  pub message: String,
}

// ============================================================================
// Error processors
// ============================================================================

/// Translates raw failures of one domain into typed [`Error`]s.
pub trait ErrorProcessor: Send + Sync {
  /// Map a numeric code and message. Total: unknown codes are preserved.
  fn on_error(&self, code: i32, message: &str) -> Error;

  /// Classify a caught failure, including anything in its `source()` chain.
  fn on_failure(&self, failure: &(dyn StdError + 'static)) -> Error;
}

/// Error processor for the remote API.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkErrorProcessor;

impl ErrorProcessor for NetworkErrorProcessor {
  fn on_error(&self, code: i32, message: &str) -> Error {
    let message = message.to_string();
    let error = match code {
      codes::BAD_REQUEST => NetworkError::BadRequest { message },
      codes::UNAUTHORIZED => NetworkError::Unauthorized { message },
      codes::FORBIDDEN => NetworkError::Forbidden {
        missing_scopes: missing_scopes(&message),
        message,
      },
      codes::NOT_FOUND => NetworkError::NotFound { message },
      codes::TIMEOUT => NetworkError::Timeout { message },
      codes::TOO_MANY_REQUESTS => NetworkError::TooManyRequests { message },
      codes::INTERNAL_SERVER => NetworkError::InternalServer { message },
      codes::UNAVAILABLE => NetworkError::Unavailable { message },
      codes::NO_NETWORK => InternalError::NoNetwork { message }.into(),
      codes::UNKNOWN_HOST => InternalError::UnknownHost { message }.into(),
      codes::SERIALIZATION => InternalError::Serialization { message }.into(),
      codes::SOCKET_TIMEOUT => InternalError::SocketTimeout { message }.into(),
      codes::PROTOCOL => InternalError::Protocol { message }.into(),
      codes::HTTP => InternalError::Http { message }.into(),
      code => NetworkError::Unknown { code, message },
    };
    Error::Network(error)
  }

  fn on_failure(&self, failure: &(dyn StdError + 'static)) -> Error {
    let message = failure.to_string();

    let mut current = Some(failure);
    while let Some(err) = current {
      if let Some(error) = self.classify(err, &message) {
        return error;
      }
      current = err.source();
    }

    InternalError::Http { message }.into()
  }
}

impl NetworkErrorProcessor {
  fn classify(&self, err: &(dyn StdError + 'static), message: &str) -> Option<Error> {
    let message = message.to_string();

    if let Some(status) = err.downcast_ref::<HttpStatusError>() {
      return Some(self.on_error(i32::from(status.status), &status.message));
    }
    if let Some(err) = err.downcast_ref::<reqwest::Error>() {
      return Some(self.classify_reqwest(err, message));
    }
    if err.is::<serde_json::Error>() {
      return Some(InternalError::Serialization { message }.into());
    }
    if err.is::<url::ParseError>() {
      return Some(InternalError::Protocol { message }.into());
    }
    if let Some(io) = err.downcast_ref::<std::io::Error>() {
      use std::io::ErrorKind;
      let error = match io.kind() {
        ErrorKind::TimedOut => InternalError::SocketTimeout { message },
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::BrokenPipe => InternalError::NoNetwork { message },
        ErrorKind::InvalidData => InternalError::Serialization { message },
        _ => InternalError::Protocol { message },
      };
      return Some(error.into());
    }

    None
  }

  fn classify_reqwest(&self, err: &reqwest::Error, message: String) -> Error {
    if err.is_timeout() {
      return InternalError::SocketTimeout { message }.into();
    }
    if let Some(status) = err.status() {
      return self.on_error(i32::from(status.as_u16()), &message);
    }
    if err.is_connect() {
      if chain_mentions_dns(err) {
        return InternalError::UnknownHost { message }.into();
      }
      return InternalError::NoNetwork { message }.into();
    }
    if err.is_decode() {
      return InternalError::Serialization { message }.into();
    }
    if err.is_request() || err.is_redirect() || err.is_body() || err.is_builder() {
      return InternalError::Protocol { message }.into();
    }
    InternalError::Http { message }.into()
  }
}

/// Resolver failures only show up in the error text of the connector chain.
fn chain_mentions_dns(err: &(dyn StdError + 'static)) -> bool {
  let mut current = Some(err);
  while let Some(err) = current {
    let text = err.to_string().to_ascii_lowercase();
    if text.contains("dns error") || text.contains("failed to lookup address") {
      return true;
    }
    current = err.source();
  }
  false
}

/// Extract scope names from messages like `"missing scopes: read_stats, email"`.
fn missing_scopes(message: &str) -> BTreeSet<String> {
  let lower = message.to_ascii_lowercase();
  let Some(index) = lower.rfind("scopes:") else {
    return BTreeSet::new();
  };

  message[index + "scopes:".len()..]
    .split(|c: char| c == ',' || c.is_whitespace())
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(String::from)
    .collect()
}

/// Error processor for the local store.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatabaseErrorProcessor;

impl ErrorProcessor for DatabaseErrorProcessor {
  fn on_error(&self, code: i32, message: &str) -> Error {
    Error::Database(DatabaseError::Unknown {
      code,
      message: message.to_string(),
    })
  }

  fn on_failure(&self, failure: &(dyn StdError + 'static)) -> Error {
    let message = failure.to_string();

    let mut current = Some(failure);
    while let Some(err) = current {
      if let Some(rusqlite::Error::SqliteFailure(sqlite, _)) = err.downcast_ref::<rusqlite::Error>() {
        return self.on_error(sqlite.extended_code, &message);
      }
      current = err.source();
    }

    self.on_error(codes::DATABASE_UNKNOWN, &message)
  }
}

// ============================================================================
// Failure boundary
// ============================================================================

/// Run a fallible async block, converting any error into a `Failure`.
pub async fn safe_operation<T, E, P, Fut>(processor: &P, block: Fut) -> LoadResult<T>
where
  P: ErrorProcessor + ?Sized,
  E: StdError + 'static,
  Fut: Future<Output = Result<LoadResult<T>, E>>,
{
  match block.await {
    Ok(result) => result,
    Err(err) => fail(processor, &err),
  }
}

/// Synchronous counterpart of [`safe_operation`] for blocking collaborators.
pub fn safe_call<T, E, P, F>(processor: &P, block: F) -> LoadResult<T>
where
  P: ErrorProcessor + ?Sized,
  E: StdError + 'static,
  F: FnOnce() -> Result<LoadResult<T>, E>,
{
  match block() {
    Ok(result) => result,
    Err(err) => fail(processor, &err),
  }
}

fn fail<T, P>(processor: &P, err: &(dyn StdError + 'static)) -> LoadResult<T>
where
  P: ErrorProcessor + ?Sized,
{
  let error = processor.on_failure(err);
  debug!(code = error.code(), %error, "operation failed");
  LoadResult::Failure(error)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_known_codes_map_to_their_variant() {
    let processor = NetworkErrorProcessor;

    let error = processor.on_error(404, "not found");
    assert_eq!(
      error,
      Error::Network(NetworkError::NotFound {
        message: "not found".into()
      })
    );
    assert_eq!(error.code(), 404);

    assert!(matches!(
      processor.on_error(429, "slow down"),
      Error::Network(NetworkError::TooManyRequests { .. })
    ));
    assert!(matches!(
      processor.on_error(codes::SOCKET_TIMEOUT, "timed out"),
      Error::Network(NetworkError::Internal(InternalError::SocketTimeout { .. }))
    ));
  }

  #[test]
  fn test_unknown_code_is_preserved() {
    let error = NetworkErrorProcessor.on_error(999, "weird");
    assert_eq!(
      error,
      Error::Network(NetworkError::Unknown {
        code: 999,
        message: "weird".into()
      })
    );
    assert_eq!(error.message(), "weird");
  }

  #[test]
  fn test_forbidden_parses_missing_scopes() {
    let error = NetworkErrorProcessor.on_error(403, "Missing scopes: read_stats, read_logged_time");
    match error {
      Error::Network(NetworkError::Forbidden { missing_scopes, .. }) => {
        let expected: BTreeSet<String> = ["read_stats", "read_logged_time"]
          .into_iter()
          .map(String::from)
          .collect();
        assert_eq!(missing_scopes, expected);
      }
      other => panic!("expected Forbidden, got {:?}", other),
    }

    match NetworkErrorProcessor.on_error(403, "go away") {
      Error::Network(NetworkError::Forbidden { missing_scopes, .. }) => {
        assert!(missing_scopes.is_empty())
      }
      other => panic!("expected Forbidden, got {:?}", other),
    }
  }

  #[test]
  fn test_failure_classification() {
    let processor = NetworkErrorProcessor;

    let status = HttpStatusError {
      status: 503,
      message: "maintenance".into(),
    };
    assert!(matches!(
      processor.on_failure(&status),
      Error::Network(NetworkError::Unavailable { .. })
    ));

    let json = serde_json::from_str::<u32>("not json").unwrap_err();
    assert_eq!(processor.on_failure(&json).code(), codes::SERIALIZATION);

    let timeout = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
    assert_eq!(processor.on_failure(&timeout).code(), codes::SOCKET_TIMEOUT);

    let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    assert_eq!(processor.on_failure(&refused).code(), codes::NO_NETWORK);

    let url = url::Url::parse("::not a url").unwrap_err();
    assert_eq!(processor.on_failure(&url).code(), codes::PROTOCOL);

    let other = std::fmt::Error;
    assert_eq!(processor.on_failure(&other).code(), codes::HTTP);
  }

  #[derive(Debug, thiserror::Error)]
  #[error("wrapped: {0}")]
  struct Wrapper(#[source] std::io::Error);

  #[test]
  fn test_failure_classification_walks_source_chain() {
    let wrapped = Wrapper(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"));
    let error = NetworkErrorProcessor.on_failure(&wrapped);
    assert_eq!(error.code(), codes::SOCKET_TIMEOUT);
    assert_eq!(error.message(), "wrapped: slow");
  }

  #[test]
  fn test_database_processor_is_opaque() {
    let error = DatabaseErrorProcessor.on_failure(&std::fmt::Error);
    assert!(matches!(
      error,
      Error::Database(DatabaseError::Unknown {
        code: codes::DATABASE_UNKNOWN,
        ..
      })
    ));

    let sqlite = rusqlite::Error::SqliteFailure(
      rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
      Some("disk full".into()),
    );
    assert_eq!(
      DatabaseErrorProcessor.on_failure(&sqlite).code(),
      rusqlite::ffi::SQLITE_FULL
    );
  }

  #[tokio::test]
  async fn test_safe_operation_converts_errors() {
    let ok: LoadResult<u32> = safe_operation(&NetworkErrorProcessor, async {
      Ok::<_, std::io::Error>(LoadResult::values(7))
    })
    .await;
    assert_eq!(ok, LoadResult::values(7));

    let failed: LoadResult<u32> = safe_operation(&NetworkErrorProcessor, async {
      Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"))
    })
    .await;
    assert_eq!(failed.error().map(Error::code), Some(codes::SOCKET_TIMEOUT));
  }

  #[test]
  fn test_safe_call_converts_errors() {
    let failed: LoadResult<u32> = safe_call(&DatabaseErrorProcessor, || Err(std::fmt::Error));
    assert!(failed.is_failure());
  }
}

#[cfg(test)]
mod prop_tests {
  use super::*;
  use proptest::prelude::*;

  proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Any code maps to an error that reports that code and message back.
    #[test]
    fn prop_error_mapping_is_total(code in any::<i32>(), message in "\\PC{0,64}") {
      let error = NetworkErrorProcessor.on_error(code, &message);
      prop_assert_eq!(error.code(), code);
      prop_assert_eq!(error.message(), message.as_str());
    }

    /// Codes without a dedicated variant survive unchanged as `Unknown`.
    #[test]
    fn prop_unmapped_codes_are_unknown(code in 1000i32..) {
      let error = NetworkErrorProcessor.on_error(code, "msg");
      prop_assert!(
        matches!(error, Error::Network(NetworkError::Unknown { code: c, .. }) if c == code),
        "unexpected {:?}",
        error
      );
    }
  }
}
