//! Expiry tracking for cached resources.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

/// Monotonic time source.
pub trait Clock: Send + Sync {
  fn now(&self) -> Instant;
}

/// The process monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Instant {
    Instant::now()
  }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
  origin: Instant,
  elapsed: Mutex<Duration>,
}

impl ManualClock {
  pub fn new() -> Self {
    Self {
      origin: Instant::now(),
      elapsed: Mutex::new(Duration::ZERO),
    }
  }

  pub fn advance(&self, by: Duration) {
    let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
    *elapsed += by;
  }
}

impl Default for ManualClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for ManualClock {
  fn now(&self) -> Instant {
    self.origin + *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Remembers when each key was last refreshed and decides when it is due again.
///
/// A key that was never marked is always due. Marks live for the lifetime of
/// the limiter and are never persisted, so a fresh process always refetches.
pub struct RateLimiter {
  timeout: Duration,
  clock: Arc<dyn Clock>,
  marks: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
  pub fn new(timeout: Duration) -> Self {
    Self::with_clock(timeout, Arc::new(SystemClock))
  }

  pub fn with_clock(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
    Self {
      timeout,
      clock,
      marks: Mutex::new(HashMap::new()),
    }
  }

  pub fn timeout(&self) -> Duration {
    self.timeout
  }

  /// True if `key` was never marked or its mark is older than the timeout.
  pub fn should_fetch(&self, key: &str) -> bool {
    let now = self.clock.now();
    let due = match self.marks().get(key) {
      Some(last) => now.saturating_duration_since(*last) > self.timeout,
      None => true,
    };
    debug!(key, due, "rate limit check");
    due
  }

  /// Record a successful refresh of `key`.
  pub fn mark(&self, key: &str) {
    let now = self.clock.now();
    self.marks().insert(key.to_string(), now);
  }

  /// Forget `key` so the next check is due.
  pub fn reset(&self, key: &str) {
    self.marks().remove(key);
  }

  // The map holds plain timestamps, so a poisoned lock is still consistent.
  fn marks(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
    self.marks.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl std::fmt::Debug for RateLimiter {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RateLimiter")
      .field("timeout", &self.timeout)
      .field("keys", &self.marks().len())
      .finish()
  }
}
