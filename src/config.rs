use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::remote::Credentials;

pub const DEFAULT_API_URL: &str = "https://wakatime.com/api/v1";
pub const DEFAULT_REVOKE_URL: &str = "https://wakatime.com/oauth/revoke";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
  /// Secret API key from the account settings page
  #[default]
  ApiKey,
  /// OAuth access token
  Oauth,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub url: String,
  pub revoke_url: String,
  pub auth_type: AuthType,
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_API_URL.to_string(),
      revoke_url: DEFAULT_REVOKE_URL.to_string(),
      auth_type: AuthType::default(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// How long cached data stays fresh
  pub ttl_minutes: u64,
  /// Keep the cache on disk; otherwise it lives in memory for one run
  pub persist: bool,
  /// Database location (defaults to the data directory)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_minutes: 5,
      persist: true,
      path: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./waka.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/waka/config.yaml
  ///
  /// Without a file the defaults apply.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("waka.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("waka").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    // An empty file is valid YAML null, not an empty mapping
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }

    let config: Config = serde_yaml::from_str(contents)?;
    if config.api.timeout_secs == 0 {
      return Err(eyre!("api.timeout_secs must be greater than zero"));
    }

    Ok(config)
  }

  /// Freshness window for cached data. Huge values clamp instead of wrapping.
  pub fn cache_ttl(&self) -> Duration {
    Duration::from_secs(self.cache.ttl_minutes.saturating_mul(60))
  }

  /// Credentials from the environment.
  ///
  /// Reads WAKA_API_KEY for `api_key` auth and WAKA_ACCESS_TOKEN for `oauth`.
  /// `None` means the session starts signed out.
  pub fn credentials(&self) -> Option<Credentials> {
    self.credentials_from(|name| std::env::var(name).ok())
  }

  fn credentials_from(&self, var: impl Fn(&str) -> Option<String>) -> Option<Credentials> {
    let credentials = match self.api.auth_type {
      AuthType::ApiKey => var("WAKA_API_KEY").map(Credentials::ApiKey),
      AuthType::Oauth => var("WAKA_ACCESS_TOKEN").map(Credentials::Bearer),
    };
    credentials.filter(|c| !c.secret().trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.url, DEFAULT_API_URL);
    assert_eq!(config.api.auth_type, AuthType::ApiKey);
    assert_eq!(config.cache_ttl(), Duration::from_secs(300));
    assert!(config.cache.persist);
  }

  #[test]
  fn test_partial_config() {
    let config = Config::parse(
      r#"
api:
  auth_type: oauth
cache:
  ttl_minutes: 1
  persist: false
"#,
    )
    .unwrap();

    assert_eq!(config.api.auth_type, AuthType::Oauth);
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.cache_ttl(), Duration::from_secs(60));
    assert!(!config.cache.persist);
    assert_eq!(config.cache.path, None);
  }

  #[test]
  fn test_rejects_bad_values() {
    assert!(Config::parse("api:\n  auth_type: password\n").is_err());
    assert!(Config::parse("api:\n  timeout_secs: 0\n").is_err());
  }

  #[test]
  fn test_huge_ttl_saturates() {
    let config = Config::parse(&format!("cache:\n  ttl_minutes: {}\n", u64::MAX)).unwrap();
    assert_eq!(config.cache_ttl(), Duration::from_secs(u64::MAX));

    let config = Config::parse("cache:\n  ttl_minutes: 307445734561825861\n").unwrap();
    assert_eq!(config.cache_ttl(), Duration::from_secs(u64::MAX));
  }

  #[test]
  fn test_credentials_follow_auth_type() {
    let env = |name: &str| match name {
      "WAKA_API_KEY" => Some("key".to_string()),
      "WAKA_ACCESS_TOKEN" => Some(" ".to_string()),
      _ => None,
    };

    let mut config = Config::default();
    assert_eq!(
      config.credentials_from(env),
      Some(Credentials::ApiKey("key".into()))
    );

    config.api.auth_type = AuthType::Oauth;
    assert_eq!(config.credentials_from(env), None);
  }

  #[test]
  fn test_load_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("waka.yaml");
    std::fs::write(&path, "api:\n  url: http://localhost:3000/api\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.api.url, "http://localhost:3000/api");

    assert!(Config::load(Some(&dir.path().join("missing.yaml"))).is_err());
  }
}
