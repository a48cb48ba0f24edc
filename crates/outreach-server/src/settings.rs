//! Server configuration, layered from an optional TOML file and
//! `OUTREACH_*` environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use outreach_api::ApiConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error(transparent)]
  Load(#[from] config::ConfigError),

  #[error("demo_mode is enabled but demo_user_id is not set")]
  MissingDemoUser,

  #[error("{0} must be positive")]
  NotPositive(&'static str),
}

/// Runtime server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  #[serde(default)]
  pub demo_mode:            bool,
  #[serde(default)]
  pub demo_user_id:         Option<String>,
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs: u64,
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours:    i64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 3000 }
fn default_store_path() -> PathBuf { PathBuf::from("outreach.db") }
fn default_request_timeout_secs() -> u64 { 30 }
fn default_session_ttl_hours() -> i64 { 168 }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 default_host(),
      port:                 default_port(),
      store_path:           default_store_path(),
      demo_mode:            false,
      demo_user_id:         None,
      request_timeout_secs: default_request_timeout_secs(),
      session_ttl_hours:    default_session_ttl_hours(),
    }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists), then overlay the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("OUTREACH").try_parsing(true))
      .build()?;
    let cfg: ServerConfig = settings.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.demo_mode && self.demo_user_id.as_deref().is_none_or(str::is_empty) {
      return Err(ConfigError::MissingDemoUser);
    }
    if self.request_timeout_secs == 0 {
      return Err(ConfigError::NotPositive("request_timeout_secs"));
    }
    if self.session_ttl_hours <= 0 {
      return Err(ConfigError::NotPositive("session_ttl_hours"));
    }
    Ok(())
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// The store path with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      demo_mode:       self.demo_mode,
      demo_user_id:    self.demo_user_id.clone(),
      request_timeout: Duration::from_secs(self.request_timeout_secs),
      session_ttl:     chrono::Duration::hours(self.session_ttl_hours),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
