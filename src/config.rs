use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::linear::client::DEFAULT_API_URL;
use crate::linear::{CacheTtls, FacadeConfig};
use crate::resilience::{RateLimitConfig, RetryPolicy};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// GraphQL endpoint
  pub api_url: Url,
  pub rate_limit: RateLimitSection,
  pub retry: RetrySection,
  pub cache: CacheSection,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api_url: default_api_url(),
      rate_limit: RateLimitSection::default(),
      retry: RetrySection::default(),
      cache: CacheSection::default(),
    }
  }
}

fn default_api_url() -> Url {
  Url::parse(DEFAULT_API_URL).expect("DEFAULT_API_URL is a valid URL")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
  pub max_requests: usize,
  pub window_ms: u64,
  /// Throttle issue mutations and viewer lookups too, not only reads
  pub limit_all_calls: bool,
}

impl Default for RateLimitSection {
  fn default() -> Self {
    Self {
      max_requests: 10,
      window_ms: 1000,
      limit_all_calls: true,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
  pub max_retries: u32,
  pub initial_delay_ms: u64,
  pub max_delay_ms: u64,
  pub backoff_multiplier: f64,
}

impl Default for RetrySection {
  fn default() -> Self {
    let policy = RetryPolicy::DEFAULT;
    Self {
      max_retries: policy.max_retries,
      initial_delay_ms: policy.initial_delay.as_millis() as u64,
      max_delay_ms: policy.max_delay.as_millis() as u64,
      backoff_multiplier: policy.backoff_multiplier,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
  pub viewer_ttl_secs: u64,
  pub teams_ttl_secs: u64,
  pub workflow_states_ttl_secs: u64,
}

impl Default for CacheSection {
  fn default() -> Self {
    let ttls = CacheTtls::default();
    Self {
      viewer_ttl_secs: ttls.viewer.as_secs(),
      teams_ttl_secs: ttls.teams.as_secs(),
      workflow_states_ttl_secs: ttls.workflow_states.as_secs(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./linear-facade.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/linear-facade/config.yaml
  ///
  /// Every setting has a default, so a missing file is not an error unless
  /// the path was given explicitly.
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

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };
    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("linear-facade.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("linear-facade").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.rate_limit.max_requests == 0 {
      return Err(eyre!("rate_limit.max_requests must be at least 1"));
    }
    if self.rate_limit.window_ms == 0 {
      return Err(eyre!("rate_limit.window_ms must be positive"));
    }
    if self.retry.backoff_multiplier < 1.0 {
      return Err(eyre!("retry.backoff_multiplier must be at least 1.0"));
    }
    Ok(())
  }

  /// Policy settings for the facade.
  pub fn facade_config(&self) -> FacadeConfig {
    FacadeConfig {
      rate_limit: RateLimitConfig {
        max_requests: self.rate_limit.max_requests,
        window: Duration::from_millis(self.rate_limit.window_ms),
      },
      limit_all_calls: self.rate_limit.limit_all_calls,
      retry: RetryPolicy {
        max_retries: self.retry.max_retries,
        initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
        max_delay: Duration::from_millis(self.retry.max_delay_ms),
        backoff_multiplier: self.retry.backoff_multiplier,
      },
      ttls: CacheTtls {
        viewer: Duration::from_secs(self.cache.viewer_ttl_secs),
        teams: Duration::from_secs(self.cache.teams_ttl_secs),
        workflow_states: Duration::from_secs(self.cache.workflow_states_ttl_secs),
      },
    }
  }

  /// Get the Linear API key from environment variables.
  ///
  /// Checks LINEAR_FACADE_API_KEY first, then LINEAR_API_KEY as fallback.
  pub fn get_api_key() -> Result<String> {
    std::env::var("LINEAR_FACADE_API_KEY")
      .or_else(|_| std::env::var("LINEAR_API_KEY"))
      .map_err(|_| {
        eyre!("Linear API key not found. Set LINEAR_FACADE_API_KEY or LINEAR_API_KEY environment variable.")
      })
  }
}
