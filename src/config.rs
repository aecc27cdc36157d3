use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::{StalenessPolicy, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub lists: ListsConfig,
  /// Log filter used when QRDASH_LOG is not set (e.g. "debug", "qrdash=trace")
  pub log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
  /// Per-request timeout
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  15
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long fetched data counts as fresh
  #[serde(default = "default_freshness_secs")]
  pub freshness_secs: u64,
}

fn default_freshness_secs() -> u64 {
  300
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      freshness_secs: default_freshness_secs(),
    }
  }
}

impl CacheConfig {
  pub fn policy(&self) -> StalenessPolicy {
    let secs = i64::try_from(self.freshness_secs).unwrap_or(i64::MAX);
    let freshness = chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX);
    StalenessPolicy::new(freshness)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListsConfig {
  /// Rows per page for contacts and audit logs
  #[serde(default = "default_page_size")]
  pub page_size: u32,
}

fn default_page_size() -> u32 {
  DEFAULT_PAGE_SIZE
}

impl Default for ListsConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./qrdash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/qrdash/config.yaml
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
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/qrdash/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("qrdash.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("qrdash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.lists.page_size == 0 {
      return Err(eyre!("lists.page_size must be at least 1"));
    }
    Ok(config)
  }

  /// Get the API token from environment variables.
  ///
  /// Checks QRDASH_API_TOKEN first, then QR_API_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("QRDASH_API_TOKEN")
      .or_else(|_| std::env::var("QR_API_TOKEN"))
      .map_err(|_| {
        eyre!("API token not found. Set QRDASH_API_TOKEN or QR_API_TOKEN environment variable.")
      })
  }
}
