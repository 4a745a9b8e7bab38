use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::resources::ResourceKind;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub http: HttpConfig,
  #[serde(default)]
  pub endpoints: EndpointsConfig,
  #[serde(default)]
  pub messages: MessagesConfig,
  /// Per-resource overrides; resources not listed use their defaults
  #[serde(default)]
  pub resources: BTreeMap<ResourceKind, ResourceOverrides>,
  #[serde(default)]
  pub log: LogConfig,
  /// File this configuration was read from; `None` for built-in defaults
  #[serde(skip)]
  pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub bind: SocketAddr,
  /// TTL advertised on every answer record, in seconds
  pub answer_ttl: u32,
  /// Longest payload of a single TXT answer; longer lines are split
  pub max_record_len: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind: SocketAddr::from(([0, 0, 0, 0], 5353)),
      answer_ttl: 60,
      max_record_len: 255,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
  pub timeout_secs: u64,
  pub user_agent: String,
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self {
      timeout_secs: 10,
      user_agent: concat!("sol-dns/", env!("CARGO_PKG_VERSION")).to_string(),
    }
  }
}

impl HttpConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

/// Base URLs of the upstream data providers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
  pub stakewiz: Url,
  pub solanacompass: Url,
  pub solanabeach: Url,
}

impl Default for EndpointsConfig {
  fn default() -> Self {
    Self {
      stakewiz: default_url("https://api.stakewiz.com/"),
      solanacompass: default_url("https://solanacompass.com/"),
      solanabeach: default_url("https://api.solanabeach.io/"),
    }
  }
}

fn default_url(s: &str) -> Url {
  Url::parse(s).unwrap_or_else(|e| panic!("invalid built-in endpoint {s}: {e}"))
}

/// Fixed response texts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
  /// Served by scheduled resources before their first refresh lands
  pub loading: String,
  /// Answer for names that map to no command
  pub unknown_command: String,
  /// Answer when a resource failed and has nothing cached
  pub unavailable: String,
  /// Answer when a handler misbehaves
  pub error: String,
}

impl Default for MessagesConfig {
  fn default() -> Self {
    Self {
      loading: "Loading data. Please try again shortly.".to_string(),
      unknown_command: "Unknown command. Query help.cli for the list of commands.".to_string(),
      unavailable: "Data temporarily unavailable. Please try again later.".to_string(),
      error: "Internal error. Please try again later.".to_string(),
    }
  }
}

/// When a resource's cache gets refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshPolicy {
  /// Queries trigger refreshes; expired values are served while one
  /// background refresh runs
  OnDemand,
  /// Queries on an expired value wait for a fresh fetch
  Blocking,
  /// A background timer refreshes the value; queries only read
  Scheduled,
}

impl std::fmt::Display for RefreshPolicy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      RefreshPolicy::OnDemand => "on-demand",
      RefreshPolicy::Blocking => "blocking",
      RefreshPolicy::Scheduled => "scheduled",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceOverrides {
  pub enabled: Option<bool>,
  pub ttl_secs: Option<u64>,
  pub policy: Option<RefreshPolicy>,
  /// Timer period for scheduled resources (defaults to the ttl)
  pub interval_secs: Option<u64>,
}

/// Effective settings of one resource after applying overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSettings {
  pub enabled: bool,
  pub ttl: Duration,
  pub policy: RefreshPolicy,
  pub interval: Duration,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Also write logs to this file
  pub file: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./sol-dns.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/sol-dns/config.yaml
  ///
  /// Falls back to built-in defaults when no file is found. Nothing is
  /// logged here since logging is configured from the result; call
  /// `log_source` once the subscriber is installed.
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
      Some(p) => {
        let mut config = Self::load_from_path(&p)?;
        config.source = Some(p);
        Ok(config)
      }
      None => Ok(Self::default()),
    }
  }

  /// Report where the configuration came from.
  pub fn log_source(&self) {
    match &self.source {
      Some(path) => info!(path = %path.display(), "Loaded configuration"),
      None => warn!("No configuration file found, using built-in defaults"),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("sol-dns.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("sol-dns").join("config.yaml");
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
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.server.max_record_len == 0 || self.server.max_record_len > 255 {
      return Err(eyre!(
        "server.max_record_len must be between 1 and 255, got {}",
        self.server.max_record_len
      ));
    }
    for (kind, overrides) in &self.resources {
      if overrides.ttl_secs == Some(0) {
        return Err(eyre!("resources.{}.ttl_secs must be positive", kind));
      }
      if overrides.interval_secs == Some(0) {
        return Err(eyre!("resources.{}.interval_secs must be positive", kind));
      }
    }
    Ok(())
  }

  /// Effective settings for a resource: its defaults with any configured
  /// overrides applied.
  pub fn resource(&self, kind: ResourceKind) -> ResourceSettings {
    let overrides = self.resources.get(&kind).cloned().unwrap_or_default();
    let ttl = overrides
      .ttl_secs
      .map(Duration::from_secs)
      .unwrap_or_else(|| kind.default_ttl());
    ResourceSettings {
      enabled: overrides.enabled.unwrap_or(true),
      ttl,
      policy: overrides.policy.unwrap_or_else(|| kind.default_policy()),
      interval: overrides.interval_secs.map(Duration::from_secs).unwrap_or(ttl),
    }
  }

  /// Get the upstream API key from environment variables.
  ///
  /// Checks SOL_DNS_API_KEY. Resources behind authenticated endpoints fail
  /// their fetches without it.
  pub fn get_api_key() -> Option<String> {
    std::env::var("SOL_DNS_API_KEY")
      .ok()
      .filter(|key| !key.trim().is_empty())
  }
}
