//! Owner of every resource cache and of the query routing table.

use color_eyre::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::cache::{CacheSettings, Resource, ResourceCache, Source};
use crate::commands::{self, Target};
use crate::config::{Config, EndpointsConfig, MessagesConfig};
use crate::resources::{
  EpochSource, HttpClient, PriceChartSource, ResourceKind, SeriesSource, StakeSource, StakeView,
  SupplySource, ValidatorsSource, BLOCKTIME_STYLE, TPS_STYLE,
};

/// Where a query name leads.
pub enum Route {
  Resource(Arc<dyn Resource>),
  Help,
  Status,
  Unknown,
}

pub struct Registry {
  resources: BTreeMap<ResourceKind, Arc<dyn Resource>>,
  messages: MessagesConfig,
}

impl Registry {
  pub fn new(messages: MessagesConfig) -> Self {
    Self {
      resources: BTreeMap::new(),
      messages,
    }
  }

  /// One cache per enabled resource, created up front.
  pub fn from_config(config: &Config, client: HttpClient) -> Result<Self> {
    let mut registry = Self::new(config.messages.clone());
    for kind in ResourceKind::ALL {
      let settings = config.resource(kind);
      if !settings.enabled {
        info!(resource = %kind, "Resource disabled");
        continue;
      }
      let cache_settings = CacheSettings {
        ttl: settings.ttl,
        policy: settings.policy,
        interval: settings.interval,
        loading_message: config.messages.loading.clone(),
      };
      registry.insert(build(kind, client.clone(), &config.endpoints, cache_settings)?);
    }
    Ok(registry)
  }

  pub fn insert(&mut self, resource: Arc<dyn Resource>) {
    self.resources.insert(resource.kind(), resource);
  }

  pub fn get(&self, kind: ResourceKind) -> Option<&Arc<dyn Resource>> {
    self.resources.get(&kind)
  }

  pub fn resources(&self) -> impl Iterator<Item = &Arc<dyn Resource>> {
    self.resources.values()
  }

  pub fn messages(&self) -> &MessagesConfig {
    &self.messages
  }

  /// Exact-match routing. Commands whose resource is disabled are unknown.
  pub fn route(&self, name: &str) -> Route {
    match commands::lookup(name).map(|cmd| cmd.target) {
      Some(Target::Resource(kind)) => match self.get(kind) {
        Some(resource) => Route::Resource(Arc::clone(resource)),
        None => Route::Unknown,
      },
      Some(Target::Help) => Route::Help,
      Some(Target::Status) => Route::Status,
      None => Route::Unknown,
    }
  }

  pub fn help_lines(&self) -> Vec<String> {
    commands::help_lines(|cmd| match cmd.target {
      Target::Resource(kind) => self.resources.contains_key(&kind),
      Target::Help | Target::Status => true,
    })
  }

  pub fn status_lines(&self) -> Vec<String> {
    let mut lines = vec![format!(
      "{:<18} | {:<10} | {:<9} | {:>6} | {:>6} | {:<23} | FAILURES",
      "RESOURCE", "STATE", "POLICY", "TTL", "AGE", "LAST SUCCESS"
    )];
    lines.extend(self.resources().map(|resource| {
      let status = resource.status();
      let age = status
        .age
        .map(|age| format!("{}s", age.as_secs()))
        .unwrap_or_else(|| "-".to_string());
      let updated = status
        .last_success_at
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
      let mut line = format!(
        "{:<18} | {:<10} | {:<9} | {:>6} | {:>6} | {:<23} | {}",
        status.kind.as_str(),
        status.state.to_string(),
        status.policy.to_string(),
        format!("{}s", status.ttl.as_secs()),
        age,
        updated,
        status.consecutive_failures
      );
      if let Some(error) = status.last_error {
        line.push_str(&format!(" ({})", error));
      }
      line
    }));
    lines
  }
}

fn cached<S: Source>(kind: ResourceKind, source: S, settings: CacheSettings) -> Arc<dyn Resource> {
  Arc::new(ResourceCache::new(kind, source, settings))
}

fn build(
  kind: ResourceKind,
  client: HttpClient,
  endpoints: &EndpointsConfig,
  settings: CacheSettings,
) -> Result<Arc<dyn Resource>> {
  let resource = match kind {
    ResourceKind::Epoch => cached(kind, EpochSource::new(client, endpoints)?, settings),
    ResourceKind::Tps => cached(kind, SeriesSource::new(client, endpoints, &TPS_STYLE)?, settings),
    ResourceKind::Blocktime => cached(
      kind,
      SeriesSource::new(client, endpoints, &BLOCKTIME_STYLE)?,
      settings,
    ),
    ResourceKind::Validators => cached(kind, ValidatorsSource::new(client, endpoints)?, settings),
    ResourceKind::PriceChart => cached(kind, PriceChartSource::new(client, endpoints)?, settings),
    ResourceKind::Supply => cached(kind, SupplySource::new(client, endpoints)?, settings),
    ResourceKind::StakeStats => cached(
      kind,
      StakeSource::new(client, endpoints, StakeView::Full)?,
      settings,
    ),
    ResourceKind::StakeAverageSize => cached(
      kind,
      StakeSource::new(client, endpoints, StakeView::AverageSize)?,
      settings,
    ),
    ResourceKind::StakeGraph => cached(
      kind,
      StakeSource::new(client, endpoints, StakeView::Graph)?,
      settings,
    ),
  };
  Ok(resource)
}
