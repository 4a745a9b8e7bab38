use color_eyre::Result;
use std::future::Future;
use std::time::Duration;
use url::Url;

use super::api_types::ApiValidator;
use super::format::{format_stake, group_thousands};
use super::http::{endpoint, Auth, HttpClient};
use crate::cache::Source;
use crate::config::EndpointsConfig;

const TOP_N: usize = 10;

/// Top validators by activated stake from solanabeach.
pub struct ValidatorsSource {
  client: HttpClient,
  url: Url,
}

impl ValidatorsSource {
  pub fn new(client: HttpClient, endpoints: &EndpointsConfig) -> Result<Self> {
    Ok(Self {
      client,
      url: endpoint(&endpoints.solanabeach, "v1/validators/top")?,
    })
  }
}

impl Source for ValidatorsSource {
  type Data = Vec<ApiValidator>;

  fn fetch(&self) -> impl Future<Output = Result<Vec<ApiValidator>>> + Send {
    self.client.get_json(&self.url, Auth::Bearer)
  }

  fn render(&self, data: &Vec<ApiValidator>, _age: Duration) -> Vec<String> {
    render_validators(data)
  }
}

pub fn render_validators(validators: &[ApiValidator]) -> Vec<String> {
  if validators.is_empty() {
    return vec!["No validator data available".to_string()];
  }

  let mut lines = vec![
    "TOP 10 SOLANA VALIDATORS".to_string(),
    "------------------------".to_string(),
  ];
  lines.extend(validators.iter().take(TOP_N).enumerate().map(|(i, v)| {
    format!(
      "{}. {} - {} - {}% commission - {} delegators",
      i + 1,
      v.moniker.as_deref().filter(|m| !m.is_empty()).unwrap_or("Unknown"),
      format_stake(v.activated_stake),
      v.commission,
      group_thousands(v.delegator_count)
    )
  }));
  lines
}
