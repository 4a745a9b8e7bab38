use color_eyre::Result;
use std::future::Future;
use std::time::Duration;
use url::Url;

use super::api_types::{ApiInflation, ApiStakingApy, ApiSupplyBreakdown};
use super::format::{bar, LAMPORTS_PER_SOL};
use super::http::{endpoint, Auth, HttpClient};
use crate::cache::Source;
use crate::config::EndpointsConfig;

const BAR_WIDTH: usize = 40;
const SEPARATOR: &str = "---------------------";

/// The three solanabeach documents behind `solana-supply.cli`.
#[derive(Debug, Clone)]
pub struct SupplySnapshot {
  pub breakdown: ApiSupplyBreakdown,
  pub apy: ApiStakingApy,
  pub inflation: ApiInflation,
}

pub struct SupplySource {
  client: HttpClient,
  breakdown_url: Url,
  apy_url: Url,
  inflation_url: Url,
}

impl SupplySource {
  pub fn new(client: HttpClient, endpoints: &EndpointsConfig) -> Result<Self> {
    let base = &endpoints.solanabeach;
    Ok(Self {
      client,
      breakdown_url: endpoint(base, "v2/supply-breakdown")?,
      apy_url: endpoint(base, "v1/staking-apy")?,
      inflation_url: endpoint(base, "v1/inflation")?,
    })
  }
}

impl Source for SupplySource {
  type Data = SupplySnapshot;

  /// All three requests run concurrently; any failure fails the refresh.
  fn fetch(&self) -> impl Future<Output = Result<SupplySnapshot>> + Send {
    async move {
      let (breakdown, apy, inflation) = futures::try_join!(
        self.client.get_json(&self.breakdown_url, Auth::Bearer),
        self.client.get_json(&self.apy_url, Auth::Bearer),
        self.client.get_json(&self.inflation_url, Auth::Bearer),
      )?;
      Ok(SupplySnapshot {
        breakdown,
        apy,
        inflation,
      })
    }
  }

  fn render(&self, data: &SupplySnapshot, _age: Duration) -> Vec<String> {
    render_supply(data)
  }
}

fn millions(lamports: f64) -> String {
  format!("{:.1}", lamports / LAMPORTS_PER_SOL / 1e6)
}

fn share(part: f64, total: f64) -> f64 {
  if total > 0.0 {
    part / total * 100.0
  } else {
    0.0
  }
}

pub fn render_supply(data: &SupplySnapshot) -> Vec<String> {
  let supply = &data.breakdown.supply;
  let stake = &data.breakdown.stake;
  let circulating_pct = share(supply.circulating, supply.total);
  let stake_pct = share(stake.effective, supply.total);

  vec![
    "SOLANA SUPPLY & STAKE DATA".to_string(),
    SEPARATOR.to_string(),
    format!(
      "Circulating SOL Supply: {}M SOL  - [{}] {:.1}%",
      millions(supply.circulating),
      bar(circulating_pct, BAR_WIDTH),
      circulating_pct
    ),
    format!(
      "Active Staked SOL: {}M SOL       - [{}] {:.1}%",
      millions(stake.effective),
      bar(stake_pct, BAR_WIDTH),
      stake_pct
    ),
    format!("Total SOL Supply: {}M SOL", millions(supply.total)),
    SEPARATOR.to_string(),
    format!("Current Epoch: {}", data.inflation.epoch),
    format!("Staking APY: {:.2}%", data.apy.apy),
    format!("Inflation Rate: {:.2}%", data.inflation.total * 100.0),
    SEPARATOR.to_string(),
  ]
}
