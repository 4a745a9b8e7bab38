use color_eyre::Result;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use url::Url;

use super::api_types::{ApiStakeAmount, ApiStakeStats};
use super::format::{format_dollars, format_lamports, group_thousands, lamports_to_usd};
use super::http::{endpoint, Auth, HttpClient};
use crate::cache::Source;
use crate::config::EndpointsConfig;

const CHART_EPOCHS: usize = 12;
const CHART_BAR_WIDTH: usize = 50;
const RULE: &str = "---------------------------------";
const TABLE_HEADER: &str = "SOL RANGE         | TOTAL STAKED      | NUM STAKES | WALLETS   | VALIDATORS";
const TABLE_RULE: &str = "------------------|-------------------|------------|-----------|----------";

/// Which part of the solanacompass stats document a resource shows.
///
/// All three views are fed by the same endpoint; each resource keeps its own
/// slot and TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeView {
  /// Overview, epoch balance chart and size table
  Full,
  /// Size table with the mid ranges merged
  AverageSize,
  /// Epoch balance chart only
  Graph,
}

pub struct StakeSource {
  client: HttpClient,
  url: Url,
  view: StakeView,
}

impl StakeSource {
  pub fn new(client: HttpClient, endpoints: &EndpointsConfig, view: StakeView) -> Result<Self> {
    Ok(Self {
      client,
      url: endpoint(&endpoints.solanacompass, "stats")?,
      view,
    })
  }
}

impl Source for StakeSource {
  type Data = ApiStakeStats;

  fn fetch(&self) -> impl Future<Output = Result<ApiStakeStats>> + Send {
    self.client.get_json(&self.url, Auth::Bearer)
  }

  fn render(&self, data: &ApiStakeStats, _age: Duration) -> Vec<String> {
    render_stake(self.view, data)
  }
}

pub fn render_stake(view: StakeView, data: &ApiStakeStats) -> Vec<String> {
  match view {
    StakeView::Full => {
      let mut lines = render_overview(data);
      lines.push(String::new());
      lines.extend(render_balance_chart(data));
      lines.push(String::new());
      lines.extend(render_size_table(data, "AVERAGE STAKE SIZES", false));
      lines
    }
    StakeView::AverageSize => render_size_table(data, "AVERAGE SOL STAKED SIZES", true),
    StakeView::Graph => render_balance_chart(data),
  }
}

fn with_usd(lamports: f64) -> String {
  format!(
    "{} SOL (${})",
    format_lamports(lamports),
    format_dollars(lamports_to_usd(lamports))
  )
}

fn render_overview(data: &ApiStakeStats) -> Vec<String> {
  let Some(stats) = &data.stats else {
    return vec!["No stake data available".to_string()];
  };

  vec![
    "SOLANA NETWORK STAKING STATISTICS".to_string(),
    RULE.to_string(),
    format!("TOTAL STAKED: {}", with_usd(stats.total)),
    format!("ACTIVE STAKERS: {}", group_thousands(stats.num_active)),
    format!("UNIQUE WALLETS: {}", group_thousands(stats.wallets)),
    format!("BIGGEST STAKE: {}", with_usd(stats.max)),
    format!("MEDIAN STAKE: {}", with_usd(stats.median)),
    format!("MEAN STAKE: {}", with_usd(stats.mean)),
    format!("FILTER APY: {:.2}%", stats.filter_apy * 100.0),
    format!("UPDATED: {}", stats.updated),
  ]
}

/// Indices of at most `count` evenly spaced points, always ending with the
/// last one.
fn sample_indices(len: usize, count: usize) -> Vec<usize> {
  let step = (len / count).max(1);
  let mut indices: Vec<usize> = (0..len).step_by(step).take(count).collect();
  if len > 0 && indices.last() != Some(&(len - 1)) {
    indices.push(len - 1);
  }
  indices
}

fn render_balance_chart(data: &ApiStakeStats) -> Vec<String> {
  let points = data
    .epoch_charts
    .as_ref()
    .and_then(|charts| charts.balance.as_ref())
    .map(|balance| balance.points())
    .unwrap_or_default();
  if points.is_empty() {
    return vec!["No epoch balance data available".to_string()];
  }

  let min = points.iter().map(|(_, v)| *v).fold(f64::MAX, f64::min);
  let max = points.iter().map(|(_, v)| *v).fold(f64::MIN, f64::max);
  let range = if max > min { max - min } else { 1.0 };

  let mut lines = vec![
    "SOLANA STAKE GROWTH OVER TIME (EPOCHS VS BALANCE)".to_string(),
    RULE.to_string(),
  ];
  for i in sample_indices(points.len(), CHART_EPOCHS) {
    let (epoch, value) = points[i];
    let width = (((value - min) / range * CHART_BAR_WIDTH as f64).floor() as usize).max(1);
    lines.push(format!(
      "Epoch {:>2} - {:.2}M SOL: {}",
      epoch,
      value / 1e6,
      "-".repeat(width)
    ));
  }
  lines.push(String::new());
  lines.push(format!(
    " Stake SOL Range: MIN {:.2}M SOL - MAX {:.2}M SOL",
    min / 1e6,
    max / 1e6
  ));
  lines
}

/// Merge the 100-1000 and 1000-10000 SOL buckets; validator counts take the
/// maximum since the same validator can appear in several buckets.
fn merge_mid_ranges(amounts: &[ApiStakeAmount]) -> Vec<ApiStakeAmount> {
  let mut merged: BTreeMap<(u64, u64), ApiStakeAmount> = BTreeMap::new();
  for amount in amounts {
    let key = match amount.from {
      100..=999 => (100, 1000),
      1000..=9999 => (1000, 10000),
      from => (from, amount.to),
    };
    let entry = merged.entry(key).or_insert_with(|| ApiStakeAmount {
      from: key.0,
      to: key.1,
      ..ApiStakeAmount::default()
    });
    entry.sum += amount.sum;
    entry.num_stakes += amount.num_stakes;
    entry.wallets += amount.wallets;
    entry.unique_validators = entry.unique_validators.max(amount.unique_validators);
  }
  merged.into_values().collect()
}

fn render_size_table(data: &ApiStakeStats, title: &str, merge: bool) -> Vec<String> {
  let Some(amounts) = &data.stake_amounts else {
    return vec!["No stake amount data available".to_string()];
  };
  let rows = if merge {
    merge_mid_ranges(amounts)
  } else {
    amounts.clone()
  };
  let total = data.stats.as_ref().map(|s| s.total).unwrap_or_default();

  let mut lines = vec![
    title.to_string(),
    RULE.to_string(),
    TABLE_HEADER.to_string(),
    TABLE_RULE.to_string(),
  ];
  lines.extend(rows.iter().map(|row| {
    let pct = if total > 0.0 { row.sum / total * 100.0 } else { 0.0 };
    format!(
      "{:>6} - {:<8} | {:<17} | {:>10} | {:>9} | {:>10}",
      row.from,
      row.to,
      format!("{} ({:.2}%)", format_lamports(row.sum), pct),
      group_thousands(row.num_stakes),
      group_thousands(row.wallets),
      group_thousands(row.unique_validators)
    )
  }));
  lines
}
