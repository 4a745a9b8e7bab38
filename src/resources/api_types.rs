//! Serde-deserializable types matching the upstream API responses.
//!
//! Fields the renderers can live without are optional or defaulted, so a
//! partially malformed payload still renders with a fallback line instead of
//! failing the whole fetch.

use serde::Deserialize;
use serde_json::{Map, Value};

// ============================================================================
// stakewiz
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ApiEpochInfo {
  pub epoch: u64,
  #[serde(default)]
  pub duration_seconds: f64,
  #[serde(default)]
  pub elapsed_seconds: f64,
}

// ============================================================================
// solanacompass statistics (tps, blockTime)
// ============================================================================

/// One series of `label -> value` samples, oldest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSeries {
  #[serde(default)]
  pub data: Option<Map<String, Value>>,
}

impl ApiSeries {
  /// Numeric samples in upstream order; non-numeric values are skipped.
  pub fn samples(&self) -> Vec<(String, f64)> {
    self
      .data
      .iter()
      .flatten()
      .filter_map(|(label, value)| value.as_f64().map(|v| (label.clone(), v)))
      .collect()
  }
}

// ============================================================================
// solanacompass stats
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiStakeStats {
  pub stats: Option<ApiStakeSummary>,
  #[serde(rename = "epochCharts")]
  pub epoch_charts: Option<ApiEpochCharts>,
  pub stake_amounts: Option<Vec<ApiStakeAmount>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiStakeSummary {
  pub total: f64,
  pub num_active: u64,
  pub wallets: u64,
  pub max: f64,
  pub median: f64,
  pub mean: f64,
  #[serde(rename = "filterApy")]
  pub filter_apy: f64,
  pub updated: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiEpochCharts {
  pub balance: Option<ApiBalanceChart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiBalanceChart {
  #[serde(default)]
  pub data: Map<String, Value>,
}

impl ApiBalanceChart {
  /// `(epoch, balance)` pairs sorted by epoch.
  pub fn points(&self) -> Vec<(u64, f64)> {
    let mut points: Vec<(u64, f64)> = self
      .data
      .iter()
      .filter_map(|(epoch, value)| Some((epoch.parse().ok()?, value_as_f64(value)?)))
      .collect();
    points.sort_by_key(|(epoch, _)| *epoch);
    points
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiStakeAmount {
  pub from: u64,
  pub to: u64,
  pub sum: f64,
  pub num_stakes: u64,
  pub wallets: u64,
  pub unique_validators: u64,
}

// ============================================================================
// solanabeach
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiValidator {
  pub moniker: Option<String>,
  #[serde(default)]
  pub activated_stake: f64,
  #[serde(default)]
  pub commission: f64,
  #[serde(default)]
  pub delegator_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPricePoint {
  pub price: f64,
  /// Milliseconds since the Unix epoch
  pub timestamp: i64,
  #[serde(default)]
  pub volume_24h: f64,
  pub market_cap: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSupplyBreakdown {
  pub supply: ApiSupply,
  pub stake: ApiStake,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSupply {
  pub total: f64,
  pub circulating: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiStake {
  pub effective: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiStakingApy {
  pub apy: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiInflation {
  pub total: f64,
  pub epoch: u64,
}

/// Numbers sometimes arrive as strings.
fn value_as_f64(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_series_keeps_upstream_order() {
    let series: Vec<ApiSeries> = serde_json::from_value(json!([
      { "data": { "60 mins ago": 3000, "30 mins ago": "oops", "1 min ago": 4100.5 } }
    ]))
    .unwrap();

    let samples = series[0].samples();
    assert_eq!(
      samples,
      vec![
        ("60 mins ago".to_string(), 3000.0),
        ("1 min ago".to_string(), 4100.5)
      ]
    );
  }

  #[test]
  fn test_balance_points_sorted_numerically() {
    let chart: ApiBalanceChart = serde_json::from_value(json!({
      "data": { "100": 5.0, "9": "2.5", "x": 1.0, "55": 3 }
    }))
    .unwrap();

    assert_eq!(chart.points(), vec![(9, 2.5), (55, 3.0), (100, 5.0)]);
  }

  #[test]
  fn test_stake_stats_tolerates_missing_sections() {
    let stats: ApiStakeStats = serde_json::from_value(json!({ "stats": { "total": 10 } })).unwrap();
    assert!(stats.epoch_charts.is_none());
    assert!(stats.stake_amounts.is_none());
    assert_eq!(stats.stats.unwrap().total, 10.0);
  }

  #[test]
  fn test_validator_camel_case_fields() {
    let v: ApiValidator = serde_json::from_value(json!({
      "moniker": "Alpha",
      "activatedStake": 1.5e16,
      "commission": 7,
      "delegatorCount": 1234
    }))
    .unwrap();
    assert_eq!(v.moniker.as_deref(), Some("Alpha"));
    assert_eq!(v.delegator_count, 1234);
  }
}
