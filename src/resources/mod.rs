//! Solana network resources: upstream fetchers and text renderers.

pub mod api_types;
mod epoch;
mod format;
mod http;
mod price;
mod series;
mod stake;
mod supply;
mod validators;

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::config::RefreshPolicy;

pub use epoch::EpochSource;
pub use http::{Auth, HttpClient};
pub use price::PriceChartSource;
pub use series::{SeriesSource, SeriesStyle, BLOCKTIME_STYLE, TPS_STYLE};
pub use stake::{StakeSource, StakeView};
pub use supply::SupplySource;
pub use validators::ValidatorsSource;

/// Every independently cached resource the server knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
  Epoch,
  Tps,
  Blocktime,
  Validators,
  PriceChart,
  Supply,
  StakeStats,
  StakeAverageSize,
  StakeGraph,
}

impl ResourceKind {
  pub const ALL: [ResourceKind; 9] = [
    ResourceKind::Epoch,
    ResourceKind::Tps,
    ResourceKind::Blocktime,
    ResourceKind::Validators,
    ResourceKind::PriceChart,
    ResourceKind::Supply,
    ResourceKind::StakeStats,
    ResourceKind::StakeAverageSize,
    ResourceKind::StakeGraph,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ResourceKind::Epoch => "epoch",
      ResourceKind::Tps => "tps",
      ResourceKind::Blocktime => "blocktime",
      ResourceKind::Validators => "validators",
      ResourceKind::PriceChart => "price-chart",
      ResourceKind::Supply => "supply",
      ResourceKind::StakeStats => "stake-stats",
      ResourceKind::StakeAverageSize => "stake-average-size",
      ResourceKind::StakeGraph => "stake-graph",
    }
  }

  pub fn default_ttl(&self) -> Duration {
    let minutes = match self {
      ResourceKind::Epoch => 10,
      ResourceKind::Tps => 2,
      ResourceKind::Blocktime => 2,
      ResourceKind::Validators => 10,
      ResourceKind::PriceChart => 5,
      ResourceKind::Supply => 20,
      ResourceKind::StakeStats => 5,
      ResourceKind::StakeAverageSize => 20,
      ResourceKind::StakeGraph => 20,
    };
    Duration::from_secs(minutes * 60)
  }

  pub fn default_policy(&self) -> RefreshPolicy {
    match self {
      ResourceKind::StakeAverageSize | ResourceKind::StakeGraph => RefreshPolicy::Scheduled,
      _ => RefreshPolicy::OnDemand,
    }
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_serde_names_match_display() {
    for kind in ResourceKind::ALL {
      let parsed: ResourceKind = serde_yaml::from_str(kind.as_str()).unwrap();
      assert_eq!(parsed, kind);
    }
  }

  #[test]
  fn test_ttls_within_observed_range() {
    for kind in ResourceKind::ALL {
      let ttl = kind.default_ttl();
      assert!(ttl >= Duration::from_secs(30) && ttl <= Duration::from_secs(20 * 60));
    }
  }
}
