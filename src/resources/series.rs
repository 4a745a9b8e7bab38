use color_eyre::Result;
use std::future::Future;
use std::time::Duration;
use url::Url;

use super::api_types::ApiSeries;
use super::format::format_number;
use super::http::{endpoint, Auth, HttpClient};
use crate::cache::Source;
use crate::config::EndpointsConfig;

/// Number of most recent samples shown in the table.
const DISPLAY_LIMIT: usize = 10;

/// Labels for one solanacompass statistics series.
#[derive(Debug)]
pub struct SeriesStyle {
  /// Path below the solanacompass base URL
  pub path: &'static str,
  pub title: &'static str,
  /// Metric name in the summary lines
  pub metric: &'static str,
  /// Unit appended to summary values and table rows
  pub unit: &'static str,
  pub empty: &'static str,
}

pub const TPS_STYLE: SeriesStyle = SeriesStyle {
  path: "statistics/tps",
  title: "SOLANA NETWORK TRANSACTION PER SECOND(TPS) SUMMARY FOR LAST 1 HOUR",
  metric: "TPS",
  unit: "TPS",
  empty: "No TPS data available",
};

pub const BLOCKTIME_STYLE: SeriesStyle = SeriesStyle {
  path: "statistics/blockTime",
  title: "SOLANA NETWORK BLOCK TIME SUMMARY FOR LAST 1 HOUR",
  metric: "BLOCKTIME",
  unit: "ms",
  empty: "No Blocktime data available",
};

/// Hourly time series (TPS or block time) summarized as a table.
pub struct SeriesSource {
  client: HttpClient,
  url: Url,
  style: &'static SeriesStyle,
}

impl SeriesSource {
  pub fn new(
    client: HttpClient,
    endpoints: &EndpointsConfig,
    style: &'static SeriesStyle,
  ) -> Result<Self> {
    Ok(Self {
      client,
      url: endpoint(&endpoints.solanacompass, style.path)?,
      style,
    })
  }
}

impl Source for SeriesSource {
  type Data = Vec<ApiSeries>;

  fn fetch(&self) -> impl Future<Output = Result<Vec<ApiSeries>>> + Send {
    self.client.get_json(&self.url, Auth::None)
  }

  fn render(&self, data: &Vec<ApiSeries>, _age: Duration) -> Vec<String> {
    render_series(self.style, data)
  }
}

pub fn render_series(style: &SeriesStyle, data: &[ApiSeries]) -> Vec<String> {
  let samples = data.first().map(ApiSeries::samples).unwrap_or_default();
  let Some((_, current)) = samples.last() else {
    return vec![style.empty.to_string()];
  };

  let values: Vec<f64> = samples.iter().map(|(_, v)| *v).collect();
  let average = (values.iter().sum::<f64>() / values.len() as f64).round();
  let max = values.iter().copied().fold(f64::MIN, f64::max);
  let min = values.iter().copied().fold(f64::MAX, f64::min);

  let mut lines = vec![
    style.title.to_string(),
    "---------------------------------".to_string(),
    format!("CURRENT {}: {} {}", style.metric, format_number(*current), style.unit),
    format!("AVERAGE {}: {} {}", style.metric, format_number(average), style.unit),
    format!("MAXIMUM {}: {} {}", style.metric, format_number(max), style.unit),
    format!("MINIMUM {}: {} {}", style.metric, format_number(min), style.unit),
    "TIME AGO     | VALUE".to_string(),
    "-------------|----------".to_string(),
  ];

  let start = samples.len().saturating_sub(DISPLAY_LIMIT);
  lines.extend(samples[start..].iter().map(|(label, value)| {
    format!("{:<12} | {:>5} {}", label, format_number(*value), style.unit)
  }));
  lines
}
