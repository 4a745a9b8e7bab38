use chrono::{DateTime, Utc};
use color_eyre::Result;
use std::future::Future;
use std::time::Duration;
use url::Url;

use super::api_types::ApiPricePoint;
use super::format::format_large_number;
use super::http::{endpoint, Auth, HttpClient};
use crate::cache::Source;
use crate::config::EndpointsConfig;

const CHART_WIDTH: usize = 50;
const CHART_HEIGHT: usize = 10;
const DAY_MS: i64 = 86_400_000;
const HOUR_MS: f64 = 3_600_000.0;

/// SOL market chart from solanabeach.
pub struct PriceChartSource {
  client: HttpClient,
  url: Url,
}

impl PriceChartSource {
  pub fn new(client: HttpClient, endpoints: &EndpointsConfig) -> Result<Self> {
    Ok(Self {
      client,
      url: endpoint(&endpoints.solanabeach, "v1/market-chart-data")?,
    })
  }
}

impl Source for PriceChartSource {
  type Data = Vec<ApiPricePoint>;

  fn fetch(&self) -> impl Future<Output = Result<Vec<ApiPricePoint>>> + Send {
    self.client.get_json(&self.url, Auth::Bearer)
  }

  fn render(&self, data: &Vec<ApiPricePoint>, _age: Duration) -> Vec<String> {
    render_price_chart(data)
  }
}

fn format_timestamp(ms: i64) -> String {
  DateTime::<Utc>::from_timestamp_millis(ms)
    .map(|t| t.format("%m/%d %H:%M").to_string())
    .unwrap_or_else(|| "--/-- --:--".to_string())
}

pub fn render_price_chart(points: &[ApiPricePoint]) -> Vec<String> {
  let Some(latest) = points.last() else {
    return vec!["No price data available".to_string()];
  };

  // Oldest point at least a day older than the latest, else the first one
  let reference = points
    .iter()
    .find(|p| p.timestamp <= latest.timestamp.saturating_sub(DAY_MS))
    .unwrap_or(&points[0]);
  let change = if reference.price != 0.0 {
    (latest.price - reference.price) / reference.price * 100.0
  } else {
    0.0
  };
  let (sign, arrow) = if change >= 0.0 { ("+", "^") } else { ("", "v") };

  let market_cap = match latest.market_cap {
    Some(cap) if cap > 0.0 => format!("${}", format_large_number(cap)),
    _ => "n/a".to_string(),
  };

  let mut lines = vec![
    format!(
      "SOL Price: ${:.2}({}{:.2}% {}) (as of {} UTC)",
      latest.price,
      sign,
      change,
      arrow,
      format_timestamp(latest.timestamp)
    ),
    format!("Market Cap - {}", market_cap),
    format!("24H Volume - ${}", format_large_number(latest.volume_24h)),
  ];
  if points.len() >= 2 {
    let span = latest.timestamp.saturating_sub(points[0].timestamp);
    let hours = (span as f64 / HOUR_MS).round() as i64;
    let plural = if hours == 1 { "" } else { "s" };
    lines.push(format!("Chart shows {} hour{} of price data", hours, plural));
  }
  lines.push(String::new());
  lines.extend(chart(points, CHART_WIDTH, CHART_HEIGHT));
  lines
}

/// `*` plot of sampled prices with a price axis on the left and
/// oldest/middle/latest timestamps below.
fn chart(points: &[ApiPricePoint], width: usize, height: usize) -> Vec<String> {
  let step = (points.len() / width).max(1);
  let sampled: Vec<&ApiPricePoint> = points.iter().step_by(step).take(width).collect();

  let min = sampled.iter().map(|p| p.price).fold(f64::MAX, f64::min);
  let max = sampled.iter().map(|p| p.price).fold(f64::MIN, f64::max);
  let range = max - min;

  let mut grid = vec![vec![' '; sampled.len()]; height];
  for (x, point) in sampled.iter().enumerate() {
    let normalized = if range == 0.0 { 0.0 } else { (point.price - min) / range };
    let y = ((height - 1) as f64 * (1.0 - normalized)).floor() as usize;
    grid[y.min(height - 1)][x] = '*';
  }

  let border = "-".repeat(width);
  let mut lines = vec![format!("${:.2} +{}+", max, border)];
  for (i, row) in grid.iter().enumerate() {
    let row: String = row.iter().collect();
    let axis = if i == height / 2 {
      format!("${:.2} ", min + range / 2.0)
    } else if i == height - 1 {
      format!("${:.2} ", min)
    } else {
      "        ".to_string()
    };
    lines.push(format!("{}|{:<width$}|", axis, row, width = width));
  }
  lines.push(format!("       +{}+", border));

  let third = width / 3;
  let first = sampled.first().map(|p| p.timestamp).unwrap_or_default();
  let middle = sampled[sampled.len() / 2].timestamp;
  let last = sampled.last().map(|p| p.timestamp).unwrap_or_default();
  lines.push(format!(
    "         {:<third$}{:<third$}{}",
    format_timestamp(first),
    format_timestamp(middle),
    format_timestamp(last),
    third = third
  ));
  lines.push(format!("      {}TIME{}", "=".repeat(width / 2), "=".repeat(width / 2)));
  lines
}

#[cfg(test)]
mod tests {
  use super::*;

  // 2024-05-15 00:00:00 UTC
  const T0: i64 = 1_715_731_200_000;

  fn point(hour: i64, price: f64) -> ApiPricePoint {
    ApiPricePoint {
      price,
      timestamp: T0 + hour * 3_600_000,
      volume_24h: 2_500_000_000.0,
      market_cap: Some(81_234_567_890.0),
    }
  }

  #[test]
  fn test_header_with_daily_change() {
    let points: Vec<_> = (0..=30).map(|h| point(h, 100.0 + h as f64)).collect();

    let lines = render_price_chart(&points);

    // Latest is hour 30 at 130; reference is hour 0 at 100
    assert_eq!(
      lines[0],
      "SOL Price: $130.00(+30.00% ^) (as of 05/16 06:00 UTC)"
    );
    assert_eq!(lines[1], "Market Cap - $81.2B");
    assert_eq!(lines[2], "24H Volume - $2.5B");
    assert_eq!(lines[3], "Chart shows 30 hours of price data");
    assert_eq!(lines[4], "");
  }

  #[test]
  fn test_falling_price_and_missing_market_cap() {
    let mut points = vec![point(0, 200.0), point(1, 150.0)];
    points[1].market_cap = None;

    let lines = render_price_chart(&points);

    assert!(lines[0].contains("(-25.00% v)"));
    assert_eq!(lines[1], "Market Cap - n/a");
    assert_eq!(lines[3], "Chart shows 1 hour of price data");
  }

  #[test]
  fn test_out_of_range_timestamps_render() {
    let mut oldest = point(0, 90.0);
    oldest.timestamp = i64::MIN;
    let mut latest = point(1, 100.0);
    latest.timestamp = i64::MAX;

    let lines = render_price_chart(&[oldest, latest]);

    assert_eq!(
      lines[0],
      "SOL Price: $100.00(+11.11% ^) (as of --/-- --:-- UTC)"
    );
    assert!(lines[3].starts_with("Chart shows "));
    assert_eq!(lines.len(), 5 + 1 + CHART_HEIGHT + 3);
  }

  #[test]
  fn test_chart_shape() {
    let points: Vec<_> = (0..50).map(|h| point(h, 100.0 + (h % 10) as f64)).collect();

    let lines = render_price_chart(&points);
    let chart = &lines[5..];

    // Top border, ten rows, bottom border, timestamps, time axis
    assert_eq!(chart.len(), 1 + CHART_HEIGHT + 3);
    assert!(chart[0].starts_with("$109.00 +"));
    assert!(chart[1 + CHART_HEIGHT / 2].starts_with("$104.50 |"));
    assert!(chart[CHART_HEIGHT].starts_with("$100.00 |"));
    for row in &chart[1..=CHART_HEIGHT] {
      assert_eq!(row.split('|').nth(1).unwrap().chars().count(), CHART_WIDTH);
    }
    assert!(chart.iter().any(|l| l.contains('*')));
    assert!(chart.last().unwrap().contains("TIME"));
  }

  #[test]
  fn test_flat_price() {
    let points = vec![point(0, 50.0), point(1, 50.0)];
    let lines = render_price_chart(&points);
    assert!(lines[0].contains("(+0.00% ^)"));
    // Flat prices sit on the bottom row
    assert!(lines[5 + CHART_HEIGHT].contains('*'));
    assert!(!lines[6].contains('*'));
  }

  #[test]
  fn test_no_points() {
    assert_eq!(render_price_chart(&[]), vec!["No price data available"]);
  }
}
