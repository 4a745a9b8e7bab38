use color_eyre::Result;
use std::future::Future;
use std::time::Duration;
use url::Url;

use super::api_types::ApiEpochInfo;
use super::format::{bar, format_hours_minutes};
use super::http::{endpoint, Auth, HttpClient};
use crate::cache::Source;
use crate::config::EndpointsConfig;

const BAR_WIDTH: usize = 40;

/// Current epoch progress from stakewiz.
///
/// Time-relative: elapsed time is advanced by the age of the cached value on
/// every read, so the countdown keeps moving between refreshes.
pub struct EpochSource {
  client: HttpClient,
  url: Url,
}

impl EpochSource {
  pub fn new(client: HttpClient, endpoints: &EndpointsConfig) -> Result<Self> {
    Ok(Self {
      client,
      url: endpoint(&endpoints.stakewiz, "epoch_info")?,
    })
  }
}

impl Source for EpochSource {
  type Data = ApiEpochInfo;

  fn fetch(&self) -> impl Future<Output = Result<ApiEpochInfo>> + Send {
    self.client.get_json(&self.url, Auth::None)
  }

  fn render(&self, data: &ApiEpochInfo, age: Duration) -> Vec<String> {
    render_epoch(data, age)
  }

  fn time_relative(&self) -> bool {
    true
  }
}

pub fn render_epoch(data: &ApiEpochInfo, age: Duration) -> Vec<String> {
  if data.duration_seconds <= 0.0 || !data.duration_seconds.is_finite() {
    return vec!["No epoch data available".to_string()];
  }

  let elapsed = (data.elapsed_seconds + age.as_secs_f64()).clamp(0.0, data.duration_seconds);
  let remaining = data.duration_seconds - elapsed;
  let percent = elapsed / data.duration_seconds * 100.0;

  vec![
    format!("EPOCH {}             TIME LEFT IN EPOCH", data.epoch),
    format!(
      "[{}] {:.1}%       {} left",
      bar(percent, BAR_WIDTH),
      percent,
      format_hours_minutes(remaining)
    ),
  ]
}
