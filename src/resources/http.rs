use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::HttpConfig;

/// Whether a request carries the upstream API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
  None,
  Bearer,
}

/// Upstream HTTP client wrapper
#[derive(Clone)]
pub struct HttpClient {
  client: reqwest::Client,
  api_key: Option<String>,
}

impl HttpClient {
  pub fn new(config: &HttpConfig, api_key: Option<String>) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(config.timeout())
      .user_agent(config.user_agent.clone())
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, api_key })
  }

  /// GET `url` and decode the JSON body. One attempt, no retries.
  pub async fn get_json<T: DeserializeOwned>(&self, url: &Url, auth: Auth) -> Result<T> {
    let mut request = self.client.get(url.clone());
    if auth == Auth::Bearer {
      if let Some(key) = &self.api_key {
        request = request.bearer_auth(key);
      }
    }

    debug!(%url, "GET");
    let response = request
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", url, e))?;

    let status = response.status();
    if !status.is_success() {
      return Err(eyre!("{} returned {}", url, status));
    }

    response
      .json::<T>()
      .await
      .map_err(|e| eyre!("Failed to parse response from {}: {}", url, e))
  }
}

/// Resolve an endpoint path against a provider base URL.
pub fn endpoint(base: &Url, path: &str) -> Result<Url> {
  base
    .join(path)
    .map_err(|e| eyre!("Invalid endpoint {} on {}: {}", path, base, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_endpoint_join() {
    let base = Url::parse("https://api.solanabeach.io/").unwrap();
    let url = endpoint(&base, "v1/validators/top").unwrap();
    assert_eq!(url.as_str(), "https://api.solanabeach.io/v1/validators/top");
  }

  #[test]
  fn test_endpoint_keeps_base_path() {
    let base = Url::parse("http://localhost:8080/mock/").unwrap();
    let url = endpoint(&base, "stats").unwrap();
    assert_eq!(url.as_str(), "http://localhost:8080/mock/stats");
  }

  #[tokio::test]
  async fn test_unreachable_upstream_is_an_error() {
    let config = HttpConfig {
      timeout_secs: 1,
      ..HttpConfig::default()
    };
    let client = HttpClient::new(&config, None).unwrap();
    // Port 9 (discard) on localhost is not expected to speak HTTP
    let url = Url::parse("http://127.0.0.1:9/epoch_info").unwrap();
    let result: Result<serde_json::Value> = client.get_json(&url, Auth::None).await;
    assert!(result.is_err());
  }
}
