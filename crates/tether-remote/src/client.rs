//! Async HTTP client wrapping the venue JSON API.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use tether_core::Failure;

use crate::{
  config::RemoteConfig,
  wire::{Envelope, ErrorEnvelope},
};

/// Async HTTP client for the venue API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based. Every
/// request carries the configured credentials and version date.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: RemoteConfig,
}

impl ApiClient {
  pub fn new(config: RemoteConfig) -> Result<Self, Failure> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| Failure::unclassified(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { client, config })
  }

  pub fn config(&self) -> &RemoteConfig { &self.config }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn credentials(&self) -> [(&'static str, &str); 3] {
    [
      ("client_id", self.config.client_id.as_str()),
      ("client_secret", self.config.client_secret.as_str()),
      ("v", self.config.api_version.as_str()),
    ]
  }

  /// `GET <base_url><path>?<query>` and unwrap the `response` object.
  pub async fn get<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T, Failure> {
    let resp = self
      .client
      .get(self.url(path))
      .query(&self.credentials())
      .query(query)
      .send()
      .await
      .map_err(|e| classify(path, e))?;

    let status = resp.status();
    let body = resp.bytes().await.map_err(|e| classify(path, e))?;
    debug!(path, %status, bytes = body.len(), "response received");

    if !status.is_success() {
      let failure = server_failure(status, &body);
      warn!(path, %status, %failure, "request rejected");
      return Err(failure);
    }

    let envelope: Envelope<T> = serde_json::from_slice(&body).map_err(|e| {
      Failure::unclassified(format!("GET {path}: malformed response: {e}"))
    })?;
    envelope.response.ok_or_else(|| {
      Failure::server(format!(
        "GET {path}: response missing (meta code {})",
        envelope.meta.code
      ))
    })
  }
}

/// Map a transport-level error onto the failure taxonomy.
fn classify(path: &str, err: reqwest::Error) -> Failure {
  let message = format!("GET {path}: {err}");
  if err.is_decode() || err.is_builder() {
    Failure::unclassified(message)
  } else if err.is_status() {
    Failure::server(message)
  } else {
    Failure::network(message)
  }
}

/// Describe a non-success response, preferring the service's own detail.
fn server_failure(status: StatusCode, body: &[u8]) -> Failure {
  let detail = serde_json::from_slice::<ErrorEnvelope>(body)
    .ok()
    .and_then(|e| e.meta.describe());
  match detail {
    Some(detail) => Failure::server(detail),
    None => Failure::server(format!("request failed with status {status}")),
  }
}
