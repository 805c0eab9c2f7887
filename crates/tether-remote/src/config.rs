//! Connection settings for the remote venue API.

use std::fmt;

use serde::Deserialize;

/// Deserialised from the `[remote]` table of the CLI configuration.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
  pub base_url:      String,
  pub client_id:     String,
  pub client_secret: String,
  /// API version date sent as `v`, e.g. `20200601`.
  pub api_version:   String,
  pub timeout_secs:  u64,
  /// Search radius in metres; the service picks one when unset.
  pub radius:        Option<u32>,
}

impl Default for RemoteConfig {
  fn default() -> Self {
    Self {
      base_url:      "https://api.foursquare.com/v2".into(),
      client_id:     String::new(),
      client_secret: String::new(),
      api_version:   "20200601".into(),
      timeout_secs:  30,
      radius:        None,
    }
  }
}

impl fmt::Debug for RemoteConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RemoteConfig")
      .field("base_url", &self.base_url)
      .field("client_id", &self.client_id)
      .field("client_secret", &"<redacted>")
      .field("api_version", &self.api_version)
      .field("timeout_secs", &self.timeout_secs)
      .field("radius", &self.radius)
      .finish()
  }
}
