//! [`VenueDetailSource`] — full venue records by id.

use tracing::debug;

use tether_core::{Failure, remote::EntitySource, venue::VenueDetail};

use crate::{client::ApiClient, wire::DetailResponse};

/// `GET /venues/{id}` as an [`EntitySource`].
pub struct VenueDetailSource {
  client: ApiClient,
}

impl VenueDetailSource {
  pub fn new(client: ApiClient) -> Self { Self { client } }
}

impl EntitySource<VenueDetail> for VenueDetailSource {
  async fn fetch(&self, key: &str) -> Result<VenueDetail, Failure> {
    if key.is_empty() || key.contains(['/', '?', '#']) {
      return Err(Failure::unclassified(format!("invalid venue id {key:?}")));
    }
    let response: DetailResponse = self.client.get(&format!("/venues/{key}"), &[]).await?;
    debug!(key, "venue detail fetched");
    Ok(response.venue.into())
  }
}
