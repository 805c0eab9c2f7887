//! JSON shapes of the venue API.
//!
//! Every payload is wrapped as `{"meta": {...}, "response": {...}}`. Only the
//! fields the sync layer keeps are modelled; everything else is ignored.

use serde::Deserialize;

use tether_core::venue::{Point, Venue, VenueDetail};

// ─── Envelope ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  pub meta:     Meta,
  pub response: Option<T>,
}

/// Error bodies often carry `"response": {}`, which doesn't fit the success
/// shape, so faults are decoded through this instead.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
  pub meta: Meta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
  pub code:         u16,
  pub error_type:   Option<String>,
  pub error_detail: Option<String>,
}

impl Meta {
  /// The most specific description the service gave.
  pub fn describe(&self) -> Option<String> {
    match (&self.error_type, &self.error_detail) {
      (Some(kind), Some(detail)) => Some(format!("{kind}: {detail}")),
      (None, Some(detail)) => Some(detail.clone()),
      (Some(kind), None) => Some(kind.clone()),
      (None, None) => None,
    }
  }
}

// ─── Explore ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreResponse {
  pub total_results: Option<u64>,
  #[serde(default)]
  pub groups:        Vec<Group>,
}

impl ExploreResponse {
  pub fn into_venues(self) -> Vec<Venue> {
    self
      .groups
      .into_iter()
      .flat_map(|g| g.items)
      .map(|item| item.venue.into())
      .collect()
  }
}

#[derive(Debug, Deserialize)]
pub struct Group {
  #[serde(default)]
  pub items: Vec<GroupItem>,
}

#[derive(Debug, Deserialize)]
pub struct GroupItem {
  pub venue: WireVenue,
}

#[derive(Debug, Deserialize)]
pub struct WireVenue {
  pub id:         String,
  pub name:       String,
  pub location:   WireLocation,
  #[serde(default)]
  pub categories: Vec<WireCategory>,
}

#[derive(Debug, Deserialize)]
pub struct WireLocation {
  pub lat:      f64,
  pub lng:      f64,
  pub address:  Option<String>,
  pub distance: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct WireCategory {
  pub name:    String,
  #[serde(default)]
  pub primary: bool,
}

/// The category flagged primary, else the first listed.
fn primary_category(categories: &[WireCategory]) -> Option<String> {
  categories
    .iter()
    .find(|c| c.primary)
    .or_else(|| categories.first())
    .map(|c| c.name.clone())
}

impl From<WireVenue> for Venue {
  fn from(w: WireVenue) -> Self {
    Venue {
      category: primary_category(&w.categories),
      id:       w.id,
      name:     w.name,
      location: Point::new(w.location.lat, w.location.lng),
      address:  w.location.address,
      distance: w.location.distance,
    }
  }
}

// ─── Detail ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DetailResponse {
  pub venue: WireVenueDetail,
}

#[derive(Debug, Deserialize)]
pub struct WireVenueDetail {
  pub id:          String,
  pub name:        String,
  pub location:    WireLocation,
  #[serde(default)]
  pub categories:  Vec<WireCategory>,
  pub rating:      Option<f32>,
  pub description: Option<String>,
  pub url:         Option<String>,
  pub contact:     Option<WireContact>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireContact {
  pub phone:           Option<String>,
  pub formatted_phone: Option<String>,
}

impl From<WireVenueDetail> for VenueDetail {
  fn from(w: WireVenueDetail) -> Self {
    VenueDetail {
      id:          w.id,
      name:        w.name,
      location:    Point::new(w.location.lat, w.location.lng),
      address:     w.location.address,
      categories:  w.categories.into_iter().map(|c| c.name).collect(),
      rating:      w.rating,
      description: w.description,
      url:         w.url,
      phone:       w.contact.and_then(|c| c.formatted_phone.or(c.phone)),
    }
  }
}
