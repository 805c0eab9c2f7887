//! Venue types — the records the explore feed and the detail cache hold.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;

// ─── Location ────────────────────────────────────────────────────────────────

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
  pub lat: f64,
  pub lng: f64,
}

impl Point {
  pub fn new(lat: f64, lng: f64) -> Self { Self { lat, lng } }
}

/// Formats as `lat,lng`, the form remote services take in query strings.
impl fmt::Display for Point {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{},{}", self.lat, self.lng)
  }
}

// ─── Venue ───────────────────────────────────────────────────────────────────

/// A venue as it appears in the paginated explore feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
  pub id:       String,
  pub name:     String,
  pub location: Point,
  pub address:  Option<String>,
  /// Primary category name, e.g. "Coffee Shop".
  pub category: Option<String>,
  /// Distance in metres from the location the page was fetched for.
  pub distance: Option<u32>,
}

impl Entity for Venue {
  fn key(&self) -> &str { &self.id }
}

// ─── Detail ──────────────────────────────────────────────────────────────────

/// The full record for a single venue, cached by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueDetail {
  pub id:          String,
  pub name:        String,
  pub location:    Point,
  pub address:     Option<String>,
  pub categories:  Vec<String>,
  /// Rating out of 10.
  pub rating:      Option<f32>,
  pub description: Option<String>,
  pub url:         Option<String>,
  pub phone:       Option<String>,
}

impl Entity for VenueDetail {
  fn key(&self) -> &str { &self.id }
}
