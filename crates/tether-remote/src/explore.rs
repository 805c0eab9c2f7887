//! [`ExploreSource`] — the paginated venue feed around a location.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use tether_core::{
  Failure,
  page::PageOutcome,
  remote::PageSource,
  venue::{Point, Venue},
};

use crate::{client::ApiClient, wire::ExploreResponse};

struct Cursor {
  location:   Point,
  /// `totalResults` of the last page fetched for `location`.
  last_total: Option<u64>,
}

/// `GET /venues/explore` as a [`PageSource`].
///
/// A page is reported `reliable` only when the previous fetch was for the
/// same location and the service reported the same `totalResults` both
/// times. The first fetch after [`set_location`](Self::set_location) is
/// never reliable.
pub struct ExploreSource {
  client: ApiClient,
  limit:  usize,
  cursor: Mutex<Cursor>,
}

impl ExploreSource {
  /// `limit` is sent with every request and should match the feed's page
  /// size.
  pub fn new(client: ApiClient, location: Point, limit: usize) -> Self {
    Self {
      client,
      limit,
      cursor: Mutex::new(Cursor { location, last_total: None }),
    }
  }

  fn cursor(&self) -> MutexGuard<'_, Cursor> {
    self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn location(&self) -> Point { self.cursor().location }

  /// Point subsequent fetches at `location`.
  pub fn set_location(&self, location: Point) {
    let mut cursor = self.cursor();
    if cursor.location != location {
      debug!(%location, "explore location changed");
      cursor.location = location;
      cursor.last_total = None;
    }
  }

  /// Record `total` for `location` and report whether it matches the last.
  fn settle(&self, location: Point, total: Option<u64>) -> bool {
    let mut cursor = self.cursor();
    // The location moved while the request was out; the page belongs to
    // neither window.
    if cursor.location != location {
      return false;
    }
    let reliable = total.is_some() && cursor.last_total == total;
    cursor.last_total = total;
    reliable
  }
}

impl PageSource<Venue> for ExploreSource {
  async fn fetch_page(&self, offset: usize) -> Result<PageOutcome<Venue>, Failure> {
    let location = self.location();

    let mut query = vec![
      ("ll", location.to_string()),
      ("offset", offset.to_string()),
      ("limit", self.limit.to_string()),
    ];
    if let Some(radius) = self.client.config().radius {
      query.push(("radius", radius.to_string()));
    }

    let response: ExploreResponse = self.client.get("/venues/explore", &query).await?;
    let total = response.total_results;
    let reliable = self.settle(location, total);
    let venues = response.into_venues();

    debug!(offset, count = venues.len(), ?total, reliable, "explore page fetched");
    Ok(PageOutcome::new(venues, offset, reliable))
  }
}
