//! [`PaginationCoordinator`] — decides whether a page fetch may start and at
//! which offset.
//!
//! The coordinator is a plain state machine with no I/O. It is owned by the
//! presentation adapter's driver, which calls [`complete`] when a fetch
//! reaches a terminal state.
//!
//! ```text
//!   Idle ──(init / scroll, page ≤ max_page)──▶ Fetching
//!   Fetching ──(success / error)──▶ Idle
//! ```
//!
//! `reset` is accepted in either phase. It does not clear the in-flight flag:
//! an already-issued remote call still completes and is reconciled.
//!
//! [`complete`]: PaginationCoordinator::complete

use serde::{Deserialize, Serialize};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Page geometry for one list resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
  /// Items requested per page; page `n` starts at offset `n * page_size`.
  pub page_size: usize,
  /// Highest page index that may be fetched.
  pub max_page:  usize,
}

impl Default for PaginationConfig {
  fn default() -> Self { Self { page_size: 20, max_page: 4 } }
}

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Idle,
  Fetching,
}

/// A copy of the coordinator's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
  pub page:      usize,
  pub max_page:  usize,
  pub in_flight: bool,
}

impl PaginationState {
  /// `true` once the page counter has passed the cutoff.
  pub fn exhausted(&self) -> bool { self.page > self.max_page }
}

/// The decision made for a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
  /// A fetch for `page` was issued at `offset`.
  Started { page: usize, offset: usize },
  /// Another fetch is outstanding; nothing was issued.
  InFlight,
  /// The maximum-page cutoff was reached; nothing was issued.
  Exhausted,
  /// Initial load skipped because the view already holds data.
  AlreadyLoaded,
}

impl Dispatch {
  pub fn started(&self) -> bool { matches!(self, Self::Started { .. }) }
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PaginationCoordinator {
  config:    PaginationConfig,
  page:      usize,
  in_flight: bool,
}

impl PaginationCoordinator {
  pub fn new(config: PaginationConfig) -> Self {
    Self { config, page: 0, in_flight: false }
  }

  pub fn config(&self) -> PaginationConfig { self.config }

  pub fn state(&self) -> PaginationState {
    PaginationState {
      page:      self.page,
      max_page:  self.config.max_page,
      in_flight: self.in_flight,
    }
  }

  pub fn phase(&self) -> Phase {
    if self.in_flight { Phase::Fetching } else { Phase::Idle }
  }

  /// Start a fetch for the current page (initial load or post-refresh).
  pub fn begin(&mut self) -> Dispatch {
    if self.in_flight {
      return Dispatch::InFlight;
    }
    if self.page > self.config.max_page {
      return Dispatch::Exhausted;
    }
    self.in_flight = true;
    Dispatch::Started {
      page:   self.page,
      offset: self.page * self.config.page_size,
    }
  }

  /// Advance to the next page and start fetching it.
  ///
  /// A no-op while a fetch is outstanding or once the counter has passed
  /// `max_page`. Stepping past `max_page` sets the permanent cutoff without
  /// issuing a fetch.
  pub fn request_next_page(&mut self) -> Dispatch {
    if self.in_flight {
      return Dispatch::InFlight;
    }
    if self.page > self.config.max_page {
      return Dispatch::Exhausted;
    }
    self.page += 1;
    self.begin()
  }

  /// The outstanding fetch reached success or error.
  pub fn complete(&mut self) { self.in_flight = false; }

  /// Return to page 0. The in-flight flag is left as is.
  pub fn reset(&mut self) { self.page = 0; }
}
