//! Pages, the reconciliation algorithm, and the collection view it mutates.
//!
//! A fetched [`PageOutcome`] is merged into the current view by [`reconcile`]:
//!
//! - `reliable` and the window `offset..offset + len` lies inside the view:
//!   overwrite that window in place, keeping the length.
//! - otherwise: append the items, treating `offset` as informational.
//!
//! Remote services may report a stale or overlapping offset when inserts
//! happen upstream between fetches; only a reliable page is trusted to land
//! on a known window.

use std::{
  ops::Range,
  sync::{Arc, PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};

// ─── Page ────────────────────────────────────────────────────────────────────

/// One page of a remote collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageOutcome<T> {
  pub items:    Vec<T>,
  /// Logical index of `items[0]` within the full collection.
  pub offset:   usize,
  /// Whether the window is certified free of upstream inserts/deletes since
  /// the previous fetch.
  pub reliable: bool,
}

impl<T> PageOutcome<T> {
  pub fn new(items: Vec<T>, offset: usize, reliable: bool) -> Self {
    Self { items, offset, reliable }
  }

  /// The window this page claims within the full collection.
  pub fn window(&self) -> Range<usize> {
    self.offset..self.offset.saturating_add(self.items.len())
  }
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

/// How a page was merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merge {
  /// The window was refreshed in place.
  Overwrite(Range<usize>),
  /// The items were appended at the end.
  Append,
}

/// Merge `page` into `view`, returning the new view.
pub fn reconcile<T: Clone>(view: &[T], page: &PageOutcome<T>) -> (Vec<T>, Merge) {
  let window = page.window();

  if page.reliable && view.len() >= window.end {
    let mut merged = view.to_vec();
    merged[window.clone()].clone_from_slice(&page.items);
    (merged, Merge::Overwrite(window))
  } else {
    let mut merged = Vec::with_capacity(view.len() + page.items.len());
    merged.extend_from_slice(view);
    merged.extend_from_slice(&page.items);
    (merged, Merge::Append)
  }
}

// ─── Collection view ─────────────────────────────────────────────────────────

/// The merged, consumer-visible collection for one list resource.
///
/// Readers only ever receive immutable snapshots; a merge swaps the whole
/// sequence under the write lock, so a snapshot is either fully pre-merge or
/// fully post-merge.
#[derive(Debug)]
pub struct CollectionView<T> {
  items: RwLock<Arc<[T]>>,
}

impl<T> Default for CollectionView<T> {
  fn default() -> Self {
    Self { items: RwLock::new(Arc::from(Vec::new())) }
  }
}

impl<T: Clone> CollectionView<T> {
  pub fn new() -> Self { Self::default() }

  pub fn snapshot(&self) -> Arc<[T]> {
    Arc::clone(&self.items.read().unwrap_or_else(PoisonError::into_inner))
  }

  pub fn len(&self) -> usize {
    self.items.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// Reconcile `page` into the view and return the post-merge snapshot.
  pub fn merge(&self, page: &PageOutcome<T>) -> (Arc<[T]>, Merge) {
    let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
    let (merged, how) = reconcile(&items, page);
    *items = Arc::from(merged);
    (Arc::clone(&items), how)
  }

  pub fn reset(&self) {
    *self.items.write().unwrap_or_else(PoisonError::into_inner) = Arc::from(Vec::new());
  }
}
