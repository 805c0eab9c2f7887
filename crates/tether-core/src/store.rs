//! The [`PersistentStore`] contract.
//!
//! Implemented by storage backends (e.g. `tether-store-sqlite`, or
//! [`MemoryStore`](crate::memory::MemoryStore)). The orchestrators in
//! [`ssot`](crate::ssot) and [`list`](crate::list) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use tokio::sync::watch;

use crate::entity::Entity;

/// Abstraction over a keyed cache for one resource.
///
/// A store instance owns exactly one resource's entries; [`clear`] never
/// touches another resource.
///
/// All methods return `Send` futures so stores can be driven from spawned
/// tasks on a multi-threaded runtime.
///
/// [`clear`]: PersistentStore::clear
pub trait PersistentStore<T: Entity>: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Read the entry for `key`, if any, without subscribing.
  fn read_instant<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<T>, Self::Error>> + Send + 'a;

  /// Read every entry in first-insertion order.
  fn read_all(
    &self,
  ) -> impl Future<Output = Result<Vec<T>, Self::Error>> + Send + '_;

  /// Subscribe to the entry for `key`.
  ///
  /// The receiver starts at the current value and observes every later
  /// write, and `None` on deletion. It stays live while the store does.
  fn observe<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<watch::Receiver<Option<T>>, Self::Error>> + Send + 'a;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Upsert a single entry, fully replacing any prior value for its key.
  fn write(
    &self,
    entity: T,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Upsert many entries as one unit.
  fn write_all(
    &self,
    entities: Vec<T>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove every entry of this resource.
  fn clear(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
