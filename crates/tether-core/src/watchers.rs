//! Per-key change notification shared by store backends.

use std::{
  collections::HashMap,
  sync::{Mutex, PoisonError},
};

use tokio::sync::watch;

/// A registry of `watch` channels, one per observed key.
///
/// Backends must call [`subscribe`] and [`publish`] in the same critical
/// section as the read or write they pair with, so a subscriber can never be
/// seeded with a value older than the last published one.
///
/// [`subscribe`]: Watchers::subscribe
/// [`publish`]: Watchers::publish
pub struct Watchers<T> {
  senders: Mutex<HashMap<String, watch::Sender<Option<T>>>>,
}

impl<T> Default for Watchers<T> {
  fn default() -> Self { Self { senders: Mutex::new(HashMap::new()) } }
}

impl<T> Watchers<T> {
  pub fn new() -> Self { Self::default() }

  /// Subscribe to `key`. A new channel starts at `current`; an existing one
  /// already holds the latest published value.
  pub fn subscribe(&self, key: &str, current: Option<T>) -> watch::Receiver<Option<T>> {
    let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
    senders.retain(|_, tx| tx.receiver_count() > 0);

    match senders.get(key) {
      Some(tx) => tx.subscribe(),
      None => {
        let (tx, rx) = watch::channel(current);
        senders.insert(key.to_owned(), tx);
        rx
      }
    }
  }

  /// Push a new value (or `None` for a deletion) to subscribers of `key`.
  pub fn publish(&self, key: &str, value: Option<T>) {
    let senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(tx) = senders.get(key) {
      tx.send_replace(value);
    }
  }

  /// Push `None` to every subscriber.
  pub fn publish_cleared(&self) {
    let senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
    for tx in senders.values() {
      tx.send_replace(None);
    }
  }

  /// Number of keys with at least one live subscriber.
  pub fn observed(&self) -> usize {
    let senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
    senders.values().filter(|tx| tx.receiver_count() > 0).count()
  }
}
