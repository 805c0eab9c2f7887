//! [`MemoryStore`] — a process-local [`PersistentStore`].
//!
//! Useful as a default cache for short-lived resources and in tests. A fault
//! can be injected with [`MemoryStore::fail_with`] to exercise store-fault
//! handling.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;

use crate::{entity::Entity, store::PersistentStore, watchers::Watchers};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("store fault: {0}")]
  Faulted(String),
}

struct Inner<T> {
  /// Entries in first-insertion order.
  entries: Vec<T>,
  fault:   Option<String>,
}

pub struct MemoryStore<T> {
  inner:    Mutex<Inner<T>>,
  watchers: Watchers<T>,
}

impl<T> Default for MemoryStore<T> {
  fn default() -> Self {
    Self {
      inner:    Mutex::new(Inner { entries: Vec::new(), fault: None }),
      watchers: Watchers::new(),
    }
  }
}

impl<T: Entity> MemoryStore<T> {
  pub fn new() -> Self { Self::default() }

  /// Make every subsequent operation fail with `message` until [`heal`].
  ///
  /// [`heal`]: MemoryStore::heal
  pub fn fail_with(&self, message: impl Into<String>) {
    self.lock().fault = Some(message.into());
  }

  pub fn heal(&self) { self.lock().fault = None; }

  pub fn len(&self) -> usize { self.lock().entries.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  fn lock(&self) -> MutexGuard<'_, Inner<T>> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Lock and fail fast if a fault is injected.
  fn guard(&self) -> Result<MutexGuard<'_, Inner<T>>, MemoryError> {
    let inner = self.lock();
    match &inner.fault {
      Some(message) => Err(MemoryError::Faulted(message.clone())),
      None => Ok(inner),
    }
  }

  fn upsert(&self, inner: &mut Inner<T>, entity: T) {
    let key = entity.key().to_owned();
    match inner.entries.iter_mut().find(|e| e.key() == key) {
      Some(slot) => *slot = entity.clone(),
      None => inner.entries.push(entity.clone()),
    }
    self.watchers.publish(&key, Some(entity));
  }
}

impl<T: Entity> PersistentStore<T> for MemoryStore<T> {
  type Error = MemoryError;

  async fn read_instant(&self, key: &str) -> Result<Option<T>, MemoryError> {
    let inner = self.guard()?;
    Ok(inner.entries.iter().find(|e| e.key() == key).cloned())
  }

  async fn read_all(&self) -> Result<Vec<T>, MemoryError> {
    Ok(self.guard()?.entries.clone())
  }

  async fn observe(&self, key: &str) -> Result<watch::Receiver<Option<T>>, MemoryError> {
    let inner = self.guard()?;
    let current = inner.entries.iter().find(|e| e.key() == key).cloned();
    Ok(self.watchers.subscribe(key, current))
  }

  async fn write(&self, entity: T) -> Result<(), MemoryError> {
    let mut inner = self.guard()?;
    self.upsert(&mut inner, entity);
    Ok(())
  }

  async fn write_all(&self, entities: Vec<T>) -> Result<(), MemoryError> {
    let mut inner = self.guard()?;
    for entity in entities {
      self.upsert(&mut inner, entity);
    }
    Ok(())
  }

  async fn clear(&self) -> Result<(), MemoryError> {
    let mut inner = self.guard()?;
    inner.entries.clear();
    self.watchers.publish_cleared();
    Ok(())
  }
}
