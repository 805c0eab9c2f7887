//! [`SingleSourceOfTruth`] — a single-entity resource backed by a remote
//! source and a persistent store.
//!
//! The store is the only thing consumers read. Remote fetches write into it,
//! and every write re-emits to [`observe`](SingleSourceOfTruth::observe)
//! subscribers.

use std::{future::Future, marker::PhantomData, sync::Arc};

use futures::{
  StreamExt as _,
  future::{self, BoxFuture, FutureExt as _},
  stream::{self, BoxStream},
};
use tokio::{runtime::Handle, sync::mpsc};
use tokio_stream::wrappers::{ReceiverStream, WatchStream};
use tracing::{debug, warn};

use crate::{
  entity::Entity,
  error::Failure,
  remote::EntitySource,
  result::ResultState,
  store::PersistentStore,
};

/// A live stream of states. Delivered on whichever task polls it.
pub type StateStream<T> = BoxStream<'static, ResultState<T>>;

/// Run `work` on the I/O runtime and wait for it.
pub(crate) async fn offload<F>(runtime: &Handle, work: F) -> Result<F::Output, Failure>
where
  F: Future + Send + 'static,
  F::Output: Send + 'static,
{
  runtime
    .spawn(work)
    .await
    .map_err(|e| Failure::unclassified(format!("background task failed: {e}")))
}

// ─── Invalidation hook ───────────────────────────────────────────────────────

/// A resource that can be wiped when an external signal makes it stale.
///
/// Object-safe so an adapter can hold dependents of different entity types.
pub trait Invalidate: Send + Sync {
  fn invalidate(&self) -> BoxFuture<'_, Result<(), Failure>>;
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct SingleSourceOfTruth<T, S, R> {
  store:   Arc<S>,
  remote:  Arc<R>,
  runtime: Handle,
  _entity: PhantomData<fn() -> T>,
}

impl<T, S, R> SingleSourceOfTruth<T, S, R>
where
  T: Entity,
  S: PersistentStore<T> + 'static,
  R: EntitySource<T> + 'static,
{
  /// Store and remote work is spawned on `runtime`.
  pub fn new(store: Arc<S>, remote: Arc<R>, runtime: Handle) -> Self {
    Self { store, remote, runtime, _entity: PhantomData }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Read the cached entry without touching the network.
  pub async fn get_instant(&self, key: &str) -> ResultState<T> {
    let store = Arc::clone(&self.store);
    let key = key.to_owned();

    match offload(&self.runtime, async move { store.read_instant(&key).await }).await {
      Ok(Ok(value)) => ResultState::from_option(value),
      Ok(Err(e)) => {
        warn!(error = %e, "instant read failed");
        ResultState::Error(Failure::from_store(e))
      }
      Err(failure) => ResultState::Error(failure),
    }
  }

  /// Follow the cached entry for `key`: `Success` or `Empty` now, then again
  /// after every change.
  pub async fn observe(&self, key: &str) -> StateStream<T> {
    let store = Arc::clone(&self.store);
    let owned = key.to_owned();

    let failure = match offload(&self.runtime, async move { store.observe(&owned).await }).await {
      Ok(Ok(rx)) => return WatchStream::new(rx).map(ResultState::from_option).boxed(),
      Ok(Err(e)) => Failure::from_store(e),
      Err(failure) => failure,
    };

    warn!(key, %failure, "subscription failed");
    stream::once(future::ready(ResultState::Error(failure))).boxed()
  }

  /// Upsert `entity`, replacing any prior value under its key.
  pub async fn save(&self, entity: T) -> Result<(), Failure> {
    let store = Arc::clone(&self.store);
    offload(&self.runtime, async move { store.write(entity).await })
      .await?
      .map_err(Failure::from_store)
  }

  /// Remove every entry of this resource.
  pub async fn clear(&self) -> Result<(), Failure> {
    let store = Arc::clone(&self.store);
    offload(&self.runtime, async move { store.clear().await })
      .await?
      .map_err(Failure::from_store)?;
    debug!("entity cache cleared");
    Ok(())
  }

  /// Fetch `key` from the remote and cache it.
  ///
  /// Emits `Loading`, then `Success` once the entity is stored or `Error`.
  pub fn fetch(&self, key: &str) -> StateStream<T> {
    let (tx, rx) = mpsc::channel(2);
    // Fresh channel with spare capacity; cannot fail.
    let _ = tx.try_send(ResultState::Loading);

    let store = Arc::clone(&self.store);
    let remote = Arc::clone(&self.remote);
    let key = key.to_owned();

    self.runtime.spawn(async move {
      let state = match remote.fetch(&key).await {
        Ok(entity) => match store.write(entity.clone()).await {
          Ok(()) => ResultState::Success(entity),
          Err(e) => {
            warn!(key = %key, error = %e, "caching fetched entity failed");
            ResultState::Error(Failure::from_store(e))
          }
        },
        Err(failure) => {
          warn!(key = %key, %failure, "entity fetch failed");
          ResultState::Error(failure)
        }
      };

      if tx.send(state).await.is_err() {
        debug!(key = %key, "entity fetch finished after subscriber left");
      }
    });

    ReceiverStream::new(rx).boxed()
  }
}

impl<T, S, R> Invalidate for SingleSourceOfTruth<T, S, R>
where
  T: Entity,
  S: PersistentStore<T> + 'static,
  R: EntitySource<T> + 'static,
{
  fn invalidate(&self) -> BoxFuture<'_, Result<(), Failure>> { self.clear().boxed() }
}
