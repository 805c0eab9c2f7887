//! [`ListSingleSourceOfTruth`] — a paginated collection resource.
//!
//! Each fetched page is persisted, then reconciled into the in-memory
//! [`CollectionView`]. Successful emissions carry the full merged view, not
//! just the page that was fetched.

use std::sync::Arc;

use futures::StreamExt as _;
use tokio::{runtime::Handle, sync::mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::{
  entity::Entity,
  error::Failure,
  page::{CollectionView, PageOutcome},
  remote::PageSource,
  result::ResultState,
  ssot::{StateStream, offload},
  store::PersistentStore,
};

pub struct ListSingleSourceOfTruth<T, S, R> {
  store:   Arc<S>,
  remote:  Arc<R>,
  view:    Arc<CollectionView<T>>,
  runtime: Handle,
}

impl<T, S, R> ListSingleSourceOfTruth<T, S, R>
where
  T: Entity,
  S: PersistentStore<T> + 'static,
  R: PageSource<T> + 'static,
{
  /// Store and remote work is spawned on `runtime`.
  pub fn new(store: Arc<S>, remote: Arc<R>, runtime: Handle) -> Self {
    Self {
      store,
      remote,
      view: Arc::new(CollectionView::new()),
      runtime,
    }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// An immutable copy of the merged collection.
  pub fn snapshot(&self) -> Arc<[T]> { self.view.snapshot() }

  /// Fetch the page at `offset`.
  ///
  /// Emits `Loading` immediately. On success the page is persisted and
  /// reconciled, then `Success` carries the merged view with the fetched
  /// page's `offset` and `reliable`. On failure the view and the cache are
  /// left as they were and `Error` is emitted.
  pub fn fetch_page(&self, offset: usize) -> StateStream<PageOutcome<T>> {
    let (tx, rx) = mpsc::channel(2);
    // Fresh channel with spare capacity; cannot fail.
    let _ = tx.try_send(ResultState::Loading);

    let store = Arc::clone(&self.store);
    let remote = Arc::clone(&self.remote);
    let view = Arc::clone(&self.view);

    self.runtime.spawn(async move {
      debug!(offset, "fetching page");

      let state = match remote.fetch_page(offset).await {
        Err(failure) => {
          warn!(offset, %failure, "page fetch failed");
          ResultState::Error(failure)
        }
        Ok(page) => match store.write_all(page.items.clone()).await {
          Err(e) => {
            warn!(offset, error = %e, "persisting page failed");
            ResultState::Error(Failure::from_store(e))
          }
          Ok(()) => {
            let (merged, how) = view.merge(&page);
            debug!(
              offset,
              fetched = page.items.len(),
              total = merged.len(),
              reliable = page.reliable,
              merge = ?how,
              "page reconciled"
            );
            ResultState::Success(PageOutcome {
              items:    merged.to_vec(),
              offset:   page.offset,
              reliable: page.reliable,
            })
          }
        },
      };

      if tx.send(state).await.is_err() {
        debug!(offset, "page fetch finished after subscriber left");
      }
    });

    ReceiverStream::new(rx).boxed()
  }

  /// Clear the cache and empty the view. Emits nothing; resetting pagination
  /// and refetching are the caller's business.
  pub async fn clear(&self) -> Result<(), Failure> {
    self.view.reset();

    let store = Arc::clone(&self.store);
    offload(&self.runtime, async move { store.clear().await })
      .await?
      .map_err(Failure::from_store)?;
    debug!("list cache cleared");
    Ok(())
  }

  /// The cached collection as last persisted, without touching the network.
  pub async fn cached(&self) -> ResultState<Vec<T>> {
    let store = Arc::clone(&self.store);
    match offload(&self.runtime, async move { store.read_all().await }).await {
      Ok(Ok(items)) if items.is_empty() => ResultState::Empty,
      Ok(Ok(items)) => ResultState::Success(items),
      Ok(Err(e)) => {
        warn!(error = %e, "reading cached list failed");
        ResultState::Error(Failure::from_store(e))
      }
      Err(failure) => ResultState::Error(failure),
    }
  }
}
