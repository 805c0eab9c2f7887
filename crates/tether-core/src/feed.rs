//! [`Feed`] — the consumer-facing surface of a paginated resource.
//!
//! A feed owns a driver task that holds the [`PaginationCoordinator`] and
//! processes triggers and fetch results strictly one at a time from a single
//! queue. That task is the delivery context: every state change is published
//! from it as an immutable [`FeedSnapshot`] over a `watch` channel.
//!
//! One-shot notifications (error messages, location changes) go to an owned
//! [`EventQueue`] that the single consumer drains.

use std::{
  collections::VecDeque,
  future,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::StreamExt as _;
use tokio::{
  runtime::Handle,
  sync::{Notify, mpsc, oneshot, watch},
};
use tracing::{debug, info, warn};

use crate::{
  entity::Entity,
  error::{Error, Failure, Result},
  list::ListSingleSourceOfTruth,
  page::PageOutcome,
  pagination::{Dispatch, PaginationConfig, PaginationCoordinator, PaginationState},
  remote::PageSource,
  result::ResultState,
  ssot::{Invalidate, StateStream},
  store::PersistentStore,
};

// ─── Published state ─────────────────────────────────────────────────────────

/// What the consumer renders.
#[derive(Debug, Clone)]
pub struct FeedSnapshot<T> {
  /// The merged collection, or the cached one when `from_cache` is set.
  pub items:      Arc<[T]>,
  /// A fetch has emitted `Loading` and not yet finished.
  pub loading:    bool,
  /// `false` after a fetch failed with nothing to show.
  pub available:  bool,
  /// `items` came from the persistent cache after a failed fetch.
  pub from_cache: bool,
  pub pagination: PaginationState,
}

/// A notification meant to be handled exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
  /// A transient message to surface, e.g. a fetch error.
  Message(String),
  /// The feed was invalidated by an external signal.
  LocationChanged,
}

/// Pending one-shot events, consumed and cleared by the single subscriber.
#[derive(Default)]
pub struct EventQueue {
  pending: Mutex<VecDeque<FeedEvent>>,
  notify:  Notify,
}

impl EventQueue {
  fn lock(&self) -> MutexGuard<'_, VecDeque<FeedEvent>> {
    self.pending.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn push(&self, event: FeedEvent) {
    self.lock().push_back(event);
    self.notify.notify_one();
  }

  /// Remove and return everything pending.
  pub fn take(&self) -> Vec<FeedEvent> { self.lock().drain(..).collect() }

  /// Wait for the next event and remove it.
  pub async fn next(&self) -> FeedEvent {
    loop {
      let next = self.lock().pop_front();
      if let Some(event) = next {
        return event;
      }
      self.notify.notified().await;
    }
  }
}

// ─── Handle ──────────────────────────────────────────────────────────────────

enum Command {
  Init(oneshot::Sender<Dispatch>),
  NextPage(oneshot::Sender<Dispatch>),
  Refresh(oneshot::Sender<Dispatch>),
  Invalidate(oneshot::Sender<()>),
}

/// Handle to a running feed. Dropping it stops the driver.
pub struct Feed<T> {
  commands:  mpsc::Sender<Command>,
  snapshots: watch::Receiver<FeedSnapshot<T>>,
  events:    Arc<EventQueue>,
}

impl<T: Entity> Feed<T> {
  pub fn builder<S, R>(list: ListSingleSourceOfTruth<T, S, R>) -> FeedBuilder<T, S, R>
  where
    S: PersistentStore<T> + 'static,
    R: PageSource<T> + 'static,
  {
    FeedBuilder {
      list,
      pagination: PaginationConfig::default(),
      dependents: Vec::new(),
    }
  }

  /// Load the first page, unless the view already holds data.
  pub async fn init(&self) -> Result<Dispatch> { self.ask(Command::Init).await }

  /// The consumer scrolled to the end of what it has.
  pub async fn request_next_page(&self) -> Result<Dispatch> {
    self.ask(Command::NextPage).await
  }

  /// Drop cached and in-memory data, rewind to page 0 and fetch it.
  pub async fn refresh(&self) -> Result<Dispatch> { self.ask(Command::Refresh).await }

  /// Drop cached and in-memory data of this feed and its dependents, rewind
  /// to page 0, and queue [`FeedEvent::LocationChanged`]. Issues no fetch.
  pub async fn invalidate(&self) -> Result<()> { self.ask(Command::Invalidate).await }

  /// Follow published snapshots.
  pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot<T>> { self.snapshots.clone() }

  /// The latest published snapshot.
  pub fn snapshot(&self) -> FeedSnapshot<T> { self.snapshots.borrow().clone() }

  /// Drain pending one-shot events.
  pub fn take_events(&self) -> Vec<FeedEvent> { self.events.take() }

  pub async fn next_event(&self) -> FeedEvent { self.events.next().await }

  async fn ask<O>(&self, command: impl FnOnce(oneshot::Sender<O>) -> Command) -> Result<O> {
    let (tx, rx) = oneshot::channel();
    self
      .commands
      .send(command(tx))
      .await
      .map_err(|_| Error::FeedClosed)?;
    rx.await.map_err(|_| Error::FeedClosed)
  }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

pub struct FeedBuilder<T, S, R> {
  list:       ListSingleSourceOfTruth<T, S, R>,
  pagination: PaginationConfig,
  dependents: Vec<Arc<dyn Invalidate>>,
}

impl<T, S, R> FeedBuilder<T, S, R>
where
  T: Entity,
  S: PersistentStore<T> + 'static,
  R: PageSource<T> + 'static,
{
  pub fn pagination(mut self, config: PaginationConfig) -> Self {
    self.pagination = config;
    self
  }

  /// Also clear `dependent` whenever the feed is invalidated.
  pub fn invalidates(mut self, dependent: Arc<dyn Invalidate>) -> Self {
    self.dependents.push(dependent);
    self
  }

  /// Start the driver on `runtime`.
  pub fn spawn(self, runtime: &Handle) -> Feed<T> {
    let coordinator = PaginationCoordinator::new(self.pagination);
    let (snapshots_tx, snapshots) = watch::channel(FeedSnapshot {
      items:      self.list.snapshot(),
      loading:    false,
      available:  true,
      from_cache: false,
      pagination: coordinator.state(),
    });
    let (commands, commands_rx) = mpsc::channel(16);
    let events = Arc::new(EventQueue::default());

    let driver = Driver {
      list: self.list,
      coordinator,
      dependents: self.dependents,
      snapshots: snapshots_tx,
      events: Arc::clone(&events),
      current: None,
      loading: false,
      available: true,
      cached: None,
    };
    runtime.spawn(driver.run(commands_rx));

    Feed { commands, snapshots, events }
  }
}

// ─── Driver ──────────────────────────────────────────────────────────────────

struct Driver<T, S, R> {
  list:        ListSingleSourceOfTruth<T, S, R>,
  coordinator: PaginationCoordinator,
  dependents:  Vec<Arc<dyn Invalidate>>,
  snapshots:   watch::Sender<FeedSnapshot<T>>,
  events:      Arc<EventQueue>,
  /// Emissions of the outstanding fetch, if any.
  current:     Option<StateStream<PageOutcome<T>>>,
  loading:     bool,
  available:   bool,
  /// Cached collection shown while the view is empty and unavailable.
  cached:      Option<Arc<[T]>>,
}

impl<T, S, R> Driver<T, S, R>
where
  T: Entity,
  S: PersistentStore<T> + 'static,
  R: PageSource<T> + 'static,
{
  async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
    loop {
      tokio::select! {
        command = commands.recv() => match command {
          Some(command) => self.handle(command).await,
          None => break,
        },
        state = next_state(&mut self.current) => self.on_state(state).await,
      }
    }
    debug!("feed driver stopped");
  }

  async fn handle(&mut self, command: Command) {
    match command {
      Command::Init(reply) => {
        let dispatch = if self.list.snapshot().is_empty() {
          let d = self.coordinator.begin();
          self.dispatch(d)
        } else {
          Dispatch::AlreadyLoaded
        };
        let _ = reply.send(dispatch);
      }
      Command::NextPage(reply) => {
        let d = self.coordinator.request_next_page();
        let _ = reply.send(self.dispatch(d));
      }
      Command::Refresh(reply) => {
        self.reset().await;
        let d = self.coordinator.begin();
        let _ = reply.send(self.dispatch(d));
      }
      Command::Invalidate(reply) => {
        info!("feed invalidated");
        self.events.push(FeedEvent::LocationChanged);
        self.reset().await;
        for dependent in &self.dependents {
          if let Err(failure) = dependent.invalidate().await {
            warn!(%failure, "clearing dependent resource failed");
            self.events.push(FeedEvent::Message(failure.message));
          }
        }
        let _ = reply.send(());
      }
    }
  }

  /// Start consuming the fetch a trigger was granted, if any.
  fn dispatch(&mut self, dispatch: Dispatch) -> Dispatch {
    match dispatch {
      Dispatch::Started { page, offset } => {
        debug!(page, offset, "page fetch dispatched");
        self.current = Some(self.list.fetch_page(offset));
      }
      other => debug!(?other, "page fetch suppressed"),
    }
    self.publish();
    dispatch
  }

  /// Clear cache and view and rewind pagination. An outstanding fetch keeps
  /// running and its result is reconciled into the emptied view.
  async fn reset(&mut self) {
    if let Err(failure) = self.list.clear().await {
      warn!(%failure, "clearing list resource failed");
      self.events.push(FeedEvent::Message(failure.message));
    }
    self.coordinator.reset();
    self.cached = None;
    self.publish();
  }

  async fn on_state(&mut self, state: ResultState<PageOutcome<T>>) {
    if state.is_terminal() {
      self.current = None;
      self.coordinator.complete();
      self.loading = false;
    }

    match state {
      ResultState::Loading => self.loading = true,
      ResultState::Success(outcome) => {
        debug!(total = outcome.items.len(), offset = outcome.offset, "page delivered");
        self.available = true;
        self.cached = None;
      }
      ResultState::Error(failure) => {
        self.events.push(FeedEvent::Message(failure.message));
        if self.list.snapshot().is_empty() {
          self.available = false;
          self.cached = match self.list.cached().await {
            ResultState::Success(items) => {
              info!(count = items.len(), "showing cached collection");
              Some(Arc::from(items))
            }
            _ => None,
          };
        }
      }
      ResultState::Empty => {}
    }

    self.publish();
  }

  fn publish(&self) {
    let (items, from_cache) = match &self.cached {
      Some(cached) => (Arc::clone(cached), true),
      None => (self.list.snapshot(), false),
    };
    self.snapshots.send_replace(FeedSnapshot {
      items,
      loading: self.loading,
      available: self.available,
      from_cache,
      pagination: self.coordinator.state(),
    });
  }
}

/// The next emission of the outstanding fetch; pending while there is none.
async fn next_state<U>(current: &mut Option<StateStream<U>>) -> ResultState<U> {
  let Some(stream) = current.as_mut() else {
    return future::pending().await;
  };
  match stream.next().await {
    Some(state) => state,
    None => {
      *current = None;
      ResultState::Error(Failure::unclassified("page fetch ended without a result"))
    }
  }
}
