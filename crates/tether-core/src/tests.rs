//! Orchestration tests against [`MemoryStore`] and scripted remotes.

use std::{
  collections::VecDeque,
  ops::Range,
  sync::{Arc, Mutex},
  time::Duration,
};

use futures::StreamExt as _;
use serde::{Deserialize, Serialize};
use tokio::{
  runtime::Handle,
  sync::{Semaphore, watch},
};

use crate::{
  Entity, ErrorKind, Failure, ResultState,
  feed::{Feed, FeedEvent, FeedSnapshot},
  list::ListSingleSourceOfTruth,
  memory::MemoryStore,
  page::PageOutcome,
  pagination::{Dispatch, PaginationConfig},
  remote::{EntitySource, PageSource},
  ssot::SingleSourceOfTruth,
  store::PersistentStore,
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Item {
  id:  String,
  rev: u32,
}

impl Entity for Item {
  fn key(&self) -> &str { &self.id }
}

fn item(id: &str, rev: u32) -> Item { Item { id: id.into(), rev } }

fn items(range: Range<usize>) -> Vec<Item> {
  range.map(|i| item(&format!("v{i}"), 0)).collect()
}

fn page(range: Range<usize>, offset: usize, reliable: bool) -> PageOutcome<Item> {
  PageOutcome::new(items(range), offset, reliable)
}

/// A page source that replays canned responses, optionally held behind a
/// gate that releases one fetch per permit.
struct ScriptedPages {
  responses: Mutex<VecDeque<Result<PageOutcome<Item>, Failure>>>,
  calls:     Mutex<Vec<usize>>,
  gate:      Option<Arc<Semaphore>>,
}

impl ScriptedPages {
  fn new(responses: impl IntoIterator<Item = Result<PageOutcome<Item>, Failure>>) -> Self {
    Self {
      responses: Mutex::new(responses.into_iter().collect()),
      calls:     Mutex::new(Vec::new()),
      gate:      None,
    }
  }

  fn gated(
    responses: impl IntoIterator<Item = Result<PageOutcome<Item>, Failure>>,
  ) -> (Self, Arc<Semaphore>) {
    let gate = Arc::new(Semaphore::new(0));
    let pages = Self { gate: Some(Arc::clone(&gate)), ..Self::new(responses) };
    (pages, gate)
  }

  fn calls(&self) -> Vec<usize> { self.calls.lock().unwrap().clone() }
}

impl PageSource<Item> for ScriptedPages {
  async fn fetch_page(&self, offset: usize) -> Result<PageOutcome<Item>, Failure> {
    self.calls.lock().unwrap().push(offset);
    if let Some(gate) = &self.gate {
      gate.acquire().await.expect("gate open").forget();
    }
    let next = self.responses.lock().unwrap().pop_front();
    next.unwrap_or_else(|| Err(Failure::unclassified("script exhausted")))
  }
}

struct StubEntity(Result<Item, Failure>);

impl EntitySource<Item> for StubEntity {
  async fn fetch(&self, _key: &str) -> Result<Item, Failure> { self.0.clone() }
}

fn entity_ssot(
  remote: Result<Item, Failure>,
) -> SingleSourceOfTruth<Item, MemoryStore<Item>, StubEntity> {
  SingleSourceOfTruth::new(
    Arc::new(MemoryStore::new()),
    Arc::new(StubEntity(remote)),
    Handle::current(),
  )
}

fn list_ssot(
  pages: Arc<ScriptedPages>,
) -> ListSingleSourceOfTruth<Item, MemoryStore<Item>, ScriptedPages> {
  ListSingleSourceOfTruth::new(Arc::new(MemoryStore::new()), pages, Handle::current())
}

fn feed(pages: &Arc<ScriptedPages>, config: PaginationConfig) -> Feed<Item> {
  Feed::builder(list_ssot(Arc::clone(pages)))
    .pagination(config)
    .spawn(&Handle::current())
}

async fn settle(
  rx: &mut watch::Receiver<FeedSnapshot<Item>>,
  ready: impl FnMut(&FeedSnapshot<Item>) -> bool,
) -> FeedSnapshot<Item> {
  let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(ready))
    .await
    .expect("feed settled in time")
    .expect("feed still running");
  snapshot.clone()
}

fn idle_with(len: usize) -> impl FnMut(&FeedSnapshot<Item>) -> bool {
  move |s| s.items.len() == len && !s.pagination.in_flight && !s.loading
}

// ─── Entity resource ─────────────────────────────────────────────────────────

#[tokio::test]
async fn save_then_get_instant_round_trips() {
  let ssot = entity_ssot(Err(Failure::network("unused")));
  let saved = item("a", 7);

  ssot.save(saved.clone()).await.unwrap();

  assert_eq!(ssot.get_instant("a").await, ResultState::Success(saved));
}

#[tokio::test]
async fn save_replaces_prior_value() {
  let ssot = entity_ssot(Err(Failure::network("unused")));
  ssot.save(item("a", 1)).await.unwrap();
  ssot.save(item("a", 2)).await.unwrap();

  assert_eq!(ssot.get_instant("a").await, ResultState::Success(item("a", 2)));
  assert_eq!(ssot.store().len(), 1);
}

#[tokio::test]
async fn clear_then_get_instant_is_empty() {
  let ssot = entity_ssot(Err(Failure::network("unused")));
  ssot.save(item("a", 1)).await.unwrap();

  ssot.clear().await.unwrap();

  assert_eq!(ssot.get_instant("a").await, ResultState::Empty);
}

#[tokio::test]
async fn store_fault_surfaces_as_error() {
  let ssot = entity_ssot(Err(Failure::network("unused")));
  ssot.store().fail_with("disk full");

  let state = ssot.get_instant("a").await;

  let failure = state.failure().expect("error state");
  assert_eq!(failure.kind, ErrorKind::StoreFault);
  assert!(failure.message.contains("disk full"));
  assert_eq!(
    ssot.save(item("a", 1)).await.unwrap_err().kind,
    ErrorKind::StoreFault
  );
}

#[tokio::test]
async fn observe_follows_writes_and_clears() {
  let ssot = entity_ssot(Err(Failure::network("unused")));
  let mut states = ssot.observe("a").await;

  assert_eq!(states.next().await, Some(ResultState::Empty));

  ssot.save(item("a", 1)).await.unwrap();
  assert_eq!(states.next().await, Some(ResultState::Success(item("a", 1))));

  ssot.clear().await.unwrap();
  assert_eq!(states.next().await, Some(ResultState::Empty));

  ssot.save(item("a", 2)).await.unwrap();
  assert_eq!(states.next().await, Some(ResultState::Success(item("a", 2))));
}

#[tokio::test]
async fn observe_ignores_other_keys() {
  let ssot = entity_ssot(Err(Failure::network("unused")));
  let mut states = ssot.observe("a").await;
  assert_eq!(states.next().await, Some(ResultState::Empty));

  ssot.save(item("b", 1)).await.unwrap();
  ssot.save(item("a", 3)).await.unwrap();

  assert_eq!(states.next().await, Some(ResultState::Success(item("a", 3))));
}

#[tokio::test]
async fn fetch_caches_remote_entity() {
  let ssot = entity_ssot(Ok(item("a", 9)));
  let mut observed = ssot.observe("a").await;
  assert_eq!(observed.next().await, Some(ResultState::Empty));

  let states: Vec<_> = ssot.fetch("a").collect().await;

  assert_eq!(states, vec![ResultState::Loading, ResultState::Success(item("a", 9))]);
  assert_eq!(observed.next().await, Some(ResultState::Success(item("a", 9))));
  assert_eq!(ssot.get_instant("a").await, ResultState::Success(item("a", 9)));
}

#[tokio::test]
async fn fetch_failure_keeps_cached_entity() {
  let ssot = entity_ssot(Err(Failure::network("unreachable")));
  ssot.save(item("a", 1)).await.unwrap();

  let states: Vec<_> = ssot.fetch("a").collect().await;

  assert_eq!(states.len(), 2);
  assert!(states[0].is_loading());
  assert_eq!(states[1].failure().map(|f| f.kind), Some(ErrorKind::NetworkFailure));
  assert_eq!(ssot.get_instant("a").await, ResultState::Success(item("a", 1)));
}

// ─── List resource ───────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_page_emits_loading_then_full_view() {
  let pages = Arc::new(ScriptedPages::new([
    Ok(page(0..3, 0, false)),
    Ok(page(3..5, 3, false)),
  ]));
  let list = list_ssot(pages);

  let first: Vec<_> = list.fetch_page(0).collect().await;
  assert_eq!(first[0], ResultState::Loading);

  let second: Vec<_> = list.fetch_page(3).collect().await;
  assert_eq!(second.len(), 2);
  assert!(second[0].is_loading());
  let outcome = second[1].clone().success().expect("success");
  assert_eq!(outcome.items, items(0..5));
  assert_eq!(outcome.offset, 3);
  assert_eq!(list.snapshot().len(), 5);
  assert_eq!(list.store().len(), 5);
}

#[tokio::test]
async fn reliable_page_refreshes_window_in_place() {
  let mut refreshed = page(1..3, 1, true);
  for entry in &mut refreshed.items {
    entry.rev = 1;
  }
  let pages = Arc::new(ScriptedPages::new([Ok(page(0..4, 0, false)), Ok(refreshed)]));
  let list = list_ssot(pages);

  list.fetch_page(0).collect::<Vec<_>>().await;
  list.fetch_page(1).collect::<Vec<_>>().await;

  let view = list.snapshot();
  let revs: Vec<_> = view.iter().map(|i| (i.id.as_str(), i.rev)).collect();
  assert_eq!(revs, [("v0", 0), ("v1", 1), ("v2", 1), ("v3", 0)]);
}

#[tokio::test]
async fn fetch_error_leaves_view_and_cache() {
  let pages = Arc::new(ScriptedPages::new([
    Ok(page(0..3, 0, false)),
    Err(Failure::server("rate limited")),
  ]));
  let list = list_ssot(pages);
  list.fetch_page(0).collect::<Vec<_>>().await;

  let states: Vec<_> = list.fetch_page(3).collect().await;

  let failure = states[1].failure().expect("error");
  assert_eq!(failure.kind, ErrorKind::ServerFailure);
  assert_eq!(failure.message, "rate limited");
  assert_eq!(&*list.snapshot(), items(0..3).as_slice());
  assert_eq!(list.store().len(), 3);
}

#[tokio::test]
async fn persist_failure_is_a_store_fault_and_skips_merge() {
  let pages = Arc::new(ScriptedPages::new([Ok(page(0..3, 0, false))]));
  let list = list_ssot(pages);
  list.store().fail_with("read-only filesystem");

  let states: Vec<_> = list.fetch_page(0).collect().await;

  assert_eq!(states[1].failure().map(|f| f.kind), Some(ErrorKind::StoreFault));
  assert!(list.snapshot().is_empty());
}

#[tokio::test]
async fn clear_empties_view_and_cache() {
  let pages = Arc::new(ScriptedPages::new([Ok(page(0..3, 0, false))]));
  let list = list_ssot(pages);
  list.fetch_page(0).collect::<Vec<_>>().await;
  assert_eq!(list.cached().await, ResultState::Success(items(0..3)));

  list.clear().await.unwrap();

  assert!(list.snapshot().is_empty());
  assert_eq!(list.cached().await, ResultState::Empty);
}

// ─── Feed ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scrolling_fills_view_until_max_page() {
  let pages = Arc::new(ScriptedPages::new([
    Ok(page(0..20, 0, false)),
    Ok(page(20..35, 20, false)),
    Ok(page(35..40, 40, false)),
  ]));
  let feed = feed(&pages, PaginationConfig { page_size: 20, max_page: 2 });
  let mut rx = feed.subscribe();

  assert_eq!(feed.init().await.unwrap(), Dispatch::Started { page: 0, offset: 0 });
  settle(&mut rx, idle_with(20)).await;

  assert_eq!(
    feed.request_next_page().await.unwrap(),
    Dispatch::Started { page: 1, offset: 20 }
  );
  let snapshot = settle(&mut rx, idle_with(35)).await;
  assert_eq!(&*snapshot.items, items(0..35).as_slice());

  assert_eq!(
    feed.request_next_page().await.unwrap(),
    Dispatch::Started { page: 2, offset: 40 }
  );
  settle(&mut rx, idle_with(40)).await;

  assert_eq!(feed.request_next_page().await.unwrap(), Dispatch::Exhausted);
  assert_eq!(feed.request_next_page().await.unwrap(), Dispatch::Exhausted);
  assert!(feed.snapshot().pagination.exhausted());
  assert_eq!(pages.calls(), [0, 20, 40]);
}

#[tokio::test]
async fn next_page_while_in_flight_is_ignored() {
  let (pages, gate) = ScriptedPages::gated([Ok(page(0..20, 0, false))]);
  let pages = Arc::new(pages);
  let feed = feed(&pages, PaginationConfig { page_size: 20, max_page: 5 });
  let mut rx = feed.subscribe();

  assert!(feed.init().await.unwrap().started());
  assert_eq!(feed.request_next_page().await.unwrap(), Dispatch::InFlight);
  assert_eq!(feed.snapshot().pagination.page, 0);
  assert!(feed.snapshot().pagination.in_flight);

  gate.add_permits(1);
  settle(&mut rx, idle_with(20)).await;

  assert_eq!(pages.calls(), [0]);
  assert_eq!(feed.snapshot().pagination.page, 0);
}

#[tokio::test]
async fn init_skips_when_view_is_loaded() {
  let pages = Arc::new(ScriptedPages::new([Ok(page(0..5, 0, false))]));
  let feed = feed(&pages, PaginationConfig::default());
  let mut rx = feed.subscribe();

  feed.init().await.unwrap();
  settle(&mut rx, idle_with(5)).await;

  assert_eq!(feed.init().await.unwrap(), Dispatch::AlreadyLoaded);
  assert_eq!(pages.calls(), [0]);
}

#[tokio::test]
async fn refresh_rewinds_before_fetching() {
  let (pages, gate) = ScriptedPages::gated([
    Ok(page(0..20, 0, false)),
    Ok(page(20..40, 20, false)),
    Ok(page(100..120, 0, false)),
  ]);
  let pages = Arc::new(pages);
  let feed = feed(&pages, PaginationConfig { page_size: 20, max_page: 5 });
  let mut rx = feed.subscribe();

  gate.add_permits(2);
  feed.init().await.unwrap();
  settle(&mut rx, idle_with(20)).await;
  feed.request_next_page().await.unwrap();
  settle(&mut rx, idle_with(40)).await;

  assert_eq!(feed.refresh().await.unwrap(), Dispatch::Started { page: 0, offset: 0 });
  let rewound = feed.snapshot();
  assert!(rewound.items.is_empty());
  assert_eq!(rewound.pagination.page, 0);

  gate.add_permits(1);
  let refreshed = settle(&mut rx, idle_with(20)).await;
  assert_eq!(&*refreshed.items, items(100..120).as_slice());
  assert_eq!(pages.calls(), [0, 20, 0]);
}

#[tokio::test]
async fn stale_response_after_invalidate_lands_in_empty_view() {
  let (pages, gate) = ScriptedPages::gated([Ok(page(40..60, 40, false))]);
  let pages = Arc::new(pages);
  let feed = feed(&pages, PaginationConfig::default());
  let mut rx = feed.subscribe();

  feed.init().await.unwrap();
  feed.invalidate().await.unwrap();
  assert!(feed.snapshot().pagination.in_flight);

  gate.add_permits(1);
  let snapshot = settle(&mut rx, idle_with(20)).await;

  assert_eq!(&*snapshot.items, items(40..60).as_slice());
  assert_eq!(snapshot.pagination.page, 0);
}

#[tokio::test]
async fn error_on_empty_view_falls_back_to_cache() {
  let pages = Arc::new(ScriptedPages::new([Err(Failure::network("offline"))]));
  let list = list_ssot(Arc::clone(&pages));
  list.store().write_all(items(0..3)).await.unwrap();
  let feed = Feed::builder(list).spawn(&Handle::current());
  let mut rx = feed.subscribe();

  feed.init().await.unwrap();
  let snapshot = settle(&mut rx, |s| !s.available).await;

  assert!(snapshot.from_cache);
  assert_eq!(&*snapshot.items, items(0..3).as_slice());
  assert!(!snapshot.pagination.in_flight);
  assert_eq!(feed.take_events(), [FeedEvent::Message("offline".into())]);
  assert!(feed.take_events().is_empty());
}

#[tokio::test]
async fn error_after_success_keeps_view_available() {
  let pages = Arc::new(ScriptedPages::new([
    Ok(page(0..20, 0, false)),
    Err(Failure::server("bad gateway")),
    Ok(page(20..30, 20, false)),
  ]));
  let feed = feed(&pages, PaginationConfig { page_size: 20, max_page: 5 });
  let mut rx = feed.subscribe();

  feed.init().await.unwrap();
  settle(&mut rx, idle_with(20)).await;
  feed.request_next_page().await.unwrap();
  assert_eq!(feed.next_event().await, FeedEvent::Message("bad gateway".into()));

  let after_error = settle(&mut rx, idle_with(20)).await;
  assert!(after_error.available);
  assert!(!after_error.from_cache);

  // The coordinator is idle again, so the next trigger retries.
  assert!(feed.request_next_page().await.unwrap().started());
  settle(&mut rx, idle_with(30)).await;
}

#[tokio::test]
async fn invalidate_clears_dependents_and_queues_event() {
  let pages = Arc::new(ScriptedPages::new([Ok(page(0..5, 0, false))]));
  let details = Arc::new(entity_ssot(Err(Failure::network("unused"))));
  details.save(item("v1", 1)).await.unwrap();

  let feed = Feed::builder(list_ssot(Arc::clone(&pages)))
    .invalidates(details.clone())
    .spawn(&Handle::current());
  let mut rx = feed.subscribe();
  feed.init().await.unwrap();
  settle(&mut rx, idle_with(5)).await;

  feed.invalidate().await.unwrap();

  let snapshot = feed.snapshot();
  assert!(snapshot.items.is_empty());
  assert_eq!(snapshot.pagination.page, 0);
  assert_eq!(details.get_instant("v1").await, ResultState::Empty);
  assert_eq!(feed.take_events(), [FeedEvent::LocationChanged]);
}
