//! Client-side collection cache for paged collections.
//!
//! A [`CollectionCache`] accumulates the pages of one collection under the
//! active [`CacheKey`] (entity, status filter, search text):
//!
//! - Switching to a different key drops the accumulated items and starts a
//!   new sequence from page 0. Results still in flight for the old key are
//!   discarded when they arrive.
//! - Pages are appended strictly in page order. Concurrent requests for the
//!   next page share one fetch.
//! - Items are deduplicated by id; later copies are dropped with a warning.
//! - Any mutation invalidates the whole sequence; nothing is patched in
//!   place.
//!
//! Client-side sorting only orders the pages fetched so far.

use std::{
  collections::HashSet,
  fmt,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::{
  FutureExt as _,
  future::{BoxFuture, Shared},
};
use outreach_core::{
  query::{ListParams, Page, PageRequest, SortOrder},
  sort::{Identified, Sortable, sort_by_field},
};

// ─── Keys ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
  Campaigns,
  Leads,
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      EntityKind::Campaigns => "campaigns",
      EntityKind::Leads => "leads",
    })
  }
}

/// Identifies one accumulated page sequence. Sorting is not part of the key:
/// re-sorting happens client-side over the accumulated items.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  pub entity: EntityKind,
  pub status: Option<String>,
  pub search: Option<String>,
}

impl CacheKey {
  pub fn new(entity: EntityKind, status: Option<String>, search: Option<String>) -> Self {
    // Blank values and "all" mean no filter; normalise so they share a key.
    let norm = |v: Option<String>| {
      v.map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty() && s != "all")
    };
    Self { entity, status: norm(status), search: norm(search) }
  }

  /// Query parameters for fetching `page` of this sequence.
  pub fn params(&self, page: PageRequest) -> ListParams {
    ListParams {
      status: self.status.clone(),
      search: self.search.clone(),
      page: Some(page.page.to_string()),
      limit: Some(page.limit.to_string()),
      ..ListParams::default()
    }
  }
}

// ─── Fetching ────────────────────────────────────────────────────────────────

/// A failed page fetch, shareable between coalesced waiters.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0:#}")]
pub struct FetchError(Arc<anyhow::Error>);

impl From<anyhow::Error> for FetchError {
  fn from(err: anyhow::Error) -> Self { FetchError(Arc::new(err)) }
}

type FetchResult<T> = Result<Arc<Page<T>>, FetchError>;

/// Where pages come from.
pub trait PageSource<T>: Send + Sync {
  fn fetch(&self, key: &CacheKey, page: PageRequest) -> BoxFuture<'static, anyhow::Result<Page<T>>>;
}

/// What a [`CollectionCache::load_more`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
  /// A page arrived; `added` new items were appended.
  Appended { added: usize, exhausted: bool },
  /// Nothing left to fetch for the active key.
  Exhausted,
  /// The key changed or the cache was invalidated while fetching; the
  /// result was discarded.
  Stale,
}

// ─── Cache ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Sequence<T> {
  key:         CacheKey,
  items:       Vec<T>,
  seen:        HashSet<i64>,
  next_page:   u32,
  exhausted:   bool,
  total_count: Option<u64>,
}

impl<T> Sequence<T> {
  fn new(key: CacheKey) -> Self {
    Self {
      key,
      items: Vec::new(),
      seen: HashSet::new(),
      next_page: 0,
      exhausted: false,
      total_count: None,
    }
  }
}

struct InFlight<T> {
  page:       u32,
  generation: u64,
  fetch:      Shared<BoxFuture<'static, FetchResult<T>>>,
}

struct Inner<T> {
  /// Bumped whenever the active sequence is replaced or reset.
  generation: u64,
  sequence:   Option<Sequence<T>>,
  in_flight:  Option<InFlight<T>>,
}

/// Accumulates pages of `T` for one active key at a time.
pub struct CollectionCache<T> {
  limit: u32,
  inner: Mutex<Inner<T>>,
}

impl<T> CollectionCache<T>
where
  T: Identified + Clone + Send + Sync + 'static,
{
  /// A cache that fetches pages of `limit` items (clamped like the server).
  pub fn new(limit: u32) -> Self {
    Self {
      limit: PageRequest::new(0, limit).limit,
      inner: Mutex::new(Inner { generation: 0, sequence: None, in_flight: None }),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Inner<T>> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Make `key` the active key. A different key starts a fresh sequence.
  pub fn activate(&self, key: CacheKey) {
    let mut inner = self.lock();
    if inner.sequence.as_ref().is_some_and(|s| s.key == key) {
      return;
    }
    tracing::debug!(?key, "starting new page sequence");
    inner.generation += 1;
    inner.sequence = Some(Sequence::new(key));
    inner.in_flight = None;
  }

  /// Discard every accumulated page of `entity`. The next
  /// [`load_more`](Self::load_more) starts again from page 0.
  pub fn invalidate(&self, entity: EntityKind) {
    let mut inner = self.lock();
    let Some(key) = inner.sequence.as_ref().map(|s| s.key.clone()) else {
      return;
    };
    if key.entity != entity {
      return;
    }
    tracing::debug!(%entity, "invalidating cached pages");
    inner.generation += 1;
    inner.sequence = Some(Sequence::new(key));
    inner.in_flight = None;
  }

  /// Fetch and append the next page of the active sequence.
  pub async fn load_more<P>(&self, source: &P) -> Result<LoadOutcome, FetchError>
  where
    P: PageSource<T> + ?Sized,
  {
    let (page, generation, fetch) = {
      let mut inner = self.lock();
      let generation = inner.generation;
      let Some(seq) = inner.sequence.as_ref() else {
        return Ok(LoadOutcome::Exhausted);
      };
      if seq.exhausted {
        return Ok(LoadOutcome::Exhausted);
      }
      let page = seq.next_page;
      let key = seq.key.clone();

      let joined = inner
        .in_flight
        .as_ref()
        .filter(|f| f.generation == generation && f.page == page)
        .map(|f| f.fetch.clone());
      match joined {
        Some(fetch) => {
          tracing::trace!(page, "joining in-flight fetch");
          (page, generation, fetch)
        }
        None => {
          let request = PageRequest::new(page, self.limit);
          let fetch = source
            .fetch(&key, request)
            .map(|r| r.map(Arc::new).map_err(FetchError::from))
            .boxed()
            .shared();
          inner.in_flight = Some(InFlight { page, generation, fetch: fetch.clone() });
          (page, generation, fetch)
        }
      }
    };

    let result = fetch.await;

    let mut inner = self.lock();
    if inner
      .in_flight
      .as_ref()
      .is_some_and(|f| f.generation == generation && f.page == page)
    {
      inner.in_flight = None;
    }
    if inner.generation != generation {
      tracing::debug!(page, "discarding page fetched for a stale key");
      return Ok(LoadOutcome::Stale);
    }

    let fetched = result?;
    let limit = self.limit;
    let Some(seq) = inner.sequence.as_mut() else {
      return Ok(LoadOutcome::Stale);
    };
    if seq.next_page != page {
      // A coalesced caller already appended this page.
      return Ok(LoadOutcome::Appended { added: 0, exhausted: seq.exhausted });
    }

    let mut added = 0;
    for item in fetched.items.iter() {
      if seq.seen.insert(item.id()) {
        seq.items.push(item.clone());
        added += 1;
      } else {
        tracing::warn!(
          entity = %seq.key.entity,
          id = item.id(),
          page,
          "dropping duplicate item"
        );
      }
    }
    seq.next_page += 1;
    seq.total_count = Some(fetched.total_count);
    seq.exhausted = fetched.items.len() < limit as usize || !fetched.has_more;

    Ok(LoadOutcome::Appended { added, exhausted: seq.exhausted })
  }

  /// Load pages until the sequence is exhausted or `max_pages` more pages
  /// have been appended.
  pub async fn load_pages<P>(&self, source: &P, max_pages: Option<u32>) -> Result<(), FetchError>
  where
    P: PageSource<T> + ?Sized,
  {
    let mut loaded = 0;
    while max_pages.is_none_or(|max| loaded < max) {
      match self.load_more(source).await? {
        LoadOutcome::Appended { exhausted, .. } => {
          loaded += 1;
          if exhausted {
            break;
          }
        }
        LoadOutcome::Exhausted | LoadOutcome::Stale => break,
      }
    }
    Ok(())
  }

  /// Accumulated items in arrival order.
  pub fn items(&self) -> Vec<T> {
    self
      .lock()
      .sequence
      .as_ref()
      .map(|s| s.items.clone())
      .unwrap_or_default()
  }

  /// Server-reported total for the active key, once a page has arrived.
  pub fn total_count(&self) -> Option<u64> {
    self.lock().sequence.as_ref().and_then(|s| s.total_count)
  }

  pub fn is_exhausted(&self) -> bool {
    self.lock().sequence.as_ref().is_some_and(|s| s.exhausted)
  }

  /// Accumulated items re-sorted in memory; no fetch happens.
  pub fn sorted(&self, field: T::Field, order: SortOrder) -> Vec<T>
  where
    T: Sortable,
  {
    let mut items = self.items();
    sort_by_field(&mut items, field, order);
    items
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use outreach_core::sort::SortValue;
  use tokio::sync::Notify;

  use super::*;

  #[derive(Debug, Clone, PartialEq)]
  struct Item {
    id:   i64,
    name: String,
  }

  impl Identified for Item {
    fn id(&self) -> i64 { self.id }
  }

  impl Sortable for Item {
    type Field = ();

    fn sort_value(&self, _: ()) -> SortValue { SortValue::folded(&self.name) }
  }

  fn item(id: i64, name: &str) -> Item { Item { id, name: name.to_owned() } }

  /// Serves fixed pages per status; counts fetches.
  struct Fixture {
    pages:   Vec<Vec<Item>>,
    total:   u64,
    fetches: AtomicUsize,
    /// When set, fetches wait for a notification before resolving.
    gate:    Option<Arc<Notify>>,
  }

  impl Fixture {
    fn new(pages: Vec<Vec<Item>>) -> Self {
      let total = pages.iter().map(|p| p.len() as u64).sum();
      Self { pages, total, fetches: AtomicUsize::new(0), gate: None }
    }
  }

  impl PageSource<Item> for Fixture {
    fn fetch(
      &self,
      key: &CacheKey,
      page: PageRequest,
    ) -> BoxFuture<'static, anyhow::Result<Page<Item>>> {
      self.fetches.fetch_add(1, Ordering::SeqCst);
      let mut items = self.pages.get(page.page as usize).cloned().unwrap_or_default();
      if let Some(status) = &key.status {
        for i in &mut items {
          i.name = format!("{status}-{}", i.name);
        }
      }
      let result = Page::new(items, self.total, page);
      let gate = self.gate.clone();
      async move {
        if let Some(gate) = gate {
          gate.notified().await;
        }
        Ok(result)
      }
      .boxed()
    }
  }

  fn key(status: Option<&str>) -> CacheKey {
    CacheKey::new(EntityKind::Leads, status.map(str::to_owned), None)
  }

  #[tokio::test]
  async fn pages_accumulate_until_a_short_page() {
    let source = Fixture::new(vec![
      vec![item(1, "a"), item(2, "b")],
      vec![item(3, "c"), item(4, "d")],
      vec![item(5, "e")],
    ]);
    let cache = CollectionCache::new(2);
    cache.activate(key(None));

    cache.load_pages(&source, None).await.unwrap();
    let ids: Vec<i64> = cache.items().iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert!(cache.is_exhausted());
    assert_eq!(cache.total_count(), Some(5));

    assert_eq!(cache.load_more(&source).await.unwrap(), LoadOutcome::Exhausted);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn duplicates_across_pages_are_dropped() {
    // Item 2 shifts onto page 1 as if a row were inserted between fetches.
    let mut source = Fixture::new(vec![
      vec![item(1, "a"), item(2, "b")],
      vec![item(2, "b"), item(3, "c")],
      vec![],
    ]);
    source.total = 5;
    let cache = CollectionCache::new(2);
    cache.activate(key(None));

    assert_eq!(
      cache.load_more(&source).await.unwrap(),
      LoadOutcome::Appended { added: 2, exhausted: false }
    );
    assert_eq!(
      cache.load_more(&source).await.unwrap(),
      LoadOutcome::Appended { added: 1, exhausted: false }
    );
    let ids: Vec<i64> = cache.items().iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn changing_the_key_starts_over() {
    let source = Fixture::new(vec![vec![item(1, "a")]]);
    let cache = CollectionCache::new(20);

    cache.activate(key(Some("active")));
    cache.load_more(&source).await.unwrap();
    assert_eq!(cache.items()[0].name, "active-a");

    cache.activate(key(Some("draft")));
    assert!(cache.items().is_empty());
    assert!(!cache.is_exhausted());
    cache.load_more(&source).await.unwrap();

    cache.activate(key(Some("active")));
    assert!(cache.items().is_empty());
    cache.load_more(&source).await.unwrap();
    let names: Vec<String> = cache.items().into_iter().map(|i| i.name).collect();
    assert_eq!(names, vec!["active-a"]);
  }

  #[tokio::test]
  async fn reactivating_the_same_key_keeps_items() {
    let source = Fixture::new(vec![vec![item(1, "a")]]);
    let cache = CollectionCache::new(20);
    cache.activate(key(Some("all")));
    cache.load_more(&source).await.unwrap();
    // "all" and no filter are the same key.
    cache.activate(key(None));
    assert_eq!(cache.items().len(), 1);
  }

  #[tokio::test]
  async fn concurrent_loads_share_one_fetch() {
    let gate = Arc::new(Notify::new());
    let mut source = Fixture::new(vec![vec![item(1, "a"), item(2, "b")], vec![]]);
    source.gate = Some(gate.clone());
    let cache = CollectionCache::new(2);
    cache.activate(key(None));

    let (a, b, _) = tokio::join!(cache.load_more(&source), cache.load_more(&source), async {
      tokio::task::yield_now().await;
      gate.notify_waiters();
    });

    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    let added = [a.unwrap(), b.unwrap()]
      .iter()
      .map(|o| match o {
        LoadOutcome::Appended { added, .. } => *added,
        other => panic!("unexpected {other:?}"),
      })
      .sum::<usize>();
    assert_eq!(added, 2);
    assert_eq!(cache.items().len(), 2);
  }

  #[tokio::test]
  async fn results_for_a_stale_key_are_discarded() {
    let gate = Arc::new(Notify::new());
    let mut source = Fixture::new(vec![vec![item(1, "a")]]);
    source.gate = Some(gate.clone());
    let cache = CollectionCache::new(20);
    cache.activate(key(Some("active")));

    let (outcome, _) = tokio::join!(cache.load_more(&source), async {
      tokio::task::yield_now().await;
      cache.activate(key(Some("paused")));
      gate.notify_waiters();
    });

    assert_eq!(outcome.unwrap(), LoadOutcome::Stale);
    assert!(cache.items().is_empty());
  }

  #[tokio::test]
  async fn invalidation_refetches_from_page_zero() {
    let source = Fixture::new(vec![vec![item(1, "a")]]);
    let cache = CollectionCache::new(20);
    cache.activate(key(None));
    cache.load_more(&source).await.unwrap();
    assert!(cache.is_exhausted());

    // Other entities are unaffected.
    cache.invalidate(EntityKind::Campaigns);
    assert_eq!(cache.items().len(), 1);

    cache.invalidate(EntityKind::Leads);
    assert!(cache.items().is_empty());
    assert!(!cache.is_exhausted());
    cache.load_more(&source).await.unwrap();
    assert_eq!(cache.items().len(), 1);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn client_sort_does_not_fetch() {
    let source = Fixture::new(vec![vec![item(1, "b"), item(2, "C"), item(3, "a")]]);
    let cache = CollectionCache::new(20);
    cache.activate(key(None));
    cache.load_more(&source).await.unwrap();

    let asc: Vec<i64> = cache.sorted((), SortOrder::Asc).iter().map(|i| i.id).collect();
    let desc: Vec<i64> = cache.sorted((), SortOrder::Desc).iter().map(|i| i.id).collect();
    assert_eq!(asc, vec![3, 1, 2]);
    assert_eq!(desc, vec![2, 1, 3]);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn key_params_carry_filters_and_window() {
    let k = CacheKey::new(EntityKind::Leads, Some("responded".into()), Some(" acme ".into()));
    let p = k.params(PageRequest::new(3, 20));
    assert_eq!(p.status.as_deref(), Some("responded"));
    assert_eq!(p.search.as_deref(), Some("acme"));
    assert_eq!(p.page.as_deref(), Some("3"));
    assert_eq!(p.limit.as_deref(), Some("20"));
    assert_eq!(p.sort_by, None);
  }
}
