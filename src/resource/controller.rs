//! Paged resource controller.
//!
//! [`PagedResource`] binds a mutable filter to a remote paged collection.
//! Setters only record state; the synchronization pass in
//! [`poll`](PagedResource::poll) folds the individual state slots back into
//! one [`FilterCriteria`], (re)subscribes to the shared cache when the
//! request key changed, and applies whatever the cache has for that key.
//!
//! # Example
//!
//! ```ignore
//! let mut samples: PagedResource<Sample> =
//!     PagedResource::passive(screens::SAMPLES, FilterCriteria::default(), source, refresher)?;
//!
//! // In the event loop tick
//! if samples.poll() {
//!     // State changed, re-render
//! }
//!
//! // In render
//! if samples.is_loading() && !samples.loaded() {
//!     render_skeleton();
//! } else if samples.items().is_empty() {
//!     render_empty_tile();
//! } else {
//!     render_rows(samples.items(), samples.is_validating());
//! }
//! ```

use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::api::{PageSource, RawPage};
use crate::cache::{Fetcher, KeyState, Subscription};
use crate::error::{FetchError, FilterError};
use crate::filter::{check_field, FilterCriteria, FilterValue, DEFAULT_PAGE_SIZE, PAGE_SIZES};
use crate::pagination::{paginate, Pagination};

use super::refresh::Refresher;
use super::screens::ResourceSpec;

/// How a controller decides when to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
  /// Fetch on the first poll and whenever the request key changes.
  Passive,
  /// Fetch nothing until [`PagedResource::activate`] is called.
  Lazy,
}

/// Live, paginated, revalidatable view over one collection endpoint.
pub struct PagedResource<T> {
  spec: ResourceSpec,
  source: Arc<dyn PageSource>,
  refresher: Refresher,
  mode: FetchMode,
  activated: bool,

  // Mutable state slots, folded into `filter` by `synchronize`.
  filter: FilterCriteria,
  current_page: u32,
  page_size: u32,
  search: String,
  pending_search: Option<(String, Instant)>,
  search_debounce: Duration,
  fields: BTreeMap<&'static str, Option<FilterValue>>,
  dirty: bool,

  subscription: Option<Subscription>,
  applied_page: Option<Arc<RawPage>>,
  decode_error: Option<Arc<FetchError>>,

  items: Vec<T>,
  pagination: Pagination,
  total_count: Option<u64>,
  is_loading: bool,
  is_validating: bool,
  error: Option<Arc<FetchError>>,
  loaded: bool,
}

impl<T: DeserializeOwned + Clone> PagedResource<T> {
  /// Controller that fetches as soon as it is first polled.
  pub fn passive(
    spec: ResourceSpec,
    defaults: FilterCriteria,
    source: Arc<dyn PageSource>,
    refresher: Refresher,
  ) -> Result<Self, FilterError> {
    Self::new(FetchMode::Passive, spec, defaults, source, refresher)
  }

  /// Controller that waits for [`activate`](Self::activate).
  pub fn lazy(
    spec: ResourceSpec,
    defaults: FilterCriteria,
    source: Arc<dyn PageSource>,
    refresher: Refresher,
  ) -> Result<Self, FilterError> {
    Self::new(FetchMode::Lazy, spec, defaults, source, refresher)
  }

  fn new(
    mode: FetchMode,
    spec: ResourceSpec,
    defaults: FilterCriteria,
    source: Arc<dyn PageSource>,
    refresher: Refresher,
  ) -> Result<Self, FilterError> {
    defaults.validate(spec.fields)?;

    let mut controller = Self {
      spec,
      source,
      refresher,
      mode,
      activated: false,
      filter: defaults,
      current_page: 1,
      page_size: DEFAULT_PAGE_SIZE,
      search: String::new(),
      pending_search: None,
      search_debounce: Duration::ZERO,
      fields: BTreeMap::new(),
      dirty: true,
      subscription: None,
      applied_page: None,
      decode_error: None,
      items: Vec::new(),
      pagination: Pagination::empty(DEFAULT_PAGE_SIZE),
      total_count: None,
      is_loading: false,
      is_validating: false,
      error: None,
      loaded: false,
    };
    controller.mirror_filter();
    controller.pagination = Pagination::empty(controller.page_size);
    Ok(controller)
  }

  /// Delay applied to [`set_search_string`](Self::set_search_string) before
  /// the search text reaches the filter.
  pub fn with_search_debounce(mut self, delay: Duration) -> Self {
    self.search_debounce = delay;
    self
  }

  /// Copy `self.filter` into the individual state slots.
  fn mirror_filter(&mut self) {
    self.current_page = self.filter.start_index.saturating_add(1);
    self.page_size = if self.filter.limit == 0 {
      DEFAULT_PAGE_SIZE
    } else {
      self.filter.limit
    };
    self.search = self.filter.q.clone();
    self.fields = self
      .spec
      .fields
      .iter()
      .map(|field| (field.name, self.filter.fields.get(field.name).cloned()))
      .collect();
  }

  // ==========================================================================
  // Mutators. None of these fetch; the next poll does.
  // ==========================================================================

  /// Set the search text. Does not reset the current page.
  pub fn set_search_string(&mut self, search: impl Into<String>) {
    let search = search.into();
    if self.search_debounce.is_zero() {
      self.pending_search = None;
      self.search = search;
      self.dirty = true;
    } else {
      self.pending_search = Some((search, Instant::now()));
    }
  }

  /// Set the one-based page number.
  pub fn set_current_page(&mut self, page: u32) {
    self.current_page = page.max(1);
    self.dirty = true;
  }

  /// Set the page size. Keeps the current page number.
  pub fn set_page_size(&mut self, page_size: u32) {
    self.page_size = page_size.max(1);
    self.dirty = true;
  }

  /// Set or clear (`None`) a declared domain filter field.
  ///
  /// Does not reset the current page.
  pub fn set_field(&mut self, name: &str, value: Option<FilterValue>) -> Result<(), FilterError> {
    let field = self
      .spec
      .field(name)
      .ok_or_else(|| FilterError::UndeclaredField(name.to_string()))?;
    if let Some(value) = &value {
      check_field(self.spec.fields, name, value)?;
    }
    self.fields.insert(field.name, value);
    self.dirty = true;
    Ok(())
  }

  /// Shorthand for `set_field(name, None)`.
  pub fn clear_field(&mut self, name: &str) -> Result<(), FilterError> {
    self.set_field(name, None)
  }

  /// Supply the first filter and start fetching.
  ///
  /// This is the trigger for lazy controllers; on a passive controller it
  /// replaces the filter wholesale. The request is issued immediately.
  pub fn activate(&mut self, filter: FilterCriteria) -> Result<(), FilterError> {
    filter.validate(self.spec.fields)?;
    info!(resource = self.spec.name, "activated");
    self.filter = filter;
    self.mirror_filter();
    self.pending_search = None;
    self.dirty = false;
    self.activated = true;
    self.ensure_subscribed();
    Ok(())
  }

  /// Invalidate every cached key under this resource's endpoint path, which
  /// makes every mounted controller of the resource refetch.
  pub fn refresh(&self) -> usize {
    self.refresher.refresh(self.spec.path)
  }

  // ==========================================================================
  // Synchronization pass
  // ==========================================================================

  /// Run one synchronization pass.
  ///
  /// Returns `true` if any observable state changed. Call this from the
  /// event loop tick or before rendering.
  pub fn poll(&mut self) -> bool {
    let mut changed = self.commit_search();
    changed |= self.synchronize();
    if self.fetch_enabled() {
      changed |= self.ensure_subscribed();
    }
    changed | self.apply_key_state()
  }

  fn fetch_enabled(&self) -> bool {
    match self.mode {
      FetchMode::Passive => true,
      FetchMode::Lazy => self.activated,
    }
  }

  fn commit_search(&mut self) -> bool {
    let due = match &self.pending_search {
      Some((_, at)) => at.elapsed() >= self.search_debounce,
      None => false,
    };
    if !due {
      return false;
    }
    if let Some((search, _)) = self.pending_search.take() {
      self.search = search;
      self.dirty = true;
    }
    true
  }

  /// Fold the state slots into a new filter. `totalCount` and `v` are
  /// carried over from the existing filter.
  fn synchronize(&mut self) -> bool {
    if !self.dirty {
      return false;
    }
    self.dirty = false;

    let next = FilterCriteria {
      start_index: self.current_page.saturating_sub(1),
      limit: self.page_size,
      q: self.search.clone(),
      total_count: self.filter.total_count,
      v: self.filter.v.clone(),
      fields: self
        .fields
        .iter()
        .filter_map(|(name, value)| value.clone().map(|v| (name.to_string(), v)))
        .collect(),
    };
    if next == self.filter {
      return false;
    }
    self.filter = next;
    true
  }

  /// Subscribe to the current request key if not already subscribed to it.
  fn ensure_subscribed(&mut self) -> bool {
    let key = self.filter.request_key(self.spec.path);
    if self.request_key() == Some(key.as_str()) {
      return false;
    }

    // Unsubscribe first so late deliveries for the old key never land here.
    self.subscription = None;
    self.decode_error = None;
    debug!(resource = self.spec.name, key = %key, "subscribing");

    let source = Arc::clone(&self.source);
    let fetch_key = key.clone();
    let fetcher: Fetcher = Arc::new(move || source.fetch_page(&fetch_key));
    self.subscription = Some(self.refresher.cache().subscribe(&key, fetcher));
    true
  }

  fn apply_key_state(&mut self) -> bool {
    let Some(subscription) = self.subscription.as_mut() else {
      return false;
    };
    let state = subscription.latest();
    let mut changed = self.apply_page(&state);

    let started = match self.mode {
      FetchMode::Passive => state.fetches_started > 0,
      FetchMode::Lazy => state.fetches_settled > 0,
    };
    if !self.loaded && (started || state.data.is_some()) {
      self.loaded = true;
      changed = true;
    }

    let error = state.error.clone().or_else(|| self.decode_error.clone());
    let flags = (state.is_loading(), state.is_validating);
    if flags != (self.is_loading, self.is_validating) || !same_error(&error, &self.error) {
      (self.is_loading, self.is_validating) = flags;
      self.error = error;
      changed = true;
    }
    changed
  }

  /// Decode a newly delivered page. Items are only replaced on success.
  fn apply_page(&mut self, state: &KeyState) -> bool {
    let Some(page) = &state.data else {
      return false;
    };
    if self
      .applied_page
      .as_ref()
      .is_some_and(|applied| Arc::ptr_eq(applied, page))
    {
      return false;
    }
    self.applied_page = Some(Arc::clone(page));

    match page.decode::<T>() {
      Ok(decoded) => {
        let (items, pagination) = paginate(
          &decoded.results,
          self.page_size,
          self.current_page,
          decoded.total_count,
        );
        self.items = items;
        self.pagination = pagination;
        self.total_count = decoded.total_count;
        self.decode_error = None;
      }
      Err(err) => {
        warn!(resource = self.spec.name, error = %err, "page rejected");
        self.decode_error = Some(Arc::new(err));
      }
    }
    true
  }

  // ==========================================================================
  // Returned state
  // ==========================================================================

  pub fn spec(&self) -> &ResourceSpec {
    &self.spec
  }

  pub fn mode(&self) -> FetchMode {
    self.mode
  }

  /// Current page slice.
  pub fn items(&self) -> &[T] {
    &self.items
  }

  pub fn pagination(&self) -> &Pagination {
    &self.pagination
  }

  pub fn total_count(&self) -> Option<u64> {
    self.total_count
  }

  pub fn current_page(&self) -> u32 {
    self.current_page
  }

  pub fn page_size(&self) -> u32 {
    self.page_size
  }

  pub fn page_sizes(&self) -> &'static [u32] {
    &PAGE_SIZES
  }

  /// Search text as last typed, including a not-yet-committed value.
  pub fn search_string(&self) -> &str {
    match &self.pending_search {
      Some((search, _)) => search,
      None => &self.search,
    }
  }

  pub fn field(&self, name: &str) -> Option<&FilterValue> {
    self.fields.get(name).and_then(Option::as_ref)
  }

  /// Filter as of the last synchronization pass.
  pub fn filter(&self) -> &FilterCriteria {
    &self.filter
  }

  /// Key the controller is currently subscribed to.
  pub fn request_key(&self) -> Option<&str> {
    self.subscription.as_ref().map(Subscription::key)
  }

  /// A fetch is in flight and the current key has no data yet.
  pub fn is_loading(&self) -> bool {
    self.is_loading
  }

  /// A fetch for the current key is in flight.
  pub fn is_validating(&self) -> bool {
    self.is_validating
  }

  pub fn is_error(&self) -> bool {
    self.error.is_some()
  }

  pub fn error(&self) -> Option<&FetchError> {
    self.error.as_deref()
  }

  /// Whether the first load has happened. Never reverts to `false`.
  pub fn loaded(&self) -> bool {
    self.loaded
  }
}

fn same_error(a: &Option<Arc<FetchError>>, b: &Option<Arc<FetchError>>) -> bool {
  match (a, b) {
    (Some(a), Some(b)) => Arc::ptr_eq(a, b),
    (None, None) => true,
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{RevalidationCache, SwrCache};
  use crate::filter::Representation;
  use crate::resource::screens::{SAMPLES, TEST_REQUESTS, WORKSHEETS};
  use futures::future::BoxFuture;
  use serde::Deserialize;
  use serde_json::json;
  use std::sync::Mutex;
  use url::form_urlencoded;

  #[derive(Debug, Clone, PartialEq, Deserialize)]
  struct Row {
    id: String,
  }

  type Respond = Box<dyn Fn(&str) -> Result<RawPage, FetchError> + Send + Sync>;

  /// Page source that records requested keys and answers after a delay.
  struct MockSource {
    calls: Mutex<Vec<String>>,
    delay: Duration,
    respond: Respond,
  }

  impl MockSource {
    fn new(delay: Duration, respond: Respond) -> Arc<Self> {
      Arc::new(Self {
        calls: Mutex::new(Vec::new()),
        delay,
        respond,
      })
    }

    fn calls(&self) -> Vec<String> {
      self.calls.lock().unwrap().clone()
    }

    fn calls_under(&self, prefix: &str) -> usize {
      self.calls().iter().filter(|k| k.starts_with(prefix)).count()
    }
  }

  impl PageSource for MockSource {
    fn fetch_page(&self, key: &str) -> BoxFuture<'static, Result<RawPage, FetchError>> {
      self.calls.lock().unwrap().push(key.to_string());
      let result = (self.respond)(key);
      let delay = self.delay;
      Box::pin(async move {
        tokio::time::sleep(delay).await;
        result
      })
    }
  }

  fn param(key: &str, name: &str) -> Option<String> {
    let query = key.split_once('?').map(|(_, q)| q).unwrap_or("");
    form_urlencoded::parse(query.as_bytes())
      .find(|(k, _)| k == name)
      .map(|(_, v)| v.into_owned())
  }

  /// Two rows named after the requested page offset.
  fn rows_for(key: &str) -> RawPage {
    let start = param(key, "startIndex").unwrap_or_default();
    RawPage {
      results: vec![
        json!({ "id": format!("p{}-a", start) }),
        json!({ "id": format!("p{}-b", start) }),
      ],
      total_count: Some(40),
    }
  }

  fn ids(rows: &[Row]) -> Vec<&str> {
    rows.iter().map(|r| r.id.as_str()).collect()
  }

  fn refresher() -> Refresher {
    refresher_over(&SwrCache::new())
  }

  fn refresher_over(cache: &SwrCache) -> Refresher {
    let cache: Arc<dyn RevalidationCache> = Arc::new(cache.clone());
    Refresher::new(cache, "/labmanagement/dashboard-metrics", Duration::from_millis(300))
  }

  fn passive(
    spec: ResourceSpec,
    source: &Arc<MockSource>,
    refresher: &Refresher,
  ) -> PagedResource<Row> {
    let source: Arc<dyn PageSource> = source.clone();
    PagedResource::passive(spec, FilterCriteria::default(), source, refresher.clone()).unwrap()
  }

  async fn settle(controller: &mut PagedResource<Row>) {
    for _ in 0..100 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      controller.poll();
      if !controller.is_validating() {
        return;
      }
    }
  }

  #[tokio::test]
  async fn test_page_change_issues_one_fetch() {
    let source = MockSource::new(Duration::from_millis(10), Box::new(|k| Ok(rows_for(k))));
    let mut requests = passive(TEST_REQUESTS, &source, &refresher());

    requests.poll();
    settle(&mut requests).await;
    assert_eq!(
      source.calls(),
      vec!["/labmanagement/test-request?startIndex=0&limit=10&totalCount=true&v=default"]
    );

    requests.set_current_page(3);
    assert_eq!(source.calls().len(), 1, "setters must not fetch");

    requests.poll();
    assert_eq!(requests.filter().start_index, 2);
    assert_eq!(requests.filter().limit, 10);
    requests.poll();
    requests.poll();
    assert_eq!(source.calls().len(), 2);
    assert_eq!(
      source.calls()[1],
      "/labmanagement/test-request?startIndex=2&limit=10&totalCount=true&v=default"
    );

    settle(&mut requests).await;
    assert_eq!(ids(requests.items()), vec!["p2-a", "p2-b"]);
    assert_eq!(requests.total_count(), Some(40));
    assert_eq!(requests.pagination().current_page, 3);
    assert_eq!(requests.pagination().total_pages, 4);
    assert_eq!(source.calls().len(), 2);
  }

  #[tokio::test]
  async fn test_revisited_page_is_fetched_again() {
    let source = MockSource::new(Duration::ZERO, Box::new(|k| Ok(rows_for(k))));
    let mut samples = passive(SAMPLES, &source, &refresher());

    for page in [1, 2, 1] {
      samples.set_current_page(page);
      samples.poll();
      settle(&mut samples).await;
    }
    let starts: Vec<_> = source
      .calls()
      .iter()
      .map(|k| param(k, "startIndex").unwrap_or_default())
      .collect();
    assert_eq!(starts, vec!["0", "1", "0"]);
    assert_eq!(ids(samples.items()), vec!["p0-a", "p0-b"]);
  }

  #[tokio::test]
  async fn test_paging_keeps_cache_bounded() {
    let source = MockSource::new(Duration::ZERO, Box::new(|k| Ok(rows_for(k))));
    let cache = SwrCache::new();
    let mut samples = passive(SAMPLES, &source, &refresher_over(&cache));

    for page in 1..=50 {
      samples.set_current_page(page);
      samples.poll();
      settle(&mut samples).await;
      assert!(cache.len() <= 2, "page {} left {} keys", page, cache.len());
    }
    assert_eq!(source.calls().len(), 50);
    assert_eq!(cache.len(), 1);

    drop(samples);
    assert!(cache.is_empty());
  }

  #[tokio::test]
  async fn test_activate_rejects_start_index_past_last_page() {
    let source = MockSource::new(Duration::ZERO, Box::new(|k| Ok(rows_for(k))));
    let dyn_source: Arc<dyn PageSource> = source.clone();
    let mut results: PagedResource<Row> =
      PagedResource::lazy(SAMPLES, FilterCriteria::default(), dyn_source, refresher()).unwrap();

    let overflowing = FilterCriteria::from_query_string("startIndex=4294967295", SAMPLES.fields)
      .unwrap();
    assert!(matches!(
      results.activate(overflowing),
      Err(FilterError::InvalidValue { .. })
    ));
    assert_eq!(results.current_page(), 1);
    assert!(source.calls().is_empty());

    results
      .activate(FilterCriteria::default().with_start_index(u32::MAX - 1))
      .unwrap();
    assert_eq!(results.current_page(), u32::MAX);
    results.set_page_size(20);
    results.poll();
    assert_eq!(results.filter().start_index, u32::MAX - 1);
    assert_eq!(results.filter().limit, 20);
  }

  #[tokio::test]
  async fn test_start_index_tracks_current_page() {
    let source = MockSource::new(Duration::ZERO, Box::new(|k| Ok(rows_for(k))));
    let mut samples = passive(SAMPLES, &source, &refresher());

    for page in [1, 5, 2, 9, 9, 1] {
      samples.set_current_page(page);
      samples.poll();
      assert_eq!(samples.filter().start_index, page - 1);
      assert_eq!(samples.current_page(), page);
    }
  }

  #[tokio::test]
  async fn test_search_and_field_changes_keep_current_page() {
    let source = MockSource::new(Duration::ZERO, Box::new(|k| Ok(rows_for(k))));
    let mut samples = passive(SAMPLES, &source, &refresher());

    samples.set_current_page(4);
    samples.poll();
    samples.set_search_string("hb");
    samples
      .set_field("status", Some(FilterValue::Text("COLLECTED".into())))
      .unwrap();
    samples.poll();

    assert_eq!(samples.current_page(), 4);
    assert_eq!(samples.filter().start_index, 3);
    assert_eq!(samples.filter().q, "hb");
    assert_eq!(
      samples.filter().field("status"),
      Some(&FilterValue::Text("COLLECTED".into()))
    );
  }

  #[tokio::test]
  async fn test_search_is_debounced() {
    let source = MockSource::new(Duration::ZERO, Box::new(|k| Ok(rows_for(k))));
    let mut samples =
      passive(SAMPLES, &source, &refresher()).with_search_debounce(Duration::from_millis(50));

    samples.poll();
    samples.set_search_string("a");
    samples.set_search_string("ab");
    samples.poll();
    assert_eq!(samples.filter().q, "");
    assert_eq!(samples.search_string(), "ab");

    tokio::time::sleep(Duration::from_millis(80)).await;
    samples.poll();
    assert_eq!(samples.filter().q, "ab");
    assert_eq!(source.calls_under("/labmanagement/sample?"), 2);
    assert!(source.calls()[1].contains("q=ab"));
  }

  #[tokio::test]
  async fn test_total_count_and_representation_are_carried_over() {
    let source = MockSource::new(Duration::ZERO, Box::new(|k| Ok(rows_for(k))));
    let defaults = FilterCriteria::default()
      .with_total_count(false)
      .with_representation(Representation::Full)
      .with_limit(20);
    let dyn_source: Arc<dyn PageSource> = source.clone();
    let mut results: PagedResource<Row> =
      PagedResource::passive(WORKSHEETS, defaults, dyn_source, refresher()).unwrap();

    results.set_current_page(2);
    results.set_page_size(30);
    results.poll();
    assert!(!results.filter().total_count);
    assert_eq!(results.filter().v, Representation::Full);
    assert_eq!(
      results.request_key(),
      Some("/labmanagement/worksheet?startIndex=1&limit=30&totalCount=false&v=full")
    );
  }

  #[tokio::test]
  async fn test_stale_items_kept_on_error() {
    let source = MockSource::new(
      Duration::from_millis(5),
      Box::new(|k| {
        if k.contains("status=REJECTED") {
          Err(FetchError::server(500, json!({ "error": { "message": "boom" } })))
        } else {
          Ok(rows_for(k))
        }
      }),
    );
    let mut samples = passive(SAMPLES, &source, &refresher());
    samples.poll();
    settle(&mut samples).await;
    assert_eq!(ids(samples.items()), vec!["p0-a", "p0-b"]);
    assert!(!samples.is_error());

    samples
      .set_field("status", Some(FilterValue::Text("REJECTED".into())))
      .unwrap();
    samples.poll();
    settle(&mut samples).await;

    assert_eq!(ids(samples.items()), vec!["p0-a", "p0-b"]);
    assert!(samples.is_error());
    assert_eq!(samples.error().and_then(FetchError::status), Some(500));

    // Leaving the failing filter clears the flag again.
    samples.clear_field("status").unwrap();
    samples.poll();
    settle(&mut samples).await;
    assert!(!samples.is_error());
  }

  #[tokio::test]
  async fn test_malformed_rows_set_error_and_keep_items() {
    let source = MockSource::new(
      Duration::ZERO,
      Box::new(|k| {
        if param(k, "startIndex").as_deref() == Some("1") {
          Ok(RawPage {
            results: vec![json!({ "id": 5 })],
            total_count: None,
          })
        } else {
          Ok(rows_for(k))
        }
      }),
    );
    let mut samples = passive(SAMPLES, &source, &refresher());
    samples.poll();
    settle(&mut samples).await;

    samples.set_current_page(2);
    samples.poll();
    settle(&mut samples).await;
    assert!(matches!(samples.error(), Some(FetchError::Protocol(_))));
    assert_eq!(ids(samples.items()), vec!["p0-a", "p0-b"]);
  }

  #[tokio::test]
  async fn test_loaded_is_monotonic_in_passive_mode() {
    let source = MockSource::new(
      Duration::from_millis(20),
      Box::new(|k| {
        if param(k, "startIndex").as_deref() == Some("4") {
          Err(FetchError::transport("offline"))
        } else {
          Ok(rows_for(k))
        }
      }),
    );
    let mut requests = passive(TEST_REQUESTS, &source, &refresher());
    assert!(!requests.loaded());

    requests.poll();
    assert!(requests.loaded(), "loaded once the first fetch begins");
    assert!(requests.is_loading());

    settle(&mut requests).await;
    assert!(requests.loaded());
    assert!(!requests.is_loading());

    requests.set_current_page(5);
    requests.poll();
    assert!(requests.loaded());
    settle(&mut requests).await;
    assert!(requests.is_error());
    assert!(requests.loaded());
  }

  #[tokio::test]
  async fn test_lazy_controller_waits_for_activation() {
    let source = MockSource::new(Duration::from_millis(20), Box::new(|k| Ok(rows_for(k))));
    let dyn_source: Arc<dyn PageSource> = source.clone();
    let mut results: PagedResource<Row> =
      PagedResource::lazy(SAMPLES, FilterCriteria::default(), dyn_source, refresher()).unwrap();

    for _ in 0..3 {
      results.set_current_page(2);
      results.poll();
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(source.calls().is_empty());
    assert!(!results.loaded());
    assert!(results.request_key().is_none());

    results
      .activate(FilterCriteria::default().with_start_index(1).with_search("ur"))
      .unwrap();
    assert_eq!(source.calls().len(), 1);
    assert_eq!(results.current_page(), 2);
    assert_eq!(results.search_string(), "ur");

    results.poll();
    assert!(!results.loaded(), "lazy mode is loaded once the first fetch resolves");
    assert!(results.is_validating());

    settle(&mut results).await;
    assert!(results.loaded());
    assert_eq!(ids(results.items()), vec!["p1-a", "p1-b"]);
    assert_eq!(source.calls().len(), 1);
  }

  #[tokio::test]
  async fn test_refresh_refetches_only_matching_controllers() {
    let source = MockSource::new(Duration::ZERO, Box::new(|k| Ok(rows_for(k))));
    let refresher = refresher();
    let mut first = passive(SAMPLES, &source, &refresher);
    let mut second = passive(SAMPLES, &source, &refresher);
    let mut worksheets = passive(WORKSHEETS, &source, &refresher);
    second.set_current_page(2);

    for controller in [&mut first, &mut second, &mut worksheets] {
      controller.poll();
      settle(controller).await;
    }
    assert_eq!(source.calls_under(SAMPLES.path), 2);
    assert_eq!(source.calls_under(WORKSHEETS.path), 1);

    assert_eq!(first.refresh(), 2);
    for controller in [&mut first, &mut second, &mut worksheets] {
      settle(controller).await;
    }
    assert_eq!(source.calls_under(SAMPLES.path), 4);
    assert_eq!(source.calls_under(WORKSHEETS.path), 1);
  }

  #[tokio::test]
  async fn test_controllers_on_same_key_share_request() {
    let source = MockSource::new(Duration::from_millis(20), Box::new(|k| Ok(rows_for(k))));
    let refresher = refresher();
    let mut first = passive(SAMPLES, &source, &refresher);
    let mut second = passive(SAMPLES, &source, &refresher);

    first.poll();
    second.poll();
    assert_eq!(source.calls().len(), 1);

    settle(&mut first).await;
    settle(&mut second).await;
    assert_eq!(first.items(), second.items());
    assert_eq!(source.calls().len(), 1);
  }

  #[tokio::test]
  async fn test_undeclared_and_mistyped_fields_rejected() {
    let source = MockSource::new(Duration::ZERO, Box::new(|k| Ok(rows_for(k))));
    let mut samples = passive(SAMPLES, &source, &refresher());
    samples.poll();

    assert_eq!(
      samples.set_field("urgency", Some(FilterValue::Text("STAT".into()))),
      Err(FilterError::UndeclaredField("urgency".into()))
    );
    assert!(matches!(
      samples.set_field("includeTests", Some(FilterValue::Text("yes".into()))),
      Err(FilterError::KindMismatch { .. })
    ));
    samples.poll();
    assert!(samples.filter().fields.is_empty());

    let dyn_source: Arc<dyn PageSource> = source.clone();
    let bad_defaults = FilterCriteria::default().with_field("urgency", FilterValue::Bool(true));
    assert!(PagedResource::<Row>::passive(SAMPLES, bad_defaults, dyn_source, refresher()).is_err());
  }
}
