//! Core traits and types for the revalidation cache.

use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::RawPage;
use crate::error::FetchError;

/// Factory for the request that (re)fills one cache key.
///
/// The cache keeps the most recent fetcher per key so invalidation can
/// refetch on behalf of mounted subscribers.
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<RawPage, FetchError>> + Send + Sync>;

/// Observable state of one cache key.
#[derive(Debug, Clone, Default)]
pub struct KeyState {
  /// Last successful page for this key. Kept when a later fetch fails.
  pub data: Option<Arc<RawPage>>,
  /// Error of the most recent settled fetch, cleared by the next success.
  pub error: Option<Arc<FetchError>>,
  /// A request for this key is in flight.
  pub is_validating: bool,
  pub fetches_started: u64,
  pub fetches_settled: u64,
}

impl KeyState {
  /// In flight with nothing to show yet.
  pub fn is_loading(&self) -> bool {
    self.is_validating && self.data.is_none()
  }
}

/// A mounted subscriber of one cache key.
///
/// Dropping the subscription unmounts it: the cache stops refetching the key
/// on its behalf and the subscriber never sees later deliveries for it.
pub struct Subscription {
  key: String,
  rx: watch::Receiver<KeyState>,
  release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
  pub fn new(key: impl Into<String>, rx: watch::Receiver<KeyState>) -> Self {
    Self {
      key: key.into(),
      rx,
      release: None,
    }
  }

  /// Run `release` when this subscription is dropped, before its receiver
  /// goes away.
  pub fn on_release(mut self, release: impl FnOnce() + Send + Sync + 'static) -> Self {
    self.release = Some(Box::new(release));
    self
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  /// Current state without marking it seen.
  pub fn current(&self) -> KeyState {
    self.rx.borrow().clone()
  }

  /// Current state, marking it seen.
  pub fn latest(&mut self) -> KeyState {
    self.rx.borrow_and_update().clone()
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription").field("key", &self.key).finish_non_exhaustive()
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(release) = self.release.take() {
      release();
    }
  }
}

/// Key-addressed request cache shared by every controller and one-shot call.
pub trait RevalidationCache: Send + Sync {
  /// Mount a subscriber on `key`, fetching unless a request is already in
  /// flight. A settled key is always refetched; its last page stays visible
  /// meanwhile.
  fn subscribe(&self, key: &str, fetcher: Fetcher) -> Subscription;

  /// Start a fetch for `key` unless one is already in flight.
  ///
  /// Returns `true` if a new request was started, `false` if the caller
  /// joined the in-flight one.
  fn fetch_or_join(&self, key: &str, fetcher: Fetcher) -> bool;

  /// Refetch every mounted key starting with `prefix` and drop unmounted
  /// ones. Returns how many keys were refetched.
  fn invalidate_by_prefix(&self, prefix: &str) -> usize;
}
