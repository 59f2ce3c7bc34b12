//! Prefix invalidation shared by list refreshes and one-shot mutations.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::{Debouncer, RevalidationCache};

/// Invalidates endpoint families and keeps the dashboard metrics in sync.
///
/// Clones share one debouncer, so a burst of refreshes from any screen
/// produces a single metrics invalidation.
#[derive(Clone)]
pub struct Refresher {
  cache: Arc<dyn RevalidationCache>,
  metrics_prefix: Arc<str>,
  metrics: Arc<Debouncer>,
}

impl Refresher {
  pub fn new(
    cache: Arc<dyn RevalidationCache>,
    metrics_prefix: impl Into<String>,
    metrics_debounce: Duration,
  ) -> Self {
    Self {
      cache,
      metrics_prefix: Arc::from(metrics_prefix.into()),
      metrics: Arc::new(Debouncer::new(metrics_debounce)),
    }
  }

  pub fn cache(&self) -> &Arc<dyn RevalidationCache> {
    &self.cache
  }

  /// Refetch every mounted key under `base_path` now, and the dashboard
  /// metrics once the refresh burst has quietened.
  pub fn refresh(&self, base_path: &str) -> usize {
    let refetched = self.cache.invalidate_by_prefix(base_path);
    debug!(base_path, refetched, "refresh");

    let cache = Arc::clone(&self.cache);
    let prefix = Arc::clone(&self.metrics_prefix);
    self.metrics.call(move || {
      cache.invalidate_by_prefix(&prefix);
    });
    refetched
  }
}
