//! In-memory revalidation cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::traits::{Fetcher, KeyState, RevalidationCache, Subscription};

struct Entry {
  tx: watch::Sender<KeyState>,
  fetcher: Fetcher,
  in_flight: bool,
  /// An invalidation arrived while a request was in flight.
  refetch_queued: bool,
}

impl Entry {
  fn new(fetcher: Fetcher) -> Self {
    let (tx, _) = watch::channel(KeyState::default());
    Self {
      tx,
      fetcher,
      in_flight: false,
      refetch_queued: false,
    }
  }

  fn subscribers(&self) -> usize {
    self.tx.receiver_count()
  }
}

type Entries = HashMap<String, Entry>;

/// Process-wide cache keyed by request key (`endpointPath?queryString`).
///
/// Guarantees at most one in-flight request per key; concurrent subscribers
/// of a key share its result. Successful pages replace the stored page,
/// failures keep it and record the error.
///
/// An entry lives only while it has subscribers or a request in flight, so
/// the map holds roughly one key per mounted controller.
#[derive(Clone)]
pub struct SwrCache {
  entries: Arc<Mutex<Entries>>,
}

impl Default for SwrCache {
  fn default() -> Self {
    Self::new()
  }
}

impl SwrCache {
  pub fn new() -> Self {
    Self {
      entries: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  fn lock(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Snapshot of a key's state, if the key is cached.
  pub fn peek(&self, key: &str) -> Option<KeyState> {
    Self::lock(&self.entries)
      .get(key)
      .map(|entry| entry.tx.borrow().clone())
  }

  /// Number of cached keys.
  pub fn len(&self) -> usize {
    Self::lock(&self.entries).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Start a request for `key`. Caller holds the lock and has checked that
  /// nothing is in flight.
  fn start_fetch(shared: &Arc<Mutex<Entries>>, entries: &mut Entries, key: &str) {
    let Some(entry) = entries.get_mut(key) else {
      return;
    };
    entry.in_flight = true;
    entry.tx.send_modify(|state| {
      state.is_validating = true;
      state.fetches_started += 1;
    });
    debug!(key, "fetch started");

    let request = (entry.fetcher)();
    let shared_for_task = Arc::clone(shared);
    let key = key.to_string();
    tokio::spawn(async move {
      let result = request.await;
      let mut entries = Self::lock(&shared_for_task);
      let Some(entry) = entries.get_mut(&key) else {
        // Evicted while in flight.
        return;
      };
      entry.in_flight = false;
      entry.tx.send_modify(|state| {
        state.is_validating = false;
        state.fetches_settled += 1;
        match result {
          Ok(page) => {
            state.data = Some(Arc::new(page));
            state.error = None;
          }
          Err(err) => {
            warn!(key = %key, error = %err, "fetch failed");
            state.error = Some(Arc::new(err));
          }
        }
      });
      debug!(key = %key, "fetch settled");

      if entry.refetch_queued {
        entry.refetch_queued = false;
        Self::start_fetch(&shared_for_task, &mut entries, &key);
      } else if entry.subscribers() == 0 {
        entries.remove(&key);
        debug!(key = %key, "released after last subscriber left");
      }
    });
  }

  /// Drop hook of a subscription on `key`. Runs before the subscription's
  /// receiver is dropped, so that receiver is still counted.
  fn release(shared: &Weak<Mutex<Entries>>, key: &str) {
    let Some(shared) = shared.upgrade() else {
      return;
    };
    let mut entries = Self::lock(&shared);
    let idle = entries
      .get(key)
      .is_some_and(|entry| !entry.in_flight && entry.subscribers() <= 1);
    if idle {
      entries.remove(key);
      debug!(key, "released");
    }
  }
}

impl RevalidationCache for SwrCache {
  fn subscribe(&self, key: &str, fetcher: Fetcher) -> Subscription {
    let mut entries = Self::lock(&self.entries);
    let entry = entries
      .entry(key.to_string())
      .or_insert_with(|| Entry::new(Arc::clone(&fetcher)));
    entry.fetcher = fetcher;
    let rx = entry.tx.subscribe();

    if entry.in_flight {
      debug!(key, "subscribed to in-flight key");
    } else {
      Self::start_fetch(&self.entries, &mut entries, key);
    }

    let shared = Arc::downgrade(&self.entries);
    let owned_key = key.to_string();
    Subscription::new(key, rx).on_release(move || Self::release(&shared, &owned_key))
  }

  fn fetch_or_join(&self, key: &str, fetcher: Fetcher) -> bool {
    let mut entries = Self::lock(&self.entries);
    let entry = entries
      .entry(key.to_string())
      .or_insert_with(|| Entry::new(Arc::clone(&fetcher)));
    entry.fetcher = fetcher;
    if entry.in_flight {
      debug!(key, "joined in-flight request");
      return false;
    }
    Self::start_fetch(&self.entries, &mut entries, key);
    true
  }

  fn invalidate_by_prefix(&self, prefix: &str) -> usize {
    let mut entries = Self::lock(&self.entries);
    let matching: Vec<String> = entries
      .keys()
      .filter(|key| key.starts_with(prefix))
      .cloned()
      .collect();

    let mut refetched = 0;
    for key in matching {
      let Some(entry) = entries.get_mut(&key) else {
        continue;
      };
      if entry.subscribers() == 0 {
        entries.remove(&key);
        continue;
      }
      refetched += 1;
      if entry.in_flight {
        entry.refetch_queued = true;
      } else {
        Self::start_fetch(&self.entries, &mut entries, &key);
      }
    }
    debug!(prefix, refetched, "invalidated");
    refetched
  }
}
