//! Trailing-edge debouncing of invalidation side effects.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Runs the last action handed to [`call`](Debouncer::call) once no new call
/// has arrived for `delay`.
pub struct Debouncer {
  delay: Duration,
  pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      pending: Mutex::new(None),
    }
  }

  pub fn delay(&self) -> Duration {
    self.delay
  }

  /// Schedule `action`, cancelling any action still waiting.
  pub fn call<F>(&self, action: F)
  where
    F: FnOnce() + Send + 'static,
  {
    let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(previous) = pending.take() {
      previous.abort();
    }
    let delay = self.delay;
    *pending = Some(tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      action();
    }));
  }
}

impl Drop for Debouncer {
  fn drop(&mut self) {
    let pending = self.pending.get_mut().unwrap_or_else(PoisonError::into_inner);
    if let Some(handle) = pending.take() {
      handle.abort();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  #[tokio::test]
  async fn test_burst_runs_once() {
    let debouncer = Debouncer::new(Duration::from_millis(40));
    let runs = Arc::new(AtomicU32::new(0));

    for _ in 0..3 {
      let runs = runs.clone();
      debouncer.call(move || {
        runs.fetch_add(1, Ordering::SeqCst);
      });
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_separate_bursts_run_separately() {
    let debouncer = Debouncer::new(Duration::from_millis(20));
    let runs = Arc::new(AtomicU32::new(0));

    for _ in 0..2 {
      let runs = runs.clone();
      debouncer.call(move || {
        runs.fetch_add(1, Ordering::SeqCst);
      });
      tokio::time::sleep(Duration::from_millis(80)).await;
    }
    assert_eq!(runs.load(Ordering::SeqCst), 2);
  }
}
