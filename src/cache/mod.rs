//! Key-addressed revalidation cache.
//!
//! This module provides the shared request cache the paged controllers
//! fetch through:
//! - At most one in-flight request per key; concurrent subscribers share it
//! - Subscribers observe per-key state (data, error, validating) via a watch channel
//! - Prefix invalidation refetches every mounted key of an endpoint family
//! - Failed refetches keep the last good page

mod debounce;
mod layer;
mod traits;

pub use debounce::Debouncer;
pub use layer::SwrCache;
pub use traits::{Fetcher, KeyState, RevalidationCache, Subscription};
