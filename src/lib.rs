//! Paged, filterable, cache-revalidated views over the laboratory REST API.
//!
//! The centre of the crate is [`resource::PagedResource`], a controller that
//! binds a mutable filter to a remote paged collection. It fetches through a
//! shared [`cache::RevalidationCache`] so that concurrent subscribers of the
//! same request key share one in-flight request, and list mutations can
//! invalidate whole endpoint families by key prefix.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod resource;
