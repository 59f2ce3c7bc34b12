//! REST transport for the laboratory endpoints.

pub mod client;
pub mod types;

pub use client::{LabClient, PageSource, RecordWriter};
pub use types::{ApiResponse, PageableResult, RawPage};
