//! One-shot mutating calls.
//!
//! Mutations never go through a paged controller. Each call waits for the
//! server to confirm, then invalidates the affected endpoint families so
//! every mounted controller watching them refetches. Dropping a returned
//! future before it completes cancels the underlying request.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::api::client::delete_body;
use crate::api::types::decode_body;
use crate::api::RecordWriter;
use crate::error::FetchError;

use super::refresh::Refresher;
use super::screens::ResourceSpec;

#[derive(Clone)]
pub struct ResourceActions {
  writer: Arc<dyn RecordWriter>,
  refresher: Refresher,
}

impl ResourceActions {
  pub fn new(writer: Arc<dyn RecordWriter>, refresher: Refresher) -> Self {
    Self { writer, refresher }
  }

  /// Create a record in `spec`'s collection.
  pub async fn create<B, T>(&self, spec: &ResourceSpec, body: &B) -> Result<T, FetchError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let data = self.writer.post_json(spec.path, to_json(body)?).await?;
    info!(resource = spec.name, "created");
    self.refresher.refresh(spec.path);
    decode_body(data)
  }

  /// Update record `id` of `spec`'s collection.
  pub async fn update<B, T>(
    &self,
    spec: &ResourceSpec,
    id: &str,
    body: &B,
  ) -> Result<T, FetchError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let data = self
      .writer
      .post_json(&record_path(spec, id), to_json(body)?)
      .await?;
    info!(resource = spec.name, id, "updated");
    self.refresher.refresh(spec.path);
    decode_body(data)
  }

  /// Delete record `id`. The backend requires a reason in the request body;
  /// `"N/A"` is sent when none is given.
  pub async fn delete_resource(
    &self,
    spec: &ResourceSpec,
    id: &str,
    reason: Option<&str>,
  ) -> Result<(), FetchError> {
    self
      .writer
      .delete_json(&record_path(spec, id), delete_body(reason))
      .await?;
    info!(resource = spec.name, id, "deleted");
    self.refresher.refresh(spec.path);
    Ok(())
  }

  /// POST to an action endpoint (approve, reject, refer, ...) and invalidate
  /// every prefix the action affects.
  pub async fn perform<B>(
    &self,
    path: &str,
    body: &B,
    invalidate: &[&str],
  ) -> Result<Value, FetchError>
  where
    B: Serialize + ?Sized,
  {
    let data = self.writer.post_json(path, to_json(body)?).await?;
    info!(path, "action performed");
    for prefix in invalidate {
      self.refresher.refresh(prefix);
    }
    Ok(data)
  }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<Value, FetchError> {
  serde_json::to_value(body)
    .map_err(|e| FetchError::Protocol(format!("unserializable body: {}", e)))
}

/// Path of one record in a collection.
pub fn record_path(spec: &ResourceSpec, id: &str) -> String {
  format!("{}/{}", spec.path, id.trim_matches('/'))
}
