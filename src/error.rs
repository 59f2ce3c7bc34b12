//! Error types shared by the transport, cache and controller.

use serde_json::Value;
use thiserror::Error;

use crate::filter::FieldKind;

/// Failure of a collection fetch or a one-shot call.
///
/// Errors that reach controller state are wrapped in an `Arc` by the cache so
/// every subscriber of a key observes the same error object.
#[derive(Debug, Error)]
pub enum FetchError {
  /// The request failed before a response was obtained.
  #[error("request failed: {message}")]
  Transport { message: String },

  /// The server answered with a non-2xx status.
  #[error("server responded with {status}: {message}")]
  Server {
    status: u16,
    message: String,
    body: Value,
  },

  /// The response body did not have the expected shape.
  #[error("unexpected response: {0}")]
  Protocol(String),

  #[error(transparent)]
  Filter(#[from] FilterError),
}

impl FetchError {
  pub fn transport(message: impl Into<String>) -> Self {
    FetchError::Transport {
      message: message.into(),
    }
  }

  /// Build a server error, pulling a readable message out of the body.
  pub fn server(status: u16, body: Value) -> Self {
    FetchError::Server {
      status,
      message: extract_error_message(&body),
      body,
    }
  }

  pub fn status(&self) -> Option<u16> {
    match self {
      FetchError::Server { status, .. } => Some(*status),
      _ => None,
    }
  }
}

impl From<reqwest::Error> for FetchError {
  fn from(err: reqwest::Error) -> Self {
    FetchError::transport(err.to_string())
  }
}

/// Errors raised while building or parsing filter criteria.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
  #[error("filter field '{0}' is not declared for this resource")]
  UndeclaredField(String),

  #[error("filter field '{field}' expects a {expected} value, got {found}")]
  KindMismatch {
    field: String,
    expected: FieldKind,
    found: FieldKind,
  },

  #[error("invalid value '{value}' for filter field '{field}'")]
  InvalidValue { field: String, value: String },
}

const FALLBACK_MESSAGE: &str = "An unknown error occurred";

/// Extract a human-readable message from a backend error body.
///
/// The backend wraps failures as `{"error": {"message", "globalErrors",
/// "fieldErrors"}}`. The top-level message wins, then the first global error,
/// then the first field error.
pub fn extract_error_message(body: &Value) -> String {
  let Some(error) = body.get("error") else {
    return body
      .get("message")
      .and_then(Value::as_str)
      .unwrap_or(FALLBACK_MESSAGE)
      .to_string();
  };

  if let Some(message) = error.get("message").and_then(Value::as_str) {
    if !message.trim().is_empty() {
      return message.to_string();
    }
  }

  let global = error
    .get("globalErrors")
    .and_then(Value::as_array)
    .and_then(|errors| errors.iter().find_map(message_of));
  if let Some(message) = global {
    return message;
  }

  error
    .get("fieldErrors")
    .and_then(Value::as_object)
    .and_then(|fields| {
      fields.iter().find_map(|(field, errors)| {
        errors
          .as_array()
          .and_then(|errs| errs.iter().find_map(message_of))
          .map(|message| format!("{}: {}", field, message))
      })
    })
    .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
}

fn message_of(entry: &Value) -> Option<String> {
  entry
    .get("message")
    .and_then(Value::as_str)
    .map(String::from)
}
