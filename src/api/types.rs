//! Response shapes of the laboratory REST API.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;

/// One page of a collection as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageableResult<T> {
  pub results: Vec<T>,
  #[serde(
    rename = "totalCount",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub total_count: Option<u64>,
}

/// A page whose rows have not been decoded yet. The shared cache stores
/// pages in this form so one cache serves every resource type.
pub type RawPage = PageableResult<Value>;

impl RawPage {
  /// Decode every row into `T`, failing on the first row that does not fit.
  pub fn decode<T: DeserializeOwned>(&self) -> Result<PageableResult<T>, FetchError> {
    let results = self
      .results
      .iter()
      .enumerate()
      .map(|(index, row)| {
        T::deserialize(row)
          .map_err(|e| FetchError::Protocol(format!("row {} does not match: {}", index, e)))
      })
      .collect::<Result<Vec<T>, _>>()?;
    Ok(PageableResult {
      results,
      total_count: self.total_count,
    })
  }
}

/// Response envelope: HTTP status plus the decoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
  pub status: u16,
  pub data: T,
}

/// Parse a response body. An empty body decodes as JSON `null`.
pub fn parse_body(bytes: &[u8]) -> Result<Value, FetchError> {
  if bytes.iter().all(u8::is_ascii_whitespace) {
    return Ok(Value::Null);
  }
  serde_json::from_slice(bytes).map_err(|e| FetchError::Protocol(format!("invalid JSON body: {}", e)))
}

/// Decode a body into `T`. Any other shape is a protocol violation.
pub fn decode_body<T: DeserializeOwned>(body: Value) -> Result<T, FetchError> {
  serde_json::from_value(body).map_err(|e| FetchError::Protocol(e.to_string()))
}
