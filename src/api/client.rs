use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::api::types::{decode_body, parse_body, ApiResponse, RawPage};
use crate::config::{ApiConfig, Config};
use crate::error::FetchError;

/// Reason sent with a DELETE when the caller gives none.
pub const DEFAULT_DELETE_REASON: &str = "N/A";

/// Source of collection pages, addressed by request key
/// (`endpointPath?queryString`).
///
/// This is the fetch primitive the revalidation cache calls. The returned
/// future owns everything it needs so the cache can spawn it.
pub trait PageSource: Send + Sync {
  fn fetch_page(&self, key: &str) -> BoxFuture<'static, Result<RawPage, FetchError>>;
}

/// Mutating side of the REST API, used by one-shot actions.
///
/// Bodies travel as JSON values so the trait stays object safe; callers
/// serialize and decode on their side.
pub trait RecordWriter: Send + Sync {
  fn post_json(&self, path: &str, body: Value) -> BoxFuture<'static, Result<Value, FetchError>>;

  fn delete_json(&self, path: &str, body: Value) -> BoxFuture<'static, Result<Value, FetchError>>;
}

/// Laboratory REST API client
#[derive(Clone)]
pub struct LabClient {
  http: reqwest::Client,
  base_url: String,
  credentials: Option<(String, String)>,
}

impl LabClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    url::Url::parse(&config.url).map_err(|e| eyre!("Invalid API url {}: {}", config.url, e))?;

    let credentials = match &config.username {
      Some(user) => Some((user.clone(), Config::get_password()?)),
      None => None,
    };

    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: config.url.trim_end_matches('/').to_string(),
      credentials,
    })
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    let url = format!("{}{}", self.base_url, path);
    let builder = self
      .http
      .request(method, url)
      .header(reqwest::header::ACCEPT, "application/json");
    match &self.credentials {
      Some((user, password)) => builder.basic_auth(user, Some(password)),
      None => builder,
    }
  }

  /// Send a request and map non-2xx statuses to [`FetchError::Server`].
  async fn send(&self, builder: RequestBuilder) -> Result<ApiResponse<Value>, FetchError> {
    let response = builder.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;
    debug!(status = status.as_u16(), len = bytes.len(), "response received");

    if !status.is_success() {
      // Error bodies are not always JSON; keep what we can.
      let body = parse_body(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
      return Err(FetchError::server(status.as_u16(), body));
    }

    Ok(ApiResponse {
      status: status.as_u16(),
      data: parse_body(&bytes)?,
    })
  }

  /// GET `path` (which may carry a query string) and decode the body.
  pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, FetchError> {
    debug!(path, "GET");
    let response = self.send(self.request(Method::GET, path)).await?;
    Ok(ApiResponse {
      status: response.status,
      data: decode_body(response.data)?,
    })
  }

  /// POST a JSON body to `path`.
  pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, FetchError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    debug!(path, "POST");
    let response = self.send(self.request(Method::POST, path).json(body)).await?;
    Ok(ApiResponse {
      status: response.status,
      data: decode_body(response.data)?,
    })
  }

  /// DELETE `path`, sending the reason in a JSON body as the backend requires.
  pub async fn delete(
    &self,
    path: &str,
    reason: Option<&str>,
  ) -> Result<ApiResponse<Value>, FetchError> {
    self.delete_with_body(path, &delete_body(reason)).await
  }

  async fn delete_with_body(
    &self,
    path: &str,
    body: &Value,
  ) -> Result<ApiResponse<Value>, FetchError> {
    debug!(path, "DELETE");
    self.send(self.request(Method::DELETE, path).json(body)).await
  }
}

impl PageSource for LabClient {
  fn fetch_page(&self, key: &str) -> BoxFuture<'static, Result<RawPage, FetchError>> {
    let client = self.clone();
    let key = key.to_string();
    Box::pin(async move { client.get::<RawPage>(&key).await.map(|r| r.data) })
  }
}

impl RecordWriter for LabClient {
  fn post_json(&self, path: &str, body: Value) -> BoxFuture<'static, Result<Value, FetchError>> {
    let client = self.clone();
    let path = path.to_string();
    Box::pin(async move { client.post::<Value, Value>(&path, &body).await.map(|r| r.data) })
  }

  fn delete_json(&self, path: &str, body: Value) -> BoxFuture<'static, Result<Value, FetchError>> {
    let client = self.clone();
    let path = path.to_string();
    Box::pin(async move { client.delete_with_body(&path, &body).await.map(|r| r.data) })
  }
}

/// Body of a DELETE request.
pub fn delete_body(reason: Option<&str>) -> Value {
  let reason = reason
    .map(str::trim)
    .filter(|r| !r.is_empty())
    .unwrap_or(DEFAULT_DELETE_REASON);
  json!({ "reason": reason })
}
