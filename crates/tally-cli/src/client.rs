//! Async HTTP client wrapping the Tally JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{Value, json};

/// Async HTTP client for a running `tally-server`.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: Url,
}

impl ApiClient {
  pub fn new(base_url: &str) -> Result<Self> {
    let base_url =
      Url::parse(base_url).with_context(|| format!("invalid server URL {base_url:?}"))?;
    if base_url.cannot_be_a_base() {
      return Err(anyhow!("server URL {base_url} cannot take a path"));
    }
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url })
  }

  /// The base URL with `segments` appended, each percent-encoded as a single
  /// path segment so keys may contain `/`, `?` or `#`.
  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  /// Send `req`; `Ok(None)` for `204`, the server's error message otherwise.
  async fn send(&self, req: RequestBuilder, what: &str) -> Result<Option<Value>> {
    tracing::debug!(what, "sending request");
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;
    let status = resp.status();
    if status == StatusCode::NO_CONTENT {
      return Ok(None);
    }
    let body = resp
      .bytes()
      .await
      .with_context(|| format!("reading {what} response"))?;

    if !status.is_success() {
      let message = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
      return Err(anyhow!("{what} → {status}: {message}"));
    }
    if body.is_empty() {
      return Ok(None);
    }
    serde_json::from_slice(&body)
      .map(Some)
      .with_context(|| format!("deserialising {what} response"))
  }

  /// `POST /invoke`
  pub async fn invoke(&self, function: &str, args: &[String]) -> Result<Option<Value>> {
    let req = self
      .client
      .post(self.url(&["invoke"]))
      .json(&json!({ "function": function, "args": args }));
    self.send(req, "POST /invoke").await
  }

  /// `GET /invoices/{key}`
  pub async fn get(&self, key: &str) -> Result<Option<Value>> {
    let req = self.client.get(self.url(&["invoices", key]));
    self.send(req, "GET /invoices/{key}").await
  }

  /// `PUT /invoices/{key}` with a raw JSON record.
  pub async fn put(&self, key: &str, record: String) -> Result<Option<Value>> {
    let req = self
      .client
      .put(self.url(&["invoices", key]))
      .header(reqwest::header::CONTENT_TYPE, "application/json")
      .body(record);
    self.send(req, "PUT /invoices/{key}").await
  }

  /// `GET /invoices[?start=&end=]`
  pub async fn list(&self, range: Option<(&str, &str)>) -> Result<Option<Value>> {
    let mut req = self.client.get(self.url(&["invoices"]));
    if let Some((start, end)) = range {
      req = req.query(&[("start", start), ("end", end)]);
    }
    self.send(req, "GET /invoices").await
  }

  /// `GET /invoices/{key}/history`
  pub async fn history(&self, key: &str) -> Result<Option<Value>> {
    let req = self.client.get(self.url(&["invoices", key, "history"]));
    self.send(req, "GET /invoices/{key}/history").await
  }

  /// `GET /query?field=&value=`
  pub async fn query(&self, field: &str, value: &str) -> Result<Option<Value>> {
    let req = self
      .client
      .get(self.url(&["query"]))
      .query(&[("field", field), ("value", value)]);
    self.send(req, "GET /query").await
  }
}
