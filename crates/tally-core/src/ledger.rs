//! The `Ledger` trait and the cursor types its scans yield.
//!
//! A ledger is an ordered key-value store that keeps every value ever written
//! under a key. The trait is implemented by storage backends (the in-memory
//! [`crate::memory::MemoryLedger`] and `tally-store-sqlite`); the
//! [`crate::store::InvoiceStore`] depends only on this abstraction.

use std::{fmt, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Transaction ids ─────────────────────────────────────────────────────────

/// Identifier the backend stamps on every write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
  pub fn new() -> Self { Self(Uuid::new_v4().simple().to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl Default for TxId {
  fn default() -> Self { Self::new() }
}

impl From<String> for TxId {
  fn from(s: String) -> Self { Self(s) }
}

impl fmt::Display for TxId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Scan items ──────────────────────────────────────────────────────────────

/// A current-state entry yielded by range scans and selector queries.
/// `value` holds the stored bytes exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
  pub key:   String,
  pub value: Vec<u8>,
}

/// One historical write to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyModification {
  pub tx_id:     TxId,
  pub value:     Vec<u8>,
  /// Wall-clock time the backend recorded at write time.
  pub timestamp: DateTime<Utc>,
}

// ─── Selector ────────────────────────────────────────────────────────────────

/// A single-field equality filter, evaluated by backends with rich-query
/// support. Only string-valued fields match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
  pub field: String,
  pub value: String,
}

impl Selector {
  pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
    Self { field: field.into(), value: value.into() }
  }

  /// The query document, e.g. `{"selector":{"billedTo":"Acme"}}`.
  pub fn to_query(&self) -> serde_json::Value {
    let mut inner = serde_json::Map::new();
    inner.insert(self.field.clone(), self.value.clone().into());
    serde_json::json!({ "selector": inner })
  }
}

impl fmt::Display for Selector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_query())
  }
}

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// A lazy, finite, non-restartable sequence of results.
///
/// Backends fetch results incrementally, so a cursor observes the ledger as
/// it is when each item is pulled, not as it was when the scan began.
pub trait Cursor: Send {
  type Item: Send;
  type Error: std::error::Error + Send + Sync + 'static;

  /// Pull the next item; `Ok(None)` once the sequence is exhausted.
  fn next(
    &mut self,
  ) -> impl Future<Output = Result<Option<Self::Item>, Self::Error>> + Send + '_;
}

/// Drain a cursor into a `Vec`.
pub async fn collect<C: Cursor>(mut cursor: C) -> Result<Vec<C::Item>, C::Error> {
  let mut items = Vec::new();
  while let Some(item) = cursor.next().await? {
    items.push(item);
  }
  Ok(items)
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an ordered, history-keeping key-value ledger.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait Ledger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
  type Scan: Cursor<Item = KeyValue, Error = Self::Error>;
  type History: Cursor<Item = KeyModification, Error = Self::Error>;

  /// The current value under `key`, or empty bytes if nothing is stored.
  fn get_state<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Vec<u8>, Self::Error>> + Send + 'a;

  /// Store `value` under `key`, replacing the current value and appending a
  /// history entry. Returns the transaction id stamped on the write.
  fn put_state<'a>(
    &'a self,
    key: &'a str,
    value: Vec<u8>,
  ) -> impl Future<Output = Result<TxId, Self::Error>> + Send + 'a;

  /// Current entries with `start <= key < end` in byte-wise key order. An
  /// empty `end` leaves the range open.
  fn range_scan<'a>(
    &'a self,
    start: &'a str,
    end: &'a str,
  ) -> impl Future<Output = Result<Self::Scan, Self::Error>> + Send + 'a;

  /// Whether [`Ledger::rich_query`] is available.
  fn supports_rich_query(&self) -> bool;

  /// Current entries whose JSON value satisfies `selector`.
  fn rich_query<'a>(
    &'a self,
    selector: &'a Selector,
  ) -> impl Future<Output = Result<Self::Scan, Self::Error>> + Send + 'a;

  /// Every value ever written under `key`, oldest first.
  fn history<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Self::History, Self::Error>> + Send + 'a;
}
