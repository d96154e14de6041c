//! [`MemoryLedger`]: an in-process [`Ledger`] backed by a `BTreeMap`.
//!
//! Useful for embedding and testing. It has no query engine, so selector
//! queries are reported as unsupported.

use std::{
  collections::{BTreeMap, HashMap},
  ops::Bound,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use thiserror::Error;

use crate::ledger::{Cursor, KeyModification, KeyValue, Ledger, Selector, TxId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("rich queries are not supported by the in-memory ledger")]
  RichQueryUnsupported,
}

#[derive(Debug, Default)]
struct Inner {
  state:   BTreeMap<String, Vec<u8>>,
  history: HashMap<String, Vec<KeyModification>>,
}

/// Clones share the same underlying maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
  inner: Arc<Mutex<Inner>>,
}

impl MemoryLedger {
  pub fn new() -> Self { Self::default() }

  /// Number of keys with a current value.
  pub fn len(&self) -> usize { self.lock().state.len() }

  pub fn is_empty(&self) -> bool { self.lock().state.is_empty() }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

// ─── Cursors ─────────────────────────────────────────────────────────────────

/// Walks the key range one entry at a time, resuming after the last key seen.
pub struct RangeCursor {
  inner: Arc<Mutex<Inner>>,
  after: Option<String>,
  start: String,
  end:   String,
}

impl Cursor for RangeCursor {
  type Item = KeyValue;
  type Error = Error;

  async fn next(&mut self) -> Result<Option<KeyValue>, Error> {
    let lower = match &self.after {
      Some(after) => Bound::Excluded(after.clone()),
      None => Bound::Included(self.start.clone()),
    };
    let upper = if self.end.is_empty() {
      Bound::Unbounded
    } else {
      Bound::Excluded(self.end.clone())
    };
    if let (Bound::Included(lo) | Bound::Excluded(lo), Bound::Excluded(hi)) =
      (&lower, &upper)
      && lo >= hi
    {
      return Ok(None);
    }

    let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
    let found = inner
      .state
      .range::<String, _>((lower, upper))
      .next()
      .map(|(k, v)| KeyValue { key: k.clone(), value: v.clone() });
    drop(inner);

    if let Some(kv) = &found {
      self.after = Some(kv.key.clone());
    }
    Ok(found)
  }
}

/// A snapshot of one key's history taken when the cursor was opened.
pub struct HistoryCursor {
  entries: std::vec::IntoIter<KeyModification>,
}

impl Cursor for HistoryCursor {
  type Item = KeyModification;
  type Error = Error;

  async fn next(&mut self) -> Result<Option<KeyModification>, Error> {
    Ok(self.entries.next())
  }
}

// ─── Ledger impl ─────────────────────────────────────────────────────────────

impl Ledger for MemoryLedger {
  type Error = Error;
  type History = HistoryCursor;
  type Scan = RangeCursor;

  async fn get_state(&self, key: &str) -> Result<Vec<u8>, Error> {
    Ok(self.lock().state.get(key).cloned().unwrap_or_default())
  }

  async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<TxId, Error> {
    let modification = KeyModification {
      tx_id:     TxId::new(),
      value:     value.clone(),
      timestamp: Utc::now(),
    };
    let tx_id = modification.tx_id.clone();

    let mut inner = self.lock();
    inner.state.insert(key.to_owned(), value);
    inner
      .history
      .entry(key.to_owned())
      .or_default()
      .push(modification);
    Ok(tx_id)
  }

  async fn range_scan(&self, start: &str, end: &str) -> Result<RangeCursor, Error> {
    Ok(RangeCursor {
      inner: Arc::clone(&self.inner),
      after: None,
      start: start.to_owned(),
      end:   end.to_owned(),
    })
  }

  fn supports_rich_query(&self) -> bool { false }

  async fn rich_query(&self, _selector: &Selector) -> Result<RangeCursor, Error> {
    Err(Error::RichQueryUnsupported)
  }

  async fn history(&self, key: &str) -> Result<HistoryCursor, Error> {
    let entries = self.lock().history.get(key).cloned().unwrap_or_default();
    Ok(HistoryCursor { entries: entries.into_iter() })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ledger::collect;

  async fn seeded(keys: &[&str]) -> MemoryLedger {
    let ledger = MemoryLedger::new();
    for key in keys {
      ledger.put_state(key, b"{}".to_vec()).await.unwrap();
    }
    ledger
  }

  fn keys(entries: &[KeyValue]) -> Vec<&str> {
    entries.iter().map(|kv| kv.key.as_str()).collect()
  }

  #[tokio::test]
  async fn absent_key_reads_as_empty_bytes() {
    let ledger = MemoryLedger::new();
    assert!(ledger.get_state("INV0").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn range_is_half_open_in_byte_order() {
    let ledger = seeded(&["INV999", "INV1", "INV0", "INV10", "INVA", "A"]).await;
    let entries = collect(ledger.range_scan("INV0", "INV999").await.unwrap())
      .await
      .unwrap();
    assert_eq!(keys(&entries), ["INV0", "INV1", "INV10"]);
  }

  #[tokio::test]
  async fn empty_end_leaves_range_open() {
    let ledger = seeded(&["INV0", "INVA", "ZZZ"]).await;
    let entries = collect(ledger.range_scan("INV", "").await.unwrap())
      .await
      .unwrap();
    assert_eq!(keys(&entries), ["INV0", "INVA", "ZZZ"]);
  }

  #[tokio::test]
  async fn inverted_range_is_empty() {
    let ledger = seeded(&["INV0", "INV5"]).await;
    let entries = collect(ledger.range_scan("INV5", "INV0").await.unwrap())
      .await
      .unwrap();
    assert!(entries.is_empty());
  }

  #[tokio::test]
  async fn cursor_is_lazy() {
    let ledger = seeded(&["INV0"]).await;
    let mut cursor = ledger.range_scan("INV0", "INV999").await.unwrap();
    assert_eq!(cursor.next().await.unwrap().unwrap().key, "INV0");
    ledger.put_state("INV5", b"{}".to_vec()).await.unwrap();
    assert_eq!(cursor.next().await.unwrap().unwrap().key, "INV5");
    assert!(cursor.next().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn history_keeps_every_write_in_order() {
    let ledger = MemoryLedger::new();
    let first = ledger.put_state("INV0", b"1".to_vec()).await.unwrap();
    let second = ledger.put_state("INV0", b"2".to_vec()).await.unwrap();

    let history = collect(ledger.history("INV0").await.unwrap()).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].tx_id, first);
    assert_eq!(history[1].tx_id, second);
    assert_eq!(history[1].value, b"2");
    assert!(history[0].timestamp <= history[1].timestamp);
    assert_eq!(ledger.get_state("INV0").await.unwrap(), b"2");
  }

  #[tokio::test]
  async fn rich_query_is_unsupported() {
    let ledger = MemoryLedger::new();
    assert!(!ledger.supports_rich_query());
    let err = ledger.rich_query(&Selector::new("gr", "Y")).await;
    assert!(matches!(err, Err(Error::RichQueryUnsupported)));
  }
}
