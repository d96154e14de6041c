//! [`SqliteLedger`]: the SQLite implementation of [`Ledger`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tally_core::ledger::{Ledger, Selector, TxId};
use tracing::debug;

use crate::{
  Error, Result,
  cursor::{HistoryCursor, StateCursor},
  encode::{encode_ts, selector_path},
  schema::SCHEMA,
};

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// A Tally ledger backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteLedger {
  conn:      tokio_rusqlite::Connection,
  page_size: usize,
}

impl SqliteLedger {
  /// Rows fetched per round trip by scan and history cursors.
  pub const DEFAULT_PAGE_SIZE: usize = 100;

  /// Open (or create) a ledger at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory ledger.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  /// Set the cursor page size (minimum 1).
  pub fn with_page_size(mut self, page_size: usize) -> Self {
    self.page_size = page_size.max(1);
    self
  }

  pub fn page_size(&self) -> usize { self.page_size }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, page_size: Self::DEFAULT_PAGE_SIZE })
  }
}

// ─── Ledger impl ─────────────────────────────────────────────────────────────

impl Ledger for SqliteLedger {
  type Error = Error;
  type History = HistoryCursor;
  type Scan = StateCursor;

  async fn get_state(&self, key: &str) -> Result<Vec<u8>> {
    let key = key.to_owned();
    let value: Option<Vec<u8>> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT value FROM world_state WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;
    Ok(value.unwrap_or_default())
  }

  async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<TxId> {
    let tx_id         = TxId::new();
    let tx_id_str     = tx_id.to_string();
    let key_str       = key.to_owned();
    let (secs, nanos) = encode_ts(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO world_state (key, value, tx_id, ts_seconds, ts_nanos)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(key) DO UPDATE SET
             value      = excluded.value,
             tx_id      = excluded.tx_id,
             ts_seconds = excluded.ts_seconds,
             ts_nanos   = excluded.ts_nanos",
          rusqlite::params![key_str, value, tx_id_str, secs, nanos],
        )?;
        tx.execute(
          "INSERT INTO history (key, tx_id, value, ts_seconds, ts_nanos)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![key_str, tx_id_str, value, secs, nanos],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    debug!(key, %tx_id, "state written");
    Ok(tx_id)
  }

  async fn range_scan(&self, start: &str, end: &str) -> Result<StateCursor> {
    Ok(StateCursor::range(self.conn.clone(), start, end, self.page_size))
  }

  fn supports_rich_query(&self) -> bool { true }

  async fn rich_query(&self, selector: &Selector) -> Result<StateCursor> {
    let path = selector_path(&selector.field)?;
    Ok(StateCursor::selector(
      self.conn.clone(),
      path,
      &selector.value,
      self.page_size,
    ))
  }

  async fn history(&self, key: &str) -> Result<HistoryCursor> {
    Ok(HistoryCursor::new(self.conn.clone(), key, self.page_size))
  }
}
