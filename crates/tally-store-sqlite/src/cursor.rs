//! Paged cursors over the SQLite ledger.
//!
//! Each cursor fetches `page_size` rows at a time using keyset pagination
//! (resuming after the last key or sequence number seen), so a scan never
//! holds a statement open between pulls and never loads the whole result.

use std::collections::VecDeque;

use tally_core::ledger::{Cursor, KeyModification, KeyValue};

use crate::{Error, Result, encode::RawModification};

// ─── Current-state scans ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum StateFilter {
  /// `start <= key < end`; an empty `end` is unbounded.
  Range { start: String, end: String },
  /// String field at `path` equal to `value`, over well-formed JSON values.
  Selector { path: String, value: String },
}

/// Range scan or selector query over `world_state`, in key order.
pub struct StateCursor {
  conn:      tokio_rusqlite::Connection,
  filter:    StateFilter,
  page_size: usize,
  after:     Option<String>,
  buffer:    VecDeque<KeyValue>,
  exhausted: bool,
}

impl StateCursor {
  pub(crate) fn range(
    conn: tokio_rusqlite::Connection,
    start: &str,
    end: &str,
    page_size: usize,
  ) -> Self {
    Self::new(
      conn,
      StateFilter::Range { start: start.to_owned(), end: end.to_owned() },
      page_size,
    )
  }

  pub(crate) fn selector(
    conn: tokio_rusqlite::Connection,
    path: String,
    value: &str,
    page_size: usize,
  ) -> Self {
    Self::new(
      conn,
      StateFilter::Selector { path, value: value.to_owned() },
      page_size,
    )
  }

  fn new(conn: tokio_rusqlite::Connection, filter: StateFilter, page_size: usize) -> Self {
    Self {
      conn,
      filter,
      page_size: page_size.max(1),
      after: None,
      buffer: VecDeque::new(),
      exhausted: false,
    }
  }

  async fn fetch_page(&mut self) -> Result<()> {
    let filter = self.filter.clone();
    let after  = self.after.clone();
    let limit  = self.page_size as i64;

    let rows: Vec<(String, Vec<u8>)> = self
      .conn
      .call(move |conn| {
        let mut stmt = match &filter {
          StateFilter::Range { .. } => conn.prepare_cached(
            "SELECT key, value FROM world_state
             WHERE key >= ?1
               AND (?2 = '' OR key < ?2)
               AND (?3 IS NULL OR key > ?3)
             ORDER BY key
             LIMIT ?4",
          )?,
          StateFilter::Selector { .. } => conn.prepare_cached(
            "SELECT key, value FROM world_state
             WHERE CASE WHEN json_valid(CAST(value AS TEXT))
                        THEN json_type(CAST(value AS TEXT), ?1) = 'text'
                         AND json_extract(CAST(value AS TEXT), ?1) = ?2
                   END
               AND (?3 IS NULL OR key > ?3)
             ORDER BY key
             LIMIT ?4",
          )?,
        };
        let (first, second) = match &filter {
          StateFilter::Range { start, end } => (start, end),
          StateFilter::Selector { path, value } => (path, value),
        };
        let rows = stmt
          .query_map(rusqlite::params![first, second, after, limit], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    if rows.len() < self.page_size {
      self.exhausted = true;
    }
    if let Some((key, _)) = rows.last() {
      self.after = Some(key.clone());
    }
    self
      .buffer
      .extend(rows.into_iter().map(|(key, value)| KeyValue { key, value }));
    Ok(())
  }
}

impl Cursor for StateCursor {
  type Error = Error;
  type Item = KeyValue;

  async fn next(&mut self) -> Result<Option<KeyValue>> {
    if self.buffer.is_empty() && !self.exhausted {
      self.fetch_page().await?;
    }
    Ok(self.buffer.pop_front())
  }
}

// ─── History ─────────────────────────────────────────────────────────────────

/// Every write to one key, in commit (`seq`) order.
pub struct HistoryCursor {
  conn:      tokio_rusqlite::Connection,
  key:       String,
  page_size: usize,
  after_seq: i64,
  buffer:    VecDeque<KeyModification>,
  exhausted: bool,
}

impl HistoryCursor {
  pub(crate) fn new(conn: tokio_rusqlite::Connection, key: &str, page_size: usize) -> Self {
    Self {
      conn,
      key: key.to_owned(),
      page_size: page_size.max(1),
      after_seq: 0,
      buffer: VecDeque::new(),
      exhausted: false,
    }
  }

  async fn fetch_page(&mut self) -> Result<()> {
    let key   = self.key.clone();
    let after = self.after_seq;
    let limit = self.page_size as i64;

    let raws: Vec<RawModification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT seq, tx_id, value, ts_seconds, ts_nanos FROM history
           WHERE key = ?1 AND seq > ?2
           ORDER BY seq
           LIMIT ?3",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![key, after, limit], |row| {
            Ok(RawModification {
              seq:        row.get(0)?,
              tx_id:      row.get(1)?,
              value:      row.get(2)?,
              ts_seconds: row.get(3)?,
              ts_nanos:   row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    if raws.len() < self.page_size {
      self.exhausted = true;
    }
    if let Some(last) = raws.last() {
      self.after_seq = last.seq;
    }
    for raw in raws {
      self.buffer.push_back(raw.into_modification()?);
    }
    Ok(())
  }
}

impl Cursor for HistoryCursor {
  type Error = Error;
  type Item = KeyModification;

  async fn next(&mut self) -> Result<Option<KeyModification>> {
    if self.buffer.is_empty() && !self.exhausted {
      self.fetch_page().await?;
    }
    Ok(self.buffer.pop_front())
  }
}
