//! Conversions between ledger types and the column representations stored in
//! SQLite.
//!
//! Timestamps are split into whole seconds and sub-second nanoseconds so the
//! exact write time survives the round trip. Selector fields become quoted
//! JSON paths for `json_extract`.

use chrono::{DateTime, Utc};
use tally_core::ledger::{KeyModification, TxId};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_ts(ts: DateTime<Utc>) -> (i64, i64) {
  (ts.timestamp(), i64::from(ts.timestamp_subsec_nanos()))
}

pub fn decode_ts(seconds: i64, nanos: i64) -> Result<DateTime<Utc>> {
  u32::try_from(nanos)
    .ok()
    .and_then(|nanos| DateTime::from_timestamp(seconds, nanos))
    .ok_or_else(|| Error::DateParse(format!("invalid timestamp {seconds}s {nanos}ns")))
}

// ─── Selector paths ──────────────────────────────────────────────────────────

/// `billedTo` → `$."billedTo"`.
pub fn selector_path(field: &str) -> Result<String> {
  if field.is_empty() || field.contains(['"', '\\']) {
    return Err(Error::UnsupportedSelector(field.to_owned()));
  }
  Ok(format!("$.\"{field}\""))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns read from a `history` row.
pub struct RawModification {
  pub seq:        i64,
  pub tx_id:      String,
  pub value:      Vec<u8>,
  pub ts_seconds: i64,
  pub ts_nanos:   i64,
}

impl RawModification {
  pub fn into_modification(self) -> Result<KeyModification> {
    Ok(KeyModification {
      tx_id:     TxId::from(self.tx_id),
      value:     self.value,
      timestamp: decode_ts(self.ts_seconds, self.ts_nanos)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamp_round_trips_to_the_nanosecond() {
    let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
    let (s, n) = encode_ts(ts);
    assert_eq!(decode_ts(s, n).unwrap(), ts);
  }

  #[test]
  fn negative_nanos_are_rejected() {
    assert!(matches!(decode_ts(0, -1), Err(Error::DateParse(_))));
  }

  #[test]
  fn selector_path_quotes_field() {
    assert_eq!(selector_path("billedTo").unwrap(), "$.\"billedTo\"");
    assert_eq!(selector_path("a.b").unwrap(), "$.\"a.b\"");
    assert!(matches!(selector_path("a\"b"), Err(Error::UnsupportedSelector(_))));
    assert!(matches!(selector_path(""), Err(Error::UnsupportedSelector(_))));
  }
}
