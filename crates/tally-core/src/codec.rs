//! JSON codec for invoice records and the envelope arrays returned by
//! multi-record queries.
//!
//! Envelopes embed stored bytes verbatim rather than re-encoding them, so a
//! listing reproduces exactly what was written (including whitespace and
//! field order of payloads created from raw JSON).

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  invoice::Invoice,
  ledger::{KeyModification, KeyValue},
};

// ─── Records ─────────────────────────────────────────────────────────────────

/// Serialise a record as a JSON object with a fixed field order.
pub fn encode(invoice: &Invoice) -> Vec<u8> {
  // Serialising a struct of plain strings cannot fail.
  serde_json::to_vec(invoice).unwrap_or_default()
}

/// Parse a JSON object into a record. Unknown fields are ignored and missing
/// fields decode as empty strings.
pub fn decode(bytes: &[u8]) -> Result<Invoice> {
  let value: serde_json::Value = serde_json::from_slice(bytes)
    .map_err(|e| Error::MalformedRecord(e.to_string()))?;
  if !value.is_object() {
    return Err(Error::MalformedRecord(format!(
      "expected a JSON object, found {}",
      json_type_name(&value)
    )));
  }
  serde_json::from_value(value).map_err(|e| Error::MalformedRecord(e.to_string()))
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
  match value {
    serde_json::Value::Null => "null",
    serde_json::Value::Bool(_) => "a boolean",
    serde_json::Value::Number(_) => "a number",
    serde_json::Value::String(_) => "a string",
    serde_json::Value::Array(_) => "an array",
    serde_json::Value::Object(_) => "an object",
  }
}

// ─── Envelopes ───────────────────────────────────────────────────────────────

/// Label used for the key in range and selector query envelopes.
pub const KEY_LABEL: &str = "Key";
/// Label used for the key in the fixed-window `queryAllInvoices` envelope.
pub const INVOICE_LABEL: &str = "Invoice";

/// Incrementally builds a JSON array of envelope objects.
#[derive(Debug)]
pub struct EnvelopeWriter {
  buf:   Vec<u8>,
  empty: bool,
}

impl Default for EnvelopeWriter {
  fn default() -> Self { Self::new() }
}

impl EnvelopeWriter {
  pub fn new() -> Self { Self { buf: b"[".to_vec(), empty: true } }

  fn separator(&mut self) {
    if !self.empty {
      self.buf.push(b',');
    }
    self.empty = false;
  }

  /// Append `{"<label>":"<key>","Record":<raw value>}`.
  pub fn push_record(&mut self, label: &str, entry: &KeyValue) {
    self.separator();
    self.buf.push(b'{');
    push_string(&mut self.buf, label);
    self.buf.push(b':');
    push_string(&mut self.buf, &entry.key);
    self.buf.extend_from_slice(b",\"Record\":");
    push_raw(&mut self.buf, &entry.value);
    self.buf.push(b'}');
  }

  /// Append `{"TxId":"..","Value":<raw value>,"Timestamp":".."}`.
  pub fn push_modification(&mut self, entry: &KeyModification) {
    self.separator();
    self.buf.extend_from_slice(b"{\"TxId\":");
    push_string(&mut self.buf, entry.tx_id.as_str());
    self.buf.extend_from_slice(b",\"Value\":");
    push_raw(&mut self.buf, &entry.value);
    self.buf.extend_from_slice(b",\"Timestamp\":");
    push_string(&mut self.buf, &format_timestamp(entry.timestamp));
    self.buf.push(b'}');
  }

  pub fn finish(mut self) -> Vec<u8> {
    self.buf.push(b']');
    self.buf
  }
}

/// `2024-03-01 09:30:00.000000000 +0000 UTC`
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
  ts.format("%Y-%m-%d %H:%M:%S%.9f +0000 UTC").to_string()
}

fn push_string(buf: &mut Vec<u8>, s: &str) {
  // Serialising a `&str` cannot fail.
  let _ = serde_json::to_writer(&mut *buf, s);
}

fn push_raw(buf: &mut Vec<u8>, raw: &[u8]) {
  if raw.is_empty() {
    buf.extend_from_slice(b"null");
  } else {
    buf.extend_from_slice(raw);
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::ledger::TxId;

  fn acme() -> Invoice {
    Invoice {
      invoice_number: "42".into(),
      billed_to: "Acme".into(),
      invoice_amount: "1000".into(),
      goods_received: "N".into(),
      ..Invoice::default()
    }
  }

  #[test]
  fn encode_then_decode_preserves_every_field() {
    let invoice = Invoice::from_positional(
      ["1", "Acme", "2024-01-01", "1000", "Widgets", "Y", "N", "0", "N", "0"]
        .map(String::from),
    );
    assert_eq!(decode(&encode(&invoice)).unwrap(), invoice);
  }

  #[test]
  fn encode_uses_ledger_field_names() {
    let json: serde_json::Value = serde_json::from_slice(&encode(&acme())).unwrap();
    assert_eq!(json["billedTo"], "Acme");
    assert_eq!(json["gr"], "N");
    assert!(json.get("isPaid").is_some());
    assert!(json.get("repaid").is_some());
    assert!(json.get("repaymentAmount").is_some());
    assert!(json.get("goodsReceived").is_none());
  }

  #[test]
  fn decode_tolerates_partial_and_unknown_fields() {
    let invoice = decode(br#"{"billedTo":"Acme","owner":"bob","gr":null}"#).unwrap();
    assert_eq!(invoice.billed_to, "Acme");
    assert_eq!(invoice.goods_received, "");
    assert_eq!(invoice.invoice_amount, "");
  }

  #[test]
  fn decode_rejects_non_objects() {
    for input in [&b"not json"[..], b"", b"[\"a\"]", b"\"Acme\"", b"null"] {
      let err = decode(input).unwrap_err();
      assert!(matches!(err, Error::MalformedRecord(_)), "input {input:?}");
    }
  }

  #[test]
  fn decode_rejects_non_string_fields() {
    let err = decode(br#"{"invoiceAmount":1000}"#).unwrap_err();
    assert!(matches!(err, Error::MalformedRecord(_)));
  }

  #[test]
  fn record_envelope_embeds_raw_bytes() {
    let entries = vec![
      KeyValue { key: "INV0".into(), value: br#"{ "billedTo" : "A" }"#.to_vec() },
      KeyValue { key: "INV\"1".into(), value: b"{}".to_vec() },
    ];
    let mut writer = EnvelopeWriter::new();
    for entry in &entries {
      writer.push_record(INVOICE_LABEL, entry);
    }
    let out = writer.finish();
    assert_eq!(
      std::str::from_utf8(&out).unwrap(),
      r#"[{"Invoice":"INV0","Record":{ "billedTo" : "A" }},{"Invoice":"INV\"1","Record":{}}]"#
    );
  }

  #[test]
  fn empty_envelope_is_empty_array() {
    assert_eq!(EnvelopeWriter::new().finish(), b"[]");
  }

  #[test]
  fn history_envelope_shape() {
    let ts = Utc.timestamp_opt(1_700_000_000, 5).unwrap();
    let mut writer = EnvelopeWriter::new();
    writer.push_modification(&KeyModification {
      tx_id:     TxId::from("abc".to_string()),
      value:     b"{\"gr\":\"Y\"}".to_vec(),
      timestamp: ts,
    });
    let out = writer.finish();
    let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(parsed[0]["TxId"], "abc");
    assert_eq!(parsed[0]["Value"]["gr"], "Y");
    assert_eq!(
      parsed[0]["Timestamp"],
      "2023-11-14 22:13:20.000000005 +0000 UTC"
    );
  }
}
