//! The invoice record, the only entity kept in the ledger.
//!
//! Every attribute is an opaque string. Dates and amounts are stored exactly
//! as the caller supplied them; the `Y`/`N` flags are a convention, not an
//! enforced type.

use serde::{Deserialize, Deserializer, Serialize};

/// Conventional value of a set lifecycle flag.
pub const YES: &str = "Y";
/// Conventional value of an unset lifecycle flag.
pub const NO: &str = "N";

/// First key of the fixed window enumerated by `queryAllInvoices`.
pub const ALL_INVOICES_START: &str = "INV0";
/// Exclusive upper bound of the fixed window enumerated by `queryAllInvoices`.
pub const ALL_INVOICES_END: &str = "INV999";

// ─── Invoice ─────────────────────────────────────────────────────────────────

/// An invoice as stored under its ledger key. The key itself is not part of
/// the JSON body.
///
/// Field names on the wire are those of the existing ledger format, so the
/// lifecycle flags serialise as `gr`, `isPaid` and `repaid`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Invoice {
  #[serde(deserialize_with = "nullable")]
  pub invoice_number:      String,
  #[serde(deserialize_with = "nullable")]
  pub billed_to:           String,
  #[serde(deserialize_with = "nullable")]
  pub invoice_date:        String,
  #[serde(deserialize_with = "nullable")]
  pub invoice_amount:      String,
  #[serde(deserialize_with = "nullable")]
  pub item_description:    String,
  #[serde(rename = "gr", deserialize_with = "nullable")]
  pub goods_received:      String,
  #[serde(rename = "isPaid", deserialize_with = "nullable")]
  pub is_paid_to_supplier: String,
  #[serde(deserialize_with = "nullable")]
  pub paid_amount:         String,
  #[serde(rename = "repaid", deserialize_with = "nullable")]
  pub is_repaid_to_bank:   String,
  #[serde(deserialize_with = "nullable")]
  pub repayment_amount:    String,
}

impl Invoice {
  /// The ten positional field values accepted by `newInvoice`, in order.
  pub const FIELD_COUNT: usize = 10;

  /// Build a record from positional values in `newInvoice` order. Missing
  /// trailing values are left empty.
  pub fn from_positional<I>(values: I) -> Self
  where
    I: IntoIterator<Item = String>,
  {
    let mut values = values.into_iter();
    let mut next = || values.next().unwrap_or_default();
    Self {
      invoice_number:      next(),
      billed_to:           next(),
      invoice_date:        next(),
      invoice_amount:      next(),
      item_description:    next(),
      goods_received:      next(),
      is_paid_to_supplier: next(),
      paid_amount:         next(),
      is_repaid_to_bank:   next(),
      repayment_amount:    next(),
    }
  }

  /// The invoice seeded by `initLedger`.
  pub fn sample() -> Self {
    Self {
      invoice_number:      String::new(),
      billed_to:           "Unionbank".into(),
      invoice_date:        "10-30-2014".into(),
      invoice_amount:      "10,000".into(),
      item_description:    "Debit Card".into(),
      goods_received:      NO.into(),
      is_paid_to_supplier: NO.into(),
      paid_amount:         "0".into(),
      is_repaid_to_bank:   NO.into(),
      repayment_amount:    "0".into(),
    }
  }
}

/// Treat an explicit JSON `null` like an absent field.
fn nullable<'de, D>(de: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}
