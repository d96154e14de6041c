//! [`InvoiceStore`]: invoice operations on top of any [`Ledger`].
//!
//! The store keeps no state between calls: every update is a fresh
//! read-modify-write against the ledger with exactly one write. Two concurrent
//! updates of the same key may therefore lose one of the writes; serialising
//! them is left to the backend.

use serde::Deserialize;
use tracing::{debug, info};

use crate::{
  Error, Result, codec,
  invoice::{ALL_INVOICES_END, ALL_INVOICES_START, Invoice},
  ledger::{Cursor, KeyModification, KeyValue, Ledger, Selector, TxId},
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// How reads and updates treat a key with no stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingKeyPolicy {
  /// Fail with [`Error::NotFound`].
  #[default]
  Strict,
  /// Treat the key as holding an empty record. Updates then create a record
  /// containing only the updated fields.
  Tolerant,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StoreConfig {
  #[serde(default)]
  pub missing_key: MissingKeyPolicy,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Invoice record operations over a ledger backend.
#[derive(Debug, Clone)]
pub struct InvoiceStore<L> {
  ledger: L,
  config: StoreConfig,
}

impl<L: Ledger> InvoiceStore<L> {
  pub fn new(ledger: L) -> Self { Self::with_config(ledger, StoreConfig::default()) }

  pub fn with_config(ledger: L, config: StoreConfig) -> Self { Self { ledger, config } }

  pub fn ledger(&self) -> &L { &self.ledger }

  pub fn config(&self) -> StoreConfig { self.config }

  // ── Writes ──────────────────────────────────────────────────────────────

  /// Store `invoice` under `key`, replacing any existing record.
  pub async fn create(&self, key: &str, invoice: &Invoice) -> Result<TxId> {
    require_key(key)?;
    let tx_id = self.put(key, codec::encode(invoice)).await?;
    info!(key, %tx_id, "invoice created");
    Ok(tx_id)
  }

  /// Store a caller-supplied JSON payload under `key` byte-for-byte, after
  /// checking that it decodes as a record.
  pub async fn create_from_raw(&self, key: &str, raw: &[u8]) -> Result<TxId> {
    require_key(key)?;
    codec::decode(raw)?;
    let tx_id = self.put(key, raw.to_vec()).await?;
    info!(key, %tx_id, "invoice created from raw payload");
    Ok(tx_id)
  }

  /// Set the goods-received flag.
  pub async fn update_goods_received(&self, key: &str, value: &str) -> Result<TxId> {
    self
      .modify(key, |invoice| invoice.goods_received = value.to_owned())
      .await
  }

  /// Record a payment to the supplier.
  pub async fn update_supplier_payment(
    &self,
    key: &str,
    paid_amount: &str,
    is_paid: &str,
  ) -> Result<TxId> {
    self
      .modify(key, |invoice| {
        invoice.paid_amount = paid_amount.to_owned();
        invoice.is_paid_to_supplier = is_paid.to_owned();
      })
      .await
  }

  /// Record a repayment to the bank.
  pub async fn update_bank_repayment(
    &self,
    key: &str,
    repayment_amount: &str,
    is_repaid: &str,
  ) -> Result<TxId> {
    self
      .modify(key, |invoice| {
        invoice.repayment_amount = repayment_amount.to_owned();
        invoice.is_repaid_to_bank = is_repaid.to_owned();
      })
      .await
  }

  /// Seed the ledger with the sample invoice under `INV0`.
  pub async fn init_ledger(&self) -> Result<TxId> {
    self.create(ALL_INVOICES_START, &Invoice::sample()).await
  }

  // ── Reads ───────────────────────────────────────────────────────────────

  /// The record stored under `key`.
  pub async fn get(&self, key: &str) -> Result<Invoice> {
    let raw = self.get_raw(key).await?;
    if raw.is_empty() {
      return Ok(Invoice::default());
    }
    codec::decode(&raw)
  }

  /// The bytes stored under `key`. Under [`MissingKeyPolicy::Tolerant`] an
  /// absent key yields empty bytes.
  pub async fn get_raw(&self, key: &str) -> Result<Vec<u8>> {
    require_key(key)?;
    debug!(key, "reading invoice");
    let raw = self.ledger.get_state(key).await.map_err(Error::backend)?;
    if raw.is_empty() && self.config.missing_key == MissingKeyPolicy::Strict {
      return Err(Error::NotFound(key.to_owned()));
    }
    Ok(raw)
  }

  /// Entries with `start <= key < end`, in ledger key order.
  pub async fn list_range(&self, start: &str, end: &str) -> Result<Records<L::Scan>> {
    debug!(start, end, "range scan");
    let scan = self
      .ledger
      .range_scan(start, end)
      .await
      .map_err(Error::backend)?;
    Ok(Records(scan))
  }

  /// Every invoice in the fixed `INV0`..`INV999` window.
  pub async fn list_all(&self) -> Result<Records<L::Scan>> {
    self.list_range(ALL_INVOICES_START, ALL_INVOICES_END).await
  }

  /// Entries whose `field` equals `value`.
  pub async fn query_by_selector(
    &self,
    field: &str,
    value: &str,
  ) -> Result<Records<L::Scan>> {
    if !self.ledger.supports_rich_query() {
      return Err(Error::UnsupportedOperation(
        "ledger backend does not support selector queries".to_owned(),
      ));
    }
    if field.is_empty() {
      return Err(Error::InvalidArgument("selector field must not be empty".to_owned()));
    }
    if field.contains(['"', '\\']) {
      return Err(Error::InvalidArgument(format!(
        "selector field {field:?} must not contain quotes or backslashes"
      )));
    }
    let selector = Selector::new(field, value);
    debug!(%selector, "selector query");
    let scan = self
      .ledger
      .rich_query(&selector)
      .await
      .map_err(Error::backend)?;
    Ok(Records(scan))
  }

  /// Every value ever written under `key`, oldest first.
  pub async fn history_of(&self, key: &str) -> Result<History<L::History>> {
    require_key(key)?;
    debug!(key, "history replay");
    let history = self.ledger.history(key).await.map_err(Error::backend)?;
    Ok(History(history))
  }

  // ── Internals ───────────────────────────────────────────────────────────

  async fn put(&self, key: &str, value: Vec<u8>) -> Result<TxId> {
    self.ledger.put_state(key, value).await.map_err(Error::backend)
  }

  async fn modify<F>(&self, key: &str, apply: F) -> Result<TxId>
  where
    F: FnOnce(&mut Invoice) + Send,
  {
    let mut invoice = self.get(key).await?;
    apply(&mut invoice);
    let tx_id = self.put(key, codec::encode(&invoice)).await?;
    info!(key, %tx_id, "invoice updated");
    Ok(tx_id)
  }
}

fn require_key(key: &str) -> Result<()> {
  if key.is_empty() {
    return Err(Error::InvalidArgument("key must not be empty".to_owned()));
  }
  Ok(())
}

// ─── Result cursors ──────────────────────────────────────────────────────────

/// A backend scan with errors mapped into [`Error`].
pub struct Records<C>(C);

impl<C> Cursor for Records<C>
where
  C: Cursor<Item = KeyValue>,
{
  type Error = Error;
  type Item = KeyValue;

  async fn next(&mut self) -> Result<Option<KeyValue>> {
    self.0.next().await.map_err(Error::backend)
  }
}

/// A backend history replay with errors mapped into [`Error`].
pub struct History<C>(C);

impl<C> Cursor for History<C>
where
  C: Cursor<Item = KeyModification>,
{
  type Error = Error;
  type Item = KeyModification;

  async fn next(&mut self) -> Result<Option<KeyModification>> {
    self.0.next().await.map_err(Error::backend)
  }
}
