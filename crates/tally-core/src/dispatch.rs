//! Table-driven command dispatch.
//!
//! An invocation is a function name plus positional string arguments. The
//! [`COMMANDS`] table declares each command's arity and how its arguments map
//! onto a typed [`Command`]; parsing happens before the ledger is touched, so
//! a rejected invocation never reads or writes anything.

use tracing::{debug, warn};

use crate::{
  Error, Result, codec,
  invoice::Invoice,
  ledger::{Cursor, KeyModification, KeyValue, Ledger},
  store::InvoiceStore,
};

// ─── Commands ────────────────────────────────────────────────────────────────

/// A parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  NewInvoice { key: String, invoice: Invoice },
  CreateFromJson { key: String, payload: String },
  QueryAll,
  QueryInvoice { key: String },
  QueryBySelector { field: String, value: String },
  QueryByRange { start: String, end: String },
  GoodsReceived { key: String, value: String },
  PaidToSupplier { key: String, paid_amount: String, is_paid: String },
  PaidToBank { key: String, repayment_amount: String, is_repaid: String },
  History { key: String },
  GetUser,
  InitLedger,
}

/// How many positional arguments a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
  Exactly(usize),
  AtLeast(usize),
  Any,
}

impl Arity {
  fn check(self, got: usize) -> Result<()> {
    let expected = match self {
      Self::Exactly(n) if got != n => n.to_string(),
      Self::AtLeast(n) if got < n => format!("at least {n}"),
      _ => return Ok(()),
    };
    Err(Error::InvalidArgument(format!(
      "incorrect number of arguments, expecting {expected}"
    )))
  }
}

/// One row of the dispatch table.
pub struct CommandSpec {
  pub name:  &'static str,
  pub arity: Arity,
  parse:     fn(&mut Args) -> Command,
}

/// Positional arguments, consumed front to back.
pub struct Args(std::vec::IntoIter<String>);

impl Args {
  fn take(&mut self) -> String { self.0.next().unwrap_or_default() }
}

pub const COMMANDS: &[CommandSpec] = &[
  CommandSpec {
    name:  "newInvoice",
    arity: Arity::Exactly(1 + Invoice::FIELD_COUNT),
    parse: |a| Command::NewInvoice {
      key:     a.take(),
      invoice: Invoice::from_positional(a.0.by_ref()),
    },
  },
  CommandSpec {
    name:  "createInvoiceWithJsonInput",
    arity: Arity::Exactly(2),
    parse: |a| Command::CreateFromJson { key: a.take(), payload: a.take() },
  },
  CommandSpec {
    name:  "queryAllInvoices",
    arity: Arity::Exactly(0),
    parse: |_| Command::QueryAll,
  },
  CommandSpec {
    name:  "queryInvoice",
    arity: Arity::Exactly(1),
    parse: |a| Command::QueryInvoice { key: a.take() },
  },
  CommandSpec {
    name:  "queryInvoicesBySelector",
    arity: Arity::Exactly(2),
    parse: |a| Command::QueryBySelector { field: a.take(), value: a.take() },
  },
  CommandSpec {
    name:  "queryInvoicesByRange",
    arity: Arity::Exactly(2),
    parse: |a| Command::QueryByRange { start: a.take(), end: a.take() },
  },
  CommandSpec {
    name:  "isGoodsReceived",
    arity: Arity::Exactly(2),
    parse: |a| Command::GoodsReceived { key: a.take(), value: a.take() },
  },
  CommandSpec {
    name:  "isPaidToSupplier",
    arity: Arity::Exactly(3),
    parse: |a| Command::PaidToSupplier {
      key:         a.take(),
      paid_amount: a.take(),
      is_paid:     a.take(),
    },
  },
  CommandSpec {
    name:  "isPaidToBank",
    arity: Arity::Exactly(3),
    parse: |a| Command::PaidToBank {
      key:              a.take(),
      repayment_amount: a.take(),
      is_repaid:        a.take(),
    },
  },
  CommandSpec {
    name:  "getHistoryForInvoice",
    arity: Arity::AtLeast(1),
    parse: |a| Command::History { key: a.take() },
  },
  CommandSpec {
    name:  "getUser",
    arity: Arity::Any,
    parse: |_| Command::GetUser,
  },
  CommandSpec {
    name:  "initLedger",
    arity: Arity::Exactly(0),
    parse: |_| Command::InitLedger,
  },
];

impl Command {
  /// Resolve `function` in [`COMMANDS`] and bind `args` to it.
  pub fn parse(function: &str, args: Vec<String>) -> Result<Self> {
    let spec = COMMANDS
      .iter()
      .find(|spec| spec.name == function)
      .ok_or_else(|| {
        Error::UnsupportedOperation(format!("unknown function {function:?}"))
      })?;
    spec.arity.check(args.len())?;
    Ok((spec.parse)(&mut Args(args.into_iter())))
  }
}

// ─── Execution ───────────────────────────────────────────────────────────────

impl<L: Ledger> InvoiceStore<L> {
  /// Instantiation hook; the ledger needs no initial state.
  pub fn init(&self) -> Result<Option<Vec<u8>>> { Ok(None) }

  /// Parse and run one invocation. Returns the response payload, or `None`
  /// for commands that succeed without one.
  pub async fn invoke(
    &self,
    function: &str,
    args: Vec<String>,
  ) -> Result<Option<Vec<u8>>> {
    let command = Command::parse(function, args).inspect_err(|e| {
      warn!(function, error = %e, "invocation rejected");
    })?;
    debug!(function, "dispatching");
    self.execute(command).await
  }

  /// Run an already-parsed command.
  pub async fn execute(&self, command: Command) -> Result<Option<Vec<u8>>> {
    match command {
      Command::NewInvoice { key, invoice } => {
        self.create(&key, &invoice).await?;
        Ok(None)
      }
      Command::CreateFromJson { key, payload } => {
        self.create_from_raw(&key, payload.as_bytes()).await?;
        Ok(None)
      }
      Command::QueryAll => {
        let records = self.list_all().await?;
        render_records(codec::INVOICE_LABEL, records).await.map(Some)
      }
      Command::QueryInvoice { key } => self.get_raw(&key).await.map(Some),
      Command::QueryBySelector { field, value } => {
        let records = self.query_by_selector(&field, &value).await?;
        render_records(codec::KEY_LABEL, records).await.map(Some)
      }
      Command::QueryByRange { start, end } => {
        let records = self.list_range(&start, &end).await?;
        render_records(codec::KEY_LABEL, records).await.map(Some)
      }
      Command::GoodsReceived { key, value } => {
        self.update_goods_received(&key, &value).await?;
        Ok(None)
      }
      Command::PaidToSupplier { key, paid_amount, is_paid } => {
        self.update_supplier_payment(&key, &paid_amount, &is_paid).await?;
        Ok(None)
      }
      Command::PaidToBank { key, repayment_amount, is_repaid } => {
        self
          .update_bank_repayment(&key, &repayment_amount, &is_repaid)
          .await?;
        Ok(None)
      }
      Command::History { key } => {
        let history = self.history_of(&key).await?;
        render_history(history).await.map(Some)
      }
      // Identity attributes belong to the host; nothing to report here.
      Command::GetUser => Ok(None),
      Command::InitLedger => {
        self.init_ledger().await?;
        Ok(None)
      }
    }
  }
}

async fn render_records<C>(label: &str, mut records: C) -> Result<Vec<u8>>
where
  C: Cursor<Item = KeyValue, Error = Error>,
{
  let mut writer = codec::EnvelopeWriter::new();
  while let Some(entry) = records.next().await? {
    writer.push_record(label, &entry);
  }
  Ok(writer.finish())
}

async fn render_history<C>(mut history: C) -> Result<Vec<u8>>
where
  C: Cursor<Item = KeyModification, Error = Error>,
{
  let mut writer = codec::EnvelopeWriter::new();
  while let Some(entry) = history.next().await? {
    writer.push_modification(&entry);
  }
  Ok(writer.finish())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{codec, memory::MemoryLedger};

  fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
  }

  fn new_invoice_args(key: &str, billed_to: &str) -> Vec<String> {
    args(&[key, "7", billed_to, "2024-01-01", "1000", "Widgets", "N", "N", "0", "N", "0"])
  }

  fn json(bytes: &[u8]) -> serde_json::Value { serde_json::from_slice(bytes).unwrap() }

  // ── Parsing ──────────────────────────────────────────────────────────────

  #[test]
  fn every_command_name_is_unique() {
    for (i, spec) in COMMANDS.iter().enumerate() {
      assert!(
        COMMANDS[i + 1..].iter().all(|other| other.name != spec.name),
        "duplicate command {}",
        spec.name
      );
    }
  }

  #[test]
  fn unknown_function_is_unsupported() {
    let err = Command::parse("bogus", vec![]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation(_)));
  }

  #[test]
  fn wrong_arity_names_expected_count() {
    let err = Command::parse("isPaidToSupplier", args(&["INV0", "500"])).unwrap_err();
    match err {
      Error::InvalidArgument(msg) => assert!(msg.ends_with("expecting 3"), "{msg}"),
      other => panic!("unexpected error {other:?}"),
    }

    let err = Command::parse("getHistoryForInvoice", vec![]).unwrap_err();
    match err {
      Error::InvalidArgument(msg) => assert!(msg.ends_with("expecting at least 1"), "{msg}"),
      other => panic!("unexpected error {other:?}"),
    }
  }

  #[test]
  fn new_invoice_binds_positional_fields() {
    let command = Command::parse("newInvoice", new_invoice_args("INV3", "Acme")).unwrap();
    let Command::NewInvoice { key, invoice } = command else {
      panic!("expected NewInvoice");
    };
    assert_eq!(key, "INV3");
    assert_eq!(invoice.invoice_number, "7");
    assert_eq!(invoice.billed_to, "Acme");
    assert_eq!(invoice.item_description, "Widgets");
    assert_eq!(invoice.repayment_amount, "0");
  }

  #[test]
  fn history_ignores_extra_arguments() {
    let command = Command::parse("getHistoryForInvoice", args(&["INV0", "extra"])).unwrap();
    assert_eq!(command, Command::History { key: "INV0".into() });
  }

  #[test]
  fn get_user_accepts_any_arguments() {
    assert_eq!(Command::parse("getUser", vec![]).unwrap(), Command::GetUser);
    assert_eq!(Command::parse("getUser", args(&["role"])).unwrap(), Command::GetUser);
  }

  // ── Invocation ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn unknown_function_never_touches_ledger() {
    let store = InvoiceStore::new(MemoryLedger::new());
    store.invoke("initLedger", vec![]).await.unwrap();
    let before = store.ledger().get_state("INV0").await.unwrap();

    let err = store.invoke("bogus", args(&["INV0"])).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation(_)));

    assert_eq!(store.ledger().len(), 1);
    assert_eq!(store.ledger().get_state("INV0").await.unwrap(), before);
  }

  #[tokio::test]
  async fn invoice_lifecycle_through_dispatch() {
    let store = InvoiceStore::new(MemoryLedger::new());
    assert_eq!(store.invoke("newInvoice", new_invoice_args("INV0", "Acme")).await.unwrap(), None);
    store.invoke("isGoodsReceived", args(&["INV0", "Y"])).await.unwrap();
    store.invoke("isPaidToSupplier", args(&["INV0", "900", "Y"])).await.unwrap();
    store.invoke("isPaidToBank", args(&["INV0", "1000", "Y"])).await.unwrap();

    let raw = store.invoke("queryInvoice", args(&["INV0"])).await.unwrap().unwrap();
    let invoice = codec::decode(&raw).unwrap();
    assert_eq!(invoice.billed_to, "Acme");
    assert_eq!(invoice.goods_received, "Y");
    assert_eq!(invoice.paid_amount, "900");
    assert_eq!(invoice.is_paid_to_supplier, "Y");
    assert_eq!(invoice.repayment_amount, "1000");
    assert_eq!(invoice.is_repaid_to_bank, "Y");

    let history = store
      .invoke("getHistoryForInvoice", args(&["INV0"]))
      .await
      .unwrap()
      .unwrap();
    let history = json(&history);
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0]["Value"]["gr"], "N");
    assert_eq!(entries[3]["Value"]["repaid"], "Y");
    assert!(entries.iter().all(|e| e["TxId"].is_string() && e["Timestamp"].is_string()));
  }

  #[tokio::test]
  async fn query_all_uses_invoice_label() {
    let store = InvoiceStore::new(MemoryLedger::new());
    store.invoke("newInvoice", new_invoice_args("INV1", "Acme")).await.unwrap();
    store
      .invoke("createInvoiceWithJsonInput", args(&["INV2", r#"{"billedTo":"Globex"}"#]))
      .await
      .unwrap();
    store.invoke("newInvoice", new_invoice_args("INV999", "Initech")).await.unwrap();

    let out = store.invoke("queryAllInvoices", vec![]).await.unwrap().unwrap();
    let out = json(&out);
    let entries = out.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["Invoice"], "INV1");
    assert_eq!(entries[0]["Record"]["billedTo"], "Acme");
    assert_eq!(entries[1]["Invoice"], "INV2");
    assert_eq!(entries[1]["Record"], serde_json::json!({ "billedTo": "Globex" }));
  }

  #[tokio::test]
  async fn range_query_uses_key_label() {
    let store = InvoiceStore::new(MemoryLedger::new());
    for key in ["A1", "B1", "C1"] {
      store.invoke("newInvoice", new_invoice_args(key, "Acme")).await.unwrap();
    }
    let out = store
      .invoke("queryInvoicesByRange", args(&["B", "C"]))
      .await
      .unwrap()
      .unwrap();
    let out = json(&out);
    assert_eq!(out.as_array().unwrap().len(), 1);
    assert_eq!(out[0]["Key"], "B1");
  }

  #[tokio::test]
  async fn malformed_json_input_is_rejected() {
    let store = InvoiceStore::new(MemoryLedger::new());
    let err = store
      .invoke("createInvoiceWithJsonInput", args(&["INV0", "[1,2]"]))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::MalformedRecord(_)));
    assert!(store.ledger().is_empty());
  }

  #[tokio::test]
  async fn get_user_and_init_are_empty_successes() {
    let store = InvoiceStore::new(MemoryLedger::new());
    assert_eq!(store.init().unwrap(), None);
    assert_eq!(store.invoke("getUser", vec![]).await.unwrap(), None);
    assert!(store.ledger().is_empty());
  }
}
