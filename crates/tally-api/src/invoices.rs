//! Handlers for `/invoices` and `/query` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/invoices` | Optional `?start=&end=`; defaults to the `INV0`..`INV999` window |
//! | `GET`  | `/invoices/{key}` | Stored record bytes; 404 if absent |
//! | `PUT`  | `/invoices/{key}` | Body: raw record JSON, stored verbatim; returns 201 |
//! | `POST` | `/invoices/{key}/goods-received` | Body: `{"value":"Y"}` |
//! | `POST` | `/invoices/{key}/supplier-payment` | Body: `{"amount":"500","paid":"Y"}` |
//! | `POST` | `/invoices/{key}/bank-repayment` | Body: `{"amount":"500","repaid":"Y"}` |
//! | `GET`  | `/invoices/{key}/history` | History envelope, oldest first |
//! | `GET`  | `/query` | `?field=&value=` single-field selector query |

use std::sync::Arc;

use axum::{
  body::Bytes,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tally_core::{dispatch::Command, ledger::Ledger, store::InvoiceStore};

use crate::{
  error::ApiError,
  extract::{Json, Path, Query},
  payload_response,
};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub start: Option<String>,
  pub end:   Option<String>,
}

/// `GET /invoices[?start=<key>&end=<key>]`
pub async fn list<L>(
  State(store): State<Arc<InvoiceStore<L>>>,
  Query(params): Query<ListParams>,
) -> Result<Response, ApiError>
where
  L: Ledger + 'static,
{
  let command = match (params.start, params.end) {
    (None, None) => Command::QueryAll,
    (start, end) => Command::QueryByRange {
      start: start.unwrap_or_default(),
      end:   end.unwrap_or_default(),
    },
  };
  Ok(payload_response(store.execute(command).await?))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /invoices/{key}`
pub async fn get_one<L>(
  State(store): State<Arc<InvoiceStore<L>>>,
  Path(key): Path<String>,
) -> Result<Response, ApiError>
where
  L: Ledger + 'static,
{
  let payload = store.execute(Command::QueryInvoice { key }).await?;
  Ok(payload_response(payload))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `PUT /invoices/{key}`, returning 201 + `{"tx_id": ...}`.
pub async fn put_raw<L>(
  State(store): State<Arc<InvoiceStore<L>>>,
  Path(key): Path<String>,
  body: Bytes,
) -> Result<Response, ApiError>
where
  L: Ledger + 'static,
{
  let tx_id = store.create_from_raw(&key, &body).await?;
  Ok((StatusCode::CREATED, Json(json!({ "tx_id": tx_id })))
    .into_response())
}

// ─── Updates ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GoodsReceivedBody {
  pub value: String,
}

/// `POST /invoices/{key}/goods-received`
pub async fn goods_received<L>(
  State(store): State<Arc<InvoiceStore<L>>>,
  Path(key): Path<String>,
  Json(body): Json<GoodsReceivedBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  L: Ledger + 'static,
{
  let tx_id = store.update_goods_received(&key, &body.value).await?;
  Ok(Json(json!({ "tx_id": tx_id })))
}

#[derive(Debug, Deserialize)]
pub struct SupplierPaymentBody {
  pub amount: String,
  pub paid:   String,
}

/// `POST /invoices/{key}/supplier-payment`
pub async fn supplier_payment<L>(
  State(store): State<Arc<InvoiceStore<L>>>,
  Path(key): Path<String>,
  Json(body): Json<SupplierPaymentBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  L: Ledger + 'static,
{
  let tx_id = store
    .update_supplier_payment(&key, &body.amount, &body.paid)
    .await?;
  Ok(Json(json!({ "tx_id": tx_id })))
}

#[derive(Debug, Deserialize)]
pub struct BankRepaymentBody {
  pub amount: String,
  pub repaid: String,
}

/// `POST /invoices/{key}/bank-repayment`
pub async fn bank_repayment<L>(
  State(store): State<Arc<InvoiceStore<L>>>,
  Path(key): Path<String>,
  Json(body): Json<BankRepaymentBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  L: Ledger + 'static,
{
  let tx_id = store
    .update_bank_repayment(&key, &body.amount, &body.repaid)
    .await?;
  Ok(Json(json!({ "tx_id": tx_id })))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /invoices/{key}/history`
pub async fn history<L>(
  State(store): State<Arc<InvoiceStore<L>>>,
  Path(key): Path<String>,
) -> Result<Response, ApiError>
where
  L: Ledger + 'static,
{
  let payload = store.execute(Command::History { key }).await?;
  Ok(payload_response(payload))
}

// ─── Selector query ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QueryParams {
  pub field: String,
  pub value: String,
}

/// `GET /query?field=<field>&value=<value>`
pub async fn query<L>(
  State(store): State<Arc<InvoiceStore<L>>>,
  Query(params): Query<QueryParams>,
) -> Result<Response, ApiError>
where
  L: Ledger + 'static,
{
  if params.field.is_empty() {
    return Err(ApiError::BadRequest("`field` must not be empty".to_string()));
  }
  let payload = store
    .execute(Command::QueryBySelector { field: params.field, value: params.value })
    .await?;
  Ok(payload_response(payload))
}
