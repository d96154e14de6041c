//! Handler for `POST /invoke`, the chaincode-style entry point.
//!
//! Body: `{"function": "isGoodsReceived", "args": ["INV0", "Y"]}`. Responds
//! `200` with the command's JSON payload, or `204` when the command produces
//! none.

use std::sync::Arc;

use axum::{extract::State, response::Response};
use serde::Deserialize;
use tally_core::{ledger::Ledger, store::InvoiceStore};

use crate::{error::ApiError, extract::Json, payload_response};

#[derive(Debug, Deserialize)]
pub struct InvokeBody {
  pub function: String,
  #[serde(default)]
  pub args:     Vec<String>,
}

/// `POST /invoke`
pub async fn handler<L>(
  State(store): State<Arc<InvoiceStore<L>>>,
  Json(body): Json<InvokeBody>,
) -> Result<Response, ApiError>
where
  L: Ledger + 'static,
{
  let payload = store.invoke(&body.function, body.args).await?;
  Ok(payload_response(payload))
}
