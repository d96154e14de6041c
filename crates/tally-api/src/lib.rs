//! JSON HTTP API for Tally.
//!
//! Exposes an axum [`Router`] backed by an [`InvoiceStore`] over any
//! [`Ledger`]. TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tally_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod extract;
pub mod invoices;
pub mod invoke;

use std::sync::Arc;

use axum::{
  Router,
  http::{StatusCode, header},
  response::{IntoResponse, Response},
  routing::{get, post},
};
use tally_core::{ledger::Ledger, store::InvoiceStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<L>(store: Arc<InvoiceStore<L>>) -> Router<()>
where
  L: Ledger + 'static,
{
  Router::new()
    // Command dispatch
    .route("/invoke", post(invoke::handler::<L>))
    // Invoices
    .route("/invoices", get(invoices::list::<L>))
    .route(
      "/invoices/{key}",
      get(invoices::get_one::<L>).put(invoices::put_raw::<L>),
    )
    .route("/invoices/{key}/goods-received", post(invoices::goods_received::<L>))
    .route("/invoices/{key}/supplier-payment", post(invoices::supplier_payment::<L>))
    .route("/invoices/{key}/bank-repayment", post(invoices::bank_repayment::<L>))
    .route("/invoices/{key}/history", get(invoices::history::<L>))
    // Selector query
    .route("/query", get(invoices::query::<L>))
    .with_state(store)
}

/// `200` with a JSON payload, or `204` when there is none. An empty payload
/// (an absent key read under the tolerant policy) also yields `204`.
pub(crate) fn payload_response(payload: Option<Vec<u8>>) -> Response {
  match payload {
    Some(bytes) if !bytes.is_empty() => (
      StatusCode::OK,
      [(header::CONTENT_TYPE, "application/json")],
      bytes,
    )
      .into_response(),
    _ => StatusCode::NO_CONTENT.into_response(),
  }
}

// ─── Integration tests ────────────────────────────────────────────────────────
