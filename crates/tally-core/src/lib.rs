//! Core types and trait definitions for the Tally invoice ledger.
//!
//! This crate has no HTTP or database dependencies. It defines the invoice
//! record and its JSON codec, the [`ledger::Ledger`] backend abstraction, the
//! [`store::InvoiceStore`] built on top of it, and the table-driven command
//! dispatcher.

// Native `async fn` in traits; `Send` bounds are spelled out where needed.
#![allow(async_fn_in_trait)]

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod memory;
pub mod store;

pub use error::{Error, ErrorKind, Result};
