//! SQLite backend for the Tally invoice ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod cursor;
mod encode;
mod ledger;
mod schema;

pub mod error;

pub use cursor::{HistoryCursor, StateCursor};
pub use error::{Error, Result};
pub use ledger::SqliteLedger;
