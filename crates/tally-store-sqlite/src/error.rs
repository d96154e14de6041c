//! Error type for `tally-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A selector field that cannot be expressed as a JSON path.
  #[error("unsupported selector field: {0:?}")]
  UnsupportedSelector(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
