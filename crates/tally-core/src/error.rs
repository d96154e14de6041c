//! Error types for `tally-core`.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Wrong argument count, or an empty ledger key.
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// A payload that is not a JSON object.
  #[error("malformed record: {0}")]
  MalformedRecord(String),

  #[error("no record stored under key {0:?}")]
  NotFound(String),

  /// Unknown command name, or a selector query against a backend without
  /// rich-query support.
  #[error("unsupported operation: {0}")]
  UnsupportedOperation(String),

  #[error("ledger backend failure: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap any backend error.
  pub fn backend<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Backend(Box::new(e))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
      Self::MalformedRecord(_) => ErrorKind::MalformedRecord,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
      Self::Backend(_) => ErrorKind::BackendFailure,
    }
  }
}

/// The structured classification of an [`Error`], exposed to callers that
/// only need to branch on the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  InvalidArgument,
  MalformedRecord,
  NotFound,
  UnsupportedOperation,
  BackendFailure,
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::InvalidArgument => "invalid_argument",
      Self::MalformedRecord => "malformed_record",
      Self::NotFound => "not_found",
      Self::UnsupportedOperation => "unsupported_operation",
      Self::BackendFailure => "backend_failure",
    })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
