//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::ErrorKind;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  /// The request could not be extracted (body, query string or path).
  #[error("{message}")]
  Rejected { status: StatusCode, message: String },

  #[error(transparent)]
  Core(#[from] tally_core::Error),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Rejected { status, .. } => *status,
      ApiError::Core(e) => match e.kind() {
        ErrorKind::InvalidArgument | ErrorKind::MalformedRecord => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::UnsupportedOperation => StatusCode::NOT_IMPLEMENTED,
        ErrorKind::BackendFailure => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  fn kind(&self) -> ErrorKind {
    match self {
      ApiError::BadRequest(_) | ApiError::Rejected { .. } => ErrorKind::InvalidArgument,
      ApiError::Core(e) => e.kind(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let body = json!({ "error": self.to_string(), "kind": self.kind() });
    (status, Json(body)).into_response()
  }
}

// ─── Extractor rejections ─────────────────────────────────────────────────────

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::Rejected { status: rejection.status(), message: rejection.body_text() }
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    Self::Rejected { status: rejection.status(), message: rejection.body_text() }
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    Self::Rejected { status: rejection.status(), message: rejection.body_text() }
  }
}
