//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body has the shape `{"error": <kind>, "message": <string>}`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// 401. The message never reveals which tenant a key belonged to.
  #[error("invalid API key")]
  Unauthorized,

  /// 400 — missing required field or malformed value.
  #[error("{0}")]
  Validation(String),

  /// 400 — dangling or cross-tenant foreign key.
  #[error("{0}")]
  Reference(String),

  /// 404 — unknown id, or an id owned by another tenant (reported
  /// identically).
  #[error("{0} not found")]
  NotFound(String),

  /// 500 — unexpected fault; retryable by the caller with backoff.
  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  fn kind(&self) -> &'static str {
    match self {
      ApiError::Unauthorized => "unauthorized",
      ApiError::Validation(_) => "validation",
      ApiError::Reference(_) => "reference",
      ApiError::NotFound(_) => "not_found",
      ApiError::Internal(_) => "internal",
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Validation(_) | ApiError::Reference(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<orbit_core::Error> for ApiError {
  fn from(e: orbit_core::Error) -> Self {
    match e {
      orbit_core::Error::Unauthorized => ApiError::Unauthorized,
      orbit_core::Error::Validation(m) => ApiError::Validation(m),
      orbit_core::Error::Reference(m) => ApiError::Reference(m),
      orbit_core::Error::NotFound(m) => ApiError::NotFound(m),
      orbit_core::Error::Fault(e) => ApiError::Internal(e),
    }
  }
}

/// Map a backend error onto the wire taxonomy via `orbit_core::Error`.
pub fn store_err<E: Into<orbit_core::Error>>(e: E) -> ApiError {
  ApiError::from(e.into())
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
      tracing::error!("{self}");
    }
    let body = json!({ "error": self.kind(), "message": self.to_string() });
    (status, Json(body)).into_response()
  }
}
