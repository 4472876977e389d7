//! Error taxonomy for `orbit-core`.
//!
//! Every failure a caller can observe maps onto one of these variants. The
//! HTTP layer translates them to status codes; inside bulk ingestion,
//! `Validation` and `Reference` are captured per record instead of aborting
//! the batch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The presented API key does not resolve to any tenant. Never-issued and
  /// rotated-away keys are indistinguishable.
  #[error("invalid API key")]
  Unauthorized,

  /// A required field is missing or a supplied value is malformed.
  #[error("{0}")]
  Validation(String),

  /// A foreign key does not resolve within the caller's tenant.
  #[error("{0}")]
  Reference(String),

  /// The record does not exist, or belongs to another tenant (reported
  /// identically).
  #[error("{0} not found")]
  NotFound(String),

  /// Unexpected internal failure. Retryable by the caller with backoff.
  #[error("internal error: {0}")]
  Fault(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
