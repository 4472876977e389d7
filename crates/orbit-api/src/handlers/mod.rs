//! HTTP handlers, grouped by resource.

pub mod contacts;
pub mod deals;
pub mod health;
pub mod profile;

use uuid::Uuid;

use crate::error::ApiError;

/// A path id that does not parse maps to `NotFound`, not a validation error:
/// a syntactically bad id and an unknown id are indistinguishable to callers.
pub(crate) fn parse_id(kind: &str, raw: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("{kind} {raw}")))
}
