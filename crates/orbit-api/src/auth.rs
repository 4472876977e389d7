//! The request gate: API-key extractor and standalone verifier.
//!
//! Every route except the liveness probe authenticates through here before
//! any store access happens. The resolved tenant becomes the scope for all
//! record operations in the request and cannot be reassigned mid-flight.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use orbit_core::store::RecordStore;
use uuid::Uuid;

use crate::{
  AppState,
  error::{ApiError, store_err},
};

/// Header carrying the tenant's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The authenticated tenant scope. Present in a handler's arguments means
/// the request gate ran before the handler body.
pub struct TenantScope(pub Uuid);

/// Resolve the presented key directly from headers.
pub async fn authenticate<S>(headers: &HeaderMap, store: &S) -> Result<Uuid, ApiError>
where
  S: RecordStore,
{
  let candidate = headers
    .get(API_KEY_HEADER)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  store.resolve_key(candidate).await.map_err(store_err)
}

impl<S> FromRequestParts<AppState<S>> for TenantScope
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    authenticate(&parts.headers, state.store.as_ref())
      .await
      .map(TenantScope)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  use axum::http::{HeaderName, HeaderValue};
  use orbit_store_sqlite::SqliteStore;

  async fn state_and_key() -> (AppState<SqliteStore>, String) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let (_, key) = store.create_tenant("ada@example.com".into()).await.unwrap();
    (AppState { store: Arc::new(store) }, key.as_str().to_string())
  }

  fn headers_with(key: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(key) = key {
      headers.insert(
        HeaderName::from_static(API_KEY_HEADER),
        HeaderValue::from_str(key).unwrap(),
      );
    }
    headers
  }

  #[tokio::test]
  async fn valid_key_resolves() {
    let (state, key) = state_and_key().await;
    let headers = headers_with(Some(&key));
    assert!(authenticate(&headers, state.store.as_ref()).await.is_ok());
  }

  #[tokio::test]
  async fn missing_header_is_unauthorized() {
    let (state, _) = state_and_key().await;
    let headers = headers_with(None);
    let err = authenticate(&headers, state.store.as_ref()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
  }

  #[tokio::test]
  async fn wrong_key_is_unauthorized() {
    let (state, _) = state_and_key().await;
    let headers = headers_with(Some("zero_not_a_real_key"));
    let err = authenticate(&headers, state.store.as_ref()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
  }

  #[tokio::test]
  async fn rotated_away_key_is_unauthorized() {
    let (state, key) = state_and_key().await;
    let tenant = authenticate(&headers_with(Some(&key)), state.store.as_ref())
      .await
      .unwrap();
    state.store.rotate_key(tenant).await.unwrap();

    let err = authenticate(&headers_with(Some(&key)), state.store.as_ref())
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
  }
}
