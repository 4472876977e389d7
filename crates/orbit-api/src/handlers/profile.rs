//! Handlers for `/api/user` endpoints.

use axum::{Json, extract::State};
use orbit_core::{store::RecordStore, tenant::TenantProfile};
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::TenantScope,
  error::{ApiError, store_err},
};

/// `GET /api/user/profile`
pub async fn show<S>(
  State(state): State<AppState<S>>,
  TenantScope(tenant): TenantScope,
) -> Result<Json<TenantProfile>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let profile = state.store.profile(tenant).await.map_err(store_err)?;
  Ok(Json(profile))
}

/// `POST /api/user/rotate-key`. The old key stops resolving before this
/// returns. Not safe to blindly retry on timeout: every call mints a further
/// distinct key.
pub async fn rotate<S>(
  State(state): State<AppState<S>>,
  TenantScope(tenant): TenantScope,
) -> Result<Json<Value>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let key = state.store.rotate_key(tenant).await.map_err(store_err)?;
  Ok(Json(json!({ "apiKey": key.as_str() })))
}
