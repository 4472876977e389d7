//! Handlers for `/api/deals` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/api/deals` | Insertion-ordered list |
//! | `POST`   | `/api/deals` | One record or an array; create-or-skip |
//! | `GET`    | `/api/deals/{id}` | 404 if not found |
//! | `PATCH`  | `/api/deals/{id}` | Partial update; `contact_id` must re-resolve |
//! | `DELETE` | `/api/deals/{id}` | |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use orbit_core::{
  bulk::OneOrMany,
  deal::{Deal, DealDraft, DealPatch},
  store::RecordStore,
};
use serde_json::json;

use crate::{
  AppState,
  auth::TenantScope,
  error::{ApiError, store_err},
  handlers::parse_id,
};

/// `GET /api/deals`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  TenantScope(tenant): TenantScope,
) -> Result<Json<Vec<Deal>>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let deals = state.store.list_deals(tenant).await.map_err(store_err)?;
  Ok(Json(deals))
}

/// `POST /api/deals` — body: one draft or an array of drafts. A record whose
/// contact reference does not resolve within the tenant lands in `rejected`;
/// it never aborts the batch.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  TenantScope(tenant): TenantScope,
  Json(body): Json<OneOrMany<DealDraft>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let outcome = state
    .store
    .create_deals(tenant, body.into_vec())
    .await
    .map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

/// `GET /api/deals/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  TenantScope(tenant): TenantScope,
  Path(raw_id): Path<String>,
) -> Result<Json<Deal>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let id = parse_id("deal", &raw_id)?;
  let deal = state
    .store
    .get_deal(tenant, id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("deal {id}")))?;
  Ok(Json(deal))
}

/// `PATCH /api/deals/{id}` — merges only the supplied fields.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  TenantScope(tenant): TenantScope,
  Path(raw_id): Path<String>,
  Json(patch): Json<DealPatch>,
) -> Result<Json<Deal>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let id = parse_id("deal", &raw_id)?;
  let deal = state
    .store
    .update_deal(tenant, id, patch)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("deal {id}")))?;
  Ok(Json(deal))
}

/// `DELETE /api/deals/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  TenantScope(tenant): TenantScope,
  Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let id = parse_id("deal", &raw_id)?;
  let removed = state.store.delete_deal(tenant, id).await.map_err(store_err)?;
  if !removed {
    return Err(ApiError::NotFound(format!("deal {id}")));
  }
  Ok(Json(json!({ "message": format!("deal {id} deleted") })))
}
