//! Handlers for `/api/contacts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/api/contacts` | Insertion-ordered list |
//! | `POST`   | `/api/contacts` | One record or an array; create-or-skip |
//! | `GET`    | `/api/contacts/{id}` | 404 if not found |
//! | `PATCH`  | `/api/contacts/{id}` | Partial update |
//! | `DELETE` | `/api/contacts/{id}` | Applies the store's cascade policy |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use orbit_core::{
  bulk::OneOrMany,
  contact::{Contact, ContactDraft, ContactPatch},
  store::RecordStore,
};
use serde_json::json;

use crate::{
  AppState,
  auth::TenantScope,
  error::{ApiError, store_err},
  handlers::parse_id,
};

/// `GET /api/contacts`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  TenantScope(tenant): TenantScope,
) -> Result<Json<Vec<Contact>>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let contacts = state.store.list_contacts(tenant).await.map_err(store_err)?;
  Ok(Json(contacts))
}

/// `POST /api/contacts` — body: one draft or an array of drafts. Returns 201
/// with the created/skipped/rejected partitions; partial success is the
/// normal outcome, not an error.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  TenantScope(tenant): TenantScope,
  Json(body): Json<OneOrMany<ContactDraft>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let outcome = state
    .store
    .create_contacts(tenant, body.into_vec())
    .await
    .map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

/// `GET /api/contacts/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  TenantScope(tenant): TenantScope,
  Path(raw_id): Path<String>,
) -> Result<Json<Contact>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let id = parse_id("contact", &raw_id)?;
  let contact = state
    .store
    .get_contact(tenant, id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("contact {id}")))?;
  Ok(Json(contact))
}

/// `PATCH /api/contacts/{id}` — merges only the supplied fields.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  TenantScope(tenant): TenantScope,
  Path(raw_id): Path<String>,
  Json(patch): Json<ContactPatch>,
) -> Result<Json<Contact>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let id = parse_id("contact", &raw_id)?;
  let contact = state
    .store
    .update_contact(tenant, id, patch)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("contact {id}")))?;
  Ok(Json(contact))
}

/// `DELETE /api/contacts/{id}`. The cascade step and the contact removal
/// commit as one unit; success here means the cascade fully completed.
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  TenantScope(tenant): TenantScope,
  Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let id = parse_id("contact", &raw_id)?;
  let removal = state
    .store
    .delete_contact(tenant, id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| ApiError::NotFound(format!("contact {id}")))?;
  Ok(Json(json!({
    "message": format!("contact {id} deleted"),
    "deals_deleted": removal.deals_deleted,
    "deals_detached": removal.deals_detached,
  })))
}
