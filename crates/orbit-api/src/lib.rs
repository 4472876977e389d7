//! JSON HTTP surface for the Orbit record store.
//!
//! Exposes an axum [`Router`] backed by any [`RecordStore`]. Every route
//! except `GET /api/health` passes through the request gate in [`auth`]
//! before any record access happens.

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use orbit_core::store::RecordStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Detach referencing deals on contact delete instead of removing them.
  #[serde(default)]
  pub detach_on_contact_delete: bool,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: RecordStore> {
  pub store: Arc<S>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the Orbit API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/api/health", get(handlers::health::handler))
    .route("/api/user/profile", get(handlers::profile::show::<S>))
    .route("/api/user/rotate-key", post(handlers::profile::rotate::<S>))
    .route(
      "/api/contacts",
      get(handlers::contacts::list::<S>).post(handlers::contacts::create::<S>),
    )
    .route(
      "/api/contacts/{id}",
      get(handlers::contacts::get_one::<S>)
        .patch(handlers::contacts::update::<S>)
        .delete(handlers::contacts::delete::<S>),
    )
    .route(
      "/api/deals",
      get(handlers::deals::list::<S>).post(handlers::deals::create::<S>),
    )
    .route(
      "/api/deals/{id}",
      get(handlers::deals::get_one::<S>)
        .patch(handlers::deals::update::<S>)
        .delete(handlers::deals::delete::<S>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use orbit_core::store::RecordStore as _;
  use orbit_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  async fn make_state() -> (AppState<SqliteStore>, String) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let (_, key) = store.create_tenant("ada@example.com".into()).await.unwrap();
    (AppState { store: Arc::new(store) }, key.as_str().to_string())
  }

  async fn send(
    state:  AppState<SqliteStore>,
    method: &str,
    uri:    &str,
    key:    Option<&str>,
    body:   Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
      builder = builder.header("x-api-key", key);
    }
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let resp = router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  // ── Health & auth ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn health_needs_no_key() {
    let (state, _) = make_state().await;
    let (status, body) = send(state, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["platform"], "Orbit CRM");
  }

  #[tokio::test]
  async fn missing_key_is_401_with_error_body() {
    let (state, _) = make_state().await;
    let (status, body) = send(state, "GET", "/api/contacts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    assert!(body["message"].is_string());
  }

  #[tokio::test]
  async fn bogus_key_is_401() {
    let (state, _) = make_state().await;
    let (status, _) =
      send(state, "GET", "/api/contacts", Some("zero_bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  // ── Profile & rotation ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn profile_returns_the_current_key() {
    let (state, key) = make_state().await;
    let (status, body) =
      send(state, "GET", "/api/user/profile", Some(&key), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["apiKey"], key.as_str());
  }

  #[tokio::test]
  async fn rotation_swaps_credentials() {
    let (state, old_key) = make_state().await;

    let (status, body) = send(
      state.clone(),
      "POST",
      "/api/user/rotate-key",
      Some(&old_key),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_key = body["apiKey"].as_str().unwrap().to_string();
    assert_ne!(new_key, old_key);

    // The old key is dead, the new one works.
    let (status, _) =
      send(state.clone(), "GET", "/api/user/profile", Some(&old_key), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) =
      send(state, "GET", "/api/user/profile", Some(&new_key), None).await;
    assert_eq!(status, StatusCode::OK);
  }

  // ── Contacts ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn single_create_returns_201_with_created_partition() {
    let (state, key) = make_state().await;
    let (status, body) = send(
      state,
      "POST",
      "/api/contacts",
      Some(&key),
      Some(json!({ "name": "Ada Lovelace", "email": "ada@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let created = body["created"].as_array().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["name"], "Ada Lovelace");
    assert!(created[0]["id"].is_string());
    assert!(created[0]["created_at"].is_string());
    assert!(body["skipped"].as_array().unwrap().is_empty());
    assert!(body["rejected"].as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn bulk_create_partitions_in_order() {
    let (state, key) = make_state().await;
    let (status, body) = send(
      state,
      "POST",
      "/api/contacts",
      Some(&key),
      Some(json!([
        { "name": "Ada",   "email": "ada@example.com" },
        { "email": "nameless@example.com" },
        { "name": "Clone", "email": "ADA@example.com" },
      ])),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"].as_array().unwrap().len(), 1);
    assert_eq!(body["created"][0]["name"], "Ada");
    assert_eq!(body["skipped"].as_array().unwrap().len(), 1);
    assert_eq!(body["skipped"][0]["name"], "Clone");
    assert_eq!(body["rejected"].as_array().unwrap().len(), 1);
    assert_eq!(body["rejected"][0]["record"]["email"], "nameless@example.com");
    assert!(
      body["rejected"][0]["reason"].as_str().unwrap().contains("name"),
    );
  }

  #[tokio::test]
  async fn resubmitted_batch_is_fully_skipped() {
    let (state, key) = make_state().await;
    let batch = json!([
      { "name": "Ada",   "email": "ada@example.com" },
      { "name": "Grace", "email": "grace@example.com" },
    ]);

    send(state.clone(), "POST", "/api/contacts", Some(&key), Some(batch.clone())).await;
    let (status, body) =
      send(state.clone(), "POST", "/api/contacts", Some(&key), Some(batch)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["created"].as_array().unwrap().is_empty());
    assert_eq!(body["skipped"].as_array().unwrap().len(), 2);

    let (_, listed) = send(state, "GET", "/api/contacts", Some(&key), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn unknown_and_malformed_ids_are_404() {
    let (state, key) = make_state().await;

    let missing = Uuid::new_v4();
    let (status, body) = send(
      state.clone(),
      "GET",
      &format!("/api/contacts/{missing}"),
      Some(&key),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = send(
      state,
      "GET",
      "/api/contacts/nonexistent-id-12345",
      Some(&key),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
  }

  #[tokio::test]
  async fn patch_merges_and_preserves_untouched_fields() {
    let (state, key) = make_state().await;
    let (_, body) = send(
      state.clone(),
      "POST",
      "/api/contacts",
      Some(&key),
      Some(json!({ "name": "Ada", "email": "ada@example.com", "role": "Engineer" })),
    )
    .await;
    let id = body["created"][0]["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
      state,
      "PATCH",
      &format!("/api/contacts/{id}"),
      Some(&key),
      Some(json!({ "notes": "met at RustConf" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Ada");
    assert_eq!(updated["role"], "Engineer");
    assert_eq!(updated["notes"], "met at RustConf");
  }

  #[tokio::test]
  async fn patch_with_blank_name_is_400_validation() {
    let (state, key) = make_state().await;
    let (_, body) = send(
      state.clone(),
      "POST",
      "/api/contacts",
      Some(&key),
      Some(json!({ "name": "Ada" })),
    )
    .await;
    let id = body["created"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
      state,
      "PATCH",
      &format!("/api/contacts/{id}"),
      Some(&key),
      Some(json!({ "name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
  }

  // ── Deals & referential integrity ───────────────────────────────────────────

  #[tokio::test]
  async fn deal_referencing_unknown_contact_is_rejected() {
    let (state, key) = make_state().await;
    let (status, body) = send(
      state.clone(),
      "POST",
      "/api/deals",
      Some(&key),
      Some(json!({
        "title": "Acme renewal",
        "stage": "Qualified",
        "contact_id": Uuid::new_v4().to_string(),
      })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["created"].as_array().unwrap().is_empty());
    assert_eq!(body["rejected"].as_array().unwrap().len(), 1);

    // Nothing was persisted.
    let (_, listed) = send(state, "GET", "/api/deals", Some(&key), None).await;
    assert!(listed.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn patch_deal_with_unknown_contact_is_400_reference() {
    let (state, key) = make_state().await;
    let (_, body) = send(
      state.clone(),
      "POST",
      "/api/deals",
      Some(&key),
      Some(json!({ "title": "Acme renewal", "stage": "Qualified" })),
    )
    .await;
    let id = body["created"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
      state,
      "PATCH",
      &format!("/api/deals/{id}"),
      Some(&key),
      Some(json!({ "contact_id": Uuid::new_v4().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "reference");
  }

  #[tokio::test]
  async fn deleting_a_contact_cascades_to_its_deals() {
    let (state, key) = make_state().await;
    let (_, body) = send(
      state.clone(),
      "POST",
      "/api/contacts",
      Some(&key),
      Some(json!({ "name": "Ada", "email": "ada@example.com" })),
    )
    .await;
    let contact_id = body["created"][0]["id"].as_str().unwrap().to_string();

    send(
      state.clone(),
      "POST",
      "/api/deals",
      Some(&key),
      Some(json!([
        { "title": "First",  "stage": "Qualified",   "contact_id": contact_id },
        { "title": "Second", "stage": "Negotiation", "contact_id": contact_id },
      ])),
    )
    .await;

    let (status, body) = send(
      state.clone(),
      "DELETE",
      &format!("/api/contacts/{contact_id}"),
      Some(&key),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("deleted"));
    assert_eq!(body["deals_deleted"], 2);

    let (_, deals) = send(state, "GET", "/api/deals", Some(&key), None).await;
    assert!(deals.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn delete_deal_returns_message_then_404() {
    let (state, key) = make_state().await;
    let (_, body) = send(
      state.clone(),
      "POST",
      "/api/deals",
      Some(&key),
      Some(json!({ "title": "Acme renewal", "stage": "Qualified" })),
    )
    .await;
    let id = body["created"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
      state.clone(),
      "DELETE",
      &format!("/api/deals/{id}"),
      Some(&key),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("deleted"));

    let (status, _) = send(
      state,
      "DELETE",
      &format!("/api/deals/{id}"),
      Some(&key),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Tenant isolation over the wire ──────────────────────────────────────────

  #[tokio::test]
  async fn one_tenants_records_are_invisible_to_another() {
    let (state, key_a) = make_state().await;
    let (_, key_b) = state
      .store
      .create_tenant("grace@example.com".into())
      .await
      .unwrap();
    let key_b = key_b.as_str().to_string();

    let (_, body) = send(
      state.clone(),
      "POST",
      "/api/contacts",
      Some(&key_a),
      Some(json!({ "name": "Ada", "email": "ada@example.com" })),
    )
    .await;
    let id = body["created"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
      state.clone(),
      "GET",
      &format!("/api/contacts/{id}"),
      Some(&key_b),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
      state.clone(),
      "DELETE",
      &format!("/api/contacts/{id}"),
      Some(&key_b),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A still sees the record.
    let (status, _) = send(
      state,
      "GET",
      &format!("/api/contacts/{id}"),
      Some(&key_a),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
  }
}
