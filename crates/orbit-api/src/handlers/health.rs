//! Liveness probe — the only unauthenticated route.

use axum::Json;
use serde_json::{Value, json};

/// `GET /api/health`
pub async fn handler() -> Json<Value> {
  Json(json!({ "status": "ok", "platform": "Orbit CRM" }))
}
