pub mod admin;
pub mod content;
pub mod events;
pub mod identity;

use axum::Json;
use serde_json::{Value, json};

/// health_check
///
/// [Public Route] Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
