use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Liveness plus the size of the in-memory search state.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let (cached_searches, jobs) = state.search.footprint().await;
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "cached_searches": cached_searches,
        "jobs": jobs
    }))
}
