use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe, returns session-store counters so an
/// operator can tell the process is up and actually talking to its database.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let stats = state.sessions.stats().ok();
    Json(json!({
        "status": "ok",
        "sessions": stats.map(|s| json!({
            "total": s.total,
            "active": s.active,
            "claimed": s.claimed,
        })),
    }))
}
