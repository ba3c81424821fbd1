//! POST /workspace/events — an agent's reply inside a ticket thread.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use dispatcher_relay::RelayHub;
use dispatcher_workspace::{webhook_auth, ThreadReplyEvent};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::app::AppState;
use crate::error::{GatewayError, Result};

pub async fn handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let source_cfg = state
        .config
        .webhooks
        .sources
        .iter()
        .find(|s| s.name == "workspace-events")
        .ok_or_else(|| GatewayError::BadRequest("no webhook source named 'workspace-events' configured".to_string()))?;

    webhook_auth::verify(
        &source_cfg.auth_mode,
        source_cfg.secret.as_deref(),
        |name| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string),
        &body,
    )
    .map_err(dispatcher_surfaces::SurfaceError::from)?;

    let event: ThreadReplyEvent =
        serde_json::from_slice(&body).map_err(|e| GatewayError::BadRequest(e.to_string()))?;

    if !state.dedup.first_seen(&event.workspace_thread_key, &event.event_id) {
        info!(workspace_thread_key = %event.workspace_thread_key, event_id = %event.event_id, "duplicate workspace event dropped");
        return Ok(Json(json!({"ok": true, "duplicate": true})));
    }

    let session = state
        .sessions
        .get_by_workspace_thread(&event.workspace_thread_key)
        .map_err(dispatcher_relay::RelayError::from)?;

    let relay = RelayHub::new(&state.sessions, state.workspace.as_ref(), &state.surfaces);
    let outcome = relay
        .handle_thread_reply(&session.id, &event.agent_id, &event.agent_name, &event.text)
        .await?;

    info!(?outcome, "thread reply handled");
    Ok(Json(json!({"ok": true})))
}
