//! POST /workspace/actions — an agent pressed Accept or Close on a ticket card.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use dispatcher_escalation::Action;
use dispatcher_relay::{ClaimOutcome, CloseOutcome, RelayHub};
use dispatcher_workspace::{webhook_auth, ButtonCallback};
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
        .find(|s| s.name == "workspace-actions")
        .ok_or_else(|| GatewayError::BadRequest("no webhook source named 'workspace-actions' configured".to_string()))?;

    webhook_auth::verify(
        &source_cfg.auth_mode,
        source_cfg.secret.as_deref(),
        |name| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string),
        &body,
    )
    .map_err(dispatcher_surfaces::SurfaceError::from)?;

    let callback: ButtonCallback =
        serde_json::from_slice(&body).map_err(|e| GatewayError::BadRequest(e.to_string()))?;

    if !state.dedup.first_seen(&callback.workspace_thread_key, &callback.event_id) {
        info!(workspace_thread_key = %callback.workspace_thread_key, event_id = %callback.event_id, "duplicate workspace action dropped");
        return Ok(Json(json!({"ok": true, "duplicate": true})));
    }

    let session = state
        .sessions
        .get_by_workspace_thread(&callback.workspace_thread_key)
        .map_err(dispatcher_relay::RelayError::from)?;

    let relay = RelayHub::new(&state.sessions, state.workspace.as_ref(), &state.surfaces);

    match callback.action {
        Action::Accept => {
            let outcome = relay.handle_claim(&session.id, &callback.agent_id).await?;
            info!(?outcome, "claim handled");
            match outcome {
                ClaimOutcome::Claimed(_) => Ok(Json(json!({"ok": true}))),
                ClaimOutcome::AlreadyClaimed { claimed_by } => {
                    Ok(Json(json!({"ok": true, "already_claimed_by": claimed_by})))
                }
            }
        }
        Action::Close => {
            let outcome = relay.handle_close(&session.id, &callback.agent_id).await?;
            info!(?outcome, "close handled");
            match outcome {
                CloseOutcome::Closed(_) => Ok(Json(json!({"ok": true}))),
                CloseOutcome::NotAuthorized => Err(GatewayError::BadRequest(
                    "agent is not assigned to this ticket".to_string(),
                )),
                CloseOutcome::Stale => Ok(Json(json!({"ok": true, "stale": true}))),
            }
        }
    }
}
