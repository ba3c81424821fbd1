//! POST /user/events — inbound message from any user-facing surface.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use dispatcher_core::types::UserKey;
use dispatcher_relay::{RelayHub, UserMessageOutcome};
use dispatcher_surfaces::normalize_user_event;
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
        .find(|s| s.name == "user")
        .ok_or_else(|| GatewayError::BadRequest("no webhook source named 'user' configured".to_string()))?;

    let event = normalize_user_event(
        &source_cfg.auth_mode,
        source_cfg.secret.as_deref(),
        |name| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string),
        &body,
    )?;

    let user_key = UserKey::new(event.surface, &event.external_user_id);
    let relay = RelayHub::new(&state.sessions, state.workspace.as_ref(), &state.surfaces);

    let surface_name = event.surface.to_string();
    let outcome = relay
        .handle_user_message(&user_key, &event.channel_key, &event.text, &surface_name)
        .await?;

    match outcome {
        UserMessageOutcome::NewSession(session) | UserMessageOutcome::NeedsOrchestration(session) => {
            let orchestrator = dispatcher_orchestrator::Orchestrator::new(
                &state.sessions,
                state.llm.as_ref(),
                state.model.clone(),
                &state.knowledge,
                state.calendar.as_ref(),
                state.workspace.as_ref(),
                &relay,
                &state.config,
                &state.cancellations,
            );
            let turn = orchestrator.process_turn(session).await?;
            info!(?turn, "turn processed");
        }
        UserMessageOutcome::RelayedToWorkspace(_) => {}
    }

    Ok(Json(json!({"ok": true})))
}
