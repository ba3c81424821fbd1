use dispatcher_core::types::Surface;
use serde::{Deserialize, Serialize};

/// Canonical, surface-agnostic inbound event. Every adapter normalises its
/// transport-native payload into this shape before handing it to the
/// orchestrator — no surface-specific field ever crosses this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundUserEvent {
    pub surface: Surface,
    pub external_user_id: String,
    pub channel_key: String,
    pub text: String,
    pub at: String,
}

/// A clickable action offered alongside a text prompt (e.g. slot numbers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionChoice {
    pub label: String,
    pub payload: String,
}

/// Wire shape accepted by `POST /user/events`, mirrored 1:1 from
/// `InboundUserEvent` — kept distinct so the public webhook contract can
/// evolve independently of the internal canonical type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEventPayload {
    pub surface: Surface,
    pub external_user_id: String,
    pub channel_key: String,
    pub text: String,
    pub at: String,
}

impl From<UserEventPayload> for InboundUserEvent {
    fn from(p: UserEventPayload) -> Self {
        InboundUserEvent {
            surface: p.surface,
            external_user_id: p.external_user_id,
            channel_key: p.channel_key,
            text: p.text,
            at: p.at,
        }
    }
}
