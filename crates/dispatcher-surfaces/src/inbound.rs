use dispatcher_core::config::WebhookAuthMode;
use dispatcher_workspace::webhook_auth;

use crate::error::{Result, SurfaceError};
use crate::types::{InboundUserEvent, UserEventPayload};

/// Verifies and parses a `POST /user/events` body into the canonical event.
/// Pure translation — no session or business logic lives here.
pub fn normalize_user_event(
    mode: &WebhookAuthMode,
    secret: Option<&str>,
    header: impl Fn(&str) -> Option<String>,
    body: &[u8],
) -> Result<InboundUserEvent> {
    webhook_auth::verify(mode, secret, header, body)?;

    let payload: UserEventPayload = serde_json::from_slice(body)
        .map_err(|e| SurfaceError::Malformed(e.to_string()))?;

    Ok(payload.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatcher_core::types::Surface;

    #[test]
    fn normalizes_valid_payload_with_no_auth() {
        let body = serde_json::to_vec(&UserEventPayload {
            surface: Surface::WebChat,
            external_user_id: "u-1".to_string(),
            channel_key: "chan-1".to_string(),
            text: "hi".to_string(),
            at: "2026-07-30T00:00:00Z".to_string(),
        })
        .unwrap();

        let event = normalize_user_event(&WebhookAuthMode::None, None, |_| None, &body).unwrap();
        assert_eq!(event.external_user_id, "u-1");
        assert_eq!(event.surface, Surface::WebChat);
    }

    #[test]
    fn rejects_malformed_json() {
        let result = normalize_user_event(&WebhookAuthMode::None, None, |_| None, b"not json");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_missing_bearer_token() {
        let body = serde_json::to_vec(&UserEventPayload {
            surface: Surface::PublicWeb,
            external_user_id: "u-2".to_string(),
            channel_key: "chan-2".to_string(),
            text: "hi".to_string(),
            at: "2026-07-30T00:00:00Z".to_string(),
        })
        .unwrap();

        let result = normalize_user_event(&WebhookAuthMode::BearerToken, Some("secret"), |_| None, &body);
        assert!(result.is_err());
    }
}
