//! Webhook signature verification shared by every inbound route.
//!
//! Same two schemes the rest of this codebase's webhook ingress already
//! speaks: GitHub-style `X-Hub-Signature-256: sha256=<hex>` HMAC, or a static
//! bearer token. Lookups are done through a closure so callers can supply
//! `axum::http::HeaderMap::get` directly without this crate depending on axum.

use dispatcher_core::config::WebhookAuthMode;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Result, WorkspaceError};

type HmacSha256 = Hmac<Sha256>;

/// Verify a request against the given auth mode.
///
/// `header` looks up a header value by lowercase name (e.g. `"x-hub-signature-256"`).
pub fn verify(
    mode: &WebhookAuthMode,
    secret: Option<&str>,
    header: impl Fn(&str) -> Option<String>,
    body: &[u8],
) -> Result<()> {
    match mode {
        WebhookAuthMode::HmacSha256 => verify_hmac_sha256(header, body, secret),
        WebhookAuthMode::BearerToken => verify_bearer_token(header, secret),
        WebhookAuthMode::None => Ok(()),
    }
}

fn verify_hmac_sha256(
    header: impl Fn(&str) -> Option<String>,
    body: &[u8],
    secret: Option<&str>,
) -> Result<()> {
    let secret = secret
        .ok_or_else(|| WorkspaceError::AuthFailed("no HMAC secret configured".to_string()))?;

    let sig_header = header("x-hub-signature-256")
        .ok_or_else(|| WorkspaceError::AuthFailed("missing X-Hub-Signature-256 header".to_string()))?;

    let sig_hex = sig_header
        .strip_prefix("sha256=")
        .ok_or_else(|| WorkspaceError::AuthFailed("malformed X-Hub-Signature-256 header".to_string()))?;

    let expected = hex::decode(sig_hex)
        .map_err(|_| WorkspaceError::AuthFailed("X-Hub-Signature-256 is not valid hex".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WorkspaceError::AuthFailed("invalid HMAC key length".to_string()))?;
    mac.update(body);

    mac.verify_slice(&expected)
        .map_err(|_| WorkspaceError::AuthFailed("HMAC signature mismatch".to_string()))
}

fn verify_bearer_token(header: impl Fn(&str) -> Option<String>, secret: Option<&str>) -> Result<()> {
    let expected =
        secret.ok_or_else(|| WorkspaceError::AuthFailed("no bearer token configured".to_string()))?;

    let auth_header = header("authorization")
        .ok_or_else(|| WorkspaceError::AuthFailed("missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| WorkspaceError::AuthFailed("Authorization header must use Bearer scheme".to_string()))?;

    if token == expected {
        Ok(())
    } else {
        Err(WorkspaceError::AuthFailed("bearer token mismatch".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn bearer_token_matches_accepted() {
        let h = headers(&[("authorization", "Bearer secret-token")]);
        let result = verify(
            &WebhookAuthMode::BearerToken,
            Some("secret-token"),
            |k| h.get(k).cloned(),
            b"{}",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn bearer_token_mismatch_rejected() {
        let h = headers(&[("authorization", "Bearer wrong")]);
        let result = verify(
            &WebhookAuthMode::BearerToken,
            Some("secret-token"),
            |k| h.get(k).cloned(),
            b"{}",
        );
        assert!(result.is_err());
    }

    #[test]
    fn hmac_signature_matches_accepted() {
        let body = b"hello world";
        let mut mac = HmacSha256::new_from_slice(b"shh").unwrap();
        mac.update(body);
        let sig = hex::encode(mac.finalize().into_bytes());
        let h = headers(&[("x-hub-signature-256", &format!("sha256={sig}"))]);
        let result = verify(&WebhookAuthMode::HmacSha256, Some("shh"), |k| h.get(k).cloned(), body);
        assert!(result.is_ok());
    }

    #[test]
    fn hmac_signature_tampered_body_rejected() {
        let mut mac = HmacSha256::new_from_slice(b"shh").unwrap();
        mac.update(b"hello world");
        let sig = hex::encode(mac.finalize().into_bytes());
        let h = headers(&[("x-hub-signature-256", &format!("sha256={sig}"))]);
        let result = verify(
            &WebhookAuthMode::HmacSha256,
            Some("shh"),
            |k| h.get(k).cloned(),
            b"tampered body",
        );
        assert!(result.is_err());
    }

    #[test]
    fn none_mode_always_passes() {
        let result = verify(&WebhookAuthMode::None, None, |_| None, b"{}");
        assert!(result.is_ok());
    }
}
