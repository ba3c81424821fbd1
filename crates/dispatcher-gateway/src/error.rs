use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Boundary error type for the HTTP layer. Every component error converts
/// into one of these rather than leaking its internal message to the caller.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("bad request")]
    BadRequest(String),

    #[error(transparent)]
    Relay(#[from] dispatcher_relay::RelayError),

    #[error(transparent)]
    Orchestrator(#[from] dispatcher_orchestrator::OrchestratorError),

    #[error(transparent)]
    Surface(#[from] dispatcher_surfaces::SurfaceError),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "request failed");
        let (status, code) = match &self {
            GatewayError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            GatewayError::Surface(dispatcher_surfaces::SurfaceError::AuthFailed(_)) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
            }
            GatewayError::Surface(dispatcher_surfaces::SurfaceError::Malformed(_)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            GatewayError::Surface(_) | GatewayError::Relay(_) | GatewayError::Orchestrator(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };
        // Never echo the underlying error text to the caller — only the code.
        (status, Json(json!({"error": code}))).into_response()
    }
}
