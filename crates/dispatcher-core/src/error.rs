use thiserror::Error;

/// Errors shared across crate boundaries. Each crate downstream of
/// `dispatcher-core` defines its own narrower `Error` enum and converts into
/// this one only at the gateway's HTTP boundary.
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("upstream provider error: {0}")]
    Provider(String),

    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatcherError {
    /// Short code, never the underlying message, suitable for a user-visible
    /// response body — see error-handling design: user-visible failures never
    /// echo internal errors.
    pub fn code(&self) -> &'static str {
        match self {
            DispatcherError::Config(_) => "CONFIG_ERROR",
            DispatcherError::Database(_) => "DATABASE_ERROR",
            DispatcherError::Provider(_) => "PROVIDER_ERROR",
            DispatcherError::Timeout { .. } => "TIMEOUT",
            DispatcherError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatcherError>;
