use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("unrecognized user-surface event: {0}")]
    Malformed(String),

    #[error("surface send failed: {0}")]
    SendFailed(String),

    #[error("no surface registered for {0}")]
    UnknownSurface(String),

    #[error("webhook authentication failed: {0}")]
    AuthFailed(String),
}

pub type Result<T> = std::result::Result<T, SurfaceError>;

impl From<dispatcher_workspace::WorkspaceError> for SurfaceError {
    fn from(e: dispatcher_workspace::WorkspaceError) -> Self {
        SurfaceError::AuthFailed(e.to_string())
    }
}
