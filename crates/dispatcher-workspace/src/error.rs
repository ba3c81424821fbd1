use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("agent workspace unreachable: {0}")]
    Unavailable(String),

    #[error("agent workspace rejected request: {status} {message}")]
    Api { status: u16, message: String },

    #[error("webhook authentication failed: {0}")]
    AuthFailed(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;
