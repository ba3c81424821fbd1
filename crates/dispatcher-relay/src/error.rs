use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Session(#[from] dispatcher_sessions::SessionError),

    #[error(transparent)]
    Workspace(#[from] dispatcher_workspace::WorkspaceError),

    #[error(transparent)]
    Surface(#[from] dispatcher_surfaces::SurfaceError),
}

pub type Result<T> = std::result::Result<T, RelayError>;
