use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Session(#[from] dispatcher_sessions::SessionError),

    #[error(transparent)]
    Retrieval(#[from] dispatcher_retrieval::RetrievalError),

    #[error(transparent)]
    Relay(#[from] dispatcher_relay::RelayError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
