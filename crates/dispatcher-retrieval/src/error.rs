use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("LLM backend unavailable: {0}")]
    LlmUnavailable(String),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
