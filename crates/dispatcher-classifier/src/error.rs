use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("LLM backend unavailable: {0}")]
    LlmUnavailable(String),

    #[error("could not parse classifier response: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
