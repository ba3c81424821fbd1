use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("calendar provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("the requested slot is no longer available")]
    SlotTaken,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, SchedulingError>;
