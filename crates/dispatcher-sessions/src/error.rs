use thiserror::Error;

/// Errors that can occur during session-store operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The requested session does not exist in the database.
    #[error("session not found: {id}")]
    NotFound { id: String },

    /// A `transition` call's compare-and-set guard did not match: the
    /// session's current state was not `expected`. The caller lost a race
    /// (e.g. a claim race) or is operating on stale information.
    #[error("stale transition on session {id}: expected state {expected}, found {actual}")]
    Stale {
        id: String,
        expected: String,
        actual: String,
    },

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Row contents could not be deserialised (corrupt JSON column, etc).
    #[error("corrupt session row: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
