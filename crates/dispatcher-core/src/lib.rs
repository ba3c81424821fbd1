pub mod config;
pub mod error;
pub mod types;

pub use config::DispatcherConfig;
pub use error::{DispatcherError, Result};
pub use types::{Surface, UserKey};
