pub mod error;
pub mod orchestrator;
pub mod types;

pub use error::{OrchestratorError, Result};
pub use orchestrator::Orchestrator;
pub use types::TurnOutcome;
