//! Bidirectional bridge between a user surface and the agent workspace.
//! Stateless: every decision is made by re-reading authority from the
//! session store, never from anything cached in this crate.

pub mod error;
pub mod hub;
pub mod types;

pub use error::{RelayError, Result};
pub use hub::{RelayHub, ESCALATION_ACKNOWLEDGEMENT};
pub use types::{ClaimOutcome, CloseOutcome, ThreadReplyOutcome, UserMessageOutcome};
