//! Agent-workspace adapter: posts tickets and action buttons, receives
//! button callbacks and thread replies, edits ticket cards as claims and
//! closes happen.

pub mod adapter;
pub mod error;
pub mod types;
pub mod webhook_auth;

pub use adapter::{EventDedup, RestWorkspaceAdapter, WorkspaceAdapter};
pub use error::{Result, WorkspaceError};
pub use types::{ButtonCallback, RoleLabel, ThreadReplyEvent};
