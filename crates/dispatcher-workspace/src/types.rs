use dispatcher_escalation::Action;
use serde::{Deserialize, Serialize};

/// A button callback raised by an agent on a ticket card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonCallback {
    pub workspace_thread_key: String,
    pub agent_id: String,
    pub action: Action,
    pub event_id: String,
}

/// A reply posted by an agent inside a ticket's thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadReplyEvent {
    pub workspace_thread_key: String,
    pub agent_id: String,
    pub agent_name: String,
    pub text: String,
    pub event_id: String,
}

/// Label attached to a line posted into a ticket thread, so the transcript
/// reads like a real conversation rather than an undifferentiated log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleLabel {
    User,
    Ai,
    System,
}

impl RoleLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            RoleLabel::User => "User",
            RoleLabel::Ai => "AI",
            RoleLabel::System => "System",
        }
    }
}
