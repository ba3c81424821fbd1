use dispatcher_core::types::{AgentId, UserKey};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a session. Allowed transitions:
/// `ActiveAi -> EscalatedUnclaimed -> EscalatedClaimed -> Closed`, plus the
/// terminal shortcut `ActiveAi -> Closed`. No other transition is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    ActiveAi,
    EscalatedUnclaimed,
    EscalatedClaimed,
    Closed,
}

impl SessionState {
    /// True iff the AI is forbidden from producing a reply in this state.
    /// Invariant: `ai_disabled <=> state in {EscalatedClaimed, Closed}`.
    pub fn ai_disabled(self) -> bool {
        matches!(self, SessionState::EscalatedClaimed | SessionState::Closed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::ActiveAi => "active_ai",
            SessionState::EscalatedUnclaimed => "escalated_unclaimed",
            SessionState::EscalatedClaimed => "escalated_claimed",
            SessionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active_ai" => Ok(SessionState::ActiveAi),
            "escalated_unclaimed" => Ok(SessionState::EscalatedUnclaimed),
            "escalated_claimed" => Ok(SessionState::EscalatedClaimed),
            "closed" => Ok(SessionState::Closed),
            other => Err(format!("unknown session state: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Ai,
    Agent,
    System,
}

/// One atomic turn recorded in a session's append-only history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub at: String,
    pub surface: Option<String>,
    pub agent_display_name: Option<String>,
    pub confidence: Option<f64>,
    pub classifier_intent: Option<String>,
    #[serde(default)]
    pub citations: Vec<String>,
}

impl Message {
    pub fn user(content: impl Into<String>, surface: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            at: dispatcher_core::types::now_rfc3339(),
            surface: Some(surface.into()),
            agent_display_name: None,
            confidence: None,
            classifier_intent: None,
            citations: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            at: dispatcher_core::types::now_rfc3339(),
            surface: None,
            agent_display_name: None,
            confidence: None,
            classifier_intent: None,
            citations: Vec::new(),
        }
    }
}

/// One bookable option presented to the user during a scheduling turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotOffer {
    /// 1-based position, matching the order shown to the user.
    pub offer_index: u32,
    pub start: String,
    pub end: String,
    pub display_timezone: String,
}

/// A live or archived conversation between one user and the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_key: UserKey,
    pub channel_key: String,
    pub workspace_thread_key: Option<String>,
    pub state: SessionState,
    pub assigned_agent: Option<AgentId>,
    pub escalated_at: Option<String>,
    pub claimed_at: Option<String>,
    pub closed_at: Option<String>,
    pub escalation_reason: Option<String>,
    pub history: Vec<Message>,
    pub pending_slots: Vec<SlotOffer>,
    pub created_at: String,
    pub updated_at: String,
}

impl Session {
    pub fn ai_disabled(&self) -> bool {
        self.state.ai_disabled()
    }
}
