//! Builds a human-readable ticket from a session's history.
//!
//! The LLM never decides ticket formatting — it is assembled deterministically
//! from structured session data so it is snapshot-testable.

use dispatcher_sessions::{MessageRole, Session};
use serde::{Deserialize, Serialize};

/// How many of the most recent history turns are included in the summary.
const SUMMARY_WINDOW: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Accept,
    Close,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Accept => "Accept",
            Action::Close => "Close",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ticket {
    pub title: String,
    pub reason: String,
    pub body: String,
    pub actions: Vec<Action>,
}

/// Build a deterministic ticket from a session. `reason` is the escalation
/// trigger (e.g. "low retrieval confidence", "repeated abusive message").
pub fn build_ticket(session: &Session, reason: &str) -> Ticket {
    let title = ticket_title(session);
    let body = format_summary(session);
    Ticket {
        title,
        reason: reason.to_string(),
        body,
        actions: vec![Action::Accept, Action::Close],
    }
}

fn ticket_title(session: &Session) -> String {
    let first_user_line = session
        .history
        .iter()
        .find(|m| m.role == MessageRole::User)
        .map(|m| truncate(&m.content, 60))
        .unwrap_or_else(|| "New support request".to_string());
    format!("{} — {}", session.user_key, first_user_line)
}

fn format_summary(session: &Session) -> String {
    let recent = session
        .history
        .iter()
        .rev()
        .take(SUMMARY_WINDOW)
        .collect::<Vec<_>>()
        .into_iter()
        .rev();

    let mut out = String::new();
    for msg in recent {
        let speaker = match msg.role {
            MessageRole::User => "User",
            MessageRole::Ai => "AI",
            MessageRole::Agent => "Agent",
            MessageRole::System => "System",
        };
        out.push_str(&format!("- {speaker}: {}\n", truncate(&msg.content, 200)));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}…", &s[..max])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatcher_core::types::{Surface, UserKey};
    use dispatcher_sessions::{Message, SessionState};

    fn session_with(history: Vec<Message>) -> Session {
        Session {
            id: "sess-1".to_string(),
            user_key: UserKey::new(Surface::WebChat, "u-1"),
            channel_key: "chan-1".to_string(),
            workspace_thread_key: None,
            state: SessionState::ActiveAi,
            assigned_agent: None,
            escalated_at: None,
            claimed_at: None,
            closed_at: None,
            escalation_reason: None,
            history,
            pending_slots: Vec::new(),
            created_at: "2026-07-30T00:00:00Z".to_string(),
            updated_at: "2026-07-30T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn ticket_includes_actions_accept_and_close() {
        let session = session_with(vec![Message::user("Where is your office?", "web-chat")]);
        let ticket = build_ticket(&session, "low retrieval confidence");
        assert_eq!(ticket.actions, vec![Action::Accept, Action::Close]);
        assert_eq!(ticket.reason, "low retrieval confidence");
    }

    #[test]
    fn ticket_body_is_deterministic_for_same_history() {
        let session = session_with(vec![
            Message::user("hi", "web-chat"),
            Message::system("A specialist will be with you shortly."),
        ]);
        let a = build_ticket(&session, "low confidence");
        let b = build_ticket(&session, "low confidence");
        assert_eq!(a.body, b.body);
        assert_eq!(
            a.body,
            "- User: hi\n- System: A specialist will be with you shortly.\n"
        );
    }

    #[test]
    fn summary_window_caps_to_most_recent_entries() {
        let mut history = Vec::new();
        for i in 0..10 {
            history.push(Message::user(format!("message {i}"), "web-chat"));
        }
        let session = session_with(history);
        let ticket = build_ticket(&session, "test");
        assert_eq!(ticket.body.lines().count(), SUMMARY_WINDOW);
        assert!(ticket.body.contains("message 9"));
        assert!(!ticket.body.contains("message 3"));
    }
}
