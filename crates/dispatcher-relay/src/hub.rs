use dispatcher_core::types::{now_rfc3339, AgentId};
use dispatcher_escalation::Action;
use dispatcher_sessions::{Message, MessageRole, Session, SessionState, SessionStore};
use dispatcher_sessions::manager::TransitionFields;
use dispatcher_surfaces::{ActionChoice, SurfaceManager};
use dispatcher_workspace::{RoleLabel, WorkspaceAdapter};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::types::{ClaimOutcome, CloseOutcome, ThreadReplyOutcome, UserMessageOutcome};

const SPECIALIST_JOINED: &str = "A specialist has joined.";
const ACKNOWLEDGEMENT: &str = "A specialist will be with you shortly.";

/// Bidirectional bridge between a user surface and the agent workspace.
/// Holds no state of its own — every decision re-reads authority from the
/// session store, matching the narrow-trait decoupling this codebase uses
/// between its components.
pub struct RelayHub<'a> {
    sessions: &'a SessionStore,
    workspace: &'a dyn WorkspaceAdapter,
    surfaces: &'a SurfaceManager,
}

impl<'a> RelayHub<'a> {
    pub fn new(sessions: &'a SessionStore, workspace: &'a dyn WorkspaceAdapter, surfaces: &'a SurfaceManager) -> Self {
        Self {
            sessions,
            workspace,
            surfaces,
        }
    }

    /// Handle one inbound user message. Per §4.8: closed sessions always
    /// start fresh; AI-authoritative sessions append and defer to the
    /// orchestrator; escalated sessions append and mirror into the thread
    /// with the AI kept silent.
    #[instrument(skip(self, text), fields(user_key = %user_key, %channel_key))]
    pub async fn handle_user_message(
        &self,
        user_key: &dispatcher_core::types::UserKey,
        channel_key: &str,
        text: &str,
        surface_name: &str,
    ) -> Result<UserMessageOutcome> {
        let session = self.sessions.find_or_create_active(user_key, channel_key)?;
        let is_new = session.history.is_empty() && session.state == SessionState::ActiveAi;
        let message = Message::user(text, surface_name);
        let session = self.sessions.append_message(&session.id, message.clone())?;

        match session.state {
            SessionState::ActiveAi => {
                if is_new {
                    Ok(UserMessageOutcome::NewSession(session))
                } else {
                    Ok(UserMessageOutcome::NeedsOrchestration(session))
                }
            }
            SessionState::EscalatedUnclaimed | SessionState::EscalatedClaimed => {
                if let Some(thread) = &session.workspace_thread_key {
                    self.workspace
                        .post_thread_message(thread, text, RoleLabel::User)
                        .await?;
                }
                Ok(UserMessageOutcome::RelayedToWorkspace(session))
            }
            SessionState::Closed => unreachable!("append_message never leaves a session closed"),
        }
    }

    /// Agent pressed `Accept` on an unclaimed ticket.
    #[instrument(skip(self), fields(%session_id, %agent_id))]
    pub async fn handle_claim(&self, session_id: &str, agent_id: &str) -> Result<ClaimOutcome> {
        let result = self.sessions.transition(
            session_id,
            SessionState::EscalatedUnclaimed,
            SessionState::EscalatedClaimed,
            TransitionFields {
                assigned_agent: Some(AgentId::new(agent_id)),
                claimed_at: Some(now_rfc3339()),
                ..Default::default()
            },
        );

        match result {
            Ok(session) => {
                if let Some(thread) = &session.workspace_thread_key {
                    self.workspace
                        .edit_ticket(thread, &format!("Claimed by {agent_id}."), &[Action::Close])
                        .await?;
                }
                self.notify_user(&session, SPECIALIST_JOINED).await?;
                info!(%session_id, %agent_id, "ticket claimed");
                Ok(ClaimOutcome::Claimed(session))
            }
            Err(e) => {
                let actual = self.sessions.get(session_id).ok();
                warn!(%session_id, %agent_id, error = %e, "claim lost the race");
                Ok(ClaimOutcome::AlreadyClaimed {
                    claimed_by: actual.and_then(|s| s.assigned_agent.map(|a| a.to_string())),
                })
            }
        }
    }

    /// Agent reply inside a ticket thread.
    #[instrument(skip(self, text), fields(%session_id, %agent_id))]
    pub async fn handle_thread_reply(
        &self,
        session_id: &str,
        agent_id: &str,
        agent_display_name: &str,
        text: &str,
    ) -> Result<ThreadReplyOutcome> {
        let session = self.sessions.get(session_id)?;

        if session.state == SessionState::Closed {
            warn!(%session_id, %agent_id, "thread reply dropped: session closed");
            return Ok(ThreadReplyOutcome::DroppedSessionClosed);
        }

        let is_assigned = session
            .assigned_agent
            .as_ref()
            .is_some_and(|a| a.as_str() == agent_id);

        if !is_assigned {
            info!(%session_id, %agent_id, "thread reply ignored: not the assigned agent");
            return Ok(ThreadReplyOutcome::IgnoredNotAssignedAgent);
        }

        let message = Message {
            role: MessageRole::Agent,
            content: text.to_string(),
            at: now_rfc3339(),
            surface: None,
            agent_display_name: Some(agent_display_name.to_string()),
            confidence: None,
            classifier_intent: None,
            citations: Vec::new(),
        };
        let session = self.sessions.append_message(&session.id, message)?;
        self.notify_user(&session, text).await?;
        Ok(ThreadReplyOutcome::ForwardedToUser(session))
    }

    /// Agent pressed `Close` on a claimed ticket.
    #[instrument(skip(self), fields(%session_id, %agent_id))]
    pub async fn handle_close(&self, session_id: &str, agent_id: &str) -> Result<CloseOutcome> {
        let session = self.sessions.get(session_id)?;
        let is_assigned = session
            .assigned_agent
            .as_ref()
            .is_some_and(|a| a.as_str() == agent_id);
        if !is_assigned {
            return Ok(CloseOutcome::NotAuthorized);
        }

        let result = self.sessions.transition(
            session_id,
            SessionState::EscalatedClaimed,
            SessionState::Closed,
            TransitionFields {
                closed_at: Some(now_rfc3339()),
                ..Default::default()
            },
        );

        match result {
            Ok(session) => {
                if let Some(thread) = &session.workspace_thread_key {
                    self.workspace.edit_ticket(thread, "Closed.", &[]).await?;
                }
                self.notify_user(&session, "This conversation has been closed.").await?;
                Ok(CloseOutcome::Closed(session))
            }
            Err(_) => Ok(CloseOutcome::Stale),
        }
    }

    async fn notify_user(&self, session: &Session, text: &str) -> Result<()> {
        let surface_name = session.user_key.surface.to_string();
        self.surfaces
            .send_text(&surface_name, &session.channel_key, text)
            .await?;
        Ok(())
    }

    /// Deliver an AI-authored reply (answer, acknowledgement, escalation
    /// notice) to the user surface. The orchestrator never talks to a
    /// surface directly — every outbound hop for an Active-AI turn still
    /// passes through the relay, same as an agent's forwarded reply would.
    #[instrument(skip(self, text))]
    pub async fn deliver_to_user(&self, session: &Session, text: &str) -> Result<()> {
        self.notify_user(session, text).await
    }

    /// Present numbered slot offers to the user, used by the scheduling gate.
    #[instrument(skip(self, prompt_text))]
    pub async fn offer_slots(&self, session: &Session, prompt_text: &str, offers: &[ActionChoice]) -> Result<()> {
        let surface_name = session.user_key.surface.to_string();
        self.surfaces
            .send_actions(&surface_name, &session.channel_key, prompt_text, offers)
            .await?;
        Ok(())
    }
}

/// Text the relay sends a user once a ticket has been opened on their behalf.
pub const ESCALATION_ACKNOWLEDGEMENT: &str = ACKNOWLEDGEMENT;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dispatcher_core::types::{Surface, UserKey};
    use dispatcher_sessions::db::init_db;
    use rusqlite::Connection;
    use std::sync::Mutex;

    struct FakeWorkspace {
        posted: Mutex<Vec<(String, String, RoleLabel)>>,
        next_thread_key: String,
    }

    impl FakeWorkspace {
        fn new(next_thread_key: &str) -> Self {
            Self {
                posted: Mutex::new(Vec::new()),
                next_thread_key: next_thread_key.to_string(),
            }
        }
    }

    #[async_trait]
    impl WorkspaceAdapter for FakeWorkspace {
        async fn post_ticket(&self, _ticket: &dispatcher_escalation::Ticket) -> dispatcher_workspace::Result<String> {
            Ok(self.next_thread_key.clone())
        }

        async fn edit_ticket(&self, _k: &str, _b: &str, _a: &[Action]) -> dispatcher_workspace::Result<()> {
            Ok(())
        }

        async fn post_thread_message(&self, k: &str, text: &str, role: RoleLabel) -> dispatcher_workspace::Result<()> {
            self.posted.lock().unwrap().push((k.to_string(), text.to_string(), role));
            Ok(())
        }
    }

    struct FakeSurface {
        sent: Mutex<Vec<String>>,
    }

    impl FakeSurface {
        fn new() -> Self {
            Self { sent: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl dispatcher_surfaces::UserSurface for FakeSurface {
        fn name(&self) -> &str {
            "web-chat"
        }

        async fn send_text(&self, _channel_key: &str, text: &str) -> dispatcher_surfaces::Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn send_actions(
            &self,
            _channel_key: &str,
            prompt_text: &str,
            _actions: &[ActionChoice],
        ) -> dispatcher_surfaces::Result<()> {
            self.sent.lock().unwrap().push(prompt_text.to_string());
            Ok(())
        }
    }

    fn store() -> SessionStore {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        SessionStore::new(conn)
    }

    fn surfaces() -> (SurfaceManager, &'static FakeSurface) {
        let fake: &'static FakeSurface = Box::leak(Box::new(FakeSurface::new()));
        let mut mgr = SurfaceManager::new();
        mgr.register(Box::new(FakeSurfaceRef(fake)));
        (mgr, fake)
    }

    struct FakeSurfaceRef(&'static FakeSurface);

    #[async_trait]
    impl dispatcher_surfaces::UserSurface for FakeSurfaceRef {
        fn name(&self) -> &str {
            self.0.name()
        }
        async fn send_text(&self, channel_key: &str, text: &str) -> dispatcher_surfaces::Result<()> {
            self.0.send_text(channel_key, text).await
        }
        async fn send_actions(&self, channel_key: &str, prompt_text: &str, actions: &[ActionChoice]) -> dispatcher_surfaces::Result<()> {
            self.0.send_actions(channel_key, prompt_text, actions).await
        }
    }

    #[tokio::test]
    async fn user_message_on_active_ai_session_needs_orchestration() {
        let sessions = store();
        let workspace = FakeWorkspace::new("thread-1");
        let (surfaces, _sent) = surfaces();
        let relay = RelayHub::new(&sessions, &workspace, &surfaces);

        let user_key = UserKey::new(Surface::WebChat, "u-1");
        let outcome = relay
            .handle_user_message(&user_key, "chan-1", "hi there", "web-chat")
            .await
            .unwrap();

        match outcome {
            UserMessageOutcome::NewSession(s) | UserMessageOutcome::NeedsOrchestration(s) => {
                assert_eq!(s.state, SessionState::ActiveAi);
                assert_eq!(s.history.len(), 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn user_message_on_escalated_session_mirrors_to_workspace_thread() {
        let sessions = store();
        let workspace = FakeWorkspace::new("thread-1");
        let (surfaces, _sent) = surfaces();
        let relay = RelayHub::new(&sessions, &workspace, &surfaces);

        let user_key = UserKey::new(Surface::WebChat, "u-2");
        let session = sessions.find_or_create_active(&user_key, "chan-2").unwrap();
        sessions
            .transition(
                &session.id,
                SessionState::ActiveAi,
                SessionState::EscalatedUnclaimed,
                TransitionFields {
                    escalated_at: Some(now_rfc3339()),
                    workspace_thread_key: Some("thread-1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let outcome = relay
            .handle_user_message(&user_key, "chan-2", "still waiting", "web-chat")
            .await
            .unwrap();

        assert!(matches!(outcome, UserMessageOutcome::RelayedToWorkspace(_)));
        assert_eq!(workspace.posted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn claim_race_second_agent_sees_already_claimed() {
        let sessions = store();
        let workspace = FakeWorkspace::new("thread-1");
        let (surfaces, sent) = surfaces();
        let relay = RelayHub::new(&sessions, &workspace, &surfaces);

        let user_key = UserKey::new(Surface::WebChat, "u-3");
        let session = sessions.find_or_create_active(&user_key, "chan-3").unwrap();
        sessions
            .transition(
                &session.id,
                SessionState::ActiveAi,
                SessionState::EscalatedUnclaimed,
                TransitionFields {
                    escalated_at: Some(now_rfc3339()),
                    workspace_thread_key: Some("thread-1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let first = relay.handle_claim(&session.id, "agent-a").await.unwrap();
        assert!(matches!(first, ClaimOutcome::Claimed(_)));
        assert_eq!(sent.sent.lock().unwrap().last().unwrap(), SPECIALIST_JOINED);

        let second = relay.handle_claim(&session.id, "agent-b").await.unwrap();
        match second {
            ClaimOutcome::AlreadyClaimed { claimed_by } => {
                assert_eq!(claimed_by.as_deref(), Some("agent-a"));
            }
            other => panic!("expected AlreadyClaimed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn thread_reply_from_unassigned_agent_is_ignored() {
        let sessions = store();
        let workspace = FakeWorkspace::new("thread-1");
        let (surfaces, sent) = surfaces();
        let relay = RelayHub::new(&sessions, &workspace, &surfaces);

        let user_key = UserKey::new(Surface::WebChat, "u-4");
        let session = sessions.find_or_create_active(&user_key, "chan-4").unwrap();
        sessions
            .transition(
                &session.id,
                SessionState::ActiveAi,
                SessionState::EscalatedUnclaimed,
                TransitionFields {
                    escalated_at: Some(now_rfc3339()),
                    workspace_thread_key: Some("thread-1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        relay.handle_claim(&session.id, "agent-a").await.unwrap();
        sent.sent.lock().unwrap().clear();

        let outcome = relay
            .handle_thread_reply(&session.id, "agent-b", "Bob", "butting in")
            .await
            .unwrap();
        assert!(matches!(outcome, ThreadReplyOutcome::IgnoredNotAssignedAgent));
        assert!(sent.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn close_by_assigned_agent_notifies_user_and_edits_card() {
        let sessions = store();
        let workspace = FakeWorkspace::new("thread-1");
        let (surfaces, sent) = surfaces();
        let relay = RelayHub::new(&sessions, &workspace, &surfaces);

        let user_key = UserKey::new(Surface::WebChat, "u-5");
        let session = sessions.find_or_create_active(&user_key, "chan-5").unwrap();
        sessions
            .transition(
                &session.id,
                SessionState::ActiveAi,
                SessionState::EscalatedUnclaimed,
                TransitionFields {
                    escalated_at: Some(now_rfc3339()),
                    workspace_thread_key: Some("thread-1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        relay.handle_claim(&session.id, "agent-a").await.unwrap();

        let outcome = relay.handle_close(&session.id, "agent-a").await.unwrap();
        assert!(matches!(outcome, CloseOutcome::Closed(_)));
        assert_eq!(
            sent.sent.lock().unwrap().last().unwrap(),
            "This conversation has been closed."
        );
    }

    #[tokio::test]
    async fn close_by_non_assigned_agent_is_not_authorized() {
        let sessions = store();
        let workspace = FakeWorkspace::new("thread-1");
        let (surfaces, _sent) = surfaces();
        let relay = RelayHub::new(&sessions, &workspace, &surfaces);

        let user_key = UserKey::new(Surface::WebChat, "u-6");
        let session = sessions.find_or_create_active(&user_key, "chan-6").unwrap();
        sessions
            .transition(
                &session.id,
                SessionState::ActiveAi,
                SessionState::EscalatedUnclaimed,
                TransitionFields {
                    escalated_at: Some(now_rfc3339()),
                    workspace_thread_key: Some("thread-1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        relay.handle_claim(&session.id, "agent-a").await.unwrap();

        let outcome = relay.handle_close(&session.id, "agent-zzz").await.unwrap();
        assert!(matches!(outcome, CloseOutcome::NotAuthorized));
    }
}
