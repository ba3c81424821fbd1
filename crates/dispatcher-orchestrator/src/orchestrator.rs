use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use dispatcher_classifier::{Classification, Intent, IntentClassifier};
use dispatcher_core::config::DispatcherConfig;
use dispatcher_core::types::now_rfc3339;
use dispatcher_escalation::{build_ticket, Ticket};
use dispatcher_llm::LlmProvider;
use dispatcher_relay::{RelayHub, ESCALATION_ACKNOWLEDGEMENT};
use dispatcher_retrieval::{Answerer, KnowledgeStore};
use dispatcher_scheduling::{derive_slots, BookingExecutor, CalendarProvider, SchedulingError};
use dispatcher_sessions::manager::TransitionFields;
use dispatcher_sessions::{Message, MessageRole, Session, SessionState, SessionStore, SlotOffer};
use dispatcher_surfaces::ActionChoice;
use dispatcher_workspace::WorkspaceAdapter;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::types::TurnOutcome;

/// How many of the most recent history entries are scanned for a prior
/// abusive turn when deciding whether to escalate on repeat abuse.
const ABUSE_WINDOW_TURNS: usize = 6;
const DEESCALATION_MESSAGE: &str =
    "Let's keep this conversation respectful so I can keep helping you.";
const SALES_SUFFIX: &str =
    "If you'd like, I can connect you with our sales team for a tailored walkthrough.";
const SCHEDULING_UNAVAILABLE: &str =
    "Scheduling is temporarily unavailable right now — I'm connecting you with a specialist.";
const NO_OPENINGS: &str =
    "I don't see any openings in the next few days — connecting you with a specialist.";
const WORKSPACE_UNREACHABLE: &str =
    "I couldn't reach a specialist right now — please try again in a few minutes.";
const OFFER_SLOTS_PROMPT: &str = "Here are some times that work — reply with a number to book:";
const SLOT_NOT_RECOGNIZED: &str =
    "That's not one of the options I offered — please reply with one of the listed numbers.";
const SLOT_JUST_TAKEN: &str = "That slot was just taken by someone else. Here are the remaining options:";

const HUMAN_REQUEST_PHRASES: &[&str] = &[
    "talk to a human",
    "speak to a human",
    "talk to an agent",
    "speak to an agent",
    "speak to someone",
    "real person",
    "human please",
];

const ESCALATION_POST_RETRIES: u32 = 2;
const ESCALATION_POST_BASE_MILLIS: u64 = 200;

/// Per-message pipeline: classify, then route through the abuse,
/// slot-selection, scheduling, and information gates, falling through to
/// escalation. Depends only on the component interfaces of C2-C8; none of
/// those crates import this one.
///
/// `cancellations` is borrowed rather than owned: an `Orchestrator` is cheap
/// to build per-request, but the in-flight-turn map has to outlive any one
/// request so a later message for the same session can actually cancel it.
pub struct Orchestrator<'a> {
    sessions: &'a SessionStore,
    llm: &'a dyn LlmProvider,
    model: String,
    knowledge: &'a KnowledgeStore,
    calendar: &'a dyn CalendarProvider,
    workspace: &'a dyn WorkspaceAdapter,
    relay: &'a RelayHub<'a>,
    config: &'a DispatcherConfig,
    cancellations: &'a DashMap<String, CancellationToken>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        sessions: &'a SessionStore,
        llm: &'a dyn LlmProvider,
        model: impl Into<String>,
        knowledge: &'a KnowledgeStore,
        calendar: &'a dyn CalendarProvider,
        workspace: &'a dyn WorkspaceAdapter,
        relay: &'a RelayHub<'a>,
        config: &'a DispatcherConfig,
        cancellations: &'a DashMap<String, CancellationToken>,
    ) -> Self {
        Self {
            sessions,
            llm,
            model: model.into(),
            knowledge,
            calendar,
            workspace,
            relay,
            config,
            cancellations,
        }
    }

    /// Drive one turn for a session already appended with the user's
    /// message and confirmed `Active-AI` by the relay. A newer turn for the
    /// same session cancels whatever is in flight here.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn process_turn(&self, session: Session) -> Result<TurnOutcome> {
        let token = CancellationToken::new();
        if let Some((_, prev)) = self.cancellations.remove(&session.id) {
            prev.cancel();
        }
        self.cancellations.insert(session.id.clone(), token.clone());

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!(session_id = %session.id, "turn cancelled by a newer message");
                Ok(TurnOutcome::Cancelled)
            }
            result = self.run_pipeline(&session) => result,
        };

        self.cancellations.remove(&session.id);
        outcome
    }

    async fn run_pipeline(&self, session: &Session) -> Result<TurnOutcome> {
        let text = session
            .history
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let recent_history = recent_contents(session, 5);

        let classifier = IntentClassifier::new(self.llm, self.model.as_str());
        let classification = match classifier
            .classify(
                &text,
                session.pending_slots.len(),
                &self.config.categories.abuse_lexicon,
                &recent_history,
            )
            .await
        {
            Ok(c) => c,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "classifier unavailable, falling back to information");
                Classification {
                    intent: Intent::Information,
                    confidence: 0.0,
                    slot_index: None,
                    reason: Some("classifier unavailable".to_string()),
                }
            }
        };

        if classification.intent == Intent::Abusive {
            return self.handle_abuse(session, &classification).await;
        }

        if classification.intent == Intent::SlotSelection && !session.pending_slots.is_empty() {
            return self.handle_slot_selection(session, &classification).await;
        }

        if classification.intent == Intent::Scheduling {
            return self.handle_scheduling(session).await;
        }

        self.handle_information_or_escalate(session, &text).await
    }

    async fn handle_abuse(&self, session: &Session, classification: &Classification) -> Result<TurnOutcome> {
        let prior_abuse = session
            .history
            .iter()
            .rev()
            .take(ABUSE_WINDOW_TURNS)
            .filter(|m| m.classifier_intent.as_deref() == Some(Intent::Abusive.as_str()))
            .count();

        let message = Message {
            role: MessageRole::Ai,
            content: DEESCALATION_MESSAGE.to_string(),
            at: now_rfc3339(),
            surface: None,
            agent_display_name: None,
            confidence: Some(classification.confidence),
            classifier_intent: Some(Intent::Abusive.as_str().to_string()),
            citations: Vec::new(),
        };
        let session = self.sessions.append_message(&session.id, message)?;
        self.relay.deliver_to_user(&session, DEESCALATION_MESSAGE).await?;

        if prior_abuse >= 1 {
            self.escalate(&session, "repeated abusive message").await?;
            return Ok(TurnOutcome::AbuseWarned { escalated: true });
        }
        Ok(TurnOutcome::AbuseWarned { escalated: false })
    }

    async fn handle_slot_selection(&self, session: &Session, classification: &Classification) -> Result<TurnOutcome> {
        let index = classification.slot_index.unwrap_or(0);
        let offer = session
            .pending_slots
            .iter()
            .find(|o| o.offer_index == index)
            .cloned();

        let Some(offer) = offer else {
            self.append_and_deliver(session, SLOT_NOT_RECOGNIZED).await?;
            return Ok(TurnOutcome::BookingFailed);
        };

        let executor = BookingExecutor::new(self.calendar);
        match executor.book(&offer, &session.user_key.external_user_id).await {
            Ok(outcome) => {
                let session = self.sessions.clear_pending_slots(&session.id)?;
                let reply = format!(
                    "You're booked for {} — a confirmation has been sent.",
                    outcome.event.start.to_rfc3339()
                );
                let session = self.append_ai_message(&session, &reply, None, &[]).await?;
                self.relay.deliver_to_user(&session, &reply).await?;
                Ok(TurnOutcome::Booked {
                    event_id: outcome.event.event_id,
                })
            }
            Err(SchedulingError::SlotTaken) => {
                let remaining: Vec<SlotOffer> = session
                    .pending_slots
                    .iter()
                    .filter(|o| o.offer_index != index)
                    .cloned()
                    .collect();
                let session = self.sessions.set_pending_slots(&session.id, remaining.clone())?;
                let session = self.append_ai_message(&session, SLOT_JUST_TAKEN, None, &[]).await?;
                let choices = slot_offers_to_choices(&remaining);
                self.relay.offer_slots(&session, SLOT_JUST_TAKEN, &choices).await?;
                Ok(TurnOutcome::BookingFailed)
            }
            Err(SchedulingError::ProviderUnavailable(_)) | Err(SchedulingError::Database(_)) => {
                let session = self.append_and_deliver(session, SCHEDULING_UNAVAILABLE).await?;
                self.escalate(&session, "calendar provider unavailable during booking").await
            }
        }
    }

    async fn handle_scheduling(&self, session: &Session) -> Result<TurnOutcome> {
        let window_start = Utc::now();
        let lookahead_days = (self.config.scheduling.lookahead_business_days as i64) * 2 + 3;
        let window_end = window_start + ChronoDuration::days(lookahead_days);

        let busy = match self.calendar.freebusy(window_start, window_end).await {
            Ok(busy) => busy,
            Err(_) => {
                let session = self.append_and_deliver(session, SCHEDULING_UNAVAILABLE).await?;
                return self.escalate(&session, "calendar provider unavailable").await;
            }
        };

        let offers = derive_slots(&self.config.scheduling, &busy, window_start);
        if offers.is_empty() {
            let session = self.append_and_deliver(session, NO_OPENINGS).await?;
            return self.escalate(&session, "no scheduling availability").await;
        }

        let session = self.sessions.set_pending_slots(&session.id, offers.clone())?;
        let session = self.append_ai_message(&session, OFFER_SLOTS_PROMPT, None, &[]).await?;
        let choices = slot_offers_to_choices(&offers);
        self.relay.offer_slots(&session, OFFER_SLOTS_PROMPT, &choices).await?;
        Ok(TurnOutcome::SlotsOffered { count: offers.len() })
    }

    async fn handle_information_or_escalate(&self, session: &Session, text: &str) -> Result<TurnOutcome> {
        let lower = text.to_lowercase();

        if contains_any_str(&lower, HUMAN_REQUEST_PHRASES) {
            return self.escalate(session, "explicit request for a human").await;
        }
        if contains_any(&lower, &self.config.categories.urgency_keywords) {
            return self.escalate(session, "urgent/outage keywords detected").await;
        }

        let is_compliance = contains_any(&lower, &self.config.categories.compliance_terms);
        let is_pricing = contains_any(&lower, &self.config.categories.pricing_triggers);
        let high_conf_threshold = if is_compliance {
            self.config.confidence.high_conf_compliance
        } else {
            self.config.confidence.high_conf_general
        };

        if is_pricing {
            let size = extract_pricing_size(&lower);
            let at_or_above_threshold = size
                .map_or(true, |n| n >= self.config.confidence.pricing_escalation_size_threshold);
            if at_or_above_threshold {
                return self
                    .escalate(session, "enterprise pricing inquiry at or above size threshold")
                    .await;
            }
        }

        let recent_ai_turns = recent_role_contents(session, MessageRole::Ai, 5);
        let answerer = Answerer::new(self.knowledge, self.llm, self.model.as_str());
        let answer = answerer.answer(text, &recent_ai_turns).await?;

        if answer.confidence < high_conf_threshold {
            return self.escalate(session, "low retrieval confidence").await;
        }

        let mut reply = answer.text.clone();
        if !answer.suppress_suffix {
            reply.push_str("\n\n");
            reply.push_str(SALES_SUFFIX);
        }

        let session = self
            .append_ai_message(session, &reply, Some(answer.confidence), &answer.citations)
            .await?;
        self.relay.deliver_to_user(&session, &reply).await?;
        Ok(TurnOutcome::Answered {
            citations: answer.citations,
        })
    }

    /// Build a ticket, post it (with retry), transition the session, and
    /// acknowledge the user. On exhausted retries the session is left in
    /// `Active-AI` per the workspace-unreachable failure mode.
    #[instrument(skip(self, session), fields(session_id = %session.id, %reason))]
    async fn escalate(&self, session: &Session, reason: &str) -> Result<TurnOutcome> {
        let ticket = build_ticket(session, reason);

        match self.post_ticket_with_retry(&ticket).await {
            Ok(thread_key) => {
                let session = self.sessions.transition(
                    &session.id,
                    SessionState::ActiveAi,
                    SessionState::EscalatedUnclaimed,
                    TransitionFields {
                        escalated_at: Some(now_rfc3339()),
                        escalation_reason: Some(reason.to_string()),
                        workspace_thread_key: Some(thread_key.clone()),
                        ..Default::default()
                    },
                )?;
                self.relay.deliver_to_user(&session, ESCALATION_ACKNOWLEDGEMENT).await?;
                Ok(TurnOutcome::Escalated {
                    workspace_thread_key: thread_key,
                    reason: reason.to_string(),
                })
            }
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "could not reach workspace after retries");
                self.append_and_deliver(session, WORKSPACE_UNREACHABLE).await?;
                Ok(TurnOutcome::EscalationFailed {
                    reason: reason.to_string(),
                })
            }
        }
    }

    /// Mirrors the backoff-with-jitter shape used for channel reconnects,
    /// scaled down from minutes to milliseconds for an in-flight user turn.
    async fn post_ticket_with_retry(&self, ticket: &Ticket) -> dispatcher_workspace::Result<String> {
        let mut delay_millis = ESCALATION_POST_BASE_MILLIS;

        for attempt in 0..=ESCALATION_POST_RETRIES {
            match self.workspace.post_ticket(ticket).await {
                Ok(key) => return Ok(key),
                Err(e) if attempt == ESCALATION_POST_RETRIES => return Err(e),
                Err(e) => {
                    let jitter = jitter_millis(delay_millis);
                    warn!(
                        attempt,
                        max = ESCALATION_POST_RETRIES,
                        error = %e,
                        retry_after_ms = delay_millis + jitter,
                        "ticket post failed, retrying"
                    );
                    sleep(Duration::from_millis(delay_millis + jitter)).await;
                    delay_millis *= 2;
                }
            }
        }
        unreachable!("retry loop always returns inside the match arms above")
    }

    async fn append_ai_message(
        &self,
        session: &Session,
        text: &str,
        confidence: Option<f64>,
        citations: &[String],
    ) -> Result<Session> {
        let message = Message {
            role: MessageRole::Ai,
            content: text.to_string(),
            at: now_rfc3339(),
            surface: None,
            agent_display_name: None,
            confidence,
            classifier_intent: None,
            citations: citations.to_vec(),
        };
        Ok(self.sessions.append_message(&session.id, message)?)
    }

    async fn append_and_deliver(&self, session: &Session, text: &str) -> Result<Session> {
        let session = self.append_ai_message(session, text, None, &[]).await?;
        self.relay.deliver_to_user(&session, text).await?;
        Ok(session)
    }
}

fn recent_contents(session: &Session, n: usize) -> Vec<String> {
    let mut out: Vec<String> = session
        .history
        .iter()
        .rev()
        .take(n)
        .map(|m| m.content.clone())
        .collect();
    out.reverse();
    out
}

fn recent_role_contents(session: &Session, role: MessageRole, n: usize) -> Vec<String> {
    session
        .history
        .iter()
        .rev()
        .filter(|m| m.role == role)
        .take(n)
        .map(|m| m.content.clone())
        .collect()
}

fn slot_offers_to_choices(offers: &[SlotOffer]) -> Vec<ActionChoice> {
    offers
        .iter()
        .map(|o| ActionChoice {
            label: format!("{}. {} ({})", o.offer_index, o.start, o.display_timezone),
            payload: o.offer_index.to_string(),
        })
        .collect()
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

fn contains_any_str(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Look for a seat/user count next to a sizing word ("50 seats", "200 users").
/// Returns `None` when no count can be pinned down, which the pricing gate
/// treats conservatively as "escalate".
fn extract_pricing_size(lower_text: &str) -> Option<u32> {
    const SIZE_WORDS: &[&str] = &["seats", "seat", "users", "user", "people", "agents", "employees"];
    let tokens: Vec<&str> = lower_text.split_whitespace().collect();
    for (i, tok) in tokens.iter().enumerate() {
        if SIZE_WORDS.contains(tok) && i > 0 {
            if let Some(n) = leading_digits(tokens[i - 1]) {
                return Some(n);
            }
        }
    }
    None
}

fn leading_digits(tok: &str) -> Option<u32> {
    let digits: String = tok.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

fn jitter_millis(base_millis: u64) -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let max_jitter = (base_millis as f64 * 0.10) as u64;
    if max_jitter == 0 {
        return 0;
    }
    (nanos as u64) % max_jitter
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use dispatcher_core::types::{Surface, UserKey};
    use dispatcher_escalation::Action;
    use dispatcher_llm::{ChatRequest, ChatResponse, ProviderError};
    use dispatcher_scheduling::{BusyInterval, CreatedEvent};
    use dispatcher_workspace::RoleLabel;
    use rusqlite::Connection;
    use std::sync::Mutex;

    #[test]
    fn extract_pricing_size_reads_count_before_size_word() {
        assert_eq!(extract_pricing_size("what does it cost for 80 seats"), Some(80));
        assert_eq!(extract_pricing_size("pricing for 12 users please"), Some(12));
        assert_eq!(extract_pricing_size("enterprise pricing"), None);
    }

    #[test]
    fn contains_any_str_matches_case_normalised_input() {
        assert!(contains_any_str("i want to speak to a human", HUMAN_REQUEST_PHRASES));
        assert!(!contains_any_str("what is a demo", HUMAN_REQUEST_PHRASES));
    }

    /// Answers classify-requests deterministically from `classify_response` and
    /// answer-requests from `answer_confidence`, so each test only has to tune
    /// the one value it cares about.
    struct ScriptedLlm {
        classify_response: &'static str,
        answer_confidence: f64,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send(&self, req: &ChatRequest) -> std::result::Result<ChatResponse, ProviderError> {
            let content = if req.system.contains("You classify") {
                self.classify_response.to_string()
            } else {
                format!(
                    "Our demo walks through the dashboard and the integrations.\nCONFIDENCE: {}",
                    self.answer_confidence
                )
            };
            Ok(ChatResponse {
                content,
                model: req.model.clone(),
                tokens_in: 1,
                tokens_out: 1,
                stop_reason: "end_turn".to_string(),
            })
        }
    }

    struct FakeCalendar;

    #[async_trait]
    impl CalendarProvider for FakeCalendar {
        async fn freebusy(
            &self,
            _window_start: DateTime<Utc>,
            _window_end: DateTime<Utc>,
        ) -> dispatcher_scheduling::Result<Vec<BusyInterval>> {
            Ok(Vec::new())
        }

        async fn create_event(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
            _attendee: &str,
        ) -> dispatcher_scheduling::Result<CreatedEvent> {
            Ok(CreatedEvent {
                event_id: "evt-1".to_string(),
                start,
                end,
            })
        }
    }

    #[derive(Default)]
    struct FakeWorkspace {
        tickets_posted: Mutex<u32>,
    }

    #[async_trait]
    impl WorkspaceAdapter for FakeWorkspace {
        async fn post_ticket(&self, _ticket: &Ticket) -> dispatcher_workspace::Result<String> {
            *self.tickets_posted.lock().unwrap() += 1;
            Ok("thread-1".to_string())
        }

        async fn edit_ticket(&self, _k: &str, _b: &str, _a: &[Action]) -> dispatcher_workspace::Result<()> {
            Ok(())
        }

        async fn post_thread_message(&self, _k: &str, _t: &str, _r: RoleLabel) -> dispatcher_workspace::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSurface {
        sent: Mutex<Vec<String>>,
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

    fn session_store() -> SessionStore {
        let conn = Connection::open_in_memory().unwrap();
        dispatcher_sessions::db::init_db(&conn).unwrap();
        SessionStore::new(conn)
    }

    fn knowledge_store() -> KnowledgeStore {
        let conn = Connection::open_in_memory().unwrap();
        dispatcher_retrieval::db::init_db(&conn).unwrap();
        let store = KnowledgeStore::new(conn);
        store
            .upsert(
                "Demo",
                "Our demo walks through the dashboard and the integrations.",
                "product",
            )
            .unwrap();
        store
    }

    fn surface_manager() -> (dispatcher_surfaces::SurfaceManager, &'static FakeSurface) {
        let fake: &'static FakeSurface = Box::leak(Box::new(FakeSurface::default()));
        let mut mgr = dispatcher_surfaces::SurfaceManager::new();
        mgr.register(Box::new(FakeSurfaceRef(fake)));
        (mgr, fake)
    }

    #[tokio::test]
    async fn demo_question_is_answered_not_escalated() {
        let sessions = session_store();
        let knowledge = knowledge_store();
        let calendar = FakeCalendar;
        let workspace = FakeWorkspace::default();
        let (surfaces, sent) = surface_manager();
        let relay = RelayHub::new(&sessions, &workspace, &surfaces);
        let llm = ScriptedLlm {
            classify_response: "INTENT: information\nCONFIDENCE: 0.9",
            answer_confidence: 0.9,
        };
        let config = DispatcherConfig::default();
        let cancellations = DashMap::new();
        let orchestrator = Orchestrator::new(&sessions, &llm, "test-model", &knowledge, &calendar, &workspace, &relay, &config, &cancellations);

        let user_key = UserKey::new(Surface::WebChat, "u-demo");
        let session = sessions.find_or_create_active(&user_key, "chan-1").unwrap();
        let session = sessions
            .append_message(&session.id, Message::user("What is a demo?", "web-chat"))
            .unwrap();

        let outcome = orchestrator.process_turn(session).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Answered { .. }));
        assert_eq!(*workspace.tickets_posted.lock().unwrap(), 0);
        assert!(sent.sent.lock().unwrap().iter().any(|t| t.contains("dashboard")));
    }

    #[tokio::test]
    async fn bare_digit_without_pending_slots_never_books() {
        let sessions = session_store();
        let knowledge = knowledge_store();
        let calendar = FakeCalendar;
        let workspace = FakeWorkspace::default();
        let (surfaces, _sent) = surface_manager();
        let relay = RelayHub::new(&sessions, &workspace, &surfaces);
        let llm = ScriptedLlm {
            classify_response: "INTENT: information\nCONFIDENCE: 0.4",
            answer_confidence: 0.1,
        };
        let config = DispatcherConfig::default();
        let cancellations = DashMap::new();
        let orchestrator = Orchestrator::new(&sessions, &llm, "test-model", &knowledge, &calendar, &workspace, &relay, &config, &cancellations);

        let user_key = UserKey::new(Surface::WebChat, "u-digit");
        let session = sessions.find_or_create_active(&user_key, "chan-1").unwrap();
        assert!(session.pending_slots.is_empty());
        let session = sessions
            .append_message(&session.id, Message::user("3", "web-chat"))
            .unwrap();

        let outcome = orchestrator.process_turn(session).await.unwrap();
        assert!(!matches!(outcome, TurnOutcome::Booked { .. }));
    }

    #[tokio::test]
    async fn second_abusive_message_within_window_escalates() {
        let sessions = session_store();
        let knowledge = knowledge_store();
        let calendar = FakeCalendar;
        let workspace = FakeWorkspace::default();
        let (surfaces, _sent) = surface_manager();
        let relay = RelayHub::new(&sessions, &workspace, &surfaces);
        let llm = ScriptedLlm {
            classify_response: "INTENT: abusive\nCONFIDENCE: 0.9",
            answer_confidence: 0.9,
        };
        let config = DispatcherConfig::default();
        let cancellations = DashMap::new();
        let orchestrator = Orchestrator::new(&sessions, &llm, "test-model", &knowledge, &calendar, &workspace, &relay, &config, &cancellations);

        let user_key = UserKey::new(Surface::WebChat, "u-abuse");
        let session = sessions.find_or_create_active(&user_key, "chan-1").unwrap();
        let session = sessions
            .append_message(&session.id, Message::user("you are all useless", "web-chat"))
            .unwrap();

        let first = orchestrator.process_turn(session).await.unwrap();
        assert!(matches!(first, TurnOutcome::AbuseWarned { escalated: false }));
        assert_eq!(*workspace.tickets_posted.lock().unwrap(), 0);

        let session = sessions.get(&user_key_session_id(&sessions, &user_key)).unwrap();
        let session = sessions
            .append_message(&session.id, Message::user("still furious", "web-chat"))
            .unwrap();

        let second = orchestrator.process_turn(session).await.unwrap();
        assert!(matches!(second, TurnOutcome::AbuseWarned { escalated: true }));
        assert_eq!(*workspace.tickets_posted.lock().unwrap(), 1);
    }

    fn user_key_session_id(sessions: &SessionStore, user_key: &UserKey) -> String {
        sessions.find_or_create_active(user_key, "chan-1").unwrap().id
    }
}
