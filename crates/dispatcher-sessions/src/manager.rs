use std::sync::Mutex;

use dispatcher_core::types::{now_rfc3339, AgentId, Surface, UserKey};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::types::{Message, Session, SessionState, SlotOffer};

/// Thread-safe store for persisted sessions.
///
/// Wraps a single SQLite connection in a `Mutex`. A partial unique index on
/// `(surface, external_user_id) WHERE state != 'closed'` enforces "exactly
/// one active session per user" at the database layer, so
/// `find_or_create_active` can use the same insert-then-read-back race-safe
/// pattern used for plain upserts, and `transition` uses an explicit
/// compare-and-set on `state` for the claim/close races.
pub struct SessionStore {
    db: Mutex<Connection>,
}

impl SessionStore {
    /// Wrap an already-open (and `db::init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Return the unique active session for `user_key`, creating one in
    /// `ActiveAi` if none exists. On a race between two inserts, the losing
    /// insert is ignored and the read-back returns the winner's row.
    #[instrument(skip(self), fields(user_key = %user_key))]
    pub fn find_or_create_active(
        &self,
        user_key: &UserKey,
        channel_key: &str,
    ) -> Result<Session> {
        if let Some(session) = self.find_active(user_key)? {
            debug!("active session hit");
            return Ok(session);
        }

        let id = Uuid::now_v7().to_string();
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR IGNORE INTO sessions
             (id, surface, external_user_id, channel_key, workspace_thread_key,
              state, assigned_agent, escalated_at, claimed_at, closed_at,
              escalation_reason, history, pending_slots, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5, NULL, NULL, NULL, NULL, NULL, '[]', '[]', ?6, ?6)",
            rusqlite::params![
                id,
                user_key.surface.to_string(),
                user_key.external_user_id,
                channel_key,
                SessionState::ActiveAi.as_str(),
                now,
            ],
        )?;

        let session = self.find_active(user_key)?.ok_or_else(|| {
            SessionError::Corrupt(format!(
                "session row vanished immediately after insert for {user_key}"
            ))
        })?;
        info!(session_id = %session.id, "session created or reused");
        Ok(session)
    }

    fn find_active(&self, user_key: &UserKey) -> Result<Option<Session>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            &format!(
                "{} WHERE surface = ?1 AND external_user_id = ?2 AND state != 'closed'",
                SELECT_COLUMNS
            ),
            rusqlite::params![user_key.surface.to_string(), user_key.external_user_id],
            row_to_session,
        )
        .optional()
        .map_err(SessionError::Database)
    }

    #[instrument(skip(self))]
    pub fn get(&self, session_id: &str) -> Result<Session> {
        let db = self.db.lock().unwrap();
        db.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            rusqlite::params![session_id],
            row_to_session,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => SessionError::NotFound {
                id: session_id.to_string(),
            },
            other => SessionError::Database(other),
        })
    }

    #[instrument(skip(self))]
    pub fn get_by_workspace_thread(&self, workspace_thread_key: &str) -> Result<Session> {
        let db = self.db.lock().unwrap();
        db.query_row(
            &format!("{SELECT_COLUMNS} WHERE workspace_thread_key = ?1"),
            rusqlite::params![workspace_thread_key],
            row_to_session,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => SessionError::NotFound {
                id: workspace_thread_key.to_string(),
            },
            other => SessionError::Database(other),
        })
    }

    /// Append one message to the session's append-only history.
    #[instrument(skip(self, message))]
    pub fn append_message(&self, session_id: &str, message: Message) -> Result<Session> {
        let db = self.db.lock().unwrap();
        let history_json: String = db.query_row(
            "SELECT history FROM sessions WHERE id = ?1",
            rusqlite::params![session_id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => SessionError::NotFound {
                id: session_id.to_string(),
            },
            other => SessionError::Database(other),
        })?;

        let mut history: Vec<Message> = serde_json::from_str(&history_json)
            .map_err(|e| SessionError::Corrupt(e.to_string()))?;
        history.push(message);
        let new_history_json =
            serde_json::to_string(&history).map_err(|e| SessionError::Corrupt(e.to_string()))?;
        let now = now_rfc3339();

        db.execute(
            "UPDATE sessions SET history = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![new_history_json, now, session_id],
        )?;

        drop(db);
        self.get(session_id)
    }

    /// Compare-and-set transition: succeeds only if the session's current
    /// state equals `from_state`. `fields` lets the caller set the
    /// state-specific columns (assigned_agent, escalated_at, etc.) in the
    /// same statement the CAS guard applies to.
    #[instrument(skip(self, fields))]
    pub fn transition(
        &self,
        session_id: &str,
        from_state: SessionState,
        to_state: SessionState,
        fields: TransitionFields,
    ) -> Result<Session> {
        let db = self.db.lock().unwrap();
        let now = now_rfc3339();

        let rows_changed = db.execute(
            "UPDATE sessions
             SET state = ?1,
                 assigned_agent = COALESCE(?2, assigned_agent),
                 escalated_at = COALESCE(?3, escalated_at),
                 claimed_at = COALESCE(?4, claimed_at),
                 closed_at = COALESCE(?5, closed_at),
                 escalation_reason = COALESCE(?6, escalation_reason),
                 workspace_thread_key = COALESCE(?7, workspace_thread_key),
                 updated_at = ?8
             WHERE id = ?9 AND state = ?10",
            rusqlite::params![
                to_state.as_str(),
                fields.assigned_agent.as_ref().map(AgentId::as_str),
                fields.escalated_at,
                fields.claimed_at,
                fields.closed_at,
                fields.escalation_reason,
                fields.workspace_thread_key,
                now,
                session_id,
                from_state.as_str(),
            ],
        )?;

        if rows_changed == 0 {
            // Either the session does not exist, or the CAS guard did not
            // match — distinguish the two to give the caller an accurate error.
            let actual = db
                .query_row(
                    "SELECT state FROM sessions WHERE id = ?1",
                    rusqlite::params![session_id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            drop(db);
            return match actual {
                Some(actual) => Err(SessionError::Stale {
                    id: session_id.to_string(),
                    expected: from_state.as_str().to_string(),
                    actual,
                }),
                None => Err(SessionError::NotFound {
                    id: session_id.to_string(),
                }),
            };
        }

        drop(db);
        self.get(session_id)
    }

    #[instrument(skip(self, offers))]
    pub fn set_pending_slots(&self, session_id: &str, offers: Vec<SlotOffer>) -> Result<Session> {
        let json =
            serde_json::to_string(&offers).map_err(|e| SessionError::Corrupt(e.to_string()))?;
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        let rows_changed = db.execute(
            "UPDATE sessions SET pending_slots = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![json, now, session_id],
        )?;
        if rows_changed == 0 {
            return Err(SessionError::NotFound {
                id: session_id.to_string(),
            });
        }
        drop(db);
        self.get(session_id)
    }

    #[instrument(skip(self))]
    pub fn clear_pending_slots(&self, session_id: &str) -> Result<Session> {
        self.set_pending_slots(session_id, Vec::new())
    }

    #[instrument(skip(self))]
    pub fn stats(&self) -> Result<SessionStats> {
        let db = self.db.lock().unwrap();
        let total: i64 = db.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?;
        let active: i64 = db.query_row(
            "SELECT COUNT(*) FROM sessions WHERE state != 'closed'",
            [],
            |r| r.get(0),
        )?;
        let claimed: i64 = db.query_row(
            "SELECT COUNT(*) FROM sessions WHERE state = 'escalated_claimed'",
            [],
            |r| r.get(0),
        )?;
        Ok(SessionStats {
            total: total as u64,
            active: active as u64,
            claimed: claimed as u64,
        })
    }
}

/// Optional fields set alongside a `transition` call. `None` leaves the
/// existing column value untouched (`COALESCE`).
#[derive(Debug, Default)]
pub struct TransitionFields {
    pub assigned_agent: Option<AgentId>,
    pub escalated_at: Option<String>,
    pub claimed_at: Option<String>,
    pub closed_at: Option<String>,
    pub escalation_reason: Option<String>,
    pub workspace_thread_key: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionStats {
    pub total: u64,
    pub active: u64,
    pub claimed: u64,
}

const SELECT_COLUMNS: &str = "SELECT id, surface, external_user_id, channel_key,
        workspace_thread_key, state, assigned_agent, escalated_at, claimed_at,
        closed_at, escalation_reason, history, pending_slots, created_at, updated_at
     FROM sessions";

#[cfg(test)]
mod tests {
    use super::*;
    use dispatcher_core::types::Surface;

    fn store() -> SessionStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        SessionStore::new(conn)
    }

    fn user(id: &str) -> UserKey {
        UserKey::new(Surface::WebChat, id)
    }

    #[test]
    fn find_or_create_is_idempotent() {
        let store = store();
        let u = user("alice");
        let a = store.find_or_create_active(&u, "chan-1").unwrap();
        let b = store.find_or_create_active(&u, "chan-1").unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.state, SessionState::ActiveAi);
    }

    #[test]
    fn transition_cas_rejects_stale_guard() {
        let store = store();
        let u = user("bob");
        let session = store.find_or_create_active(&u, "chan-1").unwrap();

        let ok = store.transition(
            &session.id,
            SessionState::ActiveAi,
            SessionState::EscalatedUnclaimed,
            TransitionFields {
                escalated_at: Some(now_rfc3339()),
                ..Default::default()
            },
        );
        assert!(ok.is_ok());

        // Second attempt with the same (now stale) from_state must fail.
        let stale = store.transition(
            &session.id,
            SessionState::ActiveAi,
            SessionState::EscalatedUnclaimed,
            TransitionFields::default(),
        );
        assert!(matches!(stale, Err(SessionError::Stale { .. })));
    }

    #[test]
    fn claim_race_exactly_one_winner() {
        let store = store();
        let u = user("carol");
        let session = store.find_or_create_active(&u, "chan-1").unwrap();
        store
            .transition(
                &session.id,
                SessionState::ActiveAi,
                SessionState::EscalatedUnclaimed,
                TransitionFields::default(),
            )
            .unwrap();

        let agent_a = AgentId::new("agent-a");
        let agent_b = AgentId::new("agent-b");

        let claim_a = store.transition(
            &session.id,
            SessionState::EscalatedUnclaimed,
            SessionState::EscalatedClaimed,
            TransitionFields {
                assigned_agent: Some(agent_a.clone()),
                claimed_at: Some(now_rfc3339()),
                ..Default::default()
            },
        );
        let claim_b = store.transition(
            &session.id,
            SessionState::EscalatedUnclaimed,
            SessionState::EscalatedClaimed,
            TransitionFields {
                assigned_agent: Some(agent_b),
                claimed_at: Some(now_rfc3339()),
                ..Default::default()
            },
        );

        assert!(claim_a.is_ok());
        assert!(matches!(claim_b, Err(SessionError::Stale { .. })));
        let final_session = store.get(&session.id).unwrap();
        assert_eq!(final_session.assigned_agent, Some(agent_a));
    }

    #[test]
    fn one_active_session_per_user_enforced() {
        let store = store();
        let u = user("dana");
        let first = store.find_or_create_active(&u, "chan-1").unwrap();
        // Different channel_key, same user_key — must still resolve to the
        // same active session (invariant P1).
        let second = store.find_or_create_active(&u, "chan-2").unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn append_message_grows_history_monotonically() {
        let store = store();
        let u = user("erin");
        let session = store.find_or_create_active(&u, "chan-1").unwrap();
        let s1 = store
            .append_message(&session.id, Message::user("hi", "web-chat"))
            .unwrap();
        assert_eq!(s1.history.len(), 1);
        let s2 = store
            .append_message(&session.id, Message::system("ack"))
            .unwrap();
        assert_eq!(s2.history.len(), 2);
    }
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let surface_str: String = row.get(1)?;
    let surface: Surface = surface_str.parse().unwrap_or(Surface::WebChat);
    let state_str: String = row.get(5)?;
    let state: SessionState = state_str.parse().unwrap_or(SessionState::ActiveAi);
    let history_json: String = row.get(11)?;
    let pending_slots_json: String = row.get(12)?;

    Ok(Session {
        id: row.get(0)?,
        user_key: UserKey {
            surface,
            external_user_id: row.get(2)?,
        },
        channel_key: row.get(3)?,
        workspace_thread_key: row.get(4)?,
        state,
        assigned_agent: row.get::<_, Option<String>>(6)?.map(AgentId::new),
        escalated_at: row.get(7)?,
        claimed_at: row.get(8)?,
        closed_at: row.get(9)?,
        escalation_reason: row.get(10)?,
        history: serde_json::from_str(&history_json).unwrap_or_default(),
        pending_slots: serde_json::from_str(&pending_slots_json).unwrap_or_default(),
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}
