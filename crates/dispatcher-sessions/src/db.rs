use rusqlite::Connection;

use crate::error::Result;

/// Initialise the sessions table and its indexes.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id                   TEXT PRIMARY KEY,
            surface              TEXT NOT NULL,
            external_user_id     TEXT NOT NULL,
            channel_key          TEXT NOT NULL,
            workspace_thread_key TEXT,
            state                TEXT NOT NULL,
            assigned_agent       TEXT,
            escalated_at         TEXT,
            claimed_at           TEXT,
            closed_at            TEXT,
            escalation_reason    TEXT,
            history              TEXT NOT NULL DEFAULT '[]',
            pending_slots        TEXT NOT NULL DEFAULT '[]',
            created_at           TEXT NOT NULL,
            updated_at           TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_user
            ON sessions(surface, external_user_id, state);
        CREATE INDEX IF NOT EXISTS idx_sessions_workspace_thread
            ON sessions(workspace_thread_key);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_active_per_user
            ON sessions(surface, external_user_id) WHERE state != 'closed';",
    )?;
    Ok(())
}
