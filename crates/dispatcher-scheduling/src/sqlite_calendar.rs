use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crate::calendar::{BusyInterval, CalendarProvider, CreatedEvent};
use crate::error::Result;

/// Local SQLite-backed calendar, used when no external calendar provider is
/// configured. Same CRUD/prepared-statement shape as the job store this
/// design is grounded on — one table, one index, no connection pool.
pub struct SqliteCalendarProvider {
    db: Mutex<Connection>,
}

impl SqliteCalendarProvider {
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS calendar_events (
                id         TEXT PRIMARY KEY,
                start_at   TEXT NOT NULL,
                end_at     TEXT NOT NULL,
                attendee   TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_calendar_events_window
                ON calendar_events(start_at, end_at);",
        )?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl CalendarProvider for SqliteCalendarProvider {
    async fn freebusy(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT start_at, end_at FROM calendar_events
             WHERE start_at < ?2 AND end_at > ?1",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![window_start.to_rfc3339(), window_end.to_rfc3339()],
            |row| {
                let start: String = row.get(0)?;
                let end: String = row.get(1)?;
                Ok((start, end))
            },
        )?;
        let intervals = rows
            .filter_map(|r| r.ok())
            .filter_map(|(s, e)| {
                Some(BusyInterval {
                    start: s.parse().ok()?,
                    end: e.parse().ok()?,
                })
            })
            .collect();
        Ok(intervals)
    }

    async fn create_event(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        attendee: &str,
    ) -> Result<CreatedEvent> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO calendar_events (id, start_at, end_at, attendee, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, start.to_rfc3339(), end.to_rfc3339(), attendee, now],
        )?;
        info!(event_id = %id, %attendee, "calendar event created");
        Ok(CreatedEvent {
            event_id: id,
            start,
            end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn create_event_then_shows_as_busy() {
        let provider = SqliteCalendarProvider::new(Connection::open_in_memory().unwrap()).unwrap();
        let start = Utc::now();
        let end = start + Duration::minutes(30);
        provider.create_event(start, end, "a@example.com").await.unwrap();

        let busy = provider
            .freebusy(start - Duration::minutes(5), end + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(busy.len(), 1);
    }
}
