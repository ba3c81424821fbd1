use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatedEvent {
    pub event_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// External calendar backend contract: free/busy lookups and event creation.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn freebusy(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>)
        -> Result<Vec<BusyInterval>>;

    async fn create_event(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        attendee: &str,
    ) -> Result<CreatedEvent>;
}
