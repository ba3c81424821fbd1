use chrono::{DateTime, Utc};
use dispatcher_sessions::SlotOffer;

use crate::calendar::{CalendarProvider, CreatedEvent};
use crate::error::{Result, SchedulingError};

#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub event: CreatedEvent,
}

/// Books a previously-offered slot, re-checking availability immediately
/// before writing the calendar event so a slot taken between offer and
/// selection surfaces as `SlotTaken` rather than a silent double-book.
pub struct BookingExecutor<'a> {
    calendar: &'a dyn CalendarProvider,
}

impl<'a> BookingExecutor<'a> {
    pub fn new(calendar: &'a dyn CalendarProvider) -> Self {
        Self { calendar }
    }

    pub async fn book(&self, offer: &SlotOffer, attendee: &str) -> Result<BookingOutcome> {
        let start: DateTime<Utc> = offer
            .start
            .parse()
            .map_err(|_| SchedulingError::ProviderUnavailable("malformed slot start".to_string()))?;
        let end: DateTime<Utc> = offer
            .end
            .parse()
            .map_err(|_| SchedulingError::ProviderUnavailable("malformed slot end".to_string()))?;

        let busy = self.calendar.freebusy(start, end).await?;
        let still_free = !busy.iter().any(|b| start < b.end && end > b.start);
        if !still_free {
            return Err(SchedulingError::SlotTaken);
        }

        let event = self.calendar.create_event(start, end, attendee).await?;
        Ok(BookingOutcome { event })
    }
}
