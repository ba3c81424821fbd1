pub mod booking;
pub mod calendar;
pub mod error;
pub mod slots;
pub mod sqlite_calendar;

pub use booking::{BookingExecutor, BookingOutcome};
pub use calendar::{BusyInterval, CalendarProvider, CreatedEvent};
pub use error::{Result, SchedulingError};
pub use slots::derive_slots;
pub use sqlite_calendar::SqliteCalendarProvider;
