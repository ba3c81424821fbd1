/// What happened to one inbound user turn. Mostly useful for logging and
/// tests — the gateway route only cares that the call succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Answered { citations: Vec<String> },
    SlotsOffered { count: usize },
    Booked { event_id: String },
    BookingFailed,
    Escalated { workspace_thread_key: String, reason: String },
    /// The workspace could not be reached after retries; the session stayed
    /// in `Active-AI` and the user was told to try again later.
    EscalationFailed { reason: String },
    AbuseWarned { escalated: bool },
    /// A newer message for the same session arrived before this turn finished;
    /// this turn's output was discarded and nothing was appended to history.
    Cancelled,
}
