use dispatcher_sessions::Session;

/// What the caller should do after a user message has been relayed.
#[derive(Debug)]
pub enum UserMessageOutcome {
    /// The prior session was closed; a fresh one was started and the message
    /// appended to it. Hand this to the orchestrator like any other turn.
    NewSession(Session),
    /// Session is AI-authoritative; the orchestrator should classify and respond.
    NeedsOrchestration(Session),
    /// Session is escalated; the message was appended and mirrored into the
    /// workspace thread. The AI stays silent — nothing further to do.
    RelayedToWorkspace(Session),
}

#[derive(Debug)]
pub enum ClaimOutcome {
    Claimed(Session),
    /// CAS lost the race; `claimed_by` is the agent who holds the ticket, if known.
    AlreadyClaimed { claimed_by: Option<String> },
}

#[derive(Debug)]
pub enum CloseOutcome {
    Closed(Session),
    /// Actor was not the assigned agent.
    NotAuthorized,
    /// CAS lost the race (already closed or claimed by someone else concurrently).
    Stale,
}

#[derive(Debug)]
pub enum ThreadReplyOutcome {
    ForwardedToUser(Session),
    IgnoredNotAssignedAgent,
    DroppedSessionClosed,
}
