//! Session journal: ordered record of what happened to each session
//!
//! The coordinator appends one or more events for every successful
//! transition. Failed operations leave no trace here.

use chrono::{DateTime, Utc};
use ritual_types::{SessionEvent, SessionEventKind, SessionId};
use std::collections::HashMap;

/// Per-session event log
#[derive(Clone, Debug, Default)]
pub struct SessionJournal {
    events: HashMap<SessionId, Vec<SessionEvent>>,
}

impl SessionJournal {
    /// Create a new empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, assigning the next sequence number for the session
    pub fn record(
        &mut self,
        session_id: &SessionId,
        occurred_at: DateTime<Utc>,
        kind: SessionEventKind,
    ) -> &SessionEvent {
        let events = self.events.entry(session_id.clone()).or_default();
        let sequence = events.len() as u64;
        tracing::trace!(
            session = %session_id,
            sequence,
            event = %kind,
            "Journal event recorded"
        );
        events.push(SessionEvent::new(sequence, session_id.clone(), occurred_at, kind));
        // just pushed
        &events[events.len() - 1]
    }

    // ── Query methods ────────────────────────────────────────────────

    /// Events of one session, oldest first
    pub fn events_for(&self, session_id: &SessionId) -> &[SessionEvent] {
        self.events
            .get(session_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Get event count for a session
    pub fn event_count(&self, session_id: &SessionId) -> usize {
        self.events.get(session_id).map_or(0, Vec::len)
    }

    /// Events touching a specific step
    pub fn events_for_step(&self, session_id: &SessionId, order: u32) -> Vec<&SessionEvent> {
        self.events_for(session_id)
            .iter()
            .filter(|e| e.involves_step(order))
            .collect()
    }

    /// Most recent event of a session
    pub fn last_event(&self, session_id: &SessionId) -> Option<&SessionEvent> {
        self.events_for(session_id).last()
    }

    /// Drop a session's events
    pub fn clear(&mut self, session_id: &SessionId) {
        self.events.remove(session_id);
    }

    /// Total events across all sessions
    pub fn total_events(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }
}
