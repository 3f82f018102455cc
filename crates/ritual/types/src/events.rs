//! Session events
//!
//! Plain synchronous event records. The core does not publish them; the
//! service layer derives them from successful transitions and keeps them
//! in a journal.

use crate::{PresenceRating, RecordingId, RitualId, RitualStepKind, SessionId, WitnessId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event that happened to a session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    /// Monotonically increasing per session, starting at 0
    pub sequence: u64,
    pub session_id: SessionId,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: SessionEventKind,
}

impl SessionEvent {
    pub fn new(
        sequence: u64,
        session_id: SessionId,
        occurred_at: DateTime<Utc>,
        kind: SessionEventKind,
    ) -> Self {
        Self {
            sequence,
            session_id,
            occurred_at,
            kind,
        }
    }

    /// Check if this event concerns a particular step
    pub fn involves_step(&self, order: u32) -> bool {
        self.kind.step_order() == Some(order)
    }
}

/// What happened
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum SessionEventKind {
    SessionStarted {
        ritual_id: RitualId,
        witness_ids: Vec<WitnessId>,
    },
    StepBegan {
        order: u32,
        step_kind: RitualStepKind,
    },
    StepCompleted {
        order: u32,
        step_kind: RitualStepKind,
    },
    SilenceBegan {
        order: u32,
        expected_duration_secs: u32,
    },
    SilenceCompleted {
        order: u32,
        actual_duration_secs: u32,
        recording_id: RecordingId,
    },
    SessionCompleted,
    SurveySubmitted {
        presence_rating: PresenceRating,
    },
    SessionCancelled,
}

impl SessionEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "SessionStarted",
            Self::StepBegan { .. } => "StepBegan",
            Self::StepCompleted { .. } => "StepCompleted",
            Self::SilenceBegan { .. } => "SilenceBegan",
            Self::SilenceCompleted { .. } => "SilenceCompleted",
            Self::SessionCompleted => "SessionCompleted",
            Self::SurveySubmitted { .. } => "SurveySubmitted",
            Self::SessionCancelled => "SessionCancelled",
        }
    }

    /// The step this event refers to, if any
    pub fn step_order(&self) -> Option<u32> {
        match self {
            Self::StepBegan { order, .. }
            | Self::StepCompleted { order, .. }
            | Self::SilenceBegan { order, .. }
            | Self::SilenceCompleted { order, .. } => Some(*order),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
