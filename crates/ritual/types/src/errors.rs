//! Error types for the ritual layer

use crate::{RitualId, RitualStepKind, SessionId, WitnessId};

/// Errors that can occur in ritual and session operations
///
/// Every variant is a caller-correctable precondition violation. None of
/// them is retried by the core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RitualError {
    // ── Ritual construction ──────────────────────────────────────────
    #[error("slug must be kebab-case: {0:?}")]
    InvalidSlug(String),

    #[error("ritual must have steps")]
    EmptyRitual,

    #[error("steps must have contiguous order starting at 0")]
    InvalidStepOrder,

    #[error("ritual must include required steps (missing: {})", kind_list(.missing))]
    MissingRequiredSteps { missing: Vec<RitualStepKind> },

    // ── Session setup ────────────────────────────────────────────────
    #[error("at least one witness required")]
    EmptyWitnessList,

    #[error("createdBy must be a participant: {0}")]
    CreatorNotParticipant(WitnessId),

    // ── Session transitions ──────────────────────────────────────────
    #[error("session not active")]
    SessionNotActive,

    #[error("step {order} must be started before completing")]
    StepNotStarted { order: u32 },

    #[error("not at SILENCE step (current step {order} is {kind})")]
    NotAtSilenceStep { order: u32, kind: RitualStepKind },

    #[error("silence not active")]
    SilenceNotActive,

    #[error("must be IN_PROGRESS to enter SILENCE")]
    SilenceEntryInvalidState,

    #[error("cannot complete SILENCE outside silence state")]
    SilenceCompletionInvalidState,

    #[error("recording already attached")]
    RecordingAlreadyAttached,

    #[error("survey allowed only after completion")]
    SurveyBeforeCompletion,

    #[error("survey already submitted")]
    SurveyAlreadySubmitted,

    #[error("current step {0} not found")]
    CurrentStepMissing(u32),

    #[error("session belongs to ritual {expected}, got {actual}")]
    RitualMismatch { expected: RitualId, actual: RitualId },

    // ── Value objects ────────────────────────────────────────────────
    #[error("Alias required")]
    AliasRequired,

    #[error("presence rating must be between 0 and 5, got {0}")]
    InvalidPresenceRating(u8),

    // ── Collaborator (service layer) ─────────────────────────────────
    #[error("Ritual not found: {0}")]
    RitualNotFound(String),

    #[error("Ritual slug already registered: {0}")]
    DuplicateSlug(String),

    #[error("Ritual id already registered: {0}")]
    DuplicateRitualId(RitualId),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Witness {witness} is not a participant of session {session}")]
    NotParticipant {
        session: SessionId,
        witness: WitnessId,
    },

    #[error("Recording does not match session: {0}")]
    RecordingMismatch(String),

    #[error("Invalid recording metadata: {0}")]
    InvalidRecording(String),

    #[error("A recording is required to complete the silence step")]
    RecordingRequired,

    #[error("Survey notes exceed {max} characters")]
    NotesTooLong { max: usize },

    #[error("Ritual definition error: {0}")]
    Definition(String),

    #[error("Invalid session record: {0}")]
    InvalidSessionRecord(String),
}

impl RitualError {
    /// Errors raised while validating a ritual template
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSlug(_)
                | Self::EmptyRitual
                | Self::InvalidStepOrder
                | Self::MissingRequiredSteps { .. }
        )
    }
}

fn kind_list(kinds: &[RitualStepKind]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for ritual operations
pub type RitualResult<T> = Result<T, RitualError>;
