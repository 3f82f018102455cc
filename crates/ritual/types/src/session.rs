//! Sessions: running instances of a ritual
//!
//! A Session tracks per-step progress, the status state machine, and the
//! single recording and survey slots. Its fields are private; they change
//! only through the transition methods below, which take the caller's
//! clock reading as a parameter.
//!
//! Every transition either succeeds or returns an error with the session
//! left exactly as it was.

use crate::{
    Recording, Ritual, RitualError, RitualResult, RitualStep, RitualStepId, RitualStepKind,
    SessionId, SurveyResponse, WitnessId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Session Status ───────────────────────────────────────────────────

/// The lifecycle status of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Reserved; no operation currently produces it
    #[default]
    Draft,
    InProgress,
    /// Exclusively while the silence step is begun but not completed
    Silence,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Completed and Cancelled accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::InProgress => "IN_PROGRESS",
            Self::Silence => "SILENCE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Session Step ─────────────────────────────────────────────────────

/// Progress of one ritual step within a session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStep {
    pub ritual_step_id: RitualStepId,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionStep {
    fn unstarted(step: &RitualStep) -> Self {
        Self {
            ritual_step_id: step.id.clone(),
            order: step.order,
            started_at: None,
            completed_at: None,
        }
    }

    /// Derive progress from the two timestamps
    pub fn progress(&self) -> StepProgress {
        match (self.started_at, self.completed_at) {
            (_, Some(_)) => StepProgress::Completed,
            (Some(_), None) => StepProgress::InProgress,
            (None, None) => StepProgress::NotStarted,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Derived progress of a session step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepProgress {
    NotStarted,
    InProgress,
    Completed,
}

// ── Transition Outcomes ──────────────────────────────────────────────

/// What a step operation did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all_fields = "camelCase")]
pub enum StepTransition {
    /// The current step was started now
    Began { order: u32, kind: RitualStepKind },
    /// The current step was already started; nothing changed
    AlreadyStarted { order: u32 },
    /// The current step was completed now. `next_order` is `None` when it
    /// was the final step and the session is now Completed.
    Completed {
        order: u32,
        kind: RitualStepKind,
        next_order: Option<u32>,
    },
    /// The current step was already completed; nothing changed
    AlreadyCompleted { order: u32 },
}

impl StepTransition {
    /// Idempotent re-invocation that changed nothing
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::AlreadyStarted { .. } | Self::AlreadyCompleted { .. })
    }

    /// Order of the step the operation targeted
    pub fn order(&self) -> u32 {
        match self {
            Self::Began { order, .. }
            | Self::AlreadyStarted { order }
            | Self::Completed { order, .. }
            | Self::AlreadyCompleted { order } => *order,
        }
    }
}

/// Result of a cancellation request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelOutcome {
    Cancelled,
    /// The session was already Completed or Cancelled
    AlreadyFinished,
}

// ── Session ──────────────────────────────────────────────────────────

/// Plain, unvalidated form of a session, as read from storage
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: SessionId,
    pub ritual_id: crate::RitualId,
    pub witness_ids: Vec<WitnessId>,
    pub created_by: WitnessId,
    pub status: SessionStatus,
    pub current_order: u32,
    pub steps: Vec<SessionStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording: Option<Recording>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survey: Option<SurveyResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One run of a ritual by one or more witnesses
///
/// Deserialization goes through [`SessionRecord`] and rejects records the
/// transition methods could never have produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionRecord", into = "SessionRecord")]
pub struct Session {
    id: SessionId,
    ritual_id: crate::RitualId,
    witness_ids: Vec<WitnessId>,
    created_by: WitnessId,
    status: SessionStatus,
    current_order: u32,
    steps: Vec<SessionStep>,
    recording: Option<Recording>,
    survey: Option<SurveyResponse>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    /// Start a session of `ritual`
    ///
    /// The session begins InProgress at step 0 with every step unstarted.
    /// Duplicate witness ids are collapsed, keeping first occurrences.
    pub fn start(
        id: SessionId,
        ritual: &Ritual,
        witness_ids: Vec<WitnessId>,
        created_by: WitnessId,
        now: DateTime<Utc>,
    ) -> RitualResult<Self> {
        if witness_ids.is_empty() {
            return Err(RitualError::EmptyWitnessList);
        }
        if !witness_ids.contains(&created_by) {
            return Err(RitualError::CreatorNotParticipant(created_by));
        }

        let mut unique: Vec<WitnessId> = Vec::with_capacity(witness_ids.len());
        for witness in witness_ids {
            if !unique.contains(&witness) {
                unique.push(witness);
            }
        }

        Ok(Self {
            id,
            ritual_id: ritual.id().clone(),
            witness_ids: unique,
            created_by,
            status: SessionStatus::InProgress,
            current_order: 0,
            steps: ritual.steps().iter().map(SessionStep::unstarted).collect(),
            recording: None,
            survey: None,
            created_at: now,
            updated_at: now,
        })
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Mark the current step as started
    ///
    /// Entering a silence step also moves the session into Silence, which
    /// requires the session to be InProgress. Re-beginning a started step
    /// is a no-op.
    pub fn begin_current_step(
        &mut self,
        ritual: &Ritual,
        now: DateTime<Utc>,
    ) -> RitualResult<StepTransition> {
        self.check_ritual(ritual)?;
        self.guard_active()?;

        let order = self.current_order;
        if self.current_step_ref()?.is_started() {
            return Ok(StepTransition::AlreadyStarted { order });
        }

        let kind = self.current_ritual_step(ritual)?.kind;
        if kind.is_silence() && self.status != SessionStatus::InProgress {
            return Err(RitualError::SilenceEntryInvalidState);
        }

        self.current_step_mut()?.started_at = Some(now);
        if kind.is_silence() {
            self.status = SessionStatus::Silence;
        }
        self.updated_at = now;

        Ok(StepTransition::Began { order, kind })
    }

    /// Mark the current step as completed and advance
    ///
    /// Completing the final step completes the session; `current_order`
    /// then stays on the final step. Otherwise the session moves to the
    /// next step and back to InProgress, which is how it leaves Silence.
    /// Re-completing a completed step is a no-op.
    pub fn complete_current_step(
        &mut self,
        ritual: &Ritual,
        now: DateTime<Utc>,
    ) -> RitualResult<StepTransition> {
        self.check_ritual(ritual)?;
        self.guard_active()?;

        let order = self.current_order;
        let step = self.current_step_ref()?;
        if !step.is_started() {
            return Err(RitualError::StepNotStarted { order });
        }
        if step.is_completed() {
            return Ok(StepTransition::AlreadyCompleted { order });
        }

        let kind = self.current_ritual_step(ritual)?.kind;
        if kind.is_silence() && self.status != SessionStatus::Silence {
            return Err(RitualError::SilenceCompletionInvalidState);
        }

        self.current_step_mut()?.completed_at = Some(now);

        let is_last = (order as usize) + 1 >= self.steps.len();
        let next_order = if is_last {
            self.status = SessionStatus::Completed;
            None
        } else {
            self.current_order = order + 1;
            self.status = SessionStatus::InProgress;
            Some(self.current_order)
        };
        self.updated_at = now;

        Ok(StepTransition::Completed {
            order,
            kind,
            next_order,
        })
    }

    /// Begin the current step, which must be a silence step
    pub fn begin_silence(
        &mut self,
        ritual: &Ritual,
        now: DateTime<Utc>,
    ) -> RitualResult<StepTransition> {
        self.check_ritual(ritual)?;
        self.require_silence_step(ritual)?;
        self.begin_current_step(ritual, now)
    }

    /// Attach the silence recording and complete the silence step
    ///
    /// Only one recording is ever attached, and only while the session is
    /// in Silence on a silence step.
    pub fn complete_silence_with_recording(
        &mut self,
        ritual: &Ritual,
        recording: Recording,
        now: DateTime<Utc>,
    ) -> RitualResult<StepTransition> {
        self.check_ritual(ritual)?;
        self.require_silence_step(ritual)?;
        if self.status != SessionStatus::Silence {
            return Err(RitualError::SilenceNotActive);
        }
        if self.recording.is_some() {
            return Err(RitualError::RecordingAlreadyAttached);
        }

        self.recording = Some(recording);
        match self.complete_current_step(ritual, now) {
            Ok(transition) => Ok(transition),
            Err(err) => {
                self.recording = None;
                Err(err)
            }
        }
    }

    /// Attach the post-session survey
    pub fn submit_survey(&mut self, survey: SurveyResponse) -> RitualResult<()> {
        if self.status != SessionStatus::Completed {
            return Err(RitualError::SurveyBeforeCompletion);
        }
        if self.survey.is_some() {
            return Err(RitualError::SurveyAlreadySubmitted);
        }
        self.survey = Some(survey);
        Ok(())
    }

    /// Cancel the session from any non-terminal status, Silence included
    pub fn cancel(&mut self, now: DateTime<Utc>) -> CancelOutcome {
        if self.status.is_terminal() {
            return CancelOutcome::AlreadyFinished;
        }
        self.status = SessionStatus::Cancelled;
        self.updated_at = now;
        CancelOutcome::Cancelled
    }

    // ── Query methods ────────────────────────────────────────────────

    /// Get the session ID
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Get the ritual this session runs
    pub fn ritual_id(&self) -> &crate::RitualId {
        &self.ritual_id
    }

    /// Participating witnesses, in first-seen order
    pub fn witness_ids(&self) -> &[WitnessId] {
        &self.witness_ids
    }

    pub fn created_by(&self) -> &WitnessId {
        &self.created_by
    }

    /// Get the current status
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Order of the step awaiting action
    pub fn current_order(&self) -> u32 {
        self.current_order
    }

    /// Per-step progress, indexed by order
    pub fn steps(&self) -> &[SessionStep] {
        &self.steps
    }

    /// Get a step's progress by order
    pub fn step(&self, order: u32) -> Option<&SessionStep> {
        self.steps.get(order as usize)
    }

    /// Progress of the step awaiting action
    pub fn current_step(&self) -> Option<&SessionStep> {
        self.step(self.current_order)
    }

    /// The step after the current one, if there is one
    pub fn next_step_order(&self) -> Option<u32> {
        let next = self.current_order.checked_add(1)?;
        ((next as usize) < self.steps.len()).then_some(next)
    }

    /// The silence recording, once attached
    pub fn recording(&self) -> Option<&Recording> {
        self.recording.as_ref()
    }

    /// The post-session survey, once submitted
    pub fn survey(&self) -> Option<&SurveyResponse> {
        self.survey.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last state change
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Accepts step transitions (not Completed or Cancelled)
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Check whether a witness takes part in this session
    pub fn has_participant(&self, witness: &WitnessId) -> bool {
        self.witness_ids.contains(witness)
    }

    /// Get completed step count
    pub fn completed_step_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_completed()).count()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn check_ritual(&self, ritual: &Ritual) -> RitualResult<()> {
        if ritual.id() != &self.ritual_id {
            return Err(RitualError::RitualMismatch {
                expected: self.ritual_id.clone(),
                actual: ritual.id().clone(),
            });
        }
        Ok(())
    }

    fn guard_active(&self) -> RitualResult<()> {
        if self.status.is_terminal() {
            return Err(RitualError::SessionNotActive);
        }
        Ok(())
    }

    fn require_silence_step(&self, ritual: &Ritual) -> RitualResult<()> {
        let step = self.current_ritual_step(ritual)?;
        if !step.kind.is_silence() {
            return Err(RitualError::NotAtSilenceStep {
                order: step.order,
                kind: step.kind,
            });
        }
        Ok(())
    }

    fn current_ritual_step<'r>(&self, ritual: &'r Ritual) -> RitualResult<&'r RitualStep> {
        ritual
            .step(self.current_order)
            .ok_or(RitualError::CurrentStepMissing(self.current_order))
    }

    fn current_step_ref(&self) -> RitualResult<&SessionStep> {
        self.current_step()
            .ok_or(RitualError::CurrentStepMissing(self.current_order))
    }

    fn current_step_mut(&mut self) -> RitualResult<&mut SessionStep> {
        let order = self.current_order;
        self.steps
            .get_mut(order as usize)
            .ok_or(RitualError::CurrentStepMissing(order))
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = RitualError;

    fn try_from(record: SessionRecord) -> RitualResult<Self> {
        if record.witness_ids.is_empty() {
            return Err(RitualError::EmptyWitnessList);
        }
        if !record.witness_ids.contains(&record.created_by) {
            return Err(RitualError::CreatorNotParticipant(record.created_by));
        }
        check_step_progress(&record)?;

        if record.survey.is_some() && record.status != SessionStatus::Completed {
            return Err(invalid_record("survey on a session that is not completed"));
        }
        if let Some(survey) = &record.survey {
            if survey.session_id != record.id {
                return Err(invalid_record("survey belongs to another session"));
            }
        }
        if let Some(recording) = &record.recording {
            if recording.session_id != record.id {
                return Err(invalid_record("recording belongs to another session"));
            }
        }

        Ok(Self {
            id: record.id,
            ritual_id: record.ritual_id,
            witness_ids: record.witness_ids,
            created_by: record.created_by,
            status: record.status,
            current_order: record.current_order,
            steps: record.steps,
            recording: record.recording,
            survey: record.survey,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

impl From<Session> for SessionRecord {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            ritual_id: session.ritual_id,
            witness_ids: session.witness_ids,
            created_by: session.created_by,
            status: session.status,
            current_order: session.current_order,
            steps: session.steps,
            recording: session.recording,
            survey: session.survey,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

fn invalid_record(reason: impl Into<String>) -> RitualError {
    RitualError::InvalidSessionRecord(reason.into())
}

/// Steps before the cursor are done, steps after it are untouched, and the
/// cursor step agrees with the status
fn check_step_progress(record: &SessionRecord) -> RitualResult<()> {
    if record.steps.is_empty() {
        return Err(invalid_record("session has no steps"));
    }
    for (position, step) in record.steps.iter().enumerate() {
        if step.order as usize != position {
            return Err(invalid_record(format!(
                "step at position {} has order {}",
                position, step.order
            )));
        }
        if step.is_completed() && !step.is_started() {
            return Err(invalid_record(format!(
                "step {} completed without being started",
                step.order
            )));
        }
    }

    let current = record.current_order as usize;
    let Some(step) = record.steps.get(current) else {
        return Err(invalid_record(format!(
            "current order {} is out of range",
            record.current_order
        )));
    };
    if record.steps[..current].iter().any(|s| !s.is_completed()) {
        return Err(invalid_record("a step before the current one is not completed"));
    }
    if record.steps[current + 1..].iter().any(|s| s.is_started()) {
        return Err(invalid_record("a step after the current one was started"));
    }

    let is_last = current + 1 == record.steps.len();
    let consistent = match record.status {
        SessionStatus::Silence => step.is_started() && !step.is_completed(),
        SessionStatus::Completed => is_last && step.is_completed(),
        SessionStatus::Draft | SessionStatus::InProgress | SessionStatus::Cancelled => {
            !step.is_completed()
        }
    };
    if !consistent {
        return Err(invalid_record(format!(
            "status {} does not match progress of step {}",
            record.status, record.current_order
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PresenceRating, RecordingId, RitualId, SurveyId};
    use chrono::{Duration, TimeZone};

    fn make_ritual() -> Ritual {
        Ritual::new(
            RitualId::new("bloody-mary"),
            "bloody-mary",
            "Bloody Mary",
            vec![
                RitualStep::new("s0", 0, RitualStepKind::Preparation, "Prep"),
                RitualStep::new("s1", 1, RitualStepKind::Invocation, "Invoke"),
                RitualStep::new("s2", 2, RitualStepKind::Silence, "Silence"),
                RitualStep::new("s3", 3, RitualStepKind::Closing, "Close"),
            ],
        )
        .unwrap()
    }

    /// Deterministic clock: t(n) is n seconds after a fixed epoch
    fn t(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(n)
    }

    fn creator() -> WitnessId {
        WitnessId::new("witness-1")
    }

    fn make_session(ritual: &Ritual) -> Session {
        Session::start(SessionId::new("sess-1"), ritual, vec![creator()], creator(), t(0)).unwrap()
    }

    fn make_recording(session: &Session) -> Recording {
        Recording::audio(RecordingId::new("rec-1"), session.id().clone(), 2, 30, t(50))
            .with_byte_size(123_456)
    }

    fn make_survey(session: &Session, rating: u8) -> SurveyResponse {
        SurveyResponse::new(
            SurveyId::generate(),
            session.id().clone(),
            PresenceRating::new(rating).unwrap(),
            t(100),
        )
    }

    /// Walk steps 0 and 1 so the session sits on the silence step
    fn advance_to_silence(session: &mut Session, ritual: &Ritual) {
        for n in 0..2 {
            session.begin_current_step(ritual, t(10 * n + 1)).unwrap();
            session.complete_current_step(ritual, t(10 * n + 2)).unwrap();
        }
    }

    fn completed_session(ritual: &Ritual) -> Session {
        let mut session = make_session(ritual);
        advance_to_silence(&mut session, ritual);
        session.begin_silence(ritual, t(30)).unwrap();
        let rec = make_recording(&session);
        session
            .complete_silence_with_recording(ritual, rec, t(60))
            .unwrap();
        session.begin_current_step(ritual, t(61)).unwrap();
        session.complete_current_step(ritual, t(62)).unwrap();
        session
    }

    // ── start ────────────────────────────────────────────────────────

    #[test]
    fn test_start_session() {
        let ritual = make_ritual();
        let session = make_session(&ritual);

        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.current_order(), 0);
        assert_eq!(session.steps().len(), 4);
        assert!(session.recording().is_none());
        assert!(session.survey().is_none());
        assert_eq!(session.ritual_id(), ritual.id());
        assert_eq!(session.created_at(), t(0));
        assert_eq!(session.updated_at(), t(0));
        for (i, step) in session.steps().iter().enumerate() {
            assert_eq!(step.order as usize, i);
            assert_eq!(step.ritual_step_id, ritual.steps()[i].id);
            assert_eq!(step.progress(), StepProgress::NotStarted);
        }
    }

    #[test]
    fn test_start_requires_witness() {
        let ritual = make_ritual();
        let err = Session::start(SessionId::new("s"), &ritual, vec![], creator(), t(0)).unwrap_err();
        assert_eq!(err, RitualError::EmptyWitnessList);
    }

    #[test]
    fn test_start_requires_creator_participant() {
        let ritual = make_ritual();
        let err = Session::start(
            SessionId::new("s"),
            &ritual,
            vec![WitnessId::new("other")],
            creator(),
            t(0),
        )
        .unwrap_err();
        assert_eq!(err, RitualError::CreatorNotParticipant(creator()));
    }

    #[test]
    fn test_start_deduplicates_witnesses() {
        let ritual = make_ritual();
        let other = WitnessId::new("witness-2");
        let session = Session::start(
            SessionId::new("s"),
            &ritual,
            vec![creator(), other.clone(), creator(), other.clone()],
            creator(),
            t(0),
        )
        .unwrap();
        assert_eq!(session.witness_ids(), &[creator(), other.clone()]);
        assert!(session.has_participant(&other));
        assert!(!session.has_participant(&WitnessId::new("stranger")));
    }

    // ── begin / complete ─────────────────────────────────────────────

    #[test]
    fn test_step_timestamps() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);

        let began = session.begin_current_step(&ritual, t(1)).unwrap();
        assert_eq!(
            began,
            StepTransition::Began {
                order: 0,
                kind: RitualStepKind::Preparation
            }
        );
        assert_eq!(session.steps()[0].started_at, Some(t(1)));
        assert!(session.steps()[0].completed_at.is_none());
        assert_eq!(session.steps()[0].progress(), StepProgress::InProgress);

        let completed = session.complete_current_step(&ritual, t(2)).unwrap();
        assert_eq!(
            completed,
            StepTransition::Completed {
                order: 0,
                kind: RitualStepKind::Preparation,
                next_order: Some(1)
            }
        );
        assert_eq!(session.steps()[0].completed_at, Some(t(2)));
        assert_eq!(session.current_order(), 1);
        assert_eq!(session.updated_at(), t(2));
    }

    #[test]
    fn test_begin_is_idempotent() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);

        session.begin_current_step(&ritual, t(1)).unwrap();
        let before = session.clone();
        let again = session.begin_current_step(&ritual, t(5)).unwrap();

        assert_eq!(again, StepTransition::AlreadyStarted { order: 0 });
        assert!(again.is_noop());
        assert_eq!(session.steps()[0].started_at, Some(t(1)));
        assert_eq!(session, before);
    }

    #[test]
    fn test_complete_twice_does_not_advance_twice() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);

        session.begin_current_step(&ritual, t(1)).unwrap();
        session.complete_current_step(&ritual, t(2)).unwrap();
        let before = session.clone();

        // the next step has not begun, so a duplicate complete is rejected
        let err = session.complete_current_step(&ritual, t(3)).unwrap_err();
        assert_eq!(err, RitualError::StepNotStarted { order: 1 });
        assert_eq!(session, before);
        assert_eq!(session.steps()[0].completed_at, Some(t(2)));
        assert_eq!(session.current_order(), 1);
    }

    #[test]
    fn test_complete_before_begin_rejected() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        let err = session.complete_current_step(&ritual, t(1)).unwrap_err();
        assert_eq!(err, RitualError::StepNotStarted { order: 0 });
        assert_eq!(session.current_order(), 0);
    }

    #[test]
    fn test_completed_steps_stay_completed() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        advance_to_silence(&mut session, &ritual);

        assert_eq!(session.steps()[0].completed_at, Some(t(2)));
        assert_eq!(session.steps()[1].completed_at, Some(t(12)));
        assert_eq!(session.completed_step_count(), 2);
    }

    #[test]
    fn test_plain_begin_on_silence_step_enters_silence() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        advance_to_silence(&mut session, &ritual);

        session.begin_current_step(&ritual, t(30)).unwrap();
        assert_eq!(session.status(), SessionStatus::Silence);
    }

    // ── silence ──────────────────────────────────────────────────────

    #[test]
    fn test_begin_silence_enters_silence_status() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        advance_to_silence(&mut session, &ritual);

        assert_eq!(session.current_order(), 2);
        assert_eq!(session.status(), SessionStatus::InProgress);

        let transition = session.begin_silence(&ritual, t(30)).unwrap();
        assert_eq!(
            transition,
            StepTransition::Began {
                order: 2,
                kind: RitualStepKind::Silence
            }
        );
        assert_eq!(session.status(), SessionStatus::Silence);

        // re-begin inside the window is a no-op, status untouched
        let again = session.begin_silence(&ritual, t(31)).unwrap();
        assert!(again.is_noop());
        assert_eq!(session.status(), SessionStatus::Silence);
    }

    #[test]
    fn test_begin_silence_on_other_step_rejected() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        let err = session.begin_silence(&ritual, t(1)).unwrap_err();
        assert_eq!(
            err,
            RitualError::NotAtSilenceStep {
                order: 0,
                kind: RitualStepKind::Preparation
            }
        );
        assert!(session.steps()[0].started_at.is_none());
    }

    #[test]
    fn test_complete_silence_returns_to_in_progress() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        advance_to_silence(&mut session, &ritual);
        session.begin_silence(&ritual, t(30)).unwrap();

        let rec = make_recording(&session);
        let transition = session
            .complete_silence_with_recording(&ritual, rec.clone(), t(60))
            .unwrap();

        assert_eq!(transition.order(), 2);
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.current_order(), 3);
        assert_eq!(session.recording(), Some(&rec));
    }

    #[test]
    fn test_plain_complete_of_silence_step_exits_silence() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        advance_to_silence(&mut session, &ritual);
        session.begin_silence(&ritual, t(30)).unwrap();

        session.complete_current_step(&ritual, t(60)).unwrap();
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert!(session.recording().is_none());
    }

    #[test]
    fn test_recording_requires_active_silence() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        advance_to_silence(&mut session, &ritual);

        // on the silence step but not begun
        let rec = make_recording(&session);
        let err = session
            .complete_silence_with_recording(&ritual, rec, t(40))
            .unwrap_err();
        assert_eq!(err, RitualError::SilenceNotActive);
        assert!(session.recording().is_none());
    }

    #[test]
    fn test_recording_off_silence_step_rejected() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        let rec = make_recording(&session);
        let err = session
            .complete_silence_with_recording(&ritual, rec, t(1))
            .unwrap_err();
        assert!(matches!(err, RitualError::NotAtSilenceStep { order: 0, .. }));
    }

    #[test]
    fn test_cannot_attach_two_recordings() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        advance_to_silence(&mut session, &ritual);
        session.begin_silence(&ritual, t(30)).unwrap();

        let first = make_recording(&session);
        session
            .complete_silence_with_recording(&ritual, first.clone(), t(60))
            .unwrap();

        let second = Recording::audio(RecordingId::new("rec-2"), session.id().clone(), 2, 45, t(61));
        let err = session
            .complete_silence_with_recording(&ritual, second, t(62))
            .unwrap_err();

        // the session already left the silence step
        assert!(matches!(err, RitualError::NotAtSilenceStep { order: 3, .. }));
        assert_eq!(session.recording(), Some(&first));
    }

    #[test]
    fn test_recording_already_attached() {
        // a ritual with two silence steps lets a second attach reach the check
        let ritual = Ritual::new(
            RitualId::new("double"),
            "double-silence",
            "Double Silence",
            vec![
                RitualStep::new("s0", 0, RitualStepKind::Preparation, "Prep"),
                RitualStep::new("s1", 1, RitualStepKind::Invocation, "Invoke"),
                RitualStep::new("s2", 2, RitualStepKind::Silence, "First"),
                RitualStep::new("s3", 3, RitualStepKind::Silence, "Second"),
                RitualStep::new("s4", 4, RitualStepKind::Closing, "Close"),
            ],
        )
        .unwrap();
        let mut session = make_session(&ritual);
        advance_to_silence(&mut session, &ritual);

        session.begin_silence(&ritual, t(30)).unwrap();
        let first = make_recording(&session);
        session
            .complete_silence_with_recording(&ritual, first.clone(), t(60))
            .unwrap();

        session.begin_silence(&ritual, t(61)).unwrap();
        let second = Recording::audio(RecordingId::new("rec-2"), session.id().clone(), 3, 30, t(90));
        let before = session.clone();
        let err = session
            .complete_silence_with_recording(&ritual, second, t(91))
            .unwrap_err();

        assert_eq!(err, RitualError::RecordingAlreadyAttached);
        assert_eq!(session, before);
        assert_eq!(session.recording(), Some(&first));
        assert_eq!(session.status(), SessionStatus::Silence);
    }

    // ── completion / survey ──────────────────────────────────────────

    #[test]
    fn test_happy_path() {
        let ritual = make_ritual();
        let mut session = completed_session(&ritual);

        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.current_order(), 3);
        assert_eq!(session.next_step_order(), None);
        assert_eq!(session.recording().map(|r| r.duration_secs), Some(30));
        assert_eq!(session.completed_step_count(), 4);

        let survey = make_survey(&session, 4).with_notes("Felt a presence");
        session.submit_survey(survey).unwrap();

        let stored = session.survey().unwrap();
        assert_eq!(stored.presence_rating.value(), 4);
        assert_eq!(stored.notes.as_deref(), Some("Felt a presence"));
    }

    #[test]
    fn test_final_complete_reports_no_next_step() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        advance_to_silence(&mut session, &ritual);
        session.begin_silence(&ritual, t(30)).unwrap();
        let rec = make_recording(&session);
        session
            .complete_silence_with_recording(&ritual, rec, t(60))
            .unwrap();
        session.begin_current_step(&ritual, t(61)).unwrap();

        let last = session.complete_current_step(&ritual, t(62)).unwrap();
        assert_eq!(
            last,
            StepTransition::Completed {
                order: 3,
                kind: RitualStepKind::Closing,
                next_order: None
            }
        );
    }

    #[test]
    fn test_completed_session_rejects_transitions() {
        let ritual = make_ritual();
        let mut session = completed_session(&ritual);

        assert_eq!(
            session.begin_current_step(&ritual, t(70)).unwrap_err(),
            RitualError::SessionNotActive
        );
        assert_eq!(
            session.complete_current_step(&ritual, t(70)).unwrap_err(),
            RitualError::SessionNotActive
        );
    }

    #[test]
    fn test_survey_before_completion_rejected() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        let err = session.submit_survey(make_survey(&session, 3)).unwrap_err();
        assert_eq!(err, RitualError::SurveyBeforeCompletion);
        assert!(session.survey().is_none());
    }

    #[test]
    fn test_duplicate_survey_rejected() {
        let ritual = make_ritual();
        let mut session = completed_session(&ritual);

        let first = make_survey(&session, 3);
        session.submit_survey(first.clone()).unwrap();
        let err = session.submit_survey(make_survey(&session, 5)).unwrap_err();

        assert_eq!(err, RitualError::SurveyAlreadySubmitted);
        assert_eq!(session.survey(), Some(&first));
    }

    // ── cancellation ─────────────────────────────────────────────────

    #[test]
    fn test_cancel_from_silence() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        advance_to_silence(&mut session, &ritual);
        session.begin_silence(&ritual, t(30)).unwrap();

        assert_eq!(session.cancel(t(35)), CancelOutcome::Cancelled);
        assert_eq!(session.status(), SessionStatus::Cancelled);
        assert!(session.is_terminal());

        let rec = make_recording(&session);
        assert_eq!(
            session
                .complete_silence_with_recording(&ritual, rec, t(40))
                .unwrap_err(),
            RitualError::SilenceNotActive
        );
        assert_eq!(
            session.complete_current_step(&ritual, t(40)).unwrap_err(),
            RitualError::SessionNotActive
        );
    }

    #[test]
    fn test_cancel_finished_session_is_noop() {
        let ritual = make_ritual();
        let mut session = completed_session(&ritual);
        let updated = session.updated_at();
        assert_eq!(session.cancel(t(99)), CancelOutcome::AlreadyFinished);
        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.updated_at(), updated);
    }

    // ── misc ─────────────────────────────────────────────────────────

    #[test]
    fn test_ritual_mismatch_rejected() {
        let ritual = make_ritual();
        let mut session = make_session(&ritual);
        let other = Ritual::new(
            RitualId::new("enochian"),
            "enochian",
            "Enochian",
            ritual.steps().to_vec(),
        )
        .unwrap();

        let err = session.begin_current_step(&other, t(1)).unwrap_err();
        assert_eq!(
            err,
            RitualError::RitualMismatch {
                expected: ritual.id().clone(),
                actual: other.id().clone()
            }
        );
        assert!(session.steps()[0].started_at.is_none());
    }

    #[test]
    fn test_draft_is_reserved() {
        assert_eq!(SessionStatus::default(), SessionStatus::Draft);
        assert!(!SessionStatus::Draft.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_persistence_shape() {
        let ritual = make_ritual();
        let session = completed_session(&ritual);
        let json = serde_json::to_value(&session).unwrap();

        assert_eq!(json["status"], "COMPLETED");
        assert_eq!(json["currentOrder"], 3);
        assert_eq!(json["ritualId"], "bloody-mary");
        assert_eq!(json["witnessIds"][0], "witness-1");
        assert_eq!(json["createdBy"], "witness-1");
        assert_eq!(json["steps"][0]["ritualStepId"], "s0");
        assert!(json["steps"][0]["startedAt"].is_string());
        assert_eq!(json["recording"]["kind"], "AUDIO");
        assert!(json.get("survey").is_none());

        let back: Session = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_deserialize_rejects_impossible_sessions() {
        let ritual = make_ritual();
        let mut in_silence = make_session(&ritual);
        advance_to_silence(&mut in_silence, &ritual);
        in_silence.begin_silence(&ritual, t(30)).unwrap();
        let good = serde_json::to_value(&in_silence).unwrap();
        assert_eq!(serde_json::from_value::<Session>(good.clone()).unwrap(), in_silence);

        fn tampered(good: &serde_json::Value, edit: impl FnOnce(&mut serde_json::Value)) -> String {
            let mut json = good.clone();
            edit(&mut json);
            serde_json::from_value::<Session>(json).unwrap_err().to_string()
        }

        let err = tampered(&good, |j| j["currentOrder"] = serde_json::json!(u32::MAX));
        assert!(err.contains("current order 4294967295 is out of range"), "{err}");

        let err = tampered(&good, |j| j["currentOrder"] = serde_json::json!(3));
        assert!(err.contains("before the current one is not completed"), "{err}");

        let err = tampered(&good, |j| j["steps"][2]["startedAt"] = serde_json::Value::Null);
        assert!(err.contains("status SILENCE does not match"), "{err}");

        let err = tampered(&good, |j| {
            let started = j["steps"][2]["startedAt"].clone();
            j["steps"][3]["startedAt"] = started;
        });
        assert!(err.contains("after the current one was started"), "{err}");

        let err = tampered(&good, |j| j["steps"][1]["order"] = serde_json::json!(7));
        assert!(err.contains("step at position 1 has order 7"), "{err}");

        let err = tampered(&good, |j| j["steps"] = serde_json::json!([]));
        assert!(err.contains("session has no steps"), "{err}");

        let err = tampered(&good, |j| j["witnessIds"] = serde_json::json!(["someone-else"]));
        assert!(err.contains("createdBy must be a participant"), "{err}");
    }

    #[test]
    fn test_deserialize_rejects_premature_survey() {
        let ritual = make_ritual();
        let session = make_session(&ritual);
        let mut json = serde_json::to_value(&session).unwrap();
        json["survey"] = serde_json::to_value(make_survey(&session, 3)).unwrap();

        let err = serde_json::from_value::<Session>(json).unwrap_err();
        assert!(err.to_string().contains("survey on a session that is not completed"));
    }
}
