//! Session Coordinator: the service-layer entry point
//!
//! The coordinator owns the ritual registry, the live sessions, and the
//! journal. For every session operation it:
//! 1. Resolves the session and checks that the actor participates in it
//! 2. Validates request payloads (recording metadata, survey notes)
//! 3. Delegates the transition to the domain core
//! 4. Journals the events implied by a successful transition
//!
//! The coordinator never reads a clock; callers pass `now`.

use crate::{catalog, EngineConfig, RitualRegistry, SessionJournal};
use chrono::{DateTime, Utc};
use ritual_types::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Owns rituals and sessions and drives the session state machine
#[derive(Clone, Debug)]
pub struct SessionCoordinator {
    config: EngineConfig,
    rituals: RitualRegistry,
    sessions: HashMap<SessionId, Session>,
    journal: SessionJournal,
}

impl SessionCoordinator {
    /// Create a coordinator with an empty registry
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            rituals: RitualRegistry::new(),
            sessions: HashMap::new(),
            journal: SessionJournal::new(),
        }
    }

    /// Create a coordinator and register the built-in catalog when the
    /// config asks for it
    pub fn bootstrap(config: EngineConfig) -> RitualResult<Self> {
        let load_builtin = config.load_builtin_rituals;
        let mut coordinator = Self::new(config);
        if load_builtin {
            for ritual in catalog::builtin_rituals()? {
                coordinator.register_ritual(ritual)?;
            }
        }
        Ok(coordinator)
    }

    /// Get the engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Ritual Management ────────────────────────────────────────────

    /// Register a ritual definition
    pub fn register_ritual(&mut self, ritual: Ritual) -> RitualResult<RitualId> {
        self.rituals.register(ritual)
    }

    /// Register every ritual file in `dir`; returns how many were added
    pub fn load_rituals_from_dir(&mut self, dir: &Path) -> RitualResult<usize> {
        let rituals = catalog::load_dir(dir)?;
        let count = rituals.len();
        for ritual in rituals {
            self.register_ritual(ritual)?;
        }
        tracing::info!(dir = %dir.display(), count, "Ritual directory loaded");
        Ok(count)
    }

    /// Look a ritual up by slug or id
    pub fn ritual(&self, slug_or_id: &str) -> RitualResult<&Ritual> {
        self.rituals.resolve(slug_or_id)
    }

    /// All rituals, ordered by slug
    pub fn list_rituals(&self) -> Vec<&Ritual> {
        self.rituals.list()
    }

    /// Get ritual count
    pub fn ritual_count(&self) -> usize {
        self.rituals.count()
    }

    // ── Session Lifecycle ────────────────────────────────────────────

    /// Start a session of the ritual named by slug or id
    pub fn start_session(
        &mut self,
        ritual_ref: &str,
        witness_ids: Vec<WitnessId>,
        created_by: WitnessId,
        now: DateTime<Utc>,
    ) -> RitualResult<SessionId> {
        let ritual = self.rituals.resolve(ritual_ref)?;
        let session = Session::start(SessionId::generate(), ritual, witness_ids, created_by, now)?;
        let session_id = session.id().clone();

        tracing::info!(
            session_id = %session_id,
            ritual = %ritual.slug(),
            witnesses = session.witness_ids().len(),
            "Session started"
        );

        self.journal.record(
            &session_id,
            now,
            SessionEventKind::SessionStarted {
                ritual_id: session.ritual_id().clone(),
                witness_ids: session.witness_ids().to_vec(),
            },
        );
        self.sessions.insert(session_id.clone(), session);
        Ok(session_id)
    }

    /// Get a session by ID
    pub fn session(&self, session_id: &SessionId) -> RitualResult<&Session> {
        self.sessions
            .get(session_id)
            .ok_or_else(|| RitualError::SessionNotFound(session_id.clone()))
    }

    /// Get session count
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Begin the current step
    pub fn begin_step(
        &mut self,
        session_id: &SessionId,
        actor: &WitnessId,
        now: DateTime<Utc>,
    ) -> RitualResult<StepTransition> {
        self.transition(session_id, actor, now, "begin_step", |session, ritual| {
            let transition = session.begin_current_step(ritual, now)?;
            Ok((transition, step_events(&transition, ritual, None)))
        })
    }

    /// Complete the current step
    ///
    /// With `require_silence_recording` set, a silence step can only be
    /// completed through [`complete_silence`](Self::complete_silence) while
    /// the session has no recording yet. Later silence steps of a ritual
    /// with several of them complete here.
    pub fn complete_step(
        &mut self,
        session_id: &SessionId,
        actor: &WitnessId,
        now: DateTime<Utc>,
    ) -> RitualResult<StepTransition> {
        let require_recording = self.config.require_silence_recording;
        self.transition(session_id, actor, now, "complete_step", |session, ritual| {
            let step_done = session.current_step().is_some_and(|s| s.is_completed());
            if require_recording
                && at_silence_step(session, ritual)
                && !step_done
                && session.is_active()
                && session.recording().is_none()
            {
                return Err(RitualError::RecordingRequired);
            }

            let transition = session.complete_current_step(ritual, now)?;
            Ok((transition, step_events(&transition, ritual, None)))
        })
    }

    /// Begin the silence step
    pub fn begin_silence(
        &mut self,
        session_id: &SessionId,
        actor: &WitnessId,
        now: DateTime<Utc>,
    ) -> RitualResult<StepTransition> {
        self.transition(session_id, actor, now, "begin_silence", |session, ritual| {
            let transition = session.begin_silence(ritual, now)?;
            Ok((transition, step_events(&transition, ritual, None)))
        })
    }

    /// Attach the silence recording and complete the silence step
    ///
    /// Step and status errors from the core take precedence; recording
    /// metadata is only checked once the session could accept it.
    pub fn complete_silence(
        &mut self,
        session_id: &SessionId,
        actor: &WitnessId,
        recording: Recording,
        now: DateTime<Utc>,
    ) -> RitualResult<StepTransition> {
        let max_channels = self.config.max_recording_channels;
        self.transition(session_id, actor, now, "complete_silence", |session, ritual| {
            let accepts_recording = at_silence_step(session, ritual)
                && session.status() == SessionStatus::Silence
                && session.recording().is_none();
            if accepts_recording {
                check_recording(session, &recording, max_channels)?;
            }

            let recording_ref = (recording.id.clone(), recording.duration_secs);
            let transition = session.complete_silence_with_recording(ritual, recording, now)?;
            Ok((
                transition,
                step_events(&transition, ritual, Some(recording_ref)),
            ))
        })
    }

    /// Build and attach the post-session survey
    ///
    /// Notes are trimmed; blank notes are dropped.
    pub fn submit_survey(
        &mut self,
        session_id: &SessionId,
        actor: &WitnessId,
        rating: PresenceRating,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> RitualResult<SurveyId> {
        let max_chars = self.config.notes_max_chars;
        let survey_id = self.transition(session_id, actor, now, "submit_survey", |session, _| {
            let notes = notes.map(str::trim).filter(|n| !n.is_empty());
            if notes.is_some_and(|n| n.chars().count() > max_chars) {
                return Err(RitualError::NotesTooLong { max: max_chars });
            }

            let mut survey =
                SurveyResponse::new(SurveyId::generate(), session.id().clone(), rating, now);
            if let Some(notes) = notes {
                survey = survey.with_notes(notes);
            }
            let survey_id = survey.id.clone();
            session.submit_survey(survey)?;

            Ok((
                survey_id,
                vec![SessionEventKind::SurveySubmitted {
                    presence_rating: rating,
                }],
            ))
        })?;

        tracing::info!(session_id = %session_id, rating = %rating, "Survey submitted");
        Ok(survey_id)
    }

    /// Cancel a session
    ///
    /// Cancelling a finished session is not an error; it reports
    /// [`CancelOutcome::AlreadyFinished`] and changes nothing.
    pub fn cancel(
        &mut self,
        session_id: &SessionId,
        actor: &WitnessId,
        now: DateTime<Utc>,
    ) -> RitualResult<CancelOutcome> {
        let outcome = self.transition(session_id, actor, now, "cancel", |session, _| {
            let outcome = session.cancel(now);
            let events = match outcome {
                CancelOutcome::Cancelled => vec![SessionEventKind::SessionCancelled],
                CancelOutcome::AlreadyFinished => Vec::new(),
            };
            Ok((outcome, events))
        })?;

        match outcome {
            CancelOutcome::Cancelled => {
                tracing::info!(session_id = %session_id, actor = %actor, "Session cancelled")
            }
            CancelOutcome::AlreadyFinished => {
                tracing::debug!(session_id = %session_id, "Cancel on finished session")
            }
        }
        Ok(outcome)
    }

    // ── Views ────────────────────────────────────────────────────────

    /// Everything a runner UI needs to render the current step
    pub fn runner_view(&self, session_id: &SessionId, actor: &WitnessId) -> RitualResult<RunnerView> {
        let session = self.participant_session(session_id, actor)?;
        let ritual = self.rituals.get(session.ritual_id())?;
        let current_step = ritual
            .step(session.current_order())
            .cloned()
            .ok_or(RitualError::CurrentStepMissing(session.current_order()))?;

        let steps = session
            .steps()
            .iter()
            .zip(ritual.steps())
            .map(|(progress, step)| StepView {
                order: step.order,
                kind: step.kind,
                name: step.name.clone(),
                progress: progress.progress(),
            })
            .collect();

        Ok(RunnerView {
            session_id: session.id().clone(),
            ritual_slug: ritual.slug().to_string(),
            ritual_title: ritual.title().to_string(),
            status: session.status(),
            current_order: session.current_order(),
            next_step_order: session.next_step_order(),
            current_step,
            steps,
            has_recording: session.recording().is_some(),
            has_survey: session.survey().is_some(),
        })
    }

    /// Sessions a witness participates in, newest first
    pub fn sessions_for(&self, witness: &WitnessId) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .values()
            .filter(|s| s.has_participant(witness))
            .map(|session| {
                let ritual = self.rituals.get(session.ritual_id()).ok();
                SessionSummary {
                    id: session.id().clone(),
                    ritual_slug: ritual.map(|r| r.slug().to_string()).unwrap_or_default(),
                    ritual_title: ritual.map(|r| r.title().to_string()).unwrap_or_default(),
                    status: session.status(),
                    created_at: session.created_at(),
                    presence_rating: session.survey().map(|s| s.presence_rating),
                    silence_detected: session.recording().and_then(|r| r.silence_detected),
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    /// Get the event journal
    pub fn journal(&self) -> &SessionJournal {
        &self.journal
    }

    /// Journaled events of one session, oldest first
    pub fn events_for(&self, session_id: &SessionId) -> &[SessionEvent] {
        self.journal.events_for(session_id)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn participant_session(&self, session_id: &SessionId, actor: &WitnessId) -> RitualResult<&Session> {
        let session = self.session(session_id)?;
        if !session.has_participant(actor) {
            return Err(RitualError::NotParticipant {
                session: session_id.clone(),
                witness: actor.clone(),
            });
        }
        Ok(session)
    }

    /// Run `op` against a session and journal the events it reports
    fn transition<T>(
        &mut self,
        session_id: &SessionId,
        actor: &WitnessId,
        now: DateTime<Utc>,
        op_name: &'static str,
        op: impl FnOnce(&mut Session, &Ritual) -> RitualResult<(T, Vec<SessionEventKind>)>,
    ) -> RitualResult<T> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| RitualError::SessionNotFound(session_id.clone()))?;
        if !session.has_participant(actor) {
            tracing::warn!(session_id = %session_id, actor = %actor, op = op_name, "Actor is not a participant");
            return Err(RitualError::NotParticipant {
                session: session_id.clone(),
                witness: actor.clone(),
            });
        }
        let ritual = self.rituals.get(session.ritual_id())?;

        let (value, events) = match op(&mut *session, ritual) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    session_id = %session_id,
                    op = op_name,
                    status = %session.status(),
                    error = %err,
                    "Transition rejected"
                );
                return Err(err);
            }
        };

        if events.is_empty() {
            tracing::debug!(session_id = %session_id, op = op_name, "No-op transition");
        }
        for kind in events {
            match &kind {
                SessionEventKind::SessionCompleted => {
                    tracing::info!(session_id = %session_id, "Session completed")
                }
                other => tracing::debug!(session_id = %session_id, event = %other, "Session advanced"),
            }
            self.journal.record(session_id, now, kind);
        }
        Ok(value)
    }
}

/// Events implied by a step transition
///
/// `recording` is `(id, measured duration)` when the step was completed
/// through the silence-recording path.
fn step_events(
    transition: &StepTransition,
    ritual: &Ritual,
    recording: Option<(RecordingId, u32)>,
) -> Vec<SessionEventKind> {
    match *transition {
        StepTransition::Began { order, kind } if kind.is_silence() => {
            let expected_duration_secs = ritual
                .step(order)
                .and_then(|s| s.duration_secs)
                .unwrap_or(DEFAULT_SILENCE_DURATION_SECS);
            vec![SessionEventKind::SilenceBegan {
                order,
                expected_duration_secs,
            }]
        }
        StepTransition::Began { order, kind } => vec![SessionEventKind::StepBegan {
            order,
            step_kind: kind,
        }],
        StepTransition::Completed {
            order,
            kind,
            next_order,
        } => {
            let mut events = vec![match recording {
                Some((recording_id, actual_duration_secs)) => SessionEventKind::SilenceCompleted {
                    order,
                    actual_duration_secs,
                    recording_id,
                },
                None => SessionEventKind::StepCompleted {
                    order,
                    step_kind: kind,
                },
            }];
            if next_order.is_none() {
                events.push(SessionEventKind::SessionCompleted);
            }
            events
        }
        StepTransition::AlreadyStarted { .. } | StepTransition::AlreadyCompleted { .. } => {
            Vec::new()
        }
    }
}

fn at_silence_step(session: &Session, ritual: &Ritual) -> bool {
    ritual
        .step(session.current_order())
        .is_some_and(|step| step.kind.is_silence())
}

/// Metadata checks applied before a recording reaches the core
fn check_recording(session: &Session, recording: &Recording, max_channels: u8) -> RitualResult<()> {
    if &recording.session_id != session.id() {
        return Err(RitualError::RecordingMismatch(format!(
            "recording belongs to session {}",
            recording.session_id
        )));
    }
    if recording.silence_step_order != session.current_order() {
        return Err(RitualError::RecordingMismatch(format!(
            "recording targets step {}, current step is {}",
            recording.silence_step_order,
            session.current_order()
        )));
    }
    if recording.duration_secs == 0 {
        return Err(RitualError::InvalidRecording("duration must be positive".into()));
    }
    if recording.sample_rate_hz == 0 {
        return Err(RitualError::InvalidRecording("sample rate must be positive".into()));
    }
    if recording.channels == 0 || recording.channels > max_channels {
        return Err(RitualError::InvalidRecording(format!(
            "channels must be between 1 and {}, got {}",
            max_channels, recording.channels
        )));
    }
    Ok(())
}

// ── Views ────────────────────────────────────────────────────────────

/// Snapshot of a session for the step runner
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerView {
    pub session_id: SessionId,
    pub ritual_slug: String,
    pub ritual_title: String,
    pub status: SessionStatus,
    pub current_order: u32,
    /// `None` on the final step
    pub next_step_order: Option<u32>,
    pub current_step: RitualStep,
    pub steps: Vec<StepView>,
    pub has_recording: bool,
    pub has_survey: bool,
}

/// One row of the runner's step list
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub order: u32,
    pub kind: RitualStepKind,
    pub name: String,
    pub progress: StepProgress,
}

/// One entry in a witness's session history
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: SessionId,
    pub ritual_slug: String,
    pub ritual_title: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_rating: Option<PresenceRating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_detected: Option<bool>,
}
