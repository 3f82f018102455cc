//! Walk a ritual session end to end
//!
//! Drives a single-witness session through every step on a synthetic
//! clock: each step lasts its declared duration, or
//! [`DEFAULT_STEP_SECS`] when none is declared. The first silence step is
//! completed with a synthetic recording; a session holds one recording, so
//! any later silence step is completed without one.

use crate::error::{CliError, CliResult};
use crate::output::{self, print_info, print_success, OutputFormat};
use chrono::{DateTime, Duration, Utc};
use colored::*;
use ritual_engine::SessionCoordinator;
use ritual_types::*;
use serde::Serialize;

/// Synthetic duration of a step that declares none
pub const DEFAULT_STEP_SECS: u32 = 5;

/// Roughly 32 kbit/s opus
const RECORDING_BYTES_PER_SEC: u64 = 4_000;

/// Options for a walk
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    pub alias: String,
    /// Recorded silence length; defaults to the step's declared duration
    pub silence_secs: Option<u32>,
    pub rating: Option<u8>,
    pub notes: Option<String>,
    pub silence_detected: bool,
}

/// Everything a walk produced
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WalkReport<'a> {
    witness: &'a Witness,
    session: &'a Session,
    events: &'a [SessionEvent],
}

/// Run a session of `slug` to completion and print what happened
pub fn execute(
    coordinator: &mut SessionCoordinator,
    slug: &str,
    options: WalkOptions,
    format: OutputFormat,
) -> CliResult<()> {
    if options.notes.is_some() && options.rating.is_none() {
        return Err(CliError::InvalidInput("--notes requires --rating".into()));
    }
    let rating = options.rating.map(PresenceRating::new).transpose()?;

    let mut clock = Utc::now();
    let witness = Witness::new(WitnessId::generate(), &options.alias, None, clock)?;
    let session_id =
        coordinator.start_session(slug, vec![witness.id.clone()], witness.id.clone(), clock)?;

    while coordinator.session(&session_id)?.is_active() {
        let step = coordinator.runner_view(&session_id, &witness.id)?.current_step;

        if step.kind.is_silence() {
            coordinator.begin_silence(&session_id, &witness.id, clock)?;
            let secs = options
                .silence_secs
                .or(step.duration_secs)
                .unwrap_or(DEFAULT_SILENCE_DURATION_SECS);
            clock = advance(clock, secs);

            if coordinator.session(&session_id)?.recording().is_some() {
                coordinator.complete_step(&session_id, &witness.id, clock)?;
                continue;
            }

            let mut recording =
                Recording::audio(RecordingId::generate(), session_id.clone(), step.order, secs, clock)
                    .with_byte_size(u64::from(secs) * RECORDING_BYTES_PER_SEC);
            if options.silence_detected {
                recording = recording.with_silence_detected(true);
            }
            coordinator.complete_silence(&session_id, &witness.id, recording, clock)?;
        } else {
            coordinator.begin_step(&session_id, &witness.id, clock)?;
            clock = advance(clock, step.duration_secs.unwrap_or(DEFAULT_STEP_SECS));
            coordinator.complete_step(&session_id, &witness.id, clock)?;
        }
    }

    if let Some(rating) = rating {
        coordinator.submit_survey(
            &session_id,
            &witness.id,
            rating,
            options.notes.as_deref(),
            clock,
        )?;
    }

    let session = coordinator.session(&session_id)?;
    let events = coordinator.events_for(&session_id);
    match format {
        OutputFormat::Table => print_walk(&witness, session, events),
        _ => output::print_single(
            &WalkReport {
                witness: &witness,
                session,
                events,
            },
            format,
        )?,
    }
    Ok(())
}

fn advance(clock: DateTime<Utc>, secs: u32) -> DateTime<Utc> {
    clock + Duration::seconds(i64::from(secs))
}

fn print_walk(witness: &Witness, session: &Session, events: &[SessionEvent]) {
    print_info(&format!(
        "Session {} for {}",
        session.id().short(),
        witness.display_name()
    ));
    for event in events {
        let step = event
            .kind
            .step_order()
            .map(|o| format!(" step {}", o))
            .unwrap_or_default();
        println!(
            "  {:>3} {}{}",
            event.sequence.to_string().dimmed(),
            event.kind.name().bold(),
            step
        );
    }
    if let Some(recording) = session.recording() {
        println!(
            "  recording: {}s, {} bytes, {}",
            recording.duration_secs, recording.byte_size, recording.codec
        );
    }
    if let Some(survey) = session.survey() {
        println!("  presence: {}", survey.presence_rating);
    }
    print_success(&format!("Session {}", session.status()));
}
