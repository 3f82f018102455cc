//! End-to-end session flows through the coordinator.

use chrono::{DateTime, Duration, TimeZone, Utc};
use ritual_engine::{EngineConfig, SessionCoordinator};
use ritual_types::*;

fn t(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 21, 23, 0, 0).unwrap() + Duration::seconds(n)
}

fn witness() -> WitnessId {
    WitnessId::new("witness-1")
}

#[test]
fn full_bloody_mary_session() {
    let mut c = SessionCoordinator::bootstrap(EngineConfig::default()).unwrap();
    let me = witness();
    let id = c
        .start_session("bloody-mary", vec![me.clone()], me.clone(), t(0))
        .unwrap();

    // preparation and invocation
    for (n, expected_next) in [(0i64, 1u32), (1, 2)] {
        c.begin_step(&id, &me, t(10 * n + 1)).unwrap();
        let done = c.complete_step(&id, &me, t(10 * n + 2)).unwrap();
        assert_eq!(
            done,
            StepTransition::Completed {
                order: n as u32,
                kind: c.ritual("bloody-mary").unwrap().steps()[n as usize].kind,
                next_order: Some(expected_next),
            }
        );
    }

    // silence
    c.begin_silence(&id, &me, t(30)).unwrap();
    assert_eq!(c.session(&id).unwrap().status(), SessionStatus::Silence);

    let recording = Recording::audio(RecordingId::new("rec-1"), id.clone(), 2, 30, t(60))
        .with_byte_size(123_456)
        .with_silence_detected(true);
    let done = c.complete_silence(&id, &me, recording, t(60)).unwrap();
    assert_eq!(done.order(), 2);

    let view = c.runner_view(&id, &me).unwrap();
    assert_eq!(view.status, SessionStatus::InProgress);
    assert_eq!(view.current_order, 3);
    assert_eq!(view.next_step_order, None);
    assert!(view.has_recording);

    // closing
    c.begin_step(&id, &me, t(61)).unwrap();
    c.complete_step(&id, &me, t(62)).unwrap();
    assert_eq!(c.session(&id).unwrap().status(), SessionStatus::Completed);

    // survey
    let rating = PresenceRating::new(4).unwrap();
    c.submit_survey(&id, &me, rating, Some("Felt a presence"), t(70))
        .unwrap();
    let survey = c.session(&id).unwrap().survey().unwrap();
    assert_eq!(survey.presence_rating.value(), 4);
    assert_eq!(survey.notes.as_deref(), Some("Felt a presence"));

    // journal
    let kinds: Vec<&str> = c.events_for(&id).iter().map(|e| e.kind.name()).collect();
    assert_eq!(
        kinds,
        vec![
            "SessionStarted",
            "StepBegan",
            "StepCompleted",
            "StepBegan",
            "StepCompleted",
            "SilenceBegan",
            "SilenceCompleted",
            "StepBegan",
            "StepCompleted",
            "SessionCompleted",
            "SurveySubmitted",
        ]
    );
    let sequences: Vec<u64> = c.events_for(&id).iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, (0..11).collect::<Vec<u64>>());

    // history
    let history = c.sessions_for(&me);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].presence_rating, Some(rating));
    assert_eq!(history[0].silence_detected, Some(true));
}

#[test]
fn rejections_leave_session_unchanged() {
    let mut c = SessionCoordinator::bootstrap(EngineConfig::default()).unwrap();
    let me = witness();
    let id = c
        .start_session("enochian", vec![me.clone()], me.clone(), t(0))
        .unwrap();

    let before = c.session(&id).unwrap().clone();
    let events_before = c.journal().event_count(&id);

    assert_eq!(
        c.complete_step(&id, &me, t(1)).unwrap_err(),
        RitualError::StepNotStarted { order: 0 }
    );
    assert!(matches!(
        c.begin_silence(&id, &me, t(1)),
        Err(RitualError::NotAtSilenceStep { order: 0, .. })
    ));
    assert_eq!(
        c.submit_survey(&id, &me, PresenceRating::new(3).unwrap(), None, t(1))
            .unwrap_err(),
        RitualError::SurveyBeforeCompletion
    );

    assert_eq!(c.session(&id).unwrap(), &before);
    assert_eq!(c.journal().event_count(&id), events_before);
}

#[test]
fn cancel_during_silence_blocks_recording() {
    let mut c = SessionCoordinator::bootstrap(EngineConfig::default()).unwrap();
    let me = witness();
    let id = c
        .start_session("enochian", vec![me.clone()], me.clone(), t(0))
        .unwrap();

    for n in 0..2 {
        c.begin_step(&id, &me, t(10 * n + 1)).unwrap();
        c.complete_step(&id, &me, t(10 * n + 2)).unwrap();
    }
    c.begin_silence(&id, &me, t(30)).unwrap();
    assert_eq!(c.cancel(&id, &me, t(35)).unwrap(), CancelOutcome::Cancelled);

    let recording = Recording::audio(RecordingId::new("late"), id.clone(), 2, 30, t(60));
    assert_eq!(
        c.complete_silence(&id, &me, recording, t(60)).unwrap_err(),
        RitualError::SilenceNotActive
    );
    assert!(c.session(&id).unwrap().recording().is_none());
}

#[test]
fn custom_ritual_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("candle.toml"),
        r#"
id = "candle"
slug = "candle-gazing"
title = "Candle Gazing"

[[steps]]
id = "c0"
order = 0
kind = "PREPARATION"
name = "Light the candle"

[[steps]]
id = "c1"
order = 1
kind = "INVOCATION"
name = "Focus"

[[steps]]
id = "c2"
order = 2
kind = "EXTRA"
name = "Breathe"

[[steps]]
id = "c3"
order = 3
kind = "SILENCE"
name = "Watch the flame"

[[steps]]
id = "c4"
order = 4
kind = "CLOSING"
name = "Extinguish"
"#,
    )
    .unwrap();

    let mut c = SessionCoordinator::bootstrap(EngineConfig::default()).unwrap();
    assert_eq!(c.load_rituals_from_dir(dir.path()).unwrap(), 1);
    assert_eq!(c.ritual_count(), 3);

    let ritual = c.ritual("candle-gazing").unwrap();
    // silence duration defaults when not declared
    assert_eq!(ritual.step(3).unwrap().duration_secs, Some(30));

    // loading the same directory twice trips the slug check
    assert!(matches!(
        c.load_rituals_from_dir(dir.path()),
        Err(RitualError::DuplicateSlug(_))
    ));
}
