//! Ritual Domain Types
//!
//! A ritual is a fixed script of steps a witness walks through:
//! preparation, invocation, a silence window during which ambient audio
//! is recorded, and a closing. This crate holds the domain core and
//! nothing else: it performs no I/O and never reads a clock.
//!
//! # Key Concepts
//!
//! - **Ritual**: an immutable, validated template. Step orders form a
//!   contiguous `0..n-1` run and the required step kinds are present.
//! - **Session**: one run of a ritual by one or more witnesses. It owns
//!   per-step progress, the status state machine, and the slots for
//!   exactly one recording and one survey.
//! - **Recording**: metadata for the audio captured during the silence step.
//! - **SurveyResponse**: the post-session presence rating.
//! - **Witness**: a participant identity (alias plus optional full name).
//!
//! # Session status machine
//!
//! ```text
//!            begin(silence)            complete(silence)
//! InProgress ──────────────▶ Silence ───────────────────▶ InProgress
//!     │                                                      │
//!     └──────── complete(last step) ──────▶ Completed ◀──────┘
//!
//! any non-terminal ── cancel ──▶ Cancelled
//! ```
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use ritual_types::*;
//!
//! let ritual = Ritual::new(
//!     RitualId::new("r-1"),
//!     "bloody-mary",
//!     "Bloody Mary",
//!     vec![
//!         RitualStep::new("s0", 0, RitualStepKind::Preparation, "Prep"),
//!         RitualStep::new("s1", 1, RitualStepKind::Invocation, "Invoke"),
//!         RitualStep::new("s2", 2, RitualStepKind::Silence, "Silence"),
//!         RitualStep::new("s3", 3, RitualStepKind::Closing, "Close"),
//!     ],
//! )
//! .unwrap();
//!
//! let witness = WitnessId::new("w-1");
//! let mut session = Session::start(
//!     SessionId::new("sess-1"),
//!     &ritual,
//!     vec![witness.clone()],
//!     witness,
//!     Utc::now(),
//! )
//! .unwrap();
//!
//! session.begin_current_step(&ritual, Utc::now()).unwrap();
//! session.complete_current_step(&ritual, Utc::now()).unwrap();
//! assert_eq!(session.current_order(), 1);
//! ```

#![deny(unsafe_code)]

mod errors;
mod events;
mod ids;
mod recording;
mod ritual;
mod session;
mod survey;
mod witness;

pub use errors::*;
pub use events::*;
pub use ids::*;
pub use recording::*;
pub use ritual::*;
pub use session::*;
pub use survey::*;
pub use witness::*;
