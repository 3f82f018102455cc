//! Ritual session engine
//!
//! The engine wraps the pure domain core from `ritual-types` with the
//! collaborator duties the core leaves to its caller: ritual lookup,
//! session storage, participant checks, payload validation, and an event
//! journal.
//!
//! # Architecture
//!
//! The [`SessionCoordinator`] composes:
//!
//! - [`RitualRegistry`]: validated rituals, resolvable by slug or id
//! - [`catalog`]: TOML ritual definitions, including the built-in ones
//! - [`SessionJournal`]: ordered events per session
//! - [`EngineConfig`]: policy knobs (notes cap, recording rules)
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use ritual_engine::{EngineConfig, SessionCoordinator};
//! use ritual_types::*;
//!
//! let mut coordinator = SessionCoordinator::bootstrap(EngineConfig::default()).unwrap();
//! let me = WitnessId::new("witness-1");
//!
//! let session_id = coordinator
//!     .start_session("bloody-mary", vec![me.clone()], me.clone(), Utc::now())
//!     .unwrap();
//! coordinator.begin_step(&session_id, &me, Utc::now()).unwrap();
//! coordinator.complete_step(&session_id, &me, Utc::now()).unwrap();
//!
//! let view = coordinator.runner_view(&session_id, &me).unwrap();
//! assert_eq!(view.current_order, 1);
//! assert_eq!(view.current_step.kind, RitualStepKind::Invocation);
//! ```

#![deny(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod ritual_registry;
pub mod session_journal;

pub use config::EngineConfig;
pub use coordinator::{RunnerView, SessionCoordinator, SessionSummary, StepView};
pub use ritual_registry::RitualRegistry;
pub use session_journal::SessionJournal;
