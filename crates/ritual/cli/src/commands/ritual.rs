//! Ritual catalog commands

use crate::error::CliResult;
use crate::output::{self, print_success, OutputFormat};
use ritual_engine::{catalog, SessionCoordinator};
use ritual_types::{Ritual, RitualStep};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

/// Table row for the ritual list
#[derive(Debug, Serialize, Tabled)]
struct RitualRow {
    slug: String,
    title: String,
    steps: usize,
    #[tabled(rename = "silence (s)")]
    silence_secs: String,
}

impl From<&Ritual> for RitualRow {
    fn from(ritual: &Ritual) -> Self {
        let silence = ritual
            .silence_steps()
            .iter()
            .filter_map(|s| s.duration_secs)
            .map(|secs| secs.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            slug: ritual.slug().to_string(),
            title: ritual.title().to_string(),
            steps: ritual.step_count(),
            silence_secs: silence,
        }
    }
}

/// Table row for a single step
#[derive(Debug, Serialize, Tabled)]
struct StepRow {
    order: u32,
    kind: String,
    name: String,
    #[tabled(rename = "duration (s)")]
    duration: String,
    script: String,
}

impl From<&RitualStep> for StepRow {
    fn from(step: &RitualStep) -> Self {
        Self {
            order: step.order,
            kind: step.kind.to_string(),
            name: step.name.clone(),
            duration: step.duration_secs.map(|d| d.to_string()).unwrap_or_default(),
            script: step.script_text.clone().unwrap_or_default(),
        }
    }
}

/// List registered rituals
pub fn list(coordinator: &SessionCoordinator, format: OutputFormat) -> CliResult<()> {
    let rows: Vec<RitualRow> = coordinator
        .list_rituals()
        .into_iter()
        .map(RitualRow::from)
        .collect();
    output::print_output(rows, format)
}

/// Show one ritual and its steps
pub fn show(coordinator: &SessionCoordinator, slug: &str, format: OutputFormat) -> CliResult<()> {
    let ritual = coordinator.ritual(slug)?;
    match format {
        OutputFormat::Table => {
            println!("{} ({})", ritual.title(), ritual.slug());
            let rows: Vec<StepRow> = ritual.steps().iter().map(StepRow::from).collect();
            output::print_output(rows, format)
        }
        _ => output::print_single(ritual, format),
    }
}

/// Parse and validate a ritual file without registering it
pub fn validate(path: &Path) -> CliResult<()> {
    let ritual = catalog::load_file(path)?;
    print_success(&format!(
        "{} is valid: {} ({} steps)",
        path.display(),
        ritual.slug(),
        ritual.step_count()
    ));
    Ok(())
}
