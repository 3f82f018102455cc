//! Rituals: immutable, validated step templates
//!
//! A Ritual is checked once, when it is constructed, and is read-only
//! afterwards. Sessions reference it by id and receive it by reference on
//! every transition.

use crate::{RitualError, RitualId, RitualResult, RitualStepId};
use serde::{Deserialize, Serialize};

/// Silence duration assigned to a silence step that declares none
pub const DEFAULT_SILENCE_DURATION_SECS: u32 = 30;

// ── Step Kind ────────────────────────────────────────────────────────

/// The kind of a ritual step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RitualStepKind {
    Preparation,
    Invocation,
    /// Optional, unconstrained in count and position
    Extra,
    /// The only kind that can carry a recording
    Silence,
    Closing,
}

impl RitualStepKind {
    /// Kinds every ritual must contain at least once
    pub const REQUIRED: [RitualStepKind; 4] = [
        RitualStepKind::Preparation,
        RitualStepKind::Invocation,
        RitualStepKind::Silence,
        RitualStepKind::Closing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preparation => "PREPARATION",
            Self::Invocation => "INVOCATION",
            Self::Extra => "EXTRA",
            Self::Silence => "SILENCE",
            Self::Closing => "CLOSING",
        }
    }

    pub fn is_silence(&self) -> bool {
        *self == Self::Silence
    }
}

impl std::fmt::Display for RitualStepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Ritual Step ──────────────────────────────────────────────────────

/// A single step of a ritual script
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RitualStep {
    pub id: RitualStepId,
    /// Zero-based position within the ritual
    pub order: u32,
    pub kind: RitualStepKind,
    /// Display label, e.g. "Light the candle"
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_text: Option<String>,
    /// Advisory duration; never enforced by a clock
    #[serde(
        rename = "durationSec",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_secs: Option<u32>,
}

impl RitualStep {
    pub fn new(
        id: impl Into<String>,
        order: u32,
        kind: RitualStepKind,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: RitualStepId::new(id),
            order,
            kind,
            name: name.into(),
            script_text: None,
            duration_secs: None,
        }
    }

    pub fn with_script_text(mut self, text: impl Into<String>) -> Self {
        self.script_text = Some(text.into());
        self
    }

    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }
}

// ── Ritual ───────────────────────────────────────────────────────────

/// Plain, unvalidated form of a ritual, as read from storage or a file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RitualDefinition {
    pub id: RitualId,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub steps: Vec<RitualStep>,
}

/// A validated ritual template
///
/// Invariants, established by [`Ritual::new`]:
/// - at least one step
/// - step orders are exactly `0..n-1` and `steps()[i].order == i`
/// - every kind in [`RitualStepKind::REQUIRED`] is present
/// - every silence step has a duration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RitualDefinition", into = "RitualDefinition")]
pub struct Ritual {
    id: RitualId,
    slug: String,
    title: String,
    steps: Vec<RitualStep>,
}

impl Ritual {
    /// Validate and construct a ritual
    ///
    /// Checks run in a fixed order and the first violation wins:
    /// slug, emptiness, step order, required kinds.
    pub fn new(
        id: RitualId,
        slug: impl Into<String>,
        title: impl Into<String>,
        steps: Vec<RitualStep>,
    ) -> RitualResult<Self> {
        let slug = slug.into();
        if !is_kebab_slug(&slug) {
            return Err(RitualError::InvalidSlug(slug));
        }

        if steps.is_empty() {
            return Err(RitualError::EmptyRitual);
        }

        let mut orders: Vec<u32> = steps.iter().map(|s| s.order).collect();
        orders.sort_unstable();
        let contiguous = orders
            .iter()
            .enumerate()
            .all(|(i, &order)| order as usize == i);
        if !contiguous {
            return Err(RitualError::InvalidStepOrder);
        }

        let missing: Vec<RitualStepKind> = RitualStepKind::REQUIRED
            .iter()
            .copied()
            .filter(|kind| !steps.iter().any(|s| s.kind == *kind))
            .collect();
        if !missing.is_empty() {
            return Err(RitualError::MissingRequiredSteps { missing });
        }

        let mut steps: Vec<RitualStep> = steps
            .into_iter()
            .map(|mut step| {
                // zero counts as absent
                if step.kind.is_silence() && step.duration_secs.unwrap_or(0) == 0 {
                    step.duration_secs = Some(DEFAULT_SILENCE_DURATION_SECS);
                }
                step
            })
            .collect();
        steps.sort_by_key(|s| s.order);

        Ok(Self {
            id,
            slug,
            title: title.into(),
            steps,
        })
    }

    /// Get the ritual ID
    pub fn id(&self) -> &RitualId {
        &self.id
    }

    /// Get the URL slug
    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Steps in order; `steps()[i].order == i`
    pub fn steps(&self) -> &[RitualStep] {
        &self.steps
    }

    /// Get the step at a given order
    pub fn step(&self, order: u32) -> Option<&RitualStep> {
        self.steps.get(order as usize)
    }

    /// Get step count
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Order of the final step
    pub fn last_order(&self) -> u32 {
        // non-empty by construction
        self.steps.len().saturating_sub(1) as u32
    }

    /// All silence steps
    pub fn silence_steps(&self) -> Vec<&RitualStep> {
        self.steps.iter().filter(|s| s.kind.is_silence()).collect()
    }

    /// Sum of the declared step durations
    pub fn declared_duration_secs(&self) -> u64 {
        self.steps
            .iter()
            .filter_map(|s| s.duration_secs)
            .map(u64::from)
            .sum()
    }
}

impl TryFrom<RitualDefinition> for Ritual {
    type Error = RitualError;

    fn try_from(def: RitualDefinition) -> RitualResult<Self> {
        Ritual::new(def.id, def.slug, def.title, def.steps)
    }
}

impl From<Ritual> for RitualDefinition {
    fn from(ritual: Ritual) -> Self {
        Self {
            id: ritual.id,
            slug: ritual.slug,
            title: ritual.title,
            steps: ritual.steps,
        }
    }
}

/// `^[a-z0-9-]+$`
fn is_kebab_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
