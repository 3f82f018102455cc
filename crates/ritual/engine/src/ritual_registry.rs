//! Ritual registry: stores and resolves validated rituals
//!
//! Rituals are immutable once registered. Each is reachable by id and by
//! slug; slugs are unique across the registry.

use ritual_types::{Ritual, RitualError, RitualId, RitualResult};
use std::collections::HashMap;

/// Registry of ritual templates
#[derive(Clone, Debug, Default)]
pub struct RitualRegistry {
    rituals: HashMap<RitualId, Ritual>,
    /// slug → id
    by_slug: HashMap<String, RitualId>,
}

impl RitualRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ritual
    ///
    /// The ritual is already validated by construction; the registry only
    /// enforces slug and id uniqueness. A taken slug is reported before a
    /// taken id.
    pub fn register(&mut self, ritual: Ritual) -> RitualResult<RitualId> {
        if self.by_slug.contains_key(ritual.slug()) {
            return Err(RitualError::DuplicateSlug(ritual.slug().to_string()));
        }
        if self.rituals.contains_key(ritual.id()) {
            return Err(RitualError::DuplicateRitualId(ritual.id().clone()));
        }

        let id = ritual.id().clone();
        self.by_slug.insert(ritual.slug().to_string(), id.clone());
        tracing::info!(
            ritual_id = %id,
            slug = %ritual.slug(),
            steps = ritual.step_count(),
            "Ritual registered"
        );
        self.rituals.insert(id.clone(), ritual);
        Ok(id)
    }

    /// Get a ritual by ID
    pub fn get(&self, id: &RitualId) -> RitualResult<&Ritual> {
        self.rituals
            .get(id)
            .ok_or_else(|| RitualError::RitualNotFound(id.to_string()))
    }

    /// Get a ritual by slug
    pub fn get_by_slug(&self, slug: &str) -> Option<&Ritual> {
        self.by_slug.get(slug).and_then(|id| self.rituals.get(id))
    }

    /// Look a ritual up by slug first, then by id
    pub fn resolve(&self, slug_or_id: &str) -> RitualResult<&Ritual> {
        self.get_by_slug(slug_or_id)
            .or_else(|| self.rituals.get(&RitualId::new(slug_or_id)))
            .ok_or_else(|| RitualError::RitualNotFound(slug_or_id.to_string()))
    }

    /// All rituals, sorted by slug
    pub fn list(&self) -> Vec<&Ritual> {
        let mut rituals: Vec<&Ritual> = self.rituals.values().collect();
        rituals.sort_by(|a, b| a.slug().cmp(b.slug()));
        rituals
    }

    /// Get ritual count
    pub fn count(&self) -> usize {
        self.rituals.len()
    }

    /// Check whether a slug is taken
    pub fn contains_slug(&self, slug: &str) -> bool {
        self.by_slug.contains_key(slug)
    }

    /// Remove a ritual, freeing its slug
    pub fn remove(&mut self, id: &RitualId) -> RitualResult<Ritual> {
        let ritual = self
            .rituals
            .remove(id)
            .ok_or_else(|| RitualError::RitualNotFound(id.to_string()))?;
        self.by_slug.remove(ritual.slug());

        tracing::info!(ritual_id = %id, "Ritual removed");
        Ok(ritual)
    }
}
