//! Witnesses: participant identities

use crate::{RitualError, RitualResult, WitnessId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A participant in ritual sessions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Witness {
    pub id: WitnessId,
    /// Public handle, always trimmed and non-empty
    pub alias: String,
    /// Optional, trimmed; never an empty string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Witness {
    /// Create a witness. The alias is required after trimming; a blank
    /// full name is treated as absent.
    pub fn new(
        id: WitnessId,
        alias: &str,
        full_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> RitualResult<Self> {
        Ok(Self {
            id,
            alias: normalize_alias(alias)?,
            full_name: normalize_full_name(full_name),
            created_at: now,
        })
    }

    pub fn with_alias(self, alias: &str) -> RitualResult<Self> {
        Ok(Self {
            alias: normalize_alias(alias)?,
            ..self
        })
    }

    pub fn with_full_name(self, full_name: Option<&str>) -> Self {
        Self {
            full_name: normalize_full_name(full_name),
            ..self
        }
    }

    /// Full name when known, alias otherwise
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.alias)
    }
}

fn normalize_alias(alias: &str) -> RitualResult<String> {
    let alias = alias.trim();
    if alias.is_empty() {
        return Err(RitualError::AliasRequired);
    }
    Ok(alias.to_string())
}

fn normalize_full_name(full_name: Option<&str>) -> Option<String> {
    full_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}
