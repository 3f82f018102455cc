//! Post-session survey

use crate::{RitualError, RitualResult, SessionId, SurveyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Presence rating on the 0–5 scale
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PresenceRating(u8);

impl PresenceRating {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> RitualResult<Self> {
        if value > Self::MAX {
            return Err(RitualError::InvalidPresenceRating(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for PresenceRating {
    type Error = RitualError;

    fn try_from(value: u8) -> RitualResult<Self> {
        Self::new(value)
    }
}

impl From<PresenceRating> for u8 {
    fn from(rating: PresenceRating) -> u8 {
        rating.0
    }
}

impl std::fmt::Display for PresenceRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

/// A single survey response attached to a completed session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub id: SurveyId,
    pub session_id: SessionId,
    pub presence_rating: PresenceRating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SurveyResponse {
    pub fn new(
        id: SurveyId,
        session_id: SessionId,
        presence_rating: PresenceRating,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            session_id,
            presence_rating,
            notes: None,
            created_at,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
