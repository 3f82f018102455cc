//! Recording metadata
//!
//! The core never owns audio payloads. A Recording describes a capture
//! taken during the silence step; the blob lives elsewhere.

use crate::{RecordingId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Codec reported by browser captures
pub const DEFAULT_CODEC: &str = "audio/webm;codecs=opus";

/// Sample rate reported by browser captures
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 48_000;

/// Kind of captured media
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingKind {
    #[default]
    Audio,
}

/// Metadata for an audio capture taken during a silence step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: RecordingId,
    pub session_id: SessionId,
    pub kind: RecordingKind,
    /// Order of the silence step that was recorded
    pub silence_step_order: u32,
    /// Measured duration, as reported by the caller
    #[serde(rename = "durationSec")]
    pub duration_secs: u32,
    pub sample_rate_hz: u32,
    pub channels: u8,
    pub codec: String,
    pub byte_size: u64,
    /// Result of external silence detection, when it ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_detected: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl Recording {
    /// Create audio metadata with browser-capture defaults
    /// (48 kHz mono opus, unknown size)
    pub fn audio(
        id: RecordingId,
        session_id: SessionId,
        silence_step_order: u32,
        duration_secs: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            session_id,
            kind: RecordingKind::Audio,
            silence_step_order,
            duration_secs,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            channels: 1,
            codec: DEFAULT_CODEC.to_string(),
            byte_size: 0,
            silence_detected: None,
            created_at,
        }
    }

    pub fn with_format(mut self, sample_rate_hz: u32, channels: u8, codec: impl Into<String>) -> Self {
        self.sample_rate_hz = sample_rate_hz;
        self.channels = channels;
        self.codec = codec.into();
        self
    }

    pub fn with_byte_size(mut self, byte_size: u64) -> Self {
        self.byte_size = byte_size;
        self
    }

    pub fn with_silence_detected(mut self, detected: bool) -> Self {
        self.silence_detected = Some(detected);
        self
    }
}
