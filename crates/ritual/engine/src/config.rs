//! Engine configuration

use serde::{Deserialize, Serialize};

/// Default cap on survey note length, in characters
pub const DEFAULT_NOTES_MAX_CHARS: usize = 2000;

/// Default upper bound on recording channels (stereo)
pub const DEFAULT_MAX_RECORDING_CHANNELS: u8 = 2;

/// Coordinator policy knobs
///
/// Usually read from the `[engine]` table of the CLI config file. Every
/// field has a default, so an empty table is valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum survey note length, in characters
    pub notes_max_chars: usize,
    /// Refuse to complete a silence step without a recording
    pub require_silence_recording: bool,
    /// Highest accepted channel count for recordings
    pub max_recording_channels: u8,
    /// Register the built-in catalog on startup
    pub load_builtin_rituals: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            notes_max_chars: DEFAULT_NOTES_MAX_CHARS,
            require_silence_recording: false,
            max_recording_channels: DEFAULT_MAX_RECORDING_CHANNELS,
            load_builtin_rituals: true,
        }
    }
}

impl EngineConfig {
    /// Set the survey notes limit
    pub fn with_notes_max_chars(mut self, max: usize) -> Self {
        self.notes_max_chars = max;
        self
    }

    /// Require a recording on the silence step
    pub fn with_required_recording(mut self, required: bool) -> Self {
        self.require_silence_recording = required;
        self
    }

    /// Set the channel limit for recordings
    pub fn with_max_recording_channels(mut self, channels: u8) -> Self {
        self.max_recording_channels = channels;
        self
    }

    /// Skip the built-in catalog
    pub fn without_builtin_rituals(mut self) -> Self {
        self.load_builtin_rituals = false;
        self
    }
}
