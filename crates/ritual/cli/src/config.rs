//! CLI configuration

use crate::error::{CliError, CliResult};
use ritual_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI configuration
///
/// ```toml
/// rituals_dir = "/home/me/rituals"
/// default_alias = "nightowl"
///
/// [engine]
/// notes_max_chars = 2000
/// require_silence_recording = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Extra ritual definitions (`*.toml`) registered next to the built-ins
    pub rituals_dir: Option<PathBuf>,

    /// Alias used by `walk` when `--alias` is not given
    pub default_alias: Option<String>,

    pub engine: EngineConfig,
}

impl CliConfig {
    /// Load configuration from file
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: CliConfig = toml::from_str(&contents)?;
            tracing::debug!(path = %config_path.display(), "Configuration loaded");
            Ok(config)
        } else {
            Ok(CliConfig::default())
        }
    }

    /// `<config_dir>/ritual/config.toml`
    pub fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::Config("Cannot find config directory".into()))?;
        Ok(config_dir.join("ritual").join("config.toml"))
    }
}
