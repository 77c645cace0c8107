//! Harness configuration.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Settings shared by the recorder, the player and the game-master driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarnessConfig {
    #[serde(default = "HarnessConfig::default_model")]
    pub model: String,
    #[serde(default = "HarnessConfig::default_tape_dir")]
    pub tape_dir: PathBuf,
    /// Label stored in each recorded tape's metadata.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    /// Sleep the recorded inter-chunk delays during replay.
    #[serde(default = "HarnessConfig::default_replay_delays")]
    pub replay_delays: bool,
    /// Name attached to schema errors raised on forecaster output.
    #[serde(default = "HarnessConfig::default_source_name")]
    pub source_name: String,
}

impl HarnessConfig {
    fn default_model() -> String {
        String::from("forecaster-default")
    }

    fn default_tape_dir() -> PathBuf {
        PathBuf::from("target/tapes")
    }

    const fn default_replay_delays() -> bool {
        true
    }

    fn default_source_name() -> String {
        String::from("forecaster")
    }

    /// Load from a JSON file; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] when the file cannot be read, is not
    /// valid JSON, or fails [`HarnessConfig::validate`].
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| HarnessError::Config(format!("{}: {err}", path.display())))?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|err| HarnessError::Config(format!("{}: {err}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] when the model or source name is blank.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.model.trim().is_empty() {
            return Err(HarnessError::Config("model must not be blank".into()));
        }
        if self.source_name.trim().is_empty() {
            return Err(HarnessError::Config("sourceName must not be blank".into()));
        }
        Ok(())
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            tape_dir: Self::default_tape_dir(),
            label: None,
            comment: None,
            replay_delays: Self::default_replay_delays(),
            source_name: Self::default_source_name(),
        }
    }
}
