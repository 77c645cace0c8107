//! Replay tapes and the sinks recorded tapes are written to.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::streamer::ForecastRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapeMeta {
    pub model: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// One chunk and the gap that preceded it, in nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapeChunk {
    pub delay_ns: i64,
    pub text: String,
}

impl TapeChunk {
    /// Replay delay: whole milliseconds, floored, never negative.
    #[must_use]
    pub fn delay(&self) -> Duration {
        let millis = self.delay_ns.max(0) / 1_000_000;
        Duration::from_millis(millis.unsigned_abs())
    }
}

/// A recorded request together with the chunks it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayTape {
    pub meta: TapeMeta,
    pub request: ForecastRequest,
    pub stream: Vec<TapeChunk>,
}

impl ReplayTape {
    /// Empty tape for `request`, stamped now.
    #[must_use]
    pub fn start(request: ForecastRequest, label: Option<String>, comment: Option<String>) -> Self {
        Self {
            meta: TapeMeta {
                model: request.model.clone(),
                recorded_at: Utc::now(),
                label,
                comment,
            },
            request,
            stream: Vec::new(),
        }
    }

    /// # Errors
    ///
    /// Returns [`HarnessError::Tape`] when the file is unreadable or is not a
    /// valid tape document.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let text = std::fs::read_to_string(path).map_err(|err| tape_error(path, &err))?;
        serde_json::from_str(&text).map_err(|err| tape_error(path, &err))
    }

    /// Write the tape as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Tape`] when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), HarnessError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| tape_error(path, &err))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| tape_error(path, &err))?;
        std::fs::write(path, json).map_err(|err| tape_error(path, &err))
    }

    /// The recorded chunks joined into the full response text.
    #[must_use]
    pub fn text(&self) -> String {
        self.stream.iter().map(|chunk| chunk.text.as_str()).collect()
    }
}

fn tape_error(path: &Path, err: &dyn std::fmt::Display) -> HarnessError {
    HarnessError::Tape {
        path: path.display().to_string(),
        detail: err.to_string(),
    }
}

/// Destination for finished recordings.
pub trait TapeSink: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the tape cannot be stored.
    fn write(&self, tape: &ReplayTape) -> Result<(), HarnessError>;
}

/// Writes each tape to one fixed path.
#[derive(Debug, Clone)]
pub struct FileTapeSink {
    path: PathBuf,
}

impl FileTapeSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sink for `<tape_dir>/<name>.json`.
    #[must_use]
    pub fn in_tape_dir(config: &HarnessConfig, name: &str) -> Self {
        Self::new(config.tape_dir.join(format!("{name}.json")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TapeSink for FileTapeSink {
    fn write(&self, tape: &ReplayTape) -> Result<(), HarnessError> {
        tape.save(&self.path)
    }
}

/// Keeps tapes in memory; clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryTapeSink {
    tapes: Arc<Mutex<Vec<ReplayTape>>>,
}

impl MemoryTapeSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tapes(&self) -> Vec<ReplayTape> {
        self.tapes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TapeSink for MemoryTapeSink {
    fn write(&self, tape: &ReplayTape) -> Result<(), HarnessError> {
        self.tapes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tape.clone());
        Ok(())
    }
}
