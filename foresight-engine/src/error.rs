//! Failure taxonomy shared by every engine operation.
use thiserror::Error;

use crate::event::{Actor, GameDate};

/// Errors raised when a batch of events or commands cannot enter the log.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A batch failed validation; nothing from it was accepted.
    #[error("schema violation in {source_name}: {detail}")]
    SchemaViolation { source_name: String, detail: String },
    /// The batch was not valid JSON / JSON-Lines at all.
    #[error("malformed payload in {source_name}: {detail}")]
    Transport { source_name: String, detail: String },
    /// An addition is dated before the latest date already in the history.
    #[error("chronology violation: {kind} dated {date} precedes latest date {latest}")]
    Chronology {
        kind: &'static str,
        date: GameDate,
        latest: GameDate,
    },
    #[error("a {actor} turn is already open")]
    TurnAlreadyOpen { actor: Actor },
    #[error("no turn is currently open")]
    NoOpenTurn,
    #[error("the game is over; no further forecasts are accepted")]
    GameFinished,
}

impl EngineError {
    pub(crate) fn schema(source_name: &str, detail: impl Into<String>) -> Self {
        Self::SchemaViolation {
            source_name: source_name.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn transport(source_name: &str, detail: impl Into<String>) -> Self {
        Self::Transport {
            source_name: source_name.to_string(),
            detail: detail.into(),
        }
    }
}
