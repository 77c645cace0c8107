use std::fmt;

use foresight_engine::EngineError;
use thiserror::Error;

/// Request field compared between a live call and its recorded tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchField {
    Model,
    SystemPrompt,
    History,
}

impl fmt::Display for MismatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::SystemPrompt => write!(f, "systemPrompt"),
            Self::History => write!(f, "history"),
        }
    }
}

/// Errors raised by the streaming harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("replay mismatch on {field}: tape has {expected}, call has {actual}")]
    ReplayMismatch {
        field: MismatchField,
        expected: String,
        actual: String,
    },
    #[error("forecasting backend failed: {0}")]
    Backend(String),
    #[error("tape {path}: {detail}")]
    Tape { path: String, detail: String },
    #[error("invalid harness config: {0}")]
    Config(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
