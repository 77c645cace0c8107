//! Import/export of the event log.
//!
//! The log travels as a JSON array or as JSON-Lines. Import validates every
//! entry and rejects the batch as a whole on the first failure.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::EngineError;
use crate::event::Event;

/// Parse a JSON array or JSON-Lines document into validated events.
///
/// # Errors
///
/// Returns [`EngineError::Transport`] when the text is not JSON/JSONL and
/// [`EngineError::SchemaViolation`] when any entry is not a valid event.
pub fn parse_log(source_name: &str, text: &str) -> Result<Vec<Event>, EngineError> {
    parse_entries(source_name, text)
}

/// Export events as a pretty-printed JSON array.
#[must_use]
pub fn export_log(events: &[Event]) -> String {
    serde_json::to_string_pretty(events).expect("events serialize to JSON")
}

/// Export events as JSON-Lines, one event per line.
#[must_use]
pub fn export_jsonl(events: &[Event]) -> String {
    let mut out = String::new();
    for event in events {
        out.push_str(&serde_json::to_string(event).expect("events serialize to JSON"));
        out.push('\n');
    }
    out
}

/// Split a document into raw JSON values, then decode each as `T`.
pub(crate) fn parse_entries<T: DeserializeOwned>(
    source_name: &str,
    text: &str,
) -> Result<Vec<T>, EngineError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let values = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<Value>>(trimmed)
            .map_err(|err| EngineError::transport(source_name, err.to_string()))?
    } else {
        let mut values = Vec::new();
        for (line_no, line) in trimmed.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value = serde_json::from_str::<Value>(line).map_err(|err| {
                EngineError::transport(source_name, format!("line {}: {err}", line_no + 1))
            })?;
            values.push(value);
        }
        values
    };

    decode_entries(source_name, values)
}

pub(crate) fn decode_entries<T: DeserializeOwned>(
    source_name: &str,
    values: Vec<Value>,
) -> Result<Vec<T>, EngineError> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value::<T>(value)
                .map_err(|err| EngineError::schema(source_name, format!("entry {index}: {err}")))
        })
        .collect()
}
