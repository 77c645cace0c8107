//! Proposed facts and their normalization into events.
//!
//! A command mirrors an event variant but may omit the id; `roll-dice` asks
//! the engine to roll instead of carrying an outcome. Every command becomes
//! exactly one event.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::event::{
    DiceRoll, Event, GameOverFact, NewsItem, NewsPatched, NewsTelemetry, ScenarioHead, Timestamp,
    TurnBracket,
};
use crate::log_io::parse_entries;

/// Request for a deterministic dice roll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Command {
    NewsPublished(NewsItem),
    HiddenNewsPublished(NewsItem),
    NewsPatched(NewsPatched),
    NewsOpened(NewsTelemetry),
    NewsClosed(NewsTelemetry),
    ScenarioHeadCompleted(ScenarioHead),
    GameOver(GameOverFact),
    TurnStarted(TurnBracket),
    TurnFinished(TurnBracket),
    RollDice(DiceRequest),
}

/// Source of wall-clock time for dice rolls.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_datetime(Utc::now())
    }
}

/// Clock pinned to one instant, for reproducible runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0.clone()
    }
}

impl Command {
    /// Normalize into an event. `history_len` is the size of the log the event
    /// will join; dice rolls read it along with the clock.
    #[must_use]
    pub fn into_event<C: Clock + ?Sized>(self, history_len: usize, clock: &C) -> Event {
        match self {
            Self::NewsPublished(item) => Event::NewsPublished(item.with_resolved_id(false)),
            Self::HiddenNewsPublished(item) => {
                Event::HiddenNewsPublished(item.with_resolved_id(true))
            }
            Self::NewsPatched(patched) => Event::NewsPatched(patched),
            Self::NewsOpened(telemetry) => Event::NewsOpened(telemetry),
            Self::NewsClosed(telemetry) => Event::NewsClosed(telemetry),
            Self::ScenarioHeadCompleted(head) => Event::ScenarioHeadCompleted(head),
            Self::GameOver(over) => Event::GameOver(over),
            Self::TurnStarted(bracket) => Event::TurnStarted(bracket),
            Self::TurnFinished(bracket) => Event::TurnFinished(bracket),
            Self::RollDice(request) => {
                Event::DiceRolled(DiceRoll::rolled(history_len, clock.now(), request.label))
            }
        }
    }
}

/// Normalize a batch. Each command sees the history size including the
/// events normalized before it, so two rolls in one batch differ.
#[must_use]
pub fn normalize_commands<C: Clock + ?Sized>(
    commands: Vec<Command>,
    history_len: usize,
    clock: &C,
) -> Vec<Event> {
    commands
        .into_iter()
        .enumerate()
        .map(|(offset, command)| command.into_event(history_len + offset, clock))
        .collect()
}

/// Parse forecaster output into commands.
///
/// Accepts a JSON array or JSON-Lines, optionally wrapped in a Markdown code
/// fence.
///
/// # Errors
///
/// Returns [`EngineError::Transport`] for text that is not JSON and
/// [`EngineError::SchemaViolation`] when any command is invalid; no command
/// from a failing batch is returned.
pub fn parse_commands(source_name: &str, text: &str) -> Result<Vec<Command>, EngineError> {
    parse_entries(source_name, strip_code_fence(text))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, Icon};

    fn clock() -> FixedClock {
        FixedClock(Timestamp::parse("2025-01-15T10:00:00.000Z").unwrap())
    }

    #[test]
    fn news_commands_gain_derived_ids() {
        let commands = parse_commands(
            "forecast",
            r#"[{"type": "hidden-news-published", "date": "2025-03-01", "icon": "Bomb", "title": "Plot Uncovered", "description": "..."}]"#,
        )
        .unwrap();
        let events = normalize_commands(commands, 0, &clock());
        let Event::HiddenNewsPublished(item) = &events[0] else {
            panic!("expected hidden news, got {:?}", events[0]);
        };
        assert_eq!(item.id.as_deref(), Some("hidden-news-2025-03-01-plot-uncovered"));
        assert_eq!(item.icon, Icon::Bomb);
    }

    #[test]
    fn explicit_ids_are_kept() {
        let commands = parse_commands(
            "forecast",
            r#"{"type": "news-published", "id": "custom", "date": "2025-03-01", "icon": "Globe", "title": "T", "description": "d"}"#,
        )
        .unwrap();
        let events = normalize_commands(commands, 0, &clock());
        assert!(matches!(&events[0], Event::NewsPublished(item) if item.id.as_deref() == Some("custom")));
    }

    #[test]
    fn roll_dice_uses_history_size_and_clock() {
        let commands = vec![
            Command::RollDice(DiceRequest {
                label: Some("coup".into()),
            }),
            Command::RollDice(DiceRequest {
                label: Some("coup".into()),
            }),
        ];
        let events = normalize_commands(commands, 7, &clock());
        let rolls: Vec<_> = events
            .iter()
            .map(|event| match event {
                Event::DiceRolled(dice) => dice.clone(),
                other => panic!("expected dice, got {other:?}"),
            })
            .collect();
        assert_eq!(
            rolls[0].roll.value(),
            crate::dice::roll(7, "2025-01-15T10:00:00.000Z", Some("coup"))
        );
        assert_eq!(
            rolls[1].roll.value(),
            crate::dice::roll(8, "2025-01-15T10:00:00.000Z", Some("coup"))
        );
        assert_eq!(rolls[0].at.as_str(), "2025-01-15T10:00:00.000Z");
        assert_eq!((rolls[0].event_count, rolls[1].event_count), (7, 8));

        let merged = crate::aggregate::merge(&[], &events).unwrap();
        assert_eq!(merged, events);
    }

    #[test]
    fn fenced_jsonl_output_parses() {
        let text = "```json\n{\"type\":\"scenario-head-completed\",\"date\":\"2025-01-01\"}\n{\"type\":\"roll-dice\"}\n```\n";
        let commands = parse_commands("forecast", text).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[1], Command::RollDice(DiceRequest::default()));
        let kinds: Vec<_> = normalize_commands(commands, 0, &clock())
            .iter()
            .map(Event::kind)
            .collect();
        assert_eq!(kinds, [EventKind::ScenarioHeadCompleted, EventKind::DiceRolled]);
    }

    #[test]
    fn forecaster_cannot_forge_dice_outcomes() {
        let text = r#"[{"type": "dice-rolled", "roll": 100, "at": "2025-01-15T10:00:00Z"}]"#;
        assert!(matches!(
            parse_commands("forecast", text),
            Err(EngineError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn system_clock_emits_millisecond_utc() {
        let now = SystemClock.now();
        assert!(now.as_str().ends_with('Z'));
        assert_eq!(now.as_str().len(), "2025-01-15T10:00:00.000Z".len());
    }
}
