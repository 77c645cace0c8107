//! Projection of the event log into the forecaster prompt.
//!
//! The log is folded in the order given, which is the order the host
//! appended it. Two passes:
//! 1. **Index**: collect news ids and hidden flags, find the open turn and
//!    which news items were opened for the first time after it started.
//! 2. **Render**: one JSON line per non-telemetry event.
//!
//! Raw open/close telemetry never reaches the prompt. It is compressed into
//! the `# PLAYER ATTENTION` section, which only exists while a turn is open.

use std::collections::HashSet;

use serde::Serialize;

use crate::aggregate::{current_turn, latest_date};
use crate::constants::{SECTION_CURRENT_STATE, SECTION_PLAYER_ATTENTION, SECTION_TIMELINE};
use crate::event::{Event, GameDate, Icon, Percentile, Text, Timestamp, TurnBracket};

/// What the player has and has not read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAttention {
    /// Ids opened for the first time ever during the open turn.
    pub viewed_first_time: Vec<String>,
    /// Visible news ids never opened.
    pub not_viewed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentState {
    pub latest_date: Option<GameDate>,
    pub current_turn: Option<TurnBracket>,
}

/// Structured projection; [`Projection::render`] produces the prompt text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub timeline: Vec<String>,
    pub attention: Option<PlayerAttention>,
    pub current_state: CurrentState,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewsLine<'a> {
    #[serde(rename = "type")]
    tag: &'static str,
    id: &'a str,
    date: &'a GameDate,
    icon: Icon,
    title: &'a Text,
    description: &'a Text,
    is_hidden: bool,
}

// Dice lose their `type` tag so the forecaster reads them as ambient color.
#[derive(Serialize)]
struct DiceLine<'a> {
    roll: Percentile,
    label: Option<&'a str>,
    at: &'a Timestamp,
}

struct AttentionIndex {
    news_ids: Vec<(String, bool)>,
    open_turn: Option<TurnBracket>,
    viewed_this_turn: Vec<String>,
    ever_viewed: HashSet<String>,
}

fn index(history: &[Event]) -> AttentionIndex {
    let open_turn = current_turn(history);
    let turn_start = open_turn.and_then(|open| {
        history
            .iter()
            .rposition(|event| matches!(event, Event::TurnStarted(bracket) if bracket == open))
    });
    let mut news_ids = Vec::new();
    let mut viewed_this_turn = Vec::new();
    let mut ever_viewed = HashSet::new();

    for (position, event) in history.iter().enumerate() {
        match event {
            Event::NewsPublished(item) => {
                news_ids.push((item.resolved_id(false).into_owned(), false));
            }
            Event::HiddenNewsPublished(item) => {
                news_ids.push((item.resolved_id(true).into_owned(), true));
            }
            Event::NewsOpened(telemetry) => {
                let first_view = ever_viewed.insert(telemetry.target_id.clone());
                if first_view && turn_start.is_some_and(|start| position > start) {
                    viewed_this_turn.push(telemetry.target_id.clone());
                }
            }
            _ => {}
        }
    }

    AttentionIndex {
        news_ids,
        open_turn: open_turn.cloned(),
        viewed_this_turn,
        ever_viewed,
    }
}

fn to_json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("timeline entries serialize to JSON")
}

fn render_line(event: &Event) -> Option<String> {
    match event {
        Event::NewsPublished(item) | Event::HiddenNewsPublished(item) => {
            let is_hidden = matches!(event, Event::HiddenNewsPublished(_));
            let id = item.resolved_id(is_hidden);
            Some(to_json_line(&NewsLine {
                tag: event.kind().as_str(),
                id: &id,
                date: &item.date,
                icon: item.icon,
                title: &item.title,
                description: &item.description,
                is_hidden,
            }))
        }
        Event::DiceRolled(dice) => Some(to_json_line(&DiceLine {
            roll: dice.roll,
            label: dice.label.as_deref(),
            at: &dice.at,
        })),
        Event::NewsOpened(_) | Event::NewsClosed(_) => None,
        Event::NewsPatched(_)
        | Event::ScenarioHeadCompleted(_)
        | Event::GameOver(_)
        | Event::TurnStarted(_)
        | Event::TurnFinished(_) => Some(to_json_line(event)),
    }
}

/// Fold the log into its structured projection.
#[must_use]
pub fn projection(history: &[Event]) -> Projection {
    let index = index(history);
    let timeline = history.iter().filter_map(render_line).collect();

    let attention = index.open_turn.as_ref().map(|_| {
        let mut seen = HashSet::new();
        let not_viewed = index
            .news_ids
            .iter()
            .filter(|(id, hidden)| !hidden && !index.ever_viewed.contains(id))
            .filter(|(id, _)| seen.insert(id.clone()))
            .map(|(id, _)| id.clone())
            .collect();
        PlayerAttention {
            viewed_first_time: index.viewed_this_turn.clone(),
            not_viewed,
        }
    });

    Projection {
        timeline,
        attention,
        current_state: CurrentState {
            latest_date: latest_date(history),
            current_turn: index.open_turn,
        },
    }
}

impl Projection {
    /// Render the prompt sections in order: timeline, attention, state.
    #[must_use]
    pub fn render(&self) -> String {
        let mut sections = vec![format!("{SECTION_TIMELINE}\n{}", self.timeline.join("\n"))];
        if let Some(attention) = &self.attention {
            sections.push(format!(
                "{SECTION_PLAYER_ATTENTION}\n{}",
                to_json_line(attention)
            ));
        }
        let state = serde_json::to_string_pretty(&self.current_state)
            .expect("current state serializes to JSON");
        sections.push(format!("{SECTION_CURRENT_STATE}\n{state}"));
        sections.join("\n\n")
    }
}

/// Render the forecaster prompt for a log.
#[must_use]
pub fn project(history: &[Event]) -> String {
    projection(history).render()
}
