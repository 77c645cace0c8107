//! Derived state over a canonical event sequence.
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::canonical::canonicalize;
use crate::error::EngineError;
use crate::event::{Event, GameDate, Icon, Text, TurnBracket};

/// Summary derived from a log; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedState {
    pub events: Vec<Event>,
    pub latest_date: Option<GameDate>,
    pub event_count: usize,
}

/// A news item with every patch applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioEvent {
    pub id: String,
    pub date: GameDate,
    pub icon: Icon,
    pub title: Text,
    pub description: Text,
    pub is_hidden: bool,
}

/// Canonicalize, then derive the latest game date and event count.
#[must_use]
pub fn aggregate(events: &[Event]) -> AggregatedState {
    let events = canonicalize(events);
    let latest_date = latest_date(&events);
    let event_count = events.len();
    AggregatedState {
        events,
        latest_date,
        event_count,
    }
}

/// Maximum game date across dated events and turn brackets.
#[must_use]
pub fn latest_date(events: &[Event]) -> Option<GameDate> {
    events.iter().filter_map(Event::game_date).max().cloned()
}

/// Fold `news-patched` events onto their targets.
///
/// Patches are applied in canonical order, field by field. A patch whose
/// target id is unknown is dropped. Patches are consumed; only news items
/// come back, sorted by their resolved date.
#[must_use]
pub fn apply_patches(events: &[Event]) -> Vec<ScenarioEvent> {
    let canonical = canonicalize(events);
    let mut resolved: Vec<ScenarioEvent> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for event in &canonical {
        if let Some((item, hidden)) = event.as_news() {
            let id = item.resolved_id(hidden).into_owned();
            let scenario = ScenarioEvent {
                id: id.clone(),
                date: item.date.clone(),
                icon: item.icon,
                title: item.title.clone(),
                description: item.description.clone(),
                is_hidden: hidden,
            };
            match by_id.get(&id) {
                Some(&slot) => resolved[slot] = scenario,
                None => {
                    by_id.insert(id, resolved.len());
                    resolved.push(scenario);
                }
            }
        }
    }

    for event in &canonical {
        let Event::NewsPatched(patched) = event else {
            continue;
        };
        let Some(&slot) = by_id.get(&patched.target_id) else {
            continue;
        };
        let target = &mut resolved[slot];
        let patch = &patched.patch;
        if let Some(date) = &patch.date {
            target.date = date.clone();
        }
        if let Some(icon) = patch.icon {
            target.icon = icon;
        }
        if let Some(title) = &patch.title {
            target.title = title.clone();
        }
        if let Some(description) = &patch.description {
            target.description = description.clone();
        }
    }

    resolved.sort_by(|a, b| a.date.cmp(&b.date));
    resolved
}

/// Reject a batch containing any event dated before the history's latest date.
///
/// # Errors
///
/// Returns [`EngineError::Chronology`] for the first offending addition.
pub fn assert_chronology(history: &[Event], additions: &[Event]) -> Result<(), EngineError> {
    let Some(latest) = latest_date(history) else {
        return Ok(());
    };
    for addition in additions {
        if let Some(date) = addition.game_date()
            && *date < latest
        {
            return Err(EngineError::Chronology {
                kind: addition.kind().as_str(),
                date: date.clone(),
                latest,
            });
        }
    }
    Ok(())
}

/// Gate `additions` on chronology, then canonicalize them into `history`.
///
/// # Errors
///
/// Returns [`EngineError::Chronology`] when an addition is dated in the past.
pub fn merge(history: &[Event], additions: &[Event]) -> Result<Vec<Event>, EngineError> {
    assert_chronology(history, additions)?;
    let mut combined = Vec::with_capacity(history.len() + additions.len());
    combined.extend_from_slice(history);
    combined.extend_from_slice(additions);
    Ok(canonicalize(&combined))
}

/// The turn bracket left open at the end of the log, if any.
///
/// A bracket is open when it was started and no `turn-finished` carries the
/// same bracket. The answer does not depend on the order of the log, so a
/// canonical log (where a turn starting on day D sorts before the previous
/// turn finishing on D) reports the same open turn as the append order.
#[must_use]
pub fn current_turn(events: &[Event]) -> Option<&TurnBracket> {
    let finished: HashSet<&TurnBracket> = events
        .iter()
        .filter_map(|event| match event {
            Event::TurnFinished(bracket) => Some(bracket),
            _ => None,
        })
        .collect();
    events.iter().rev().find_map(|event| match event {
        Event::TurnStarted(bracket) if !finished.contains(bracket) => Some(bracket),
        _ => None,
    })
}

#[must_use]
pub fn is_game_over(events: &[Event]) -> bool {
    events.iter().any(|event| matches!(event, Event::GameOver(_)))
}

/// News as the player sees it: patched, with hidden items withheld until the
/// game is over.
#[must_use]
pub fn player_timeline(events: &[Event]) -> Vec<ScenarioEvent> {
    let reveal = is_game_over(events);
    apply_patches(events)
        .into_iter()
        .filter(|item| reveal || !item.is_hidden)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Actor, GameOverFact, NewsItem, NewsPatch, NewsPatched};

    fn date(value: &str) -> GameDate {
        GameDate::parse(value).unwrap()
    }

    fn news(day: &str, title: &str, hidden: bool) -> Event {
        let item = NewsItem {
            id: None,
            date: date(day),
            icon: Icon::Newspaper,
            title: Text::new(title).unwrap(),
            description: Text::new("details").unwrap(),
        };
        if hidden {
            Event::HiddenNewsPublished(item)
        } else {
            Event::NewsPublished(item)
        }
    }

    fn patch(target: &str, day: &str, title: &str) -> Event {
        Event::NewsPatched(NewsPatched {
            target_id: target.to_string(),
            date: date(day),
            patch: NewsPatch {
                date: None,
                icon: Some(Icon::Flame),
                title: Some(Text::new(title).unwrap()),
                description: None,
            },
        })
    }

    #[test]
    fn aggregate_counts_and_finds_latest_date() {
        let events = vec![
            news("2025-01-03", "Later", false),
            news("2025-01-01", "Earlier", false),
            Event::TurnFinished(TurnBracket {
                actor: Actor::Player,
                from: date("2025-01-01"),
                until: date("2025-02-01"),
            }),
        ];
        let state = aggregate(&events);
        assert_eq!(state.event_count, state.events.len());
        assert_eq!(state.event_count, 3);
        assert_eq!(state.latest_date, Some(date("2025-02-01")));
        assert_eq!(aggregate(&state.events), state);
    }

    #[test]
    fn empty_log_has_no_latest_date() {
        let state = aggregate(&[]);
        assert_eq!(state.latest_date, None);
        assert_eq!(state.event_count, 0);
    }

    #[test]
    fn patches_override_fields_and_are_consumed() {
        let events = vec![
            news("2025-01-01", "Quake", false),
            patch("news-2025-01-01-quake", "2025-01-02", "Major Quake"),
        ];
        let resolved = apply_patches(&events);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].title.as_str(), "Major Quake");
        assert_eq!(resolved[0].icon, Icon::Flame);
        assert_eq!(resolved[0].description.as_str(), "details");
        assert_eq!(resolved[0].date, date("2025-01-01"));
    }

    #[test]
    fn later_patch_wins_and_dangling_patch_is_dropped() {
        let events = vec![
            news("2025-01-01", "Quake", false),
            patch("news-2025-01-01-quake", "2025-01-03", "Third"),
            patch("news-2025-01-01-quake", "2025-01-02", "Second"),
            patch("news-1999-01-01-ghost", "2025-01-02", "Nobody"),
        ];
        let resolved = apply_patches(&events);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].title.as_str(), "Third");
    }

    #[test]
    fn chronology_rejects_past_dated_additions() {
        let history = vec![news("2025-01-05", "Old", false)];
        let past = vec![news("2025-01-02", "Past", false)];
        let same_day = vec![news("2025-01-05", "Same", false)];

        let err = assert_chronology(&history, &past).unwrap_err();
        assert_eq!(
            err,
            EngineError::Chronology {
                kind: "news-published",
                date: date("2025-01-02"),
                latest: date("2025-01-05"),
            }
        );
        assert!(assert_chronology(&history, &same_day).is_ok());
        assert!(merge(&history, &past).is_err());
        assert_eq!(merge(&history, &same_day).unwrap().len(), 2);
    }

    #[test]
    fn open_turn_tracks_last_bracket() {
        let bracket = TurnBracket {
            actor: Actor::GameMaster,
            from: date("2025-01-01"),
            until: date("2025-03-01"),
        };
        let mut events = vec![Event::TurnStarted(bracket.clone())];
        assert_eq!(current_turn(&events), Some(&bracket));
        events.push(Event::TurnFinished(bracket));
        assert_eq!(current_turn(&events), None);
    }

    #[test]
    fn open_turn_survives_canonical_order() {
        let first = TurnBracket {
            actor: Actor::Player,
            from: date("2025-01-01"),
            until: date("2025-06-01"),
        };
        let second = TurnBracket {
            actor: Actor::GameMaster,
            from: date("2025-06-01"),
            until: date("2025-09-01"),
        };
        let appended = vec![
            Event::TurnStarted(first.clone()),
            Event::TurnFinished(first),
            Event::TurnStarted(second.clone()),
        ];
        let canonical = canonicalize(&appended);
        assert!(matches!(canonical.last(), Some(Event::TurnFinished(_))));
        assert_eq!(current_turn(&appended), Some(&second));
        assert_eq!(current_turn(&canonical), Some(&second));
    }

    #[test]
    fn hidden_news_revealed_only_after_game_over() {
        let mut events = vec![
            news("2025-01-01", "Public", false),
            news("2025-01-02", "Secret", true),
        ];
        let visible = player_timeline(&events);
        assert_eq!(visible.len(), 1);
        assert!(!visible[0].is_hidden);

        events.push(Event::GameOver(GameOverFact {
            date: date("2025-02-01"),
            summary: "The end".into(),
        }));
        let revealed = player_timeline(&events);
        assert_eq!(revealed.len(), 2);
        assert_eq!(revealed[1].id, "hidden-news-2025-01-02-secret");
    }
}
