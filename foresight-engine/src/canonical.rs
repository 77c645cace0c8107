//! Canonical form of an event set: one identity rule and one total order.
//!
//! Dated events sort by `(game date, same-day priority, sort title)`. Dice
//! rolls follow every dated event, ordered by when they were rolled and then
//! by the history size they were drawn against.
//! Telemetry always comes last, ordered by timestamp, target id and tag.
//! The identity key breaks any remaining tie, so the order is total and the
//! output does not depend on input order.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::event::{Actor, Event, EventKind, GameDate, Timestamp};

/// Business identity of an event; two events with equal keys are the same fact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdentityKey {
    /// `lower(id ?? date + title)`, shared by visible and hidden news.
    News(String),
    Patch {
        target_id: String,
        date: GameDate,
    },
    Telemetry {
        kind: EventKind,
        target_id: String,
        at: Timestamp,
    },
    ScenarioHead(GameDate),
    GameOver(GameDate),
    Turn {
        kind: EventKind,
        actor: Actor,
        from: GameDate,
        until: GameDate,
    },
    Dice {
        at: Timestamp,
        label: Option<String>,
        event_count: usize,
    },
}

/// Identity key used for last-write-wins deduplication.
#[must_use]
pub fn identity_key(event: &Event) -> IdentityKey {
    match event {
        Event::NewsPublished(item) | Event::HiddenNewsPublished(item) => {
            let raw = match &item.id {
                Some(id) => id.clone(),
                None => format!("{}{}", item.date, item.title),
            };
            IdentityKey::News(raw.to_lowercase())
        }
        Event::NewsPatched(patched) => IdentityKey::Patch {
            target_id: patched.target_id.clone(),
            date: patched.date.clone(),
        },
        Event::NewsOpened(telemetry) | Event::NewsClosed(telemetry) => IdentityKey::Telemetry {
            kind: event.kind(),
            target_id: telemetry.target_id.clone(),
            at: telemetry.at.clone(),
        },
        Event::ScenarioHeadCompleted(head) => IdentityKey::ScenarioHead(head.date.clone()),
        Event::GameOver(over) => IdentityKey::GameOver(over.date.clone()),
        Event::TurnStarted(bracket) | Event::TurnFinished(bracket) => IdentityKey::Turn {
            kind: event.kind(),
            actor: bracket.actor,
            from: bracket.from.clone(),
            until: bracket.until.clone(),
        },
        Event::DiceRolled(dice) => IdentityKey::Dice {
            at: dice.at.clone(),
            label: dice.label.clone(),
            event_count: dice.event_count,
        },
    }
}

// Variant order is the group order: dated, then dice, then telemetry.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum OrderKey {
    Dated {
        date: GameDate,
        priority: u8,
        title: String,
    },
    Dice {
        at: Timestamp,
        event_count: usize,
        label: Option<String>,
    },
    Telemetry {
        at: Timestamp,
        target_id: String,
        tag: &'static str,
    },
}

fn sort_title(event: &Event) -> String {
    match event {
        Event::NewsPublished(item) | Event::HiddenNewsPublished(item) => {
            item.title.as_str().to_string()
        }
        Event::NewsPatched(patched) => format!("{}:{}", patched.target_id, patched.date),
        Event::ScenarioHeadCompleted(head) => head.date.to_string(),
        Event::GameOver(over) => format!("{}:{}", over.date, over.summary),
        Event::TurnStarted(bracket) | Event::TurnFinished(bracket) => {
            format!("{}:{}:{}", bracket.actor, bracket.from, bracket.until)
        }
        Event::NewsOpened(telemetry) | Event::NewsClosed(telemetry) => {
            telemetry.target_id.clone()
        }
        Event::DiceRolled(dice) => dice.label.clone().unwrap_or_default(),
    }
}

fn dated(event: &Event, date: &GameDate, priority: u8) -> OrderKey {
    OrderKey::Dated {
        date: date.clone(),
        priority,
        title: sort_title(event),
    }
}

// The literal is the same-day priority of each dated kind.
fn order_key(event: &Event) -> OrderKey {
    match event {
        Event::TurnStarted(bracket) => dated(event, &bracket.from, 0),
        Event::NewsPublished(item) => dated(event, &item.date, 1),
        Event::HiddenNewsPublished(item) => dated(event, &item.date, 2),
        Event::NewsPatched(patched) => dated(event, &patched.date, 3),
        Event::ScenarioHeadCompleted(head) => dated(event, &head.date, 4),
        Event::TurnFinished(bracket) => dated(event, &bracket.until, 5),
        Event::GameOver(over) => dated(event, &over.date, 6),
        Event::DiceRolled(dice) => OrderKey::Dice {
            at: dice.at.clone(),
            event_count: dice.event_count,
            label: dice.label.clone(),
        },
        Event::NewsOpened(telemetry) | Event::NewsClosed(telemetry) => OrderKey::Telemetry {
            at: telemetry.at.clone(),
            target_id: telemetry.target_id.clone(),
            tag: event.kind().as_str(),
        },
    }
}

/// Collapse events sharing an identity key, last write wins.
///
/// The surviving event keeps the slot of the first occurrence, so the
/// relative order of distinct facts is preserved.
#[must_use]
pub fn dedup_latest(events: &[Event]) -> Vec<Event> {
    let mut slots: HashMap<IdentityKey, usize> = HashMap::with_capacity(events.len());
    let mut kept: Vec<Event> = Vec::with_capacity(events.len());
    for event in events {
        match slots.entry(identity_key(event)) {
            Entry::Occupied(slot) => kept[*slot.get()] = event.clone(),
            Entry::Vacant(slot) => {
                slot.insert(kept.len());
                kept.push(event.clone());
            }
        }
    }
    kept
}

/// Deduplicate and sort into canonical order. Does not touch the input.
#[must_use]
pub fn canonicalize(events: &[Event]) -> Vec<Event> {
    let mut keyed: Vec<((OrderKey, IdentityKey), Event)> = dedup_latest(events)
        .into_iter()
        .map(|event| ((order_key(&event), identity_key(&event)), event))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, event)| event).collect()
}
