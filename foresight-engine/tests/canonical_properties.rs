use foresight_engine::{
    Actor, DiceRoll, Event, GameDate, Icon, NewsItem, NewsPatch, NewsPatched, NewsTelemetry,
    Percentile, Text, Timestamp, TurnBracket, aggregate, assert_chronology, canonicalize,
    dedup_latest, latest_date,
};
use proptest::prelude::*;

const DATES: [&str; 4] = ["2025-01-01", "2025-01-02", "2025-02-30", "2026-07-04"];
const TITLES: [&str; 4] = ["Alpha", "alpha", "Beta", "Gamma Ray"];
const STAMPS: [&str; 3] = [
    "2025-01-15T10:00:00.000Z",
    "2025-01-15T10:00:01.000Z",
    "2025-01-15T12:00:00+02:00",
];

fn date(index: usize) -> GameDate {
    GameDate::parse(DATES[index]).unwrap()
}

fn stamp(index: usize) -> Timestamp {
    Timestamp::parse(STAMPS[index]).unwrap()
}

fn news_strategy() -> impl Strategy<Value = Event> {
    (0..DATES.len(), 0..TITLES.len(), any::<bool>(), any::<bool>()).prop_map(
        |(d, t, hidden, with_id)| {
            let item = NewsItem {
                id: with_id.then(|| format!("custom-{t}")),
                date: date(d),
                icon: Icon::ALL[t],
                title: Text::new(TITLES[t]).unwrap(),
                description: Text::new(format!("{} on {}", TITLES[t], DATES[d])).unwrap(),
            };
            if hidden {
                Event::HiddenNewsPublished(item)
            } else {
                Event::NewsPublished(item)
            }
        },
    )
}

fn structural_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![
        (0..DATES.len(), 0..DATES.len(), any::<bool>(), any::<bool>()).prop_map(
            |(a, b, player, started)| {
                let bracket = TurnBracket {
                    actor: if player { Actor::Player } else { Actor::GameMaster },
                    from: date(a.min(b)),
                    until: date(a.max(b)),
                };
                if started {
                    Event::TurnStarted(bracket)
                } else {
                    Event::TurnFinished(bracket)
                }
            }
        ),
        (0..TITLES.len(), 0..DATES.len()).prop_map(|(t, d)| {
            Event::NewsPatched(NewsPatched {
                target_id: format!("custom-{t}"),
                date: date(d),
                patch: NewsPatch {
                    date: None,
                    icon: None,
                    title: Some(Text::new("Patched").unwrap()),
                    description: None,
                },
            })
        }),
        (0..TITLES.len(), 0..STAMPS.len(), any::<bool>()).prop_map(|(t, s, open)| {
            let telemetry = NewsTelemetry {
                target_id: format!("custom-{t}"),
                at: stamp(s),
            };
            if open {
                Event::NewsOpened(telemetry)
            } else {
                Event::NewsClosed(telemetry)
            }
        }),
        (
            1u32..=100,
            0..STAMPS.len(),
            proptest::option::of("[a-c]"),
            0usize..3
        )
            .prop_map(|(roll, s, label, event_count)| {
                Event::DiceRolled(DiceRoll {
                    roll: Percentile::new(roll).unwrap(),
                    at: stamp(s),
                    label,
                    event_count,
                })
            }),
    ]
}

fn event_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![news_strategy(), structural_strategy()]
}

fn log_strategy() -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec(event_strategy(), 0..24)
}

proptest! {
    #[test]
    fn canonicalize_is_idempotent(events in log_strategy()) {
        let once = canonicalize(&events);
        prop_assert_eq!(canonicalize(&once), once);
    }

    #[test]
    fn canonicalize_ignores_input_order(
        (original, shuffled) in log_strategy()
            .prop_map(|events| dedup_latest(&events))
            .prop_flat_map(|events| (Just(events.clone()), Just(events).prop_shuffle()))
    ) {
        prop_assert_eq!(canonicalize(&shuffled), canonicalize(&original));
    }

    #[test]
    fn aggregate_is_stable_and_counts(events in log_strategy()) {
        let state = aggregate(&events);
        prop_assert_eq!(state.event_count, state.events.len());
        prop_assert_eq!(aggregate(&state.events), state.clone());
        prop_assert_eq!(state.latest_date, latest_date(&events));
    }

    #[test]
    fn chronology_fails_iff_an_addition_predates_history(
        history in log_strategy(),
        additions in log_strategy(),
    ) {
        let latest = latest_date(&history);
        let expected_failure = additions.iter().any(|event| {
            matches!((event.game_date(), latest.as_ref()), (Some(date), Some(latest)) if date < latest)
        });
        prop_assert_eq!(assert_chronology(&history, &additions).is_err(), expected_failure);
    }
}
