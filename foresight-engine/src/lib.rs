//! Foresight Engine
//!
//! Event-sourcing and prompt-construction core for the Foresight forecasting
//! game. A player and a game-master forecaster take turns appending facts to
//! one shared log; this crate validates those facts, puts them in canonical
//! order, derives state from them and renders them into the forecaster
//! prompt. It performs no I/O and no logging; persistence and transport are
//! host concerns.

pub mod aggregate;
pub mod canonical;
pub mod command;
pub mod constants;
pub mod dice;
pub mod error;
pub mod event;
pub mod log_io;
pub mod projector;
pub mod session;

// Re-export commonly used types
pub use aggregate::{
    AggregatedState, ScenarioEvent, aggregate, apply_patches, assert_chronology, current_turn,
    is_game_over, latest_date, merge, player_timeline,
};
pub use canonical::{IdentityKey, canonicalize, dedup_latest, identity_key};
pub use command::{
    Clock, Command, DiceRequest, FixedClock, SystemClock, normalize_commands, parse_commands,
};
pub use dice::roll;
pub use error::EngineError;
pub use event::{
    Actor, DiceRoll, Event, EventKind, FieldError, GameDate, GameOverFact, Icon, NewsItem,
    NewsPatch, NewsPatched, NewsTelemetry, Percentile, ScenarioHead, Text, Timestamp, TurnBracket,
    derive_news_id, slugify, validate_events,
};
pub use log_io::{export_jsonl, export_log, parse_log};
pub use projector::{CurrentState, PlayerAttention, Projection, project, projection};
pub use session::GameSession;
