//! Facts that make up a game log.
//!
//! Every event is a closed record. Field-level constraints (date format, icon
//! membership, non-empty text, dice range, timestamp syntax) are enforced by
//! the field types during deserialization, so a value of [`Event`] is always
//! valid once it exists.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DICE_MAX, DICE_MIN, HIDDEN_NEWS_ID_PREFIX, NEWS_ID_PREFIX, SLUG_MAX_LEN};
use crate::error::EngineError;
use crate::log_io::decode_entries;

/// Field-level validation failures surfaced through serde.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("date `{0}` must have the form YYYY-MM-DD")]
    Date(String),
    #[error("timestamp `{0}` is not an RFC 3339 date-time")]
    Timestamp(String),
    #[error("text must not be empty")]
    EmptyText,
    #[error("roll {0} is outside 1..=100")]
    RollRange(u32),
    #[error("patch must change at least one field")]
    EmptyPatch,
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date pattern"))
}

/// In-game calendar date, `YYYY-MM-DD`.
///
/// Only the shape is checked; `2025-02-30` is a valid game date. The shape
/// makes lexicographic order equal to chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameDate(String);

impl GameDate {
    /// Validate and wrap a date string.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Date`] when the value is not four digits, a
    /// hyphen, two digits, a hyphen and two digits.
    pub fn parse(value: impl Into<String>) -> Result<Self, FieldError> {
        let value = value.into();
        if date_pattern().is_match(&value) {
            Ok(Self(value))
        } else {
            Err(FieldError::Date(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GameDate {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<GameDate> for String {
    fn from(value: GameDate) -> Self {
        value.0
    }
}

impl fmt::Display for GameDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wall-clock instant, kept verbatim as written so logs round-trip byte for byte.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp {
    raw: String,
    instant: DateTime<Utc>,
}

impl Timestamp {
    /// # Errors
    ///
    /// Returns [`FieldError::Timestamp`] when the value is not RFC 3339.
    pub fn parse(value: impl Into<String>) -> Result<Self, FieldError> {
        let raw = value.into();
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(parsed) => Ok(Self {
                instant: parsed.with_timezone(&Utc),
                raw,
            }),
            Err(_) => Err(FieldError::Timestamp(raw)),
        }
    }

    /// Format an instant the way browsers do: UTC, millisecond precision, `Z`.
    #[must_use]
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self {
            raw: instant.to_rfc3339_opts(SecondsFormat::Millis, true),
            instant,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Timestamp {}

impl Hash for Timestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant
            .cmp(&other.instant)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl TryFrom<String> for Timestamp {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.raw
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Non-empty display text (titles, descriptions).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Text(String);

impl Text {
    /// # Errors
    ///
    /// Returns [`FieldError::EmptyText`] for the empty string.
    pub fn new(value: impl Into<String>) -> Result<Self, FieldError> {
        let value = value.into();
        if value.is_empty() {
            Err(FieldError::EmptyText)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Text {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Text> for String {
    fn from(value: Text) -> Self {
        value.0
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Icon shown next to a news item. Names are matched exactly, case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Icon {
    AlertTriangle,
    Banknote,
    Bomb,
    Building,
    CloudLightning,
    Cpu,
    Factory,
    Flame,
    FlaskConical,
    Gavel,
    Globe,
    Handshake,
    HeartPulse,
    Landmark,
    Leaf,
    Megaphone,
    Newspaper,
    Plane,
    Rocket,
    Scale,
    Shield,
    Ship,
    Swords,
    TrendingDown,
    TrendingUp,
    Users,
    Vote,
    Zap,
}

impl Icon {
    pub const ALL: [Self; 28] = [
        Self::AlertTriangle,
        Self::Banknote,
        Self::Bomb,
        Self::Building,
        Self::CloudLightning,
        Self::Cpu,
        Self::Factory,
        Self::Flame,
        Self::FlaskConical,
        Self::Gavel,
        Self::Globe,
        Self::Handshake,
        Self::HeartPulse,
        Self::Landmark,
        Self::Leaf,
        Self::Megaphone,
        Self::Newspaper,
        Self::Plane,
        Self::Rocket,
        Self::Scale,
        Self::Shield,
        Self::Ship,
        Self::Swords,
        Self::TrendingDown,
        Self::TrendingUp,
        Self::Users,
        Self::Vote,
        Self::Zap,
    ];
}

/// Who owns a turn bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Player,
    GameMaster,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::GameMaster => write!(f, "game_master"),
        }
    }
}

/// Percentile outcome of a dice roll, always within `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u8")]
pub struct Percentile(u8);

impl Percentile {
    /// # Errors
    ///
    /// Returns [`FieldError::RollRange`] outside `1..=100`.
    pub fn new(value: u32) -> Result<Self, FieldError> {
        match u8::try_from(value) {
            Ok(roll) if (DICE_MIN..=DICE_MAX).contains(&roll) => Ok(Self(roll)),
            _ => Err(FieldError::RollRange(value)),
        }
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u32> for Percentile {
    type Error = FieldError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percentile> for u8 {
    fn from(value: Percentile) -> Self {
        value.0
    }
}

/// Body of `news-published` and `hidden-news-published`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewsItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub date: GameDate,
    pub icon: Icon,
    pub title: Text,
    pub description: Text,
}

impl NewsItem {
    /// The explicit id, or the id derived from date and title.
    #[must_use]
    pub fn resolved_id(&self, hidden: bool) -> Cow<'_, str> {
        match &self.id {
            Some(id) => Cow::Borrowed(id),
            None => Cow::Owned(derive_news_id(hidden, &self.date, self.title.as_str())),
        }
    }

    /// Fill in the derived id when none was supplied.
    #[must_use]
    pub fn with_resolved_id(mut self, hidden: bool) -> Self {
        if self.id.is_none() {
            self.id = Some(derive_news_id(hidden, &self.date, self.title.as_str()));
        }
        self
    }
}

/// Field overrides carried by `news-patched`. At least one field is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNewsPatch")]
pub struct NewsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<GameDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Text>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNewsPatch {
    #[serde(default)]
    date: Option<GameDate>,
    #[serde(default)]
    icon: Option<Icon>,
    #[serde(default)]
    title: Option<Text>,
    #[serde(default)]
    description: Option<Text>,
}

impl TryFrom<RawNewsPatch> for NewsPatch {
    type Error = FieldError;

    fn try_from(raw: RawNewsPatch) -> Result<Self, Self::Error> {
        if raw.date.is_none()
            && raw.icon.is_none()
            && raw.title.is_none()
            && raw.description.is_none()
        {
            return Err(FieldError::EmptyPatch);
        }
        Ok(Self {
            date: raw.date,
            icon: raw.icon,
            title: raw.title,
            description: raw.description,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewsPatched {
    pub target_id: String,
    pub date: GameDate,
    pub patch: NewsPatch,
}

/// Raw open/close telemetry for a news item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewsTelemetry {
    pub target_id: String,
    pub at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioHead {
    pub date: GameDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameOverFact {
    pub date: GameDate,
    pub summary: String,
}

/// One actor's contribution window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TurnBracket {
    pub actor: Actor,
    pub from: GameDate,
    pub until: GameDate,
}

/// A persisted roll together with the inputs that produced it.
///
/// `event_count` is the history size the roll was drawn against; rolls made
/// in one batch share `at` and differ in it. Logs written without the field
/// read it as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DiceRoll {
    pub roll: Percentile,
    pub at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub event_count: usize,
}

/// An immutable fact in the game log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    NewsPublished(NewsItem),
    /// Withheld from the player-facing timeline until the post-mortem.
    HiddenNewsPublished(NewsItem),
    NewsPatched(NewsPatched),
    NewsOpened(NewsTelemetry),
    NewsClosed(NewsTelemetry),
    ScenarioHeadCompleted(ScenarioHead),
    GameOver(GameOverFact),
    TurnStarted(TurnBracket),
    TurnFinished(TurnBracket),
    DiceRolled(DiceRoll),
}

/// Discriminant of [`Event`], carrying the wire tag and same-day priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    NewsPublished,
    HiddenNewsPublished,
    NewsPatched,
    NewsOpened,
    NewsClosed,
    ScenarioHeadCompleted,
    GameOver,
    TurnStarted,
    TurnFinished,
    DiceRolled,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewsPublished => "news-published",
            Self::HiddenNewsPublished => "hidden-news-published",
            Self::NewsPatched => "news-patched",
            Self::NewsOpened => "news-opened",
            Self::NewsClosed => "news-closed",
            Self::ScenarioHeadCompleted => "scenario-head-completed",
            Self::GameOver => "game-over",
            Self::TurnStarted => "turn-started",
            Self::TurnFinished => "turn-finished",
            Self::DiceRolled => "dice-rolled",
        }
    }

    #[must_use]
    pub const fn is_telemetry(self) -> bool {
        matches!(self, Self::NewsOpened | Self::NewsClosed)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::NewsPublished(_) => EventKind::NewsPublished,
            Self::HiddenNewsPublished(_) => EventKind::HiddenNewsPublished,
            Self::NewsPatched(_) => EventKind::NewsPatched,
            Self::NewsOpened(_) => EventKind::NewsOpened,
            Self::NewsClosed(_) => EventKind::NewsClosed,
            Self::ScenarioHeadCompleted(_) => EventKind::ScenarioHeadCompleted,
            Self::GameOver(_) => EventKind::GameOver,
            Self::TurnStarted(_) => EventKind::TurnStarted,
            Self::TurnFinished(_) => EventKind::TurnFinished,
            Self::DiceRolled(_) => EventKind::DiceRolled,
        }
    }

    /// Game date used for ordering and chronology.
    ///
    /// Turn brackets report `from` when started and `until` when finished.
    /// Telemetry and dice rolls live on the wall clock and have no game date.
    #[must_use]
    pub const fn game_date(&self) -> Option<&GameDate> {
        match self {
            Self::NewsPublished(item) | Self::HiddenNewsPublished(item) => Some(&item.date),
            Self::NewsPatched(patched) => Some(&patched.date),
            Self::ScenarioHeadCompleted(head) => Some(&head.date),
            Self::GameOver(over) => Some(&over.date),
            Self::TurnStarted(bracket) => Some(&bracket.from),
            Self::TurnFinished(bracket) => Some(&bracket.until),
            Self::NewsOpened(_) | Self::NewsClosed(_) | Self::DiceRolled(_) => None,
        }
    }

    #[must_use]
    pub const fn is_telemetry(&self) -> bool {
        self.kind().is_telemetry()
    }

    /// News body and hidden flag for the two news variants.
    #[must_use]
    pub const fn as_news(&self) -> Option<(&NewsItem, bool)> {
        match self {
            Self::NewsPublished(item) => Some((item, false)),
            Self::HiddenNewsPublished(item) => Some((item, true)),
            _ => None,
        }
    }
}

/// Deterministic id for a news item: `{prefix}-{date}-{slug(title)}`.
///
/// The slug segment is omitted when the title has no ASCII letters or digits.
#[must_use]
pub fn derive_news_id(hidden: bool, date: &GameDate, title: &str) -> String {
    let prefix = if hidden {
        HIDDEN_NEWS_ID_PREFIX
    } else {
        NEWS_ID_PREFIX
    };
    let slug = slugify(title);
    if slug.is_empty() {
        format!("{prefix}-{date}")
    } else {
        format!("{prefix}-{date}-{slug}")
    }
}

/// Lowercase ASCII slug: runs of punctuation become one hyphen, non-ASCII
/// characters are dropped, and the result is capped at [`SLUG_MAX_LEN`].
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len().min(SLUG_MAX_LEN));
    for ch in text.chars().filter(char::is_ascii) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.truncate(SLUG_MAX_LEN);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Validate an already-parsed JSON payload into events.
///
/// Accepts an array of event objects or a single object. The whole batch is
/// rejected on the first invalid entry.
///
/// # Errors
///
/// Returns [`EngineError::SchemaViolation`] naming `source_name` when any
/// entry has an unknown `type`, a missing field, or a field that breaks its
/// constraint.
pub fn validate_events(
    source_name: &str,
    payload: serde_json::Value,
) -> Result<Vec<Event>, EngineError> {
    let entries = match payload {
        serde_json::Value::Array(entries) => entries,
        object @ serde_json::Value::Object(_) => vec![object],
        other => {
            return Err(EngineError::schema(
                source_name,
                format!("expected an array of events, found {other}"),
            ));
        }
    };
    decode_entries(source_name, entries)
}
