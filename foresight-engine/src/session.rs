//! A live game: the log as appended, plus the clock used to stamp telemetry
//! and dice.
//!
//! The session persists and reloads in append order. Canonical order cannot
//! place telemetry inside a turn, so it is only ever a derived view.

use crate::aggregate::{AggregatedState, aggregate, assert_chronology, current_turn, is_game_over};
use crate::canonical::{canonicalize, dedup_latest};
use crate::command::{Clock, Command, SystemClock, normalize_commands};
use crate::error::EngineError;
use crate::event::{Actor, Event, GameDate, TurnBracket};
use crate::projector::project;

/// Game log bound to a clock, with apply-then-merge bookkeeping.
///
/// The session keeps the journal in append order so the prompt can tell
/// which news the player opened during the current turn; every derived view
/// goes through the canonicalizer.
#[derive(Debug, Clone)]
pub struct GameSession<C: Clock = SystemClock> {
    journal: Vec<Event>,
    clock: C,
}

impl GameSession<SystemClock> {
    /// Start from an existing log using the system clock.
    #[must_use]
    pub fn new(events: Vec<Event>) -> Self {
        Self::with_clock(events, SystemClock)
    }
}

impl<C: Clock> GameSession<C> {
    #[must_use]
    pub fn with_clock(events: Vec<Event>, clock: C) -> Self {
        Self {
            journal: events,
            clock,
        }
    }

    /// Events in append order, duplicates collapsed.
    #[must_use]
    pub fn journal(&self) -> Vec<Event> {
        dedup_latest(&self.journal)
    }

    /// Events in canonical order.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        canonicalize(&self.journal)
    }

    #[must_use]
    pub fn state(&self) -> AggregatedState {
        aggregate(&self.journal)
    }

    /// Forecaster prompt for the current log.
    #[must_use]
    pub fn prompt(&self) -> String {
        project(&self.journal())
    }

    #[must_use]
    pub fn current_turn(&self) -> Option<&TurnBracket> {
        current_turn(&self.journal)
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        is_game_over(&self.journal)
    }

    /// Apply player intents. Player input is not chronology-gated.
    pub fn apply_player(&mut self, commands: Vec<Command>) -> Vec<Event> {
        let additions = normalize_commands(commands, self.state().event_count, &self.clock);
        self.journal.extend(additions.iter().cloned());
        additions
    }

    /// Apply forecaster output: normalize, gate on chronology, merge.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameFinished`] once the game is over and
    /// [`EngineError::Chronology`] when any addition is dated in the past;
    /// the log is untouched in both cases.
    pub fn apply_forecast(&mut self, commands: Vec<Command>) -> Result<Vec<Event>, EngineError> {
        if self.is_over() {
            return Err(EngineError::GameFinished);
        }
        let history = self.events();
        let additions = normalize_commands(commands, history.len(), &self.clock);
        assert_chronology(&history, &additions)?;
        self.journal.extend(additions.iter().cloned());
        Ok(additions)
    }

    /// Open a turn bracket for `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TurnAlreadyOpen`] while another turn is open.
    pub fn start_turn(
        &mut self,
        actor: Actor,
        from: GameDate,
        until: GameDate,
    ) -> Result<TurnBracket, EngineError> {
        if let Some(open) = self.current_turn() {
            return Err(EngineError::TurnAlreadyOpen { actor: open.actor });
        }
        let bracket = TurnBracket { actor, from, until };
        self.journal.push(Event::TurnStarted(bracket.clone()));
        Ok(bracket)
    }

    /// Close the open turn bracket.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoOpenTurn`] when no turn is open.
    pub fn finish_turn(&mut self) -> Result<TurnBracket, EngineError> {
        let bracket = self.current_turn().cloned().ok_or(EngineError::NoOpenTurn)?;
        self.journal.push(Event::TurnFinished(bracket.clone()));
        Ok(bracket)
    }

    /// Consume the session, returning the log for persistence.
    ///
    /// The log is in append order with duplicates collapsed, so
    /// [`GameSession::with_clock`] on the result restores the same turn and
    /// player attention.
    #[must_use]
    pub fn into_events(self) -> Vec<Event> {
        dedup_latest(&self.journal)
    }
}
