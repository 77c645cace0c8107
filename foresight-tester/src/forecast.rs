//! Driving the forecaster: one generation call per game-master turn.

use foresight_engine::{
    Actor, Clock, Command, EngineError, Event, GameDate, GameSession, parse_commands,
};
use futures::StreamExt;

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::streamer::{ContentStreamer, ForecastRequest};

/// What the forecaster sees.
#[derive(Debug, Clone)]
pub struct ForecastContext {
    pub history: Vec<Event>,
    pub system_prompt: String,
}

#[derive(Debug, Clone)]
pub struct ForecastOptions {
    pub model: String,
    /// Name attached to schema errors raised on the output.
    pub source_name: String,
}

impl From<&HarnessConfig> for ForecastOptions {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            model: config.model.clone(),
            source_name: config.source_name.clone(),
        }
    }
}

/// Run one generation call and parse the full response into commands.
///
/// # Errors
///
/// Propagates backend and replay errors, and returns
/// [`HarnessError::Engine`] when the response is not a valid command batch.
pub async fn forecast<S>(
    streamer: &S,
    context: ForecastContext,
    options: &ForecastOptions,
) -> Result<Vec<Command>, HarnessError>
where
    S: ContentStreamer + ?Sized,
{
    let request = ForecastRequest::new(
        options.model.clone(),
        context.system_prompt,
        context.history,
    );
    let mut chunks = streamer.generate_content_stream(&request).await?;
    let mut text = String::new();
    while let Some(chunk) = chunks.next().await {
        text.push_str(&chunk?);
    }
    log::debug!("forecaster returned {} bytes", text.len());
    Ok(parse_commands(&options.source_name, &text)?)
}

/// Plays the game-master side of a session against a backend.
pub struct GameMaster<S> {
    streamer: S,
    system_prompt: String,
    options: ForecastOptions,
}

impl<S: ContentStreamer> GameMaster<S> {
    #[must_use]
    pub fn new(streamer: S, system_prompt: impl Into<String>, options: ForecastOptions) -> Self {
        Self {
            streamer,
            system_prompt: system_prompt.into(),
            options,
        }
    }

    /// Bracket one forecaster turn covering `from..until`.
    ///
    /// Opens a `game_master` turn, forecasts over the session log in append
    /// order, gates the output on chronology, and closes the turn. On any failure the
    /// session is restored to its state before the call.
    ///
    /// # Errors
    ///
    /// Returns the first error from turn bookkeeping, the backend, command
    /// parsing or the chronology gate.
    pub async fn take_turn<C>(
        &self,
        session: &mut GameSession<C>,
        from: GameDate,
        until: GameDate,
    ) -> Result<Vec<Event>, HarnessError>
    where
        C: Clock + Clone,
    {
        let snapshot = session.clone();
        match self.run_turn(session, from, until).await {
            Ok(added) => {
                log::info!("game master turn added {} events", added.len());
                Ok(added)
            }
            Err(err) => {
                log::warn!("game master turn failed, rolling back: {err}");
                *session = snapshot;
                Err(err)
            }
        }
    }

    async fn run_turn<C>(
        &self,
        session: &mut GameSession<C>,
        from: GameDate,
        until: GameDate,
    ) -> Result<Vec<Event>, HarnessError>
    where
        C: Clock,
    {
        if session.is_over() {
            return Err(EngineError::GameFinished.into());
        }
        session.start_turn(Actor::GameMaster, from, until)?;
        let context = ForecastContext {
            history: session.journal(),
            system_prompt: self.system_prompt.clone(),
        };
        let commands = forecast(&self.streamer, context, &self.options).await?;
        let added = session.apply_forecast(commands)?;
        session.finish_turn()?;
        Ok(added)
    }
}
