//! Foresight Tester
//!
//! Record/replay harness around the forecasting backend. A [`Recorder`]
//! captures a live stream as a [`ReplayTape`]; a [`Player`] serves that tape
//! back with its original timing once the incoming request has been matched
//! against the recorded one. Both implement [`ContentStreamer`], so the
//! [`GameMaster`] driver runs unchanged against either.

pub mod config;
pub mod error;
pub mod forecast;
pub mod player;
pub mod recorder;
pub mod streamer;
pub mod tape;

pub use config::HarnessConfig;
pub use error::{HarnessError, MismatchField};
pub use forecast::{ForecastContext, ForecastOptions, GameMaster, forecast};
pub use player::Player;
pub use recorder::Recorder;
pub use streamer::{ChunkStream, ContentStreamer, ForecastRequest, ScriptedStreamer};
pub use tape::{FileTapeSink, MemoryTapeSink, ReplayTape, TapeChunk, TapeMeta, TapeSink};
