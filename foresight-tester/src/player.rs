//! Replaying adapter: serves a recorded tape in place of a live backend.

use std::path::Path;

use async_trait::async_trait;
use foresight_engine::{Event, export_jsonl};
use futures::stream::{self, StreamExt};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, MismatchField};
use crate::streamer::{ChunkStream, ContentStreamer, ForecastRequest};
use crate::tape::ReplayTape;

/// Serves one tape, refusing calls that differ from the recorded request.
#[derive(Debug, Clone)]
pub struct Player {
    tape: ReplayTape,
    replay_delays: bool,
}

impl Player {
    #[must_use]
    pub fn new(tape: ReplayTape) -> Self {
        Self {
            tape,
            replay_delays: true,
        }
    }

    /// # Errors
    ///
    /// Returns [`HarnessError::Tape`] when the tape cannot be loaded.
    pub fn load(path: &Path, config: &HarnessConfig) -> Result<Self, HarnessError> {
        Ok(Self::new(ReplayTape::load(path)?).with_delays(config.replay_delays))
    }

    /// Toggle sleeping the recorded gaps between chunks.
    #[must_use]
    pub fn with_delays(mut self, replay_delays: bool) -> Self {
        self.replay_delays = replay_delays;
        self
    }

    #[must_use]
    pub const fn tape(&self) -> &ReplayTape {
        &self.tape
    }

    /// Compare `request` with the recorded one: model, then system prompt,
    /// then normalized history.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ReplayMismatch`] naming the first field that
    /// differs.
    pub fn verify(&self, request: &ForecastRequest) -> Result<(), HarnessError> {
        let recorded = &self.tape.request;
        if recorded.model != request.model {
            return Err(mismatch(
                MismatchField::Model,
                recorded.model.clone(),
                request.model.clone(),
            ));
        }
        if recorded.system_prompt != request.system_prompt {
            return Err(mismatch(
                MismatchField::SystemPrompt,
                format!("{} bytes", recorded.system_prompt.len()),
                format!("{} bytes", request.system_prompt.len()),
            ));
        }
        let expected = recorded.normalized_history();
        let actual = request.normalized_history();
        if expected != actual {
            let (expected, actual) = first_divergence(&expected, &actual);
            return Err(mismatch(MismatchField::History, expected, actual));
        }
        Ok(())
    }
}

fn mismatch(field: MismatchField, expected: String, actual: String) -> HarnessError {
    log::warn!("replay request diverges from tape on {field}");
    HarnessError::ReplayMismatch {
        field,
        expected,
        actual,
    }
}

/// Render the first differing entry of two histories.
fn first_divergence(expected: &[Event], actual: &[Event]) -> (String, String) {
    let index = expected
        .iter()
        .zip(actual)
        .position(|(left, right)| left != right)
        .unwrap_or_else(|| expected.len().min(actual.len()));
    let render = |events: &[Event]| {
        events.get(index).map_or_else(
            || format!("end of history at entry {index}"),
            |event| export_jsonl(std::slice::from_ref(event)).trim_end().to_owned(),
        )
    };
    (render(expected), render(actual))
}

#[async_trait]
impl ContentStreamer for Player {
    async fn generate_content_stream(
        &self,
        request: &ForecastRequest,
    ) -> Result<ChunkStream, HarnessError> {
        self.verify(request)?;
        log::debug!(
            "replaying {} chunks recorded at {}",
            self.tape.stream.len(),
            self.tape.meta.recorded_at
        );
        let replay_delays = self.replay_delays;
        let chunks = self.tape.stream.clone();
        Ok(stream::iter(chunks)
            .then(move |chunk| async move {
                if replay_delays {
                    tokio::time::sleep(chunk.delay()).await;
                }
                Ok(chunk.text)
            })
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tape::TapeChunk;
    use foresight_engine::parse_log;

    fn history(text: &str) -> Vec<Event> {
        parse_log("fixture", text).unwrap()
    }

    fn tape() -> ReplayTape {
        let request = ForecastRequest::new(
            "oracle",
            "system",
            history(
                r#"[{"type": "news-published", "date": "2025-01-01", "icon": "Globe", "title": "A", "description": "a"}]"#,
            ),
        );
        let mut tape = ReplayTape::start(request, None, None);
        tape.stream.push(TapeChunk {
            delay_ns: 0,
            text: "[]".into(),
        });
        tape
    }

    #[test]
    fn model_is_checked_first() {
        let player = Player::new(tape());
        let request = ForecastRequest::new("other", "different", Vec::new());
        let err = player.verify(&request).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::ReplayMismatch {
                field: MismatchField::Model,
                ..
            }
        ));
    }

    #[test]
    fn system_prompt_mismatch_is_named() {
        let player = Player::new(tape());
        let mut request = player.tape().request.clone();
        request.system_prompt.push('!');
        assert!(matches!(
            player.verify(&request),
            Err(HarnessError::ReplayMismatch {
                field: MismatchField::SystemPrompt,
                ..
            })
        ));
    }

    #[test]
    fn non_news_history_differences_are_ignored() {
        let player = Player::new(tape());
        let mut request = player.tape().request.clone();
        request.history.extend(history(
            r#"[{"type": "turn-started", "actor": "game_master", "from": "2025-01-01", "until": "2025-02-01"}]"#,
        ));
        player.verify(&request).unwrap();
    }

    #[test]
    fn history_mismatch_reports_first_divergent_entry() {
        let player = Player::new(tape());
        let mut request = player.tape().request.clone();
        request.history = history(
            r#"[{"type": "news-published", "date": "2025-01-01", "icon": "Globe", "title": "Z", "description": "z"}]"#,
        );
        let Err(HarnessError::ReplayMismatch {
            field: MismatchField::History,
            expected,
            actual,
        }) = player.verify(&request)
        else {
            panic!("expected a history mismatch");
        };
        assert!(expected.contains("news-2025-01-01-a"));
        assert!(actual.contains("news-2025-01-01-z"));
    }

    #[test]
    fn matching_request_streams_the_tape_text() {
        let player = Player::new(tape()).with_delays(false);
        let request = player.tape().request.clone();
        let chunks: Vec<String> = tokio_test::block_on(async {
            player
                .generate_content_stream(&request)
                .await
                .unwrap()
                .map(Result::unwrap)
                .collect()
                .await
        });
        assert_eq!(chunks.concat(), player.tape().text());
    }

    #[test]
    fn shorter_history_reports_end_marker() {
        let player = Player::new(tape());
        let mut request = player.tape().request.clone();
        request.history.clear();
        let Err(HarnessError::ReplayMismatch { actual, .. }) = player.verify(&request) else {
            panic!("expected a history mismatch");
        };
        assert_eq!(actual, "end of history at entry 0");
    }
}
