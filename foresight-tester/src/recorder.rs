//! Recording adapter: forwards a live stream and captures it as a tape.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::time::Instant;

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::streamer::{ChunkStream, ContentStreamer, ForecastRequest};
use crate::tape::{ReplayTape, TapeChunk, TapeSink};

/// Wraps a backend and writes every call it serves to a [`TapeSink`].
pub struct Recorder<S> {
    inner: S,
    sink: Arc<dyn TapeSink>,
    label: Option<String>,
    comment: Option<String>,
}

impl<S: ContentStreamer> Recorder<S> {
    #[must_use]
    pub fn new(inner: S, sink: Arc<dyn TapeSink>) -> Self {
        Self {
            inner,
            sink,
            label: None,
            comment: None,
        }
    }

    /// Recorder that stamps tapes with the configured label and comment.
    #[must_use]
    pub fn from_config(inner: S, sink: Arc<dyn TapeSink>, config: &HarnessConfig) -> Self {
        Self {
            label: config.label.clone(),
            comment: config.comment.clone(),
            ..Self::new(inner, sink)
        }
    }
}

/// A tape in progress. Written to the sink at most once.
struct Recording {
    sink: Arc<dyn TapeSink>,
    tape: Option<ReplayTape>,
}

impl Recording {
    fn push(&mut self, delay_ns: i64, text: &str) {
        if let Some(tape) = self.tape.as_mut() {
            tape.stream.push(TapeChunk {
                delay_ns,
                text: text.to_owned(),
            });
        }
    }

    fn finish(&mut self) -> Result<(), HarnessError> {
        let Some(tape) = self.tape.take() else {
            return Ok(());
        };
        log::debug!(
            "writing tape for model {} with {} chunks",
            tape.meta.model,
            tape.stream.len()
        );
        self.sink.write(&tape)
    }

    fn finish_logged(&mut self) {
        if let Err(err) = self.finish() {
            log::warn!("failed to write replay tape: {err}");
        }
    }
}

impl Drop for Recording {
    fn drop(&mut self) {
        if self.tape.is_some() {
            log::debug!("stream dropped before completion; keeping partial tape");
        }
        self.finish_logged();
    }
}

struct RecordState {
    inner: ChunkStream,
    recording: Recording,
    last: Instant,
    done: bool,
}

#[async_trait]
impl<S: ContentStreamer> ContentStreamer for Recorder<S> {
    async fn generate_content_stream(
        &self,
        request: &ForecastRequest,
    ) -> Result<ChunkStream, HarnessError> {
        let inner = self.inner.generate_content_stream(request).await?;
        let state = RecordState {
            inner,
            recording: Recording {
                sink: Arc::clone(&self.sink),
                tape: Some(ReplayTape::start(
                    request.clone(),
                    self.label.clone(),
                    self.comment.clone(),
                )),
            },
            last: Instant::now(),
            done: false,
        };

        let recorded = stream::unfold(state, |mut state| async move {
            if state.done {
                return None;
            }
            match state.inner.next().await {
                Some(Ok(text)) => {
                    let now = Instant::now();
                    let gap = now.duration_since(state.last);
                    state.last = now;
                    let delay_ns = i64::try_from(gap.as_nanos()).unwrap_or(i64::MAX);
                    state.recording.push(delay_ns, &text);
                    Some((Ok(text), state))
                }
                Some(Err(err)) => {
                    state.done = true;
                    state.recording.finish_logged();
                    Some((Err(err), state))
                }
                None => {
                    state.done = true;
                    match state.recording.finish() {
                        Ok(()) => None,
                        Err(err) => Some((Err(err), state)),
                    }
                }
            }
        });
        Ok(recorded.boxed())
    }
}
