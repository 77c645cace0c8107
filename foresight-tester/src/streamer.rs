//! The streaming call interface shared by live, recording and replaying
//! backends.

use std::time::Duration;

use async_trait::async_trait;
use foresight_engine::{Event, canonicalize, project};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Text chunks as they arrive from a forecasting backend.
pub type ChunkStream = BoxStream<'static, Result<String, HarnessError>>;

/// One generation call: which model, under which instructions, over which log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastRequest {
    pub model: String,
    pub system_prompt: String,
    pub history: Vec<Event>,
}

impl ForecastRequest {
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        history: Vec<Event>,
    ) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            history,
        }
    }

    /// Prompt body sent alongside the system prompt.
    #[must_use]
    pub fn prompt(&self) -> String {
        project(&self.history)
    }

    /// News-only, canonical view of the history used for replay matching.
    ///
    /// Only published items (visible and hidden) count as news; patches,
    /// brackets, dice and telemetry are dropped. News items carry their
    /// resolved ids so an explicit id and the id the engine would derive
    /// compare equal.
    #[must_use]
    pub fn normalized_history(&self) -> Vec<Event> {
        let news: Vec<Event> = self
            .history
            .iter()
            .filter_map(|event| match event {
                Event::NewsPublished(item) => {
                    Some(Event::NewsPublished(item.clone().with_resolved_id(false)))
                }
                Event::HiddenNewsPublished(item) => {
                    Some(Event::HiddenNewsPublished(item.clone().with_resolved_id(true)))
                }
                _ => None,
            })
            .collect();
        canonicalize(&news)
    }
}

/// A backend that answers a request with a stream of text chunks.
#[async_trait]
pub trait ContentStreamer: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the call cannot be started; failures after the
    /// first chunk arrive as items of the stream.
    async fn generate_content_stream(
        &self,
        request: &ForecastRequest,
    ) -> Result<ChunkStream, HarnessError>;
}

/// In-memory backend that yields a fixed script of chunks.
#[derive(Debug, Clone, Default)]
pub struct ScriptedStreamer {
    chunks: Vec<String>,
    delay: Duration,
    fail_after: Option<usize>,
}

impl ScriptedStreamer {
    #[must_use]
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            delay: Duration::ZERO,
            fail_after: None,
        }
    }

    /// Sleep `delay` before every chunk.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Emit a backend error in place of chunk `index`.
    #[must_use]
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_after = Some(index);
        self
    }
}

#[async_trait]
impl ContentStreamer for ScriptedStreamer {
    async fn generate_content_stream(
        &self,
        _request: &ForecastRequest,
    ) -> Result<ChunkStream, HarnessError> {
        let mut items = Vec::with_capacity(self.chunks.len());
        for (index, chunk) in self.chunks.iter().enumerate() {
            if self.fail_after == Some(index) {
                items.push(Err(HarnessError::Backend(format!(
                    "scripted failure at chunk {index}"
                ))));
                break;
            }
            items.push(Ok(chunk.clone()));
        }

        let delay = self.delay;
        Ok(stream::iter(items)
            .then(move |item| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                item
            })
            .boxed())
    }
}
