//! Common streaming infrastructure for LLM backends
//!
//! The `ChunkStream` abstraction lets consumers drive real HTTP responses and
//! scripted playback with identical processing logic.

use crate::{CompletionRequest, StreamSource};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Trait for streaming chunk sources (real HTTP response or scripted playback)
///
/// Chunks arrive strictly in order. `Ok(None)` signals a clean end of stream;
/// an `Err` signals a stream failure, after which the stream must not be
/// polled again.
#[async_trait]
pub trait ChunkStream: Send {
    async fn next_chunk(&mut self) -> Result<Option<String>>;
}

/// How a scripted stream terminates after its chunks are exhausted
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptEnding {
    /// Clean end of stream
    Complete,
    /// Stream error with the given message
    Error(String),
}

/// A canned chunk sequence for tests and offline playback
#[derive(Debug, Clone)]
pub struct ScriptedStream {
    chunks: VecDeque<String>,
    ending: ScriptEnding,
    chunk_delay: Option<Duration>,
}

impl ScriptedStream {
    pub fn new(chunks: Vec<&str>) -> Self {
        Self {
            chunks: chunks.into_iter().map(String::from).collect(),
            ending: ScriptEnding::Complete,
            chunk_delay: None,
        }
    }

    /// Terminate with a stream error after all chunks have been yielded
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.ending = ScriptEnding::Error(message.into());
        self
    }

    /// Sleep between chunks to simulate network pacing
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }
}

#[async_trait]
impl ChunkStream for ScriptedStream {
    async fn next_chunk(&mut self) -> Result<Option<String>> {
        if let Some(delay) = self.chunk_delay {
            tokio::time::sleep(delay).await;
        }
        match self.chunks.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None => match &self.ending {
                ScriptEnding::Complete => Ok(None),
                ScriptEnding::Error(message) => Err(anyhow::anyhow!("{}", message)),
            },
        }
    }
}

/// A stream source that replays scripted streams in order
///
/// Each `open_stream` call consumes the next script and records the request
/// it was opened with, so tests can assert on attempt counts and prompt
/// contents. When the scripts run out, the last one is replayed.
pub struct ScriptedSource {
    scripts: Mutex<VecDeque<ScriptedStream>>,
    last_script: Mutex<Option<ScriptedStream>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedSource {
    pub fn new(scripts: Vec<ScriptedStream>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            last_script: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A source that answers every request with the same script
    pub fn repeating(script: ScriptedStream) -> Self {
        let source = Self::new(Vec::new());
        *source.last_script.lock().unwrap() = Some(script);
        source
    }

    /// All requests streams were opened with, in order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of streams opened so far
    pub fn open_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl StreamSource for ScriptedSource {
    async fn open_stream(&self, request: &CompletionRequest) -> Result<Box<dyn ChunkStream>> {
        self.requests.lock().unwrap().push(request.clone());

        let mut scripts = self.scripts.lock().unwrap();
        let script = match scripts.pop_front() {
            Some(script) => {
                *self.last_script.lock().unwrap() = Some(script.clone());
                script
            }
            None => self
                .last_script
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| anyhow::anyhow!("No scripted streams available"))?,
        };

        Ok(Box::new(script))
    }
}
