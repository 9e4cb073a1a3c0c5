//! Stream-source abstraction for LLM backends
//!
//! This crate defines the boundary the insight engine consumes:
//! - Role-tagged message and request types
//! - The `ChunkStream` trait for ordered, incremental text chunks
//! - An OpenAI-compatible SSE streaming client
//! - Scripted streams for tests and offline playback


mod utils;

pub mod openai;
pub mod streaming;
pub mod types;

pub use openai::OpenAIClient;
pub use streaming::{ChunkStream, ScriptedSource, ScriptedStream};
pub use types::*;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for backends that can open an incremental text stream for a request.
///
/// The stream yields ordered chunks and terminates by exhaustion or by
/// returning an error; callers own all retry policy.
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn open_stream(&self, request: &CompletionRequest) -> Result<Box<dyn ChunkStream>>;
}
