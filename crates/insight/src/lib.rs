//! Streaming conversation-insight engine
//!
//! Consumes an incremental token stream from an LLM backend and recovers
//! structured data from a buffer that is only partially well-formed until the
//! stream ends. Partial results are published to a sink as soon as they become
//! parseable; malformed output is retried with a simplified prompt; bursts of
//! upstream changes are debounced into a single run.

pub mod prompts;
pub mod runner;
pub mod schema;
pub mod streaming;
pub mod trigger;

#[cfg(test)]
mod trigger_tests;

pub use runner::{AnalysisRunner, CancellationToken, RunnerConfig};
pub use schema::{Analysis, Complexity, ConversationInsights, Question, QuestionCategory};
pub use streaming::{
    AnalysisMode, AnalysisOutcome, AnalysisSink, AnalysisUpdate, ChunkBuffer, Segments, SinkError,
};
pub use trigger::{AnalyzerConfig, DebouncedAnalyzer};
