//! Streaming processors turning buffer snapshots into sink updates

mod buffer;
mod json_extractor;
mod segment_splitter;

#[cfg(test)]
pub(crate) mod test_utils;

pub use buffer::{BufferOverflow, ChunkBuffer, DEFAULT_BUFFER_CAP};
pub use json_extractor::extract_insights;
pub use segment_splitter::{
    split_segments, split_segments_final, Segments, ANSWER_CLOSE_TAG, ANSWER_OPEN_TAG,
};

use crate::schema::ConversationInsights;
use thiserror::Error;

/// A partial or complete analysis result pushed to the sink
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisUpdate {
    /// Structured insights recovered from a JSON payload
    Insights(ConversationInsights),
    /// Free-text thinking/answer segments
    Segments(Segments),
}

/// Terminal outcome of one logical analysis run
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Completed(AnalysisUpdate),
    /// All attempts exhausted; consumers clear to an empty state
    Failed,
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Consumer rejected update: {0}")]
    Rejected(String),
}

/// Boundary the consumer implements to receive progressive results
///
/// `on_partial` may be called many times with monotonically more complete
/// data; `on_final` with `Failed` means "clear to empty", never a crash.
pub trait AnalysisSink: Send + Sync {
    fn on_partial(&self, update: &AnalysisUpdate) -> Result<(), SinkError>;
    fn on_final(&self, outcome: &AnalysisOutcome) -> Result<(), SinkError>;
}

/// What a run tries to recover from the stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalysisMode {
    /// Expect a JSON object matching the insight schema
    Structured,
    /// Expect free text with an optional `<answer>` segment
    Thinking,
}

/// Re-inspects a growing buffer snapshot after each appended chunk
///
/// Implementations must tolerate structurally incomplete buffers and only
/// report when the recovered result actually changed.
pub trait BufferProcessor: Send {
    /// Inspect the current snapshot; `Some` only when the result differs
    /// from the previously reported one.
    fn inspect(&mut self, snapshot: &str) -> Option<AnalysisUpdate>;

    /// Final payload at clean end of stream. `None` means the attempt never
    /// produced a usable result and counts as a failed attempt.
    fn finish(&mut self, snapshot: &str) -> Option<AnalysisUpdate>;
}

/// Factory for the processor matching the requested mode
pub fn create_processor(mode: AnalysisMode) -> Box<dyn BufferProcessor> {
    match mode {
        AnalysisMode::Structured => Box::new(InsightProcessor::default()),
        AnalysisMode::Thinking => Box::new(SegmentProcessor::default()),
    }
}

/// Recovers the first valid insight structure from the buffer (first-wins)
#[derive(Default)]
struct InsightProcessor {
    last: Option<ConversationInsights>,
}

impl BufferProcessor for InsightProcessor {
    fn inspect(&mut self, snapshot: &str) -> Option<AnalysisUpdate> {
        let insights = extract_insights(snapshot)?;
        if self.last.as_ref() == Some(&insights) {
            return None;
        }
        self.last = Some(insights.clone());
        Some(AnalysisUpdate::Insights(insights))
    }

    fn finish(&mut self, snapshot: &str) -> Option<AnalysisUpdate> {
        // The closing chunk may have completed the object
        let _ = self.inspect(snapshot);
        self.last.clone().map(AnalysisUpdate::Insights)
    }
}

/// Splits the buffer into thinking/answer segments as markers stream in
#[derive(Default)]
struct SegmentProcessor {
    last: Option<Segments>,
}

impl BufferProcessor for SegmentProcessor {
    fn inspect(&mut self, snapshot: &str) -> Option<AnalysisUpdate> {
        let segments = split_segments(snapshot);
        if self.last.as_ref() == Some(&segments) {
            return None;
        }
        self.last = Some(segments.clone());
        Some(AnalysisUpdate::Segments(segments))
    }

    fn finish(&mut self, snapshot: &str) -> Option<AnalysisUpdate> {
        // A missing answer marker is a valid terminal state: the whole
        // text counts as thinking. The final split releases any held-back
        // marker-prefix suffix, since no chunk can complete it anymore.
        Some(AnalysisUpdate::Segments(split_segments_final(snapshot)))
    }
}
