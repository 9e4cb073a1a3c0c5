//! Common test utilities for the streaming analysis engine
//!
//! Shared helpers and the recording sink used by the processor, runner and
//! trigger tests.

use crate::schema::{Analysis, Complexity, ConversationInsights, Question, QuestionCategory};
use crate::streaming::{AnalysisOutcome, AnalysisSink, AnalysisUpdate, SinkError};
use std::sync::{Arc, Mutex};

/// A test sink that records every partial and final delivery in order
#[derive(Clone, Default)]
pub struct RecordingSink {
    partials: Arc<Mutex<Vec<AnalysisUpdate>>>,
    finals: Arc<Mutex<Vec<AnalysisOutcome>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partials(&self) -> Vec<AnalysisUpdate> {
        self.partials.lock().unwrap().clone()
    }

    pub fn finals(&self) -> Vec<AnalysisOutcome> {
        self.finals.lock().unwrap().clone()
    }
}

impl AnalysisSink for RecordingSink {
    fn on_partial(&self, update: &AnalysisUpdate) -> Result<(), SinkError> {
        self.partials.lock().unwrap().push(update.clone());
        Ok(())
    }

    fn on_final(&self, outcome: &AnalysisOutcome) -> Result<(), SinkError> {
        self.finals.lock().unwrap().push(outcome.clone());
        Ok(())
    }
}

/// Split text into small chunks to exercise boundary handling
pub fn chunk_str(s: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    chars
        .chunks(chunk_size)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect()
}

/// The canonical well-formed payload used across tests
pub fn valid_insights_json() -> &'static str {
    r#"{"questions":[{"text":"What is X?","category":"clarification","complexity":"simple","expectedOutcome":"clarity"}],"analysis":{"topics":["X"],"keyPoints":["Y"],"technicalConcepts":["Z"]}}"#
}

/// The structure `valid_insights_json` deserializes to
pub fn valid_insights() -> ConversationInsights {
    ConversationInsights {
        questions: vec![Question {
            text: "What is X?".to_string(),
            category: QuestionCategory::Clarification,
            complexity: Complexity::Simple,
            expected_outcome: "clarity".to_string(),
        }],
        analysis: Analysis {
            topics: vec!["X".to_string()],
            key_points: vec!["Y".to_string()],
            technical_concepts: vec!["Z".to_string()],
            research_gaps: vec![],
            suggested_workflows: vec![],
            thought_prompts: vec![],
            potential_challenges: vec![],
            next_steps: vec![],
        },
    }
}

/// A minimal valid payload whose single topic identifies its origin,
/// useful when two concurrent runs must be told apart
pub fn tagged_insights_json(tag: &str) -> String {
    format!(
        r#"{{"questions":[],"analysis":{{"topics":["{tag}"],"keyPoints":[],"technicalConcepts":[]}}}}"#
    )
}

/// The single topic of an insights update produced from `tagged_insights_json`
pub fn update_tag(update: &AnalysisUpdate) -> Option<String> {
    match update {
        AnalysisUpdate::Insights(insights) => insights.analysis.topics.first().cloned(),
        AnalysisUpdate::Segments(_) => None,
    }
}
