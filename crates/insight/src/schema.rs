//! Typed structures recovered from streamed model output
//!
//! Deserialization doubles as shape validation: required fields must be
//! present with the right types and enum values must match exactly, otherwise
//! the whole candidate is rejected. The extended analysis fields are only
//! requested on the first attempt and default to empty on the simplified
//! retry schema.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationInsights {
    pub questions: Vec<Question>,
    pub analysis: Analysis,
}

impl ConversationInsights {
    /// Shape rules serde cannot express. A candidate failing these is
    /// discarded as a whole, same as a missing field.
    pub fn is_well_formed(&self) -> bool {
        self.questions.iter().all(|q| !q.text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub text: String,
    pub category: QuestionCategory,
    pub complexity: Complexity,
    pub expected_outcome: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionCategory {
    Clarification,
    Solution,
    Exploration,
    Technical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub topics: Vec<String>,
    pub key_points: Vec<String>,
    pub technical_concepts: Vec<String>,
    #[serde(default)]
    pub research_gaps: Vec<String>,
    #[serde(default)]
    pub suggested_workflows: Vec<String>,
    #[serde(default)]
    pub thought_prompts: Vec<String>,
    #[serde(default)]
    pub potential_challenges: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}
