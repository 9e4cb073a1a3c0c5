//! Prompt construction for analysis and thinking-mode runs

use crate::streaming::{ANSWER_CLOSE_TAG, ANSWER_OPEN_TAG};
use llm::{CompletionRequest, Message};

const FULL_ANALYSIS_PROMPT: &str = r#"You analyze conversations between a user and an assistant.
Respond with ONLY a JSON object, no prose, no code fences, matching exactly:
{
  "questions": [
    {
      "text": "a follow-up question worth asking",
      "category": "clarification" | "solution" | "exploration" | "technical",
      "complexity": "simple" | "moderate" | "complex",
      "expectedOutcome": "what answering it would achieve"
    }
  ],
  "analysis": {
    "topics": ["main topics discussed"],
    "keyPoints": ["key points made"],
    "technicalConcepts": ["technical concepts mentioned"],
    "researchGaps": ["open questions without enough context"],
    "suggestedWorkflows": ["workflows that could move things forward"],
    "thoughtPrompts": ["prompts to deepen the discussion"],
    "potentialChallenges": ["risks or blockers to watch for"],
    "nextSteps": ["concrete next actions"]
  }
}
Every question needs all four fields. Output nothing before or after the JSON object."#;

/// Deliberately reduced ambition for degraded retries: fewer fields, only
/// simple clarification questions.
const SIMPLIFIED_ANALYSIS_PROMPT: &str = r#"You analyze conversations between a user and an assistant.
Respond with ONLY a JSON object, no prose, no code fences, matching exactly:
{
  "questions": [
    {
      "text": "a simple clarifying question",
      "category": "clarification",
      "complexity": "simple",
      "expectedOutcome": "what answering it would achieve"
    }
  ],
  "analysis": {
    "topics": ["main topics discussed"],
    "keyPoints": ["key points made"],
    "technicalConcepts": ["technical concepts mentioned"]
  }
}
Output nothing before or after the JSON object."#;

fn render_transcript(transcript: &[Message]) -> String {
    let mut rendered = String::new();
    for message in transcript {
        rendered.push_str(&format!("{}: {}\n", message.role, message.content));
    }
    rendered
}

/// Build the analysis request for the given attempt index
///
/// Attempt 0 requests the full schema; every retry uses the strictly
/// simplified variant.
pub fn analysis_request(transcript: &[Message], attempt: u32) -> CompletionRequest {
    let system_prompt = if attempt == 0 {
        FULL_ANALYSIS_PROMPT
    } else {
        SIMPLIFIED_ANALYSIS_PROMPT
    };

    CompletionRequest {
        messages: vec![Message::user(format!(
            "Conversation transcript:\n\n{}",
            render_transcript(transcript)
        ))],
        system_prompt: system_prompt.to_string(),
    }
}

/// Whether the request carries the simplified retry prompt
pub fn is_simplified(request: &CompletionRequest) -> bool {
    request.system_prompt == SIMPLIFIED_ANALYSIS_PROMPT
}

/// Build a thinking-mode request for a single free-text query
///
/// The model is asked to reason freely and delimit its final reply with the
/// answer markers; a reply without the marker is treated entirely as
/// thinking.
pub fn thinking_request(query: &str, attempt: u32) -> CompletionRequest {
    let ambition = if attempt == 0 {
        "Reason step by step about the question first."
    } else {
        "Keep the reasoning short."
    };

    CompletionRequest {
        messages: vec![Message::user(query.to_string())],
        system_prompt: format!(
            "{} Then give your final reply between {} and {}.",
            ambition, ANSWER_OPEN_TAG, ANSWER_CLOSE_TAG
        ),
    }
}
