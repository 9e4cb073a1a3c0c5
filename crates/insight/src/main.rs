mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Args;
use insight::{
    prompts, AnalysisMode, AnalysisOutcome, AnalysisRunner, AnalysisSink, AnalysisUpdate,
    CancellationToken, RunnerConfig, SinkError,
};
use llm::{Message, OpenAIClient, StreamSource};
use std::sync::Arc;

/// Prints progressive results to stdout as they stream in
struct TerminalSink;

impl AnalysisSink for TerminalSink {
    fn on_partial(&self, update: &AnalysisUpdate) -> Result<(), SinkError> {
        match update {
            AnalysisUpdate::Insights(insights) => {
                println!(
                    "[partial] {} questions, {} topics, {} key points",
                    insights.questions.len(),
                    insights.analysis.topics.len(),
                    insights.analysis.key_points.len()
                );
            }
            AnalysisUpdate::Segments(segments) => {
                if let Some(answer) = &segments.answer {
                    println!("[answer so far] {answer}");
                }
            }
        }
        Ok(())
    }

    fn on_final(&self, outcome: &AnalysisOutcome) -> Result<(), SinkError> {
        match outcome {
            AnalysisOutcome::Completed(AnalysisUpdate::Insights(insights)) => {
                let rendered = serde_json::to_string_pretty(insights)
                    .map_err(|e| SinkError::Rejected(e.to_string()))?;
                println!("{rendered}");
            }
            AnalysisOutcome::Completed(AnalysisUpdate::Segments(segments)) => {
                if !segments.thinking.is_empty() {
                    println!("--- thinking ---\n{}", segments.thinking);
                }
                match &segments.answer {
                    Some(answer) => println!("--- answer ---\n{answer}"),
                    None => println!("(no delimited answer; full text treated as thinking)"),
                }
            }
            AnalysisOutcome::Failed => {
                println!("No insights could be extracted.");
            }
        }
        Ok(())
    }
}

/// Parse a transcript file with "user:" / "assistant:" prefixed lines;
/// unprefixed lines continue the previous message.
fn parse_transcript(content: &str) -> Result<Vec<Message>> {
    let mut messages: Vec<Message> = Vec::new();

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("user:") {
            messages.push(Message::user(rest.trim()));
        } else if let Some(rest) = line.strip_prefix("assistant:") {
            messages.push(Message::assistant(rest.trim()));
        } else if let Some(last) = messages.last_mut() {
            last.content.push('\n');
            last.content.push_str(line);
        } else if !line.trim().is_empty() {
            messages.push(Message::user(line.trim()));
        }
    }

    anyhow::ensure!(!messages.is_empty(), "Transcript file contains no messages");
    Ok(messages)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::setup_logging(args.verbose);

    let api_key = std::env::var("OPENAI_API_KEY")
        .context("OPENAI_API_KEY environment variable not set")?;
    let base_url = args
        .base_url
        .unwrap_or_else(OpenAIClient::default_base_url);

    let source: Arc<dyn StreamSource> =
        Arc::new(OpenAIClient::new(api_key, args.model, base_url));
    let runner = AnalysisRunner::new(source, RunnerConfig::default());
    let sink: Arc<dyn AnalysisSink> = Arc::new(TerminalSink);

    if let Some(query) = args.ask {
        runner
            .try_run(
                &move |attempt| prompts::thinking_request(&query, attempt),
                AnalysisMode::Thinking,
                sink,
                CancellationToken::new(),
            )
            .await;
    } else if let Some(path) = args.transcript {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read transcript {}", path.display()))?;
        let transcript = parse_transcript(&content)?;
        runner
            .try_run(
                &move |attempt| prompts::analysis_request(&transcript, attempt),
                AnalysisMode::Structured,
                sink,
                CancellationToken::new(),
            )
            .await;
    } else {
        anyhow::bail!("Provide --transcript <file> or --ask <question>");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_transcript;
    use llm::MessageRole;

    #[test]
    fn test_parse_transcript_roles_and_continuations() {
        let content = "user: hello\nassistant: hi there\nsecond line\nuser: bye";
        let messages = parse_transcript(content).unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].content, "hi there\nsecond line");
        assert_eq!(messages[2].content, "bye");
    }

    #[test]
    fn test_parse_transcript_rejects_empty() {
        assert!(parse_transcript("\n  \n").is_err());
    }
}
