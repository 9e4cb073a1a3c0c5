use clap::Parser;
use std::path::PathBuf;

/// Define the application arguments
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to a transcript file with role-prefixed lines
    /// ("user: ..." / "assistant: ...")
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Ask a single question in thinking mode instead of analyzing a
    /// transcript
    #[arg(long)]
    pub ask: Option<String>,

    /// Model name to use
    #[arg(short = 'm', long, default_value = "gpt-4o-mini")]
    pub model: String,

    /// API base URL for the LLM backend (OpenAI-compatible)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
