//! OpenAI-compatible streaming chat completions client

use crate::streaming::ChunkStream;
use crate::utils;
use crate::{ApiError, CompletionRequest, MessageRole, StreamSource};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace};

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIChatMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OpenAIDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any endpoint speaking the OpenAI chat-completions protocol
pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn default_base_url() -> String {
        "https://api.openai.com/v1".to_string()
    }

    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        }
    }

    fn convert_messages(request: &CompletionRequest) -> Vec<OpenAIChatMessage> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if !request.system_prompt.is_empty() {
            messages.push(OpenAIChatMessage {
                role: MessageRole::System.to_string(),
                content: request.system_prompt.clone(),
            });
        }

        for message in &request.messages {
            messages.push(OpenAIChatMessage {
                role: message.role.to_string(),
                content: message.content.clone(),
            });
        }

        messages
    }
}

#[async_trait]
impl StreamSource for OpenAIClient {
    async fn open_stream(&self, request: &CompletionRequest) -> Result<Box<dyn ChunkStream>> {
        let body = OpenAIRequest {
            model: self.model.clone(),
            messages: Self::convert_messages(request),
            temperature: 0.7,
            stream: true,
        };

        debug!(
            "Opening completion stream: model={}, messages={}",
            body.model,
            body.messages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        let response = utils::check_response_error(response).await?;

        Ok(Box::new(SseDeltaStream::new(response)))
    }
}

/// Pull-based SSE reader that yields text deltas from chat-completion events
///
/// Partial lines are buffered across HTTP chunks; events other than content
/// deltas (role announcements, finish reasons, usage) are skipped.
struct SseDeltaStream {
    response: Response,
    line_buffer: String,
    pending: VecDeque<String>,
    done: bool,
}

impl SseDeltaStream {
    fn new(response: Response) -> Self {
        Self {
            response,
            line_buffer: String::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn process_line(&mut self, line: &str) {
        let Some(data) = line.strip_prefix("data: ") else {
            return;
        };

        if data == "[DONE]" {
            self.done = true;
            return;
        }

        match serde_json::from_str::<OpenAIStreamResponse>(data) {
            Ok(event) => {
                if let Some(choice) = event.choices.first() {
                    if let Some(content) = &choice.delta.content {
                        if !content.is_empty() {
                            self.pending.push_back(content.clone());
                        }
                    }
                    if choice.finish_reason.is_some() {
                        trace!("Stream finished: {:?}", choice.finish_reason);
                    }
                }
            }
            Err(e) => {
                // Keep-alive comments and unknown event shapes are not fatal
                trace!("Skipping unparseable SSE event: {e}");
            }
        }
    }
}

#[async_trait]
impl ChunkStream for SseDeltaStream {
    async fn next_chunk(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(text) = self.pending.pop_front() {
                return Ok(Some(text));
            }
            if self.done {
                return Ok(None);
            }

            match self.response.chunk().await {
                Ok(Some(bytes)) => {
                    self.line_buffer.push_str(&String::from_utf8_lossy(&bytes));
                    while let Some(pos) = self.line_buffer.find('\n') {
                        let line: String =
                            self.line_buffer[..pos].trim_end_matches('\r').to_string();
                        self.line_buffer.drain(..=pos);
                        self.process_line(&line);
                    }
                }
                Ok(None) => {
                    if !self.line_buffer.is_empty() {
                        let line = std::mem::take(&mut self.line_buffer);
                        self.process_line(&line);
                    }
                    self.done = true;
                }
                Err(e) => {
                    return Err(ApiError::NetworkError(format!("SSE chunk error: {e}")).into())
                }
            }
        }
    }
}
