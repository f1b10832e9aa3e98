//! OpenAI chat and completion models.

use serde::{Deserialize, Serialize};

use super::http::JsonClient;
use crate::error::{Error, Result};
use crate::translate::{Reply, Translate};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const COMPLETION_MAX_TOKENS: u32 = 150;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

/// Translator backed by the OpenAI HTTP API.
pub struct OpenAiModel {
    client: JsonClient,
    model: String,
    api_key: String,
    base_url: String,
    max_in_flight: usize,
}

impl OpenAiModel {
    pub fn new(
        client: JsonClient,
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: Option<String>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_in_flight: 1,
        }
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Whether `model` is served by the chat endpoint.
    pub fn is_chat_model(model: &str) -> bool {
        model == "gpt-3.5-turbo" || model.starts_with("gpt-3.5-turbo-") || model.starts_with("gpt-4")
    }

    fn chat(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let response: ChatResponse = self.client.post(&url, Some(&self.api_key), &request)?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Request("chat reply has no choices".to_string()))
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/completions", self.base_url);
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: COMPLETION_MAX_TOKENS,
            temperature: 0.0,
        };
        let response: CompletionResponse = self.client.post(&url, Some(&self.api_key), &request)?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| Error::Request("completion reply has no choices".to_string()))
    }
}

impl Translate for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    fn translate(&self, prompt: &str) -> Result<Reply> {
        let text = if Self::is_chat_model(&self.model) {
            self.chat(prompt)?
        } else {
            self.complete(prompt)?
        };
        Ok(Reply::ok(text.trim()))
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}
