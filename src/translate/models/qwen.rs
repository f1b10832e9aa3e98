//! Qwen through the DashScope generation API.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::http::JsonClient;
use crate::error::Result;
use crate::translate::{Reply, Translate};

pub const DEFAULT_API_URL: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation";

const QWEN_MODEL: &str = "qwen-v1";

#[derive(Debug, Serialize)]
struct QwenRequest<'a> {
    model: &'a str,
    input: QwenInput<'a>,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct QwenInput<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct QwenResponse {
    output: QwenOutput,
}

#[derive(Debug, Deserialize)]
struct QwenOutput {
    text: String,
}

/// Translator backed by DashScope.
pub struct QwenModel {
    client: JsonClient,
    api_url: String,
    api_key: String,
    max_in_flight: usize,
}

impl QwenModel {
    pub fn new(client: JsonClient, api_url: Option<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: api_key.into(),
            max_in_flight: 1,
        }
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }
}

impl Translate for QwenModel {
    fn name(&self) -> &str {
        QWEN_MODEL
    }

    fn translate(&self, prompt: &str) -> Result<Reply> {
        let request = QwenRequest {
            model: QWEN_MODEL,
            input: QwenInput { prompt },
            parameters: json!({}),
        };
        let response: QwenResponse =
            self.client.post(&self.api_url, Some(&self.api_key), &request)?;
        Ok(Reply::ok(response.output.text.trim()))
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = QwenRequest {
            model: QWEN_MODEL,
            input: QwenInput { prompt: "hi" },
            parameters: json!({}),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"model": "qwen-v1", "input": {"prompt": "hi"}, "parameters": {}})
        );
    }

    #[test]
    fn test_response_decoding() {
        let json = r#"{"output":{"text":"Hallo","finish_reason":"stop"},"request_id":"x"}"#;
        let reply: QwenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(reply.output.text, "Hallo");
    }
}
