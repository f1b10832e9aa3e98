//! ChatGLM API server.

use serde::{Deserialize, Serialize};

use super::http::JsonClient;
use crate::error::Result;
use crate::translate::{Reply, Translate};

#[derive(Debug, Serialize)]
struct GlmRequest<'a> {
    prompt: &'a str,
    history: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct GlmResponse {
    response: String,
}

/// Translator backed by a self-hosted ChatGLM API server.
pub struct GlmModel {
    client: JsonClient,
    model_url: String,
    max_in_flight: usize,
}

impl GlmModel {
    pub fn new(client: JsonClient, model_url: impl Into<String>) -> Self {
        Self {
            client,
            model_url: model_url.into(),
            max_in_flight: 1,
        }
    }

    /// Allow up to `max_in_flight` concurrent requests to the server.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }
}

impl Translate for GlmModel {
    fn name(&self) -> &str {
        "glm"
    }

    fn translate(&self, prompt: &str) -> Result<Reply> {
        let request = GlmRequest {
            prompt,
            history: Vec::new(),
        };
        let response: GlmResponse = self.client.post(&self.model_url, None, &request)?;
        Ok(Reply::ok(response.response.trim()))
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}
