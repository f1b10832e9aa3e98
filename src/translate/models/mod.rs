//! Model backends and the closed registry that builds them.
//!
//! The set of backends is fixed at compile time. A [`ModelConfig`] names one
//! through its [`ModelType`] and is validated before any request is made.

mod echo;
mod glm;
mod http;
mod openai;
mod qwen;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::translate::Translate;

pub use echo::EchoModel;
pub use glm::GlmModel;
pub use http::{JsonClient, RetryPolicy};
pub use openai::OpenAiModel;
pub use qwen::QwenModel;

/// Supported model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelType {
    OpenAi,
    Glm,
    Qwen,
    Echo,
}

impl ModelType {
    /// Every supported backend.
    pub const ALL: [ModelType; 4] = [
        ModelType::OpenAi,
        ModelType::Glm,
        ModelType::Qwen,
        ModelType::Echo,
    ];

    /// Canonical tag, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            ModelType::OpenAi => "OpenAIModel",
            ModelType::Glm => "GLMModel",
            ModelType::Qwen => "QWenModel",
            ModelType::Echo => "EchoModel",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openaimodel" | "openai" => Ok(ModelType::OpenAi),
            "glmmodel" | "glm" => Ok(ModelType::Glm),
            "qwenmodel" | "qwen" => Ok(ModelType::Qwen),
            "echomodel" | "echo" => Ok(ModelType::Echo),
            _ => Err(Error::Config(format!(
                "unknown model type '{}', expected one of: {}",
                s,
                ModelType::ALL
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

impl TryFrom<String> for ModelType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ModelType> for String {
    fn from(value: ModelType) -> Self {
        value.as_str().to_string()
    }
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_rate_limit_wait_secs() -> u64 {
    60
}

fn default_max_in_flight() -> usize {
    1
}

/// Backend selection and connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Which backend to build
    pub model_type: ModelType,

    /// Model name (OpenAI)
    #[serde(default)]
    pub model: Option<String>,

    /// API key (OpenAI, Qwen)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Endpoint: OpenAI base URL, GLM server URL or DashScope URL
    #[serde(default)]
    pub url: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Wait before retrying a rate-limited request, in seconds
    #[serde(default = "default_rate_limit_wait_secs")]
    pub rate_limit_wait_secs: u64,

    /// Upper bound on concurrent requests the backend accepts
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl ModelConfig {
    pub fn new(model_type: ModelType) -> Self {
        Self {
            model_type,
            model: None,
            api_key: None,
            url: None,
            timeout_secs: default_timeout_secs(),
            rate_limit_wait_secs: default_rate_limit_wait_secs(),
            max_in_flight: default_max_in_flight(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Check that every setting the backend needs is present.
    pub fn validate(&self) -> Result<()> {
        let missing = |field: &str| -> Result<()> {
            Err(Error::Config(format!(
                "{} requires '{}'",
                self.model_type, field
            )))
        };
        match self.model_type {
            ModelType::OpenAi => {
                if is_blank(&self.model) {
                    return missing("model");
                }
                if is_blank(&self.api_key) {
                    return missing("api_key");
                }
            }
            ModelType::Glm => {
                if is_blank(&self.url) {
                    return missing("url");
                }
            }
            ModelType::Qwen => {
                if is_blank(&self.api_key) {
                    return missing("api_key");
                }
            }
            ModelType::Echo => {}
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

/// Build the translator a configuration names.
pub fn create_translator(config: &ModelConfig) -> Result<Box<dyn Translate>> {
    config.validate()?;

    let timeout = Duration::from_secs(config.timeout_secs);
    let text = |value: &Option<String>| value.clone().unwrap_or_default();

    let translator: Box<dyn Translate> = match config.model_type {
        ModelType::OpenAi => {
            let retry = RetryPolicy {
                wait: Duration::from_secs(config.rate_limit_wait_secs),
                ..RetryPolicy::default()
            };
            let client = JsonClient::new(timeout, retry)?;
            Box::new(
                OpenAiModel::new(
                    client,
                    text(&config.model),
                    text(&config.api_key),
                    config.url.clone(),
                )
                .with_max_in_flight(config.max_in_flight),
            )
        }
        ModelType::Glm => {
            let client = JsonClient::new(timeout, RetryPolicy::none())?;
            Box::new(
                GlmModel::new(client, text(&config.url)).with_max_in_flight(config.max_in_flight),
            )
        }
        ModelType::Qwen => {
            let client = JsonClient::new(timeout, RetryPolicy::none())?;
            Box::new(
                QwenModel::new(client, config.url.clone(), text(&config.api_key))
                    .with_max_in_flight(config.max_in_flight),
            )
        }
        ModelType::Echo => Box::new(EchoModel::new()),
    };

    log::info!("Using {} backend '{}'", config.model_type, translator.name());
    Ok(translator)
}
