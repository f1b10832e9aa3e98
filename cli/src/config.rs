//! JSON configuration file.
//!
//! ```json
//! {
//!   "model": { "model_type": "OpenAIModel", "model": "gpt-3.5-turbo", "api_key": "sk-..." },
//!   "common": { "book": "tests/test.pdf", "file_format": "markdown", "target_language": "German" }
//! }
//! ```
//!
//! Command-line flags and environment variables take precedence over the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use pdftrans::ModelConfig;

/// Contents of a configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub model: Option<ModelConfig>,
    pub common: CommonConfig,
}

/// Run settings shared by every model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommonConfig {
    pub book: Option<PathBuf>,
    pub file_format: Option<String>,
    pub target_language: Option<String>,
    pub output: Option<PathBuf>,
    pub font: Option<PathBuf>,
    pub pages: Option<usize>,
    pub concurrency: Option<usize>,
}

impl FileConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
        let config = serde_json::from_str(&text)
            .map_err(|e| format!("invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Load `path` if given, otherwise an empty configuration.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
