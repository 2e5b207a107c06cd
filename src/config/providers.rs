//! Provider credentials
//!
//! Each provider client is built from one of these. `validate()` is the
//! single place that turns missing credentials into [`Error::Config`].

use serde::{Deserialize, Serialize};

use super::env_var;
use crate::error::{Error, Result};

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_elevenlabs_base_url() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}

fn missing_fields(fields: &[(&str, &str)]) -> Vec<String> {
    fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.to_string())
        .collect()
}

fn require_api_key(provider: &str, api_key: &Option<String>) -> Result<()> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err(Error::config(format!("{} API key is required", provider))),
    }
}

/// OpenAI credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
        }
    }
}

impl OpenAiConfig {
    /// `OPENAI_API_KEY`, `OPENAI_BASE_URL`
    pub fn from_env() -> Self {
        Self {
            api_key: env_var("OPENAI_API_KEY"),
            base_url: env_var("OPENAI_BASE_URL").unwrap_or_else(default_openai_base_url),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_api_key("OpenAI", &self.api_key)
    }
}

/// Gemini credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
        }
    }
}

impl GeminiConfig {
    /// `GEMINI_API_KEY`, `GEMINI_BASE_URL`
    pub fn from_env() -> Self {
        Self {
            api_key: env_var("GEMINI_API_KEY"),
            base_url: env_var("GEMINI_BASE_URL").unwrap_or_else(default_gemini_base_url),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_api_key("Gemini", &self.api_key)
    }
}

/// ElevenLabs credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevenLabsConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(default = "default_elevenlabs_base_url")]
    pub base_url: String,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_elevenlabs_base_url(),
        }
    }
}

impl ElevenLabsConfig {
    /// `ELEVENLABS_API_KEY`, `ELEVENLABS_BASE_URL`
    pub fn from_env() -> Self {
        Self {
            api_key: env_var("ELEVENLABS_API_KEY"),
            base_url: env_var("ELEVENLABS_BASE_URL").unwrap_or_else(default_elevenlabs_base_url),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_api_key("ElevenLabs", &self.api_key)
    }
}

/// Parse Server credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseConfig {
    pub base_url: String,
    pub app_id: String,
    #[serde(skip_serializing)]
    pub master_key: String,
}

impl ParseConfig {
    /// `PARSE_SERVER_URL`, `PARSE_APP_ID`, `PARSE_MASTER_KEY`
    pub fn from_env() -> Self {
        Self {
            base_url: env_var("PARSE_SERVER_URL").unwrap_or_default(),
            app_id: env_var("PARSE_APP_ID").unwrap_or_default(),
            master_key: env_var("PARSE_MASTER_KEY").unwrap_or_default(),
        }
    }

    /// Reports every missing field at once.
    pub fn validate(&self) -> Result<()> {
        let missing = missing_fields(&[
            ("base_url", &self.base_url),
            ("app_id", &self.app_id),
            ("master_key", &self.master_key),
        ]);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::config(format!(
                "Missing Parse credentials: {}",
                missing.join(", ")
            )))
        }
    }
}
