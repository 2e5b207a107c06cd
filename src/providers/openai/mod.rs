//! OpenAI connector: document extraction through the Responses API and
//! file storage.

pub mod extraction;
pub mod files;

pub use extraction::*;
pub use files::*;

use std::time::Duration;

use crate::config::OpenAiConfig;
use crate::error::Result;
use crate::http::HttpClient;

/// Extraction over large PDFs routinely exceeds the transport default.
pub const DEFAULT_OPENAI_TIMEOUT: Duration = Duration::from_secs(120);

/// Authenticated OpenAI client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: HttpClient,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::builder(&config.base_url)
            .bearer_auth(config.api_key.as_deref().unwrap_or_default())
            .timeout(DEFAULT_OPENAI_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&OpenAiConfig::from_env())
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_missing_api_key_is_config_error() {
        let err = OpenAiClient::new(&OpenAiConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("OpenAI API key is required")));
    }

    #[test]
    fn test_client_uses_configured_base_url() {
        let config = OpenAiConfig::default()
            .with_api_key("sk-test")
            .with_base_url("http://localhost:9999/v1/");
        let client = OpenAiClient::new(&config).unwrap();
        assert_eq!(client.http().base_url(), "http://localhost:9999/v1");
        assert_eq!(client.http().timeout(), DEFAULT_OPENAI_TIMEOUT);
    }
}
