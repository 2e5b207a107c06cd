//! Error taxonomy shared by every connector.
//!
//! Nothing in this crate recovers from these errors; they are built at the
//! failure site and propagated unchanged to the caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mime types accepted by the document extraction builder.
pub const ACCEPTED_DOCUMENT_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
];

/// Top-level error for every public operation.
#[derive(Error, Debug)]
pub enum Error {
    /// A required setting or credential is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// Caller-supplied inputs violate a mutual-exclusion rule.
    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("unsupported mime type '{mime_type}', accepted types: {}", .accepted.join(", "))]
    UnsupportedMimeType {
        mime_type: String,
        accepted: Vec<String>,
    },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn input_validation(message: impl Into<String>) -> Self {
        Self::InputValidation(message.into())
    }

    pub fn unsupported_document_mime(mime_type: &str) -> Self {
        Self::UnsupportedMimeType {
            mime_type: mime_type.to_string(),
            accepted: ACCEPTED_DOCUMENT_MIME_TYPES
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }

    /// Borrow the wrapped [`ApiError`], if this is one.
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Connector(ConnectorError::Api(e)) => Some(e),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Connector(ConnectorError::RateLimit(_)))
    }
}

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Self {
        Self::Connector(ConnectorError::Api(e))
    }
}

/// Failures raised while talking to a provider or processing its payload.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Generic connector failure with an optional cause chain.
    #[error("{message}")]
    Failure {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// HTTP 429, quota or throttling.
    #[error("{0}")]
    RateLimit(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ConnectorError {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            source: None,
        }
    }

    pub fn failure_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Failure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Normalized HTTP failure.
///
/// `status_code == 0` means no HTTP response was received (connection
/// refused, DNS failure, timeout).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status_code: u16,
    pub message: String,
    pub url: String,
    pub details: Option<ProviderErrorDetails>,
}

impl ApiError {
    pub fn new(status_code: u16, message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            url: url.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: ProviderErrorDetails) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ApiError(status={}, url={}, message={})",
            self.status_code, self.url, self.message
        )?;
        if let Some(details) = &self.details {
            write!(f, " details={}", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Structured fields a provider attaches to a rejected request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderErrorDetails {
    pub code: Option<String>,
    pub error_type: Option<String>,
    pub param: Option<String>,
}

impl fmt::Display for ProviderErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "None".to_string());
        write!(
            f,
            "{{code: {}, error_type: {}, param: {}}}",
            show(&self.code),
            show(&self.error_type),
            show(&self.param)
        )
    }
}

/// Result type for connector operations
pub type Result<T> = std::result::Result<T, Error>;
