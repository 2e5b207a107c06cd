//! Provider connectors
//!
//! Thin clients over [`crate::http::HttpClient`], one per external service.

pub mod elevenlabs;
pub mod gemini;
pub mod openai;
pub mod parse;

pub use elevenlabs::ElevenLabsClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use parse::ParseClient;

use serde::de::DeserializeOwned;

use crate::error::{ConnectorError, Result};
use crate::http::ResponseBody;

/// Decode a JSON response body into `T`, naming `context` on failure.
pub(crate) fn decode_json<T: DeserializeOwned>(body: ResponseBody, context: &str) -> Result<T> {
    match body.deserialize::<T>() {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(ConnectorError::failure_with_source(
            format!("unexpected {} response shape", context),
            e,
        )
        .into()),
        None => Err(ConnectorError::failure(format!("expected a JSON {} response", context)).into()),
    }
}
