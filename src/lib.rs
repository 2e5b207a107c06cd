//! connectors
//!
//! Blocking connector runtime for AI, document and media provider APIs: a
//! shared HTTP transport with a typed error taxonomy, an OpenAI document
//! extraction builder, and a speech pipeline that turns provider PCM into
//! WAV or MP3.

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod providers;
pub mod speech;

pub use error::{ApiError, ConnectorError, Error, ProviderErrorDetails, Result};
pub use http::{HttpClient, RequestOptions, ResponseBody};
pub use speech::{InlineAudio, SpeechGenerator, SpeechOptions, SpeechSynthesizer};
