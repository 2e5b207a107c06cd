//! ElevenLabs text-to-speech. The provider returns MP3 directly, so no
//! normalization or transcoding is involved.

use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audio::{AudioContainer, AudioFormat};
use crate::config::ElevenLabsConfig;
use crate::error::{ConnectorError, Error, Result};
use crate::http::{check_status, HttpClient, RequestOptions};

pub const DEFAULT_ELEVENLABS_MODEL: &str = "eleven_multilingual_v2";

pub const DEFAULT_ELEVENLABS_VOICE: &str = "marc-aurel-qc-en";

pub const ELEVENLABS_OUTPUT_FORMAT: &str = "mp3_44100_128";

pub const DEFAULT_ELEVENLABS_TIMEOUT: Duration = Duration::from_secs(60);

/// Named voices and their ElevenLabs voice ids.
pub const VOICES: &[(&str, &str)] = &[
    ("luna-qc-en", "iB0Pwf5VYt7UDBrGrMqH"),
    ("brittney-qc-en", "pjcYQlDFKMbcOUp6F5GD"),
    ("lana-fr-en", "rAmra0SCIYOxYmRNDSm3"),
    ("marc-aurel-qc-en", "RTFg9niKcgGLDwa3RFlz"),
    ("theodore-nt", "hqfrgApggtO1785R4Fsn"),
    ("john-en-fr", "EryqBbKuawX5rMsewc7f"),
];

/// Resolve a voice alias to its id.
pub fn voice_id(alias: &str) -> Option<&'static str> {
    VOICES
        .iter()
        .find(|(name, _)| *name == alias)
        .map(|(_, id)| *id)
}

/// Language hint sent with each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    Fr,
    #[default]
    En,
    Es,
}

impl LanguageCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fr => "fr",
            Self::En => "en",
            Self::Es => "es",
        }
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LanguageCode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fr" => Ok(Self::Fr),
            "en" => Ok(Self::En),
            "es" => Ok(Self::Es),
            _ => Err(format!("Invalid language code: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevenLabsSpeech {
    /// Voice alias from [`VOICES`]
    pub voice: String,
    pub model: String,
    pub language: LanguageCode,
}

impl Default for ElevenLabsSpeech {
    fn default() -> Self {
        Self {
            voice: DEFAULT_ELEVENLABS_VOICE.to_string(),
            model: DEFAULT_ELEVENLABS_MODEL.to_string(),
            language: LanguageCode::default(),
        }
    }
}

#[derive(Serialize)]
struct ConvertRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    http: HttpClient,
}

impl ElevenLabsClient {
    pub fn new(config: &ElevenLabsConfig) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::builder(&config.base_url)
            .header("xi-api-key", config.api_key.as_deref().unwrap_or_default())
            .timeout(DEFAULT_ELEVENLABS_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&ElevenLabsConfig::from_env())
    }

    /// Convert `text` to MP3 speech.
    pub fn speak(&self, text: &str, speech: &ElevenLabsSpeech) -> Result<AudioContainer> {
        let voice = voice_id(&speech.voice).ok_or_else(|| {
            let known: Vec<&str> = VOICES.iter().map(|(name, _)| *name).collect();
            Error::input_validation(format!(
                "unknown voice '{}', expected one of: {}",
                speech.voice,
                known.join(", ")
            ))
        })?;

        let body = serde_json::to_value(ConvertRequest {
            text,
            model_id: &speech.model,
            language_code: speech.language.as_str(),
        })
        .map_err(|e| ConnectorError::failure_with_source("failed to encode speech request", e))?;

        let raw = self.http.execute(
            Method::POST,
            &format!("text-to-speech/{}", voice),
            RequestOptions::new()
                .query("output_format", ELEVENLABS_OUTPUT_FORMAT)
                .header("Accept", "audio/mpeg")
                .json(body),
        )?;
        check_status(&raw)?;
        if raw.body.is_empty() {
            return Err(ConnectorError::failure("audio data empty").into());
        }

        info!(
            voice = %speech.voice,
            model = %speech.model,
            language = %speech.language,
            bytes = raw.body.len(),
            "speech synthesized"
        );
        Ok(AudioContainer::new(raw.body.to_vec(), AudioFormat::Mp3))
    }
}
