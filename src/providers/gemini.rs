//! Gemini speech generation (`models/{model}:generateContent` with an audio
//! response modality).

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeminiConfig;
use crate::error::{ConnectorError, Result};
use crate::http::HttpClient;
use crate::providers::decode_json;
use crate::speech::{InlineAudio, SpeechGenerator, SpeechOptions};

pub use crate::speech::{DEFAULT_TTS_MODEL, DEFAULT_VOICE};

pub const FLASH_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

pub const VOICE_ZEPHYR: &str = "Zephyr";
pub const VOICE_PUCK: &str = "Puck";

pub const SPEECH_TEMPERATURE: f32 = 1.0;

/// Long prompts take well over the transport default to synthesize.
pub const DEFAULT_GEMINI_TIMEOUT: Duration = Duration::from_secs(120);

// Wire types

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Variant order matters for untagged decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
    Other(serde_json::Value),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Base64 payload plus its declared mime type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

/// Build a single-turn audio request.
pub fn speech_request(prompt: &str, options: &SpeechOptions) -> GenerateContentRequest {
    let system_instruction = options
        .system_prompt
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| Content {
            role: None,
            parts: vec![Part::text(s)],
        });

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part::text(prompt)],
        }],
        system_instruction,
        generation_config: GenerationConfig {
            temperature: SPEECH_TEMPERATURE,
            response_modalities: vec!["AUDIO".to_string()],
            speech_config: SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: options.voice.clone(),
                    },
                },
            },
        },
    }
}

/// Pull the inline audio out of the first part of the first candidate.
pub fn extract_inline_audio(
    response: &GenerateContentResponse,
) -> std::result::Result<InlineAudio, ConnectorError> {
    let inline = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|content| content.parts.first())
        .and_then(|part| match part {
            Part::InlineData { inline_data } => Some(inline_data),
            _ => None,
        })
        .ok_or_else(|| ConnectorError::failure("no audio part found in generation response"))?;

    if inline.data.is_empty() {
        return Err(ConnectorError::failure("audio data empty"));
    }

    let data = base64::engine::general_purpose::STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| ConnectorError::failure_with_source("audio data is not valid base64", e))?;
    if data.is_empty() {
        return Err(ConnectorError::failure("audio data empty"));
    }

    Ok(InlineAudio {
        data,
        mime_type: inline.mime_type.clone(),
    })
}

/// Authenticated Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: HttpClient,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::builder(&config.base_url)
            .header("x-goog-api-key", config.api_key.as_deref().unwrap_or_default())
            .timeout(DEFAULT_GEMINI_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&GeminiConfig::from_env())
    }

    pub fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let body = serde_json::to_value(request)
            .map_err(|e| ConnectorError::failure_with_source("failed to encode Gemini request", e))?;
        let response = self
            .http
            .post_json(&format!("models/{}:generateContent", model), body)?;
        decode_json(response, "Gemini generateContent")
    }
}

impl SpeechGenerator for GeminiClient {
    fn generate(&self, prompt: &str, options: &SpeechOptions) -> Result<InlineAudio> {
        let request = speech_request(prompt, options);
        let response = self.generate_content(&options.model, &request)?;
        let audio = extract_inline_audio(&response)?;
        debug!(
            model = %options.model,
            voice = %options.voice,
            mime_type = %audio.mime_type,
            bytes = audio.data.len(),
            "received inline audio"
        );
        Ok(audio)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
