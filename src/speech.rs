//! Speech synthesis pipeline
//!
//! Generate -> extract -> normalize -> (optional) transcode. Generation is
//! delegated to a [`SpeechGenerator`]; everything after it is local byte
//! processing. The caller gets a complete container or an error, never
//! partially written audio.

use tracing::{debug, info};

use crate::audio::{ensure_wav, AudioContainer, AudioEncoder, AudioFormat, FfmpegEncoder};
use crate::error::{ConnectorError, Result};

/// Model used when the caller does not pick one.
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-pro-preview-tts";

/// Prebuilt voice used when the caller does not pick one.
pub const DEFAULT_VOICE: &str = "Zephyr";

/// Audio as returned by a provider, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAudio {
    pub data: Vec<u8>,
    /// Declared type, possibly with parameters (`audio/L16;rate=24000`)
    pub mime_type: String,
}

/// Per-call synthesis parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechOptions {
    pub system_prompt: Option<String>,
    pub model: String,
    pub voice: String,
    pub format: AudioFormat,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            system_prompt: None,
            model: DEFAULT_TTS_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            format: AudioFormat::Wav,
        }
    }
}

impl SpeechOptions {
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }
}

/// A provider able to turn a prompt into inline audio.
pub trait SpeechGenerator: Send + Sync {
    fn generate(&self, prompt: &str, options: &SpeechOptions) -> Result<InlineAudio>;

    fn name(&self) -> &str;
}

/// Runs the pipeline over one generator and one encoder.
pub struct SpeechSynthesizer<G> {
    generator: G,
    encoder: Box<dyn AudioEncoder>,
}

impl<G: SpeechGenerator> SpeechSynthesizer<G> {
    /// Synthesizer transcoding through `ffmpeg` on `PATH`.
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            encoder: Box::new(FfmpegEncoder::new()),
        }
    }

    pub fn with_encoder(mut self, encoder: impl AudioEncoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Synthesize `prompt` into a WAV or MP3 container.
    pub fn synthesize(&self, prompt: &str, options: &SpeechOptions) -> Result<AudioContainer> {
        let audio = self.generator.generate(prompt, options)?;
        if audio.data.is_empty() {
            return Err(ConnectorError::failure("audio data empty").into());
        }

        let wav = ensure_wav(audio.data, &audio.mime_type)?;
        debug!(
            generator = self.generator.name(),
            declared_mime = %audio.mime_type,
            wav_bytes = wav.len(),
            "normalized audio to WAV"
        );

        let container = match options.format {
            AudioFormat::Wav => AudioContainer::new(wav, AudioFormat::Wav),
            AudioFormat::Mp3 => {
                let mp3 = self.encoder.encode(&wav)?;
                AudioContainer::new(mp3, AudioFormat::Mp3)
            }
        };

        info!(
            generator = self.generator.name(),
            encoder = self.encoder.name(),
            format = %container.format,
            bytes = container.len(),
            "speech synthesized"
        );
        Ok(container)
    }
}

impl<G: std::fmt::Debug> std::fmt::Debug for SpeechSynthesizer<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechSynthesizer")
            .field("generator", &self.generator)
            .field("encoder", &self.encoder.name())
            .finish()
    }
}
