//! Audio payload handling
//!
//! Turns provider audio into a canonical container: raw PCM is wrapped in a
//! WAV header ([`wav`]) and WAV can be transcoded to MP3 by an external
//! encoder ([`transcode`]).

pub mod transcode;
pub mod wav;

pub use transcode::*;
pub use wav::*;

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Output container requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
}

impl AudioFormat {
    /// Mime label of bytes in this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            _ => Err(format!("Invalid audio format: {}", s)),
        }
    }
}

/// Finished audio, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioContainer {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

impl AudioContainer {
    pub fn new(bytes: Vec<u8>, format: AudioFormat) -> Self {
        Self { bytes, format }
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `(bytes, mime label)`
    pub fn into_parts(self) -> (Vec<u8>, &'static str) {
        let mime = self.mime_type();
        (self.bytes, mime)
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}
