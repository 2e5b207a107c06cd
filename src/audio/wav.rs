//! PCM to WAV normalization.
//!
//! Providers commonly return headerless linear PCM labelled
//! `audio/L16;rate=24000`. [`ensure_wav`] wraps such payloads in a canonical
//! 44-byte RIFF header; payloads already labelled WAV pass through untouched.

use bytes::{BufMut, BytesMut};
use tracing::{debug, warn};

use crate::error::ConnectorError;

/// Size of the canonical header.
pub const WAV_HEADER_SIZE: usize = 44;

pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;

pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

const PCM_FORMAT_TAG: u16 = 1;
const FMT_CHUNK_SIZE: u32 = 16;

/// Mime types treated as a WAV container in addition to whatever
/// `mime_guess` maps to the `wav` extension.
const WAV_MIME_ALIASES: &[&str] = &["audio/wav", "audio/x-wav", "audio/wave", "audio/vnd.wave"];

/// Sample layout of a raw PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: DEFAULT_SAMPLE_RATE,
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
        }
    }
}

impl PcmFormat {
    /// Read bits per sample and sample rate from a declared mime type such
    /// as `audio/L16;rate=24000`. Unparseable values keep their defaults.
    pub fn from_mime(mime_type: &str) -> Self {
        let mut format = Self::default();

        for part in mime_type.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let lower = part.to_lowercase();
            if let Some(rate) = lower.strip_prefix("rate=") {
                if let Ok(rate) = rate.trim().parse() {
                    format.sample_rate = rate;
                }
            } else if let Some(bits) = lower.strip_prefix("audio/l") {
                if let Ok(bits) = bits.trim().parse() {
                    format.bits_per_sample = bits;
                }
            }
        }

        format
    }

    pub fn block_align(&self) -> u16 {
        self.channels.saturating_mul(self.bits_per_sample / 8)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(u32::from(self.block_align()))
    }
}

/// Decoded fields of a canonical WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub chunk_size: u32,
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Parse the fixed 44-byte layout. Returns `None` when the magic
    /// markers don't match or the buffer is too short.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < WAV_HEADER_SIZE
            || &bytes[0..4] != b"RIFF"
            || &bytes[8..12] != b"WAVE"
            || &bytes[12..16] != b"fmt "
            || &bytes[36..40] != b"data"
        {
            return None;
        }

        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let u32_at =
            |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

        Some(Self {
            chunk_size: u32_at(4),
            audio_format: u16_at(20),
            channels: u16_at(22),
            sample_rate: u32_at(24),
            byte_rate: u32_at(28),
            block_align: u16_at(32),
            bits_per_sample: u16_at(34),
            data_size: u32_at(40),
        })
    }
}

/// True when the declared type names raw linear PCM (`audio/L<bits>`).
pub fn is_raw_pcm(mime_type: &str) -> bool {
    mime_type.to_lowercase().contains("audio/l")
}

/// True when the declared type already names a WAV container.
pub fn is_wav_container(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if essence.is_empty() {
        return false;
    }
    if WAV_MIME_ALIASES.contains(&essence.as_str()) {
        return true;
    }
    mime_guess::get_mime_extensions_str(&essence)
        .map(|exts| exts.contains(&"wav"))
        .unwrap_or(false)
}

/// Largest payload whose RIFF chunk size still fits the 32-bit field.
pub const MAX_WAV_DATA_SIZE: u32 = u32::MAX - (WAV_HEADER_SIZE as u32 - 8);

fn wav_data_size(len: usize) -> Result<u32, ConnectorError> {
    u32::try_from(len)
        .ok()
        .filter(|size| *size <= MAX_WAV_DATA_SIZE)
        .ok_or_else(|| ConnectorError::failure("audio payload too large for WAV"))
}

/// Prefix raw PCM samples with a canonical WAV header.
pub fn pcm_to_wav(pcm: &[u8], format: PcmFormat) -> Result<Vec<u8>, ConnectorError> {
    let data_size = wav_data_size(pcm.len())?;

    let mut buf = BytesMut::with_capacity(WAV_HEADER_SIZE + pcm.len());
    buf.put_slice(b"RIFF");
    buf.put_u32_le(data_size + 36);
    buf.put_slice(b"WAVE");
    buf.put_slice(b"fmt ");
    buf.put_u32_le(FMT_CHUNK_SIZE);
    buf.put_u16_le(PCM_FORMAT_TAG);
    buf.put_u16_le(format.channels);
    buf.put_u32_le(format.sample_rate);
    buf.put_u32_le(format.byte_rate());
    buf.put_u16_le(format.block_align());
    buf.put_u16_le(format.bits_per_sample);
    buf.put_slice(b"data");
    buf.put_u32_le(data_size);
    buf.put_slice(pcm);

    Ok(buf.to_vec())
}

/// Normalize a provider payload into WAV bytes.
///
/// Raw PCM is wrapped, WAV passes through byte-for-byte, and any other
/// declared type is assumed to be raw PCM and wrapped as well. Payloads too
/// large for the 32-bit RIFF size fields are rejected.
pub fn ensure_wav(audio: Vec<u8>, mime_type: &str) -> Result<Vec<u8>, ConnectorError> {
    if is_raw_pcm(mime_type) {
        let format = PcmFormat::from_mime(mime_type);
        debug!(
            mime_type,
            sample_rate = format.sample_rate,
            bits_per_sample = format.bits_per_sample,
            bytes = audio.len(),
            "wrapping raw PCM in WAV header"
        );
        return pcm_to_wav(&audio, format);
    }

    if is_wav_container(mime_type) {
        return Ok(audio);
    }

    warn!(mime_type, "unrecognized audio mime type, treating payload as raw PCM");
    pcm_to_wav(&audio, PcmFormat::from_mime(mime_type))
}
