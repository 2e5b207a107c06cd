//! WAV to MP3 transcoding through an external encoder process.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tracing::debug;

use crate::error::ConnectorError;

/// Default `-q:a` value passed to libmp3lame (VBR, ~175 kbit/s).
pub const DEFAULT_MP3_QUALITY: u8 = 3;

const TIMEOUT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Bytes-in, bytes-out audio encoder.
pub trait AudioEncoder: Send + Sync {
    /// Encode a complete WAV buffer. Either returns the full output or an
    /// error; never partial output.
    fn encode(&self, wav: &[u8]) -> Result<Vec<u8>, ConnectorError>;

    fn name(&self) -> &str;
}

/// `ffmpeg`-compatible MP3 encoder.
///
/// Each call gets its own scratch directory holding `in.wav` and `out.mp3`;
/// the directory is removed when the call returns, whatever the outcome.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: OsString,
    leading_args: Vec<OsString>,
    quality: u8,
    scratch_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    /// Encoder that runs `ffmpeg` from `PATH` with no timeout.
    pub fn new() -> Self {
        Self {
            program: OsString::from("ffmpeg"),
            leading_args: Vec::new(),
            quality: DEFAULT_MP3_QUALITY,
            scratch_dir: None,
            timeout: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self.leading_args.clear();
        self
    }

    /// Run the encoder through another program, e.g. `nice -n 10 ffmpeg`.
    pub fn with_command<I, S>(mut self, program: impl Into<OsString>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.program = program.into();
        self.leading_args = leading_args
            .into_iter()
            .map(|a| a.as_ref().to_os_string())
            .collect();
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Parent directory for per-call scratch directories (default: system
    /// temp dir).
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Kill the encoder if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full argument list for one invocation.
    pub fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args = self.leading_args.clone();
        args.extend([
            OsString::from("-y"),
            OsString::from("-i"),
            input.as_os_str().to_os_string(),
            OsString::from("-codec:a"),
            OsString::from("libmp3lame"),
            OsString::from("-q:a"),
            OsString::from(self.quality.to_string()),
            output.as_os_str().to_os_string(),
        ]);
        args
    }

    fn scratch(&self) -> Result<TempDir, ConnectorError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("transcode-");
        let dir = match &self.scratch_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        };
        dir.map_err(|e| ConnectorError::failure_with_source("failed to create scratch directory", e))
    }

    fn wait(&self, child: &mut std::process::Child) -> Result<ExitStatus, ConnectorError> {
        let program = self.program.to_string_lossy();
        let Some(timeout) = self.timeout else {
            return child
                .wait()
                .map_err(|e| ConnectorError::failure_with_source(format!("failed to wait for {}", program), e));
        };

        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ConnectorError::failure(format!(
                        "transcoding failed: {} timed out after {}ms",
                        program,
                        timeout.as_millis()
                    )));
                }
                Ok(None) => std::thread::sleep(TIMEOUT_POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(ConnectorError::failure_with_source(
                        format!("failed to wait for {}", program),
                        e,
                    ));
                }
            }
        }
    }
}

impl AudioEncoder for FfmpegEncoder {
    fn encode(&self, wav: &[u8]) -> Result<Vec<u8>, ConnectorError> {
        let dir = self.scratch()?;
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.mp3");

        std::fs::write(&input, wav)
            .map_err(|e| ConnectorError::failure_with_source("failed to write encoder input", e))?;

        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(self.args(&input, &output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                ConnectorError::failure_with_source(
                    format!(
                        "transcoding failed: could not start {}",
                        self.program.to_string_lossy()
                    ),
                    e,
                )
            })?;

        let status = self.wait(&mut child)?;
        if !status.success() {
            return Err(ConnectorError::failure(format!(
                "transcoding failed: {} exited with {}",
                self.program.to_string_lossy(),
                status
            )));
        }

        let encoded = std::fs::read(&output)
            .map_err(|e| ConnectorError::failure_with_source("failed to read encoder output", e))?;

        debug!(
            encoder = %self.program.to_string_lossy(),
            input_bytes = wav.len(),
            output_bytes = encoded.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "transcoded WAV to MP3"
        );

        Ok(encoded)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
