//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `speak` -- synthesize speech to an audio file
//! - `extract` -- run a document extraction and print the result
//! - `files list|upload|delete|delete-all` -- manage OpenAI stored files
//! - `version` -- print build/version info

use std::path::{Path, PathBuf};

use base64::Engine;
use clap::{Parser, Subcommand, ValueEnum};

use crate::audio::{AudioContainer, AudioFormat};
use crate::error::Error;
use crate::providers::elevenlabs::{
    ElevenLabsSpeech, LanguageCode, DEFAULT_ELEVENLABS_MODEL, DEFAULT_ELEVENLABS_VOICE,
};
use crate::providers::openai::{
    DocumentSources, ExtractionOptions, ExtractionOutput, ExtractionRequest, OutputSchema,
    DEFAULT_DOCUMENT_MIME_TYPE, DEFAULT_EXTRACTION_MODEL, DEFAULT_EXTRACTION_PROMPT,
};
use crate::providers::{ElevenLabsClient, GeminiClient, OpenAiClient};
use crate::speech::{SpeechOptions, SpeechSynthesizer};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Command-line access to the provider connectors.
#[derive(Parser, Debug)]
#[command(
    name = "connectors",
    version = env!("CARGO_PKG_VERSION"),
    about = "Call AI, document and media provider APIs from the command line"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Synthesize speech and write it to a file.
    Speak {
        /// Text to speak.
        text: String,

        #[arg(long, value_enum, default_value_t = SpeechProvider::Gemini)]
        provider: SpeechProvider,

        /// Voice name (Gemini) or voice alias (ElevenLabs).
        #[arg(long)]
        voice: Option<String>,

        #[arg(long)]
        model: Option<String>,

        /// System instruction (Gemini only).
        #[arg(long)]
        system: Option<String>,

        /// Output format: wav or mp3 (default: wav for Gemini, mp3 for ElevenLabs).
        #[arg(long)]
        format: Option<AudioFormat>,

        /// Language hint (ElevenLabs only): fr, en or es.
        #[arg(long)]
        language: Option<LanguageCode>,

        /// Destination file.
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Extract content from a document and print the result.
    Extract {
        /// Public URL of the document.
        #[arg(long)]
        url: Option<String>,

        /// Local file sent inline as base64.
        #[arg(long)]
        base64_file: Option<PathBuf>,

        /// Id of a file previously uploaded with `files upload`.
        #[arg(long)]
        file_id: Option<String>,

        #[arg(long, default_value = DEFAULT_DOCUMENT_MIME_TYPE)]
        mime: String,

        #[arg(long, default_value = DEFAULT_EXTRACTION_PROMPT)]
        prompt: String,

        #[arg(long)]
        system: Option<String>,

        #[arg(long, default_value = DEFAULT_EXTRACTION_MODEL)]
        model: String,

        /// JSON schema file; the output is decoded against it.
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Manage files stored with OpenAI.
    #[command(subcommand)]
    Files(FilesCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum FilesCommand {
    /// List stored files as JSON.
    List,

    /// Upload a local file with purpose `user_data`.
    Upload { path: PathBuf },

    /// Delete one stored file.
    Delete { file_id: String },

    /// Delete every stored file.
    DeleteAll {
        /// Required confirmation.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SpeechProvider {
    Gemini,
    Elevenlabs,
}

/// Dispatch a parsed subcommand.
pub fn run(command: Command) -> CliResult<()> {
    match command {
        Command::Speak {
            text,
            provider,
            voice,
            model,
            system,
            format,
            language,
            out,
        } => {
            let audio = match provider {
                SpeechProvider::Gemini => {
                    let options = gemini_speech_options(voice, model, system, format);
                    SpeechSynthesizer::new(GeminiClient::from_env()?).synthesize(&text, &options)?
                }
                SpeechProvider::Elevenlabs => {
                    if format == Some(AudioFormat::Wav) {
                        return Err(Error::input_validation("ElevenLabs only produces mp3 audio").into());
                    }
                    let speech = elevenlabs_speech(voice, model, language);
                    ElevenLabsClient::from_env()?.speak(&text, &speech)?
                }
            };
            write_audio(&audio, &out)
        }
        Command::Extract {
            url,
            base64_file,
            file_id,
            mime,
            prompt,
            system,
            model,
            schema,
        } => {
            let sources = DocumentSources {
                url,
                base64: base64_file.as_deref().map(read_base64).transpose()?,
                file_id,
            };
            let mut request = ExtractionRequest::new(prompt, mime, sources)?;
            if let Some(system) = system {
                request = request.with_system_prompt(system);
            }
            let mut options = ExtractionOptions::default().with_model(model);
            if let Some(path) = schema {
                options = options.with_schema(read_schema(&path)?);
            }

            match OpenAiClient::from_env()?.extract_data(&request, &options)? {
                ExtractionOutput::Text(text) => println!("{}", text),
                ExtractionOutput::Structured(value) => {
                    println!("{}", serde_json::to_string_pretty(&value)?)
                }
            }
            Ok(())
        }
        Command::Files(files) => handle_files(files),
        Command::Version => {
            handle_version();
            Ok(())
        }
    }
}

fn handle_files(command: FilesCommand) -> CliResult<()> {
    if matches!(command, FilesCommand::DeleteAll { yes: false }) {
        return Err(Error::input_validation("refusing to delete all files without --yes").into());
    }

    let client = OpenAiClient::from_env()?;
    match command {
        FilesCommand::List => {
            println!("{}", serde_json::to_string_pretty(&client.list_files()?)?);
        }
        FilesCommand::Upload { path } => {
            println!("{}", serde_json::to_string_pretty(&client.upload_file(&path)?)?);
        }
        FilesCommand::Delete { file_id } => {
            println!("{}", serde_json::to_string_pretty(&client.delete_file(&file_id)?)?);
        }
        FilesCommand::DeleteAll { .. } => {
            match client.delete_all_files()? {
                Some(deleted) => println!("{}", serde_json::to_string_pretty(&deleted)?),
                None => println!("No files to delete"),
            }
        }
    }
    Ok(())
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("connectors {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("CONNECTORS_BUILD_DATE"));
    println!("  Git commit: {}", env!("CONNECTORS_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn gemini_speech_options(
    voice: Option<String>,
    model: Option<String>,
    system: Option<String>,
    format: Option<AudioFormat>,
) -> SpeechOptions {
    let mut options = SpeechOptions::default().with_format(format.unwrap_or_default());
    if let Some(voice) = voice {
        options = options.with_voice(voice);
    }
    if let Some(model) = model {
        options = options.with_model(model);
    }
    if let Some(system) = system {
        options = options.with_system_prompt(system);
    }
    options
}

fn elevenlabs_speech(
    voice: Option<String>,
    model: Option<String>,
    language: Option<LanguageCode>,
) -> ElevenLabsSpeech {
    ElevenLabsSpeech {
        voice: voice.unwrap_or_else(|| DEFAULT_ELEVENLABS_VOICE.to_string()),
        model: model.unwrap_or_else(|| DEFAULT_ELEVENLABS_MODEL.to_string()),
        language: language.unwrap_or_default(),
    }
}

fn write_audio(audio: &AudioContainer, out: &Path) -> CliResult<()> {
    audio.save(out)?;
    println!(
        "Wrote {} bytes ({}) to {}",
        audio.len(),
        audio.mime_type(),
        out.display()
    );
    Ok(())
}

fn read_base64(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Load a JSON schema file, named after the file stem.
fn read_schema(path: &Path) -> CliResult<OutputSchema> {
    let raw = std::fs::read_to_string(path)?;
    let schema: serde_json::Value = serde_json::from_str(&raw)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string();
    Ok(OutputSchema::new(name, schema))
}
