//! Document extraction
//!
//! Builds a multimodal Responses API request from exactly one document
//! source (URL, inline base64 or uploaded file id) and returns either the
//! model's text or, when a JSON schema is supplied, the decoded structured
//! output.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::OpenAiClient;
use crate::error::{
    ApiError, ConnectorError, Error, ProviderErrorDetails, Result, ACCEPTED_DOCUMENT_MIME_TYPES,
};
use crate::http::{error_message, interpret, RawResponse, RequestOptions};

pub const DEFAULT_EXTRACTION_PROMPT: &str = "Analyze this document.";

pub const DEFAULT_EXTRACTION_MODEL: &str = "gpt-4o";

pub const DEFAULT_DOCUMENT_MIME_TYPE: &str = "application/pdf";

/// Where the document comes from. Exactly one per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Url(String),
    /// Base64 payload without the `data:` prefix
    Base64(String),
    /// Id returned by the Files API
    FileId(String),
}

/// Candidate sources as supplied by a caller, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSources {
    pub url: Option<String>,
    pub base64: Option<String>,
    pub file_id: Option<String>,
}

impl DocumentSources {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn base64(data: impl Into<String>) -> Self {
        Self {
            base64: Some(data.into()),
            ..Self::default()
        }
    }

    pub fn file_id(id: impl Into<String>) -> Self {
        Self {
            file_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Collapse into a single source, rejecting zero or several.
    pub fn into_source(self) -> Result<DocumentSource> {
        let provided = [self.url.is_some(), self.base64.is_some(), self.file_id.is_some()]
            .iter()
            .filter(|p| **p)
            .count();
        if provided != 1 {
            return Err(Error::input_validation(
                "exactly one of url/base64/file_id must be provided",
            ));
        }

        let source = match (self.url, self.base64, self.file_id) {
            (Some(url), _, _) => DocumentSource::Url(url),
            (_, Some(data), _) => DocumentSource::Base64(data),
            (_, _, Some(id)) => DocumentSource::FileId(id),
            (None, None, None) => {
                return Err(Error::input_validation(
                    "exactly one of url/base64/file_id must be provided",
                ))
            }
        };
        Ok(source)
    }
}

/// One block of user content, serialized in the Responses API input shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "input_text")]
    Text { text: String },

    #[serde(rename = "input_image")]
    ImageUrl { image_url: String },

    #[serde(rename = "input_file")]
    FileUrl { file_url: String },

    #[serde(rename = "input_file")]
    FileReference { file_id: String },

    /// `file_data` holds a `data:<mime>;base64,<payload>` URL.
    #[serde(rename = "input_file")]
    InlineFileData { file_data: String },
}

impl ContentBlock {
    pub fn inline_file(mime_type: &str, base64_payload: &str) -> Self {
        Self::InlineFileData {
            file_data: format!("data:{};base64,{}", mime_type, base64_payload),
        }
    }
}

/// A conversation turn sent as Responses API `input`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System { content: String },
    User { content: Vec<ContentBlock> },
}

/// A validated extraction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    prompt: String,
    mime_type: String,
    source: DocumentSource,
    system_prompt: Option<String>,
}

impl ExtractionRequest {
    /// Validate the inputs. Source cardinality is checked before the mime
    /// type; neither check touches the network.
    pub fn new(
        prompt: impl Into<String>,
        mime_type: impl Into<String>,
        sources: DocumentSources,
    ) -> Result<Self> {
        let source = sources.into_source()?;
        let mime_type = mime_type.into();
        if !ACCEPTED_DOCUMENT_MIME_TYPES.contains(&mime_type.as_str()) {
            return Err(Error::unsupported_document_mime(&mime_type));
        }

        Ok(Self {
            prompt: prompt.into(),
            mime_type,
            source,
            system_prompt: None,
        })
    }

    /// Empty prompts are treated as absent.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        self.system_prompt = (!system_prompt.is_empty()).then_some(system_prompt);
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Prompt text first, then the single document block.
    pub fn content_blocks(&self) -> Vec<ContentBlock> {
        let document = match &self.source {
            DocumentSource::Url(url) if self.mime_type.starts_with("image/") => ContentBlock::ImageUrl {
                image_url: url.clone(),
            },
            DocumentSource::Url(url) => ContentBlock::FileUrl {
                file_url: url.clone(),
            },
            DocumentSource::FileId(id) => ContentBlock::FileReference { file_id: id.clone() },
            DocumentSource::Base64(data) => ContentBlock::inline_file(&self.mime_type, data),
        };

        vec![
            ContentBlock::Text {
                text: self.prompt.clone(),
            },
            document,
        ]
    }

    /// Optional system message followed by the user message.
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::System {
                content: system.clone(),
            });
        }
        messages.push(Message::User {
            content: self.content_blocks(),
        });
        messages
    }
}

/// Validate inputs and return the content blocks for one request.
pub fn build_request(
    prompt: &str,
    mime_type: &str,
    sources: DocumentSources,
) -> Result<Vec<ContentBlock>> {
    Ok(ExtractionRequest::new(prompt, mime_type, sources)?.content_blocks())
}

/// JSON schema the model output must conform to.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
    pub strict: bool,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            strict: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOptions {
    pub model: String,
    pub schema: Option<OutputSchema>,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_EXTRACTION_MODEL.to_string(),
            schema: None,
        }
    }
}

impl ExtractionOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_schema(mut self, schema: OutputSchema) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Result of an extraction call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutput {
    Text(String),
    /// Output decoded against the requested schema
    Structured(Value),
}

impl ExtractionOutput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) => None,
        }
    }
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<Value>,
}

/// Request body for `POST /responses`.
pub fn responses_body(request: &ExtractionRequest, options: &ExtractionOptions) -> Result<Value> {
    let text = options.schema.as_ref().map(|schema| {
        serde_json::json!({
            "format": {
                "type": "json_schema",
                "name": schema.name,
                "schema": schema.schema,
                "strict": schema.strict,
            }
        })
    });
    let body = ResponsesRequest {
        model: &options.model,
        input: request.messages(),
        text,
    };
    serde_json::to_value(&body)
        .map_err(|e| ConnectorError::failure_with_source("failed to encode extraction request", e).into())
}

/// Text output of a Responses API payload.
///
/// Uses the `output_text` convenience field when present, otherwise joins
/// every `output_text` item of every output message.
pub fn output_text(payload: &Value) -> String {
    if let Some(text) = payload.get("output_text").and_then(Value::as_str) {
        return text.to_string();
    }

    payload
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|content| content.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|content| content.get("text").and_then(Value::as_str))
        .collect()
}

/// Translate a provider 400 into an [`ApiError`] carrying the provider's
/// structured error fields.
pub fn bad_request_error(raw: &RawResponse) -> ApiError {
    let payload: Option<Value> = raw.json().ok();
    let error = payload
        .as_ref()
        .and_then(|p| p.get("error"))
        .filter(|e| e.is_object());
    let field = |name: &str| error.and_then(|e| e.get(name)).and_then(scalar_to_string);

    let message = field("message").unwrap_or_else(|| error_message(&raw.body));
    let details = ProviderErrorDetails {
        code: field("code"),
        error_type: field("type"),
        param: field("param"),
    };
    ApiError::new(raw.status, message, &raw.url).with_details(details)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl OpenAiClient {
    /// Run one extraction call.
    pub fn extract_data(
        &self,
        request: &ExtractionRequest,
        options: &ExtractionOptions,
    ) -> Result<ExtractionOutput> {
        let body = responses_body(request, options)?;
        let raw = self
            .http()
            .execute(Method::POST, "responses", RequestOptions::new().json(body))?;
        if raw.status == 400 {
            return Err(bad_request_error(&raw).into());
        }

        let payload = interpret(raw)?.into_json().ok_or_else(|| {
            Error::from(ConnectorError::failure(
                "expected a JSON response from the Responses API",
            ))
        })?;
        let text = output_text(&payload);

        debug!(
            model = %options.model,
            structured = options.schema.is_some(),
            output_chars = text.chars().count(),
            "document extraction completed"
        );

        if options.schema.is_none() {
            return Ok(ExtractionOutput::Text(text));
        }
        serde_json::from_str(&text)
            .map(ExtractionOutput::Structured)
            .map_err(|e| {
                ConnectorError::failure_with_source("structured output is not valid JSON", e).into()
            })
    }
}
