//! Gemini REST client
//!
//! Calls `streamGenerateContent?alt=sse` and parses the response body into
//! fragments as it arrives. Text parts become text fragments; `inlineData`
//! parts are base64-decoded into image fragments.

use std::time::Duration;

use async_stream::try_stream;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chat::Prompt;

use super::{Fragment, FragmentStream, ModelClient, ModelError};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default model; supports interleaved text and image output
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client; `None` means requests fail with a credential error
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Create a client keyed from the `GEMINI_API_KEY` environment variable
    pub fn from_env() -> Self {
        Self::new(std::env::var("GEMINI_API_KEY").ok())
    }

    /// Override the model after construction
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL (alternate deployments, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Check if an API key is configured
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait::async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, prompt: Prompt) -> Result<FragmentStream, ModelError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ModelError::InvalidCredential("API key not configured".to_string()))?;

        let mut parts = vec![Part::Text { text: prompt.text }];
        for attachment in prompt.attachments {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: attachment.mime_type,
                    data: BASE64.encode(&attachment.data),
                },
            });
        }

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            },
        };

        let url = format!(
            "{}/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.model, api_key
        );

        debug!("sending generate request to model {}", self.model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Unclassified(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API error: {} - {}", status, body);
            return Err(classify_http_error(status, &body));
        }

        let mut bytes = response.bytes_stream();
        let stream = try_stream! {
            let mut buffer: Vec<u8> = Vec::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk
                    .map_err(|e| ModelError::Unclassified(format!("stream read failed: {}", e)))?;
                buffer.extend_from_slice(&chunk);
                for payload in drain_data_lines(&mut buffer) {
                    for fragment in parse_chunk(&payload)? {
                        yield fragment;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Pull complete `data:` lines out of the buffer, leaving any partial line
fn drain_data_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut payloads = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim_start();
            if !data.is_empty() {
                payloads.push(data.to_string());
            }
        }
    }
    payloads
}

/// Decode one response chunk into fragments
fn parse_chunk(payload: &str) -> Result<Vec<Fragment>, ModelError> {
    let response: GenerateContentResponse = serde_json::from_str(payload)
        .map_err(|e| ModelError::Unclassified(format!("malformed response chunk: {}", e)))?;

    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(ModelError::ContentBlocked(format!(
            "prompt blocked: {}",
            reason
        )));
    }

    let mut fragments = Vec::new();
    for candidate in response.candidates.unwrap_or_default() {
        let Some(content) = candidate.content else {
            continue;
        };
        for part in content.parts {
            if let Some(text) = part.text {
                if !text.is_empty() {
                    fragments.push(Fragment::Text(text));
                }
            }
            if let Some(inline) = part.inline_data {
                let data = BASE64
                    .decode(inline.data.as_bytes())
                    .map_err(|e| ModelError::Unclassified(format!("invalid image payload: {}", e)))?;
                fragments.push(Fragment::Image {
                    data,
                    mime_type: inline.mime_type.unwrap_or_else(|| "image/png".to_string()),
                });
            }
        }
    }
    Ok(fragments)
}

/// Classify a non-success HTTP response
fn classify_http_error(status: StatusCode, body: &str) -> ModelError {
    let (api_status, message) = match serde_json::from_str::<ErrorWrapper>(body) {
        Ok(wrapper) => (
            wrapper.error.status.unwrap_or_default(),
            wrapper.error.message.unwrap_or_else(|| body.to_string()),
        ),
        Err(_) => (String::new(), body.to_string()),
    };
    let detail = if api_status.is_empty() {
        format!("{}: {}", status, message)
    } else {
        format!("{} {}: {}", status, api_status, message)
    };

    match (status, api_status.as_str()) {
        (StatusCode::UNAUTHORIZED, _)
        | (StatusCode::FORBIDDEN, _)
        | (_, "UNAUTHENTICATED")
        | (_, "PERMISSION_DENIED") => ModelError::InvalidCredential(detail),
        (StatusCode::TOO_MANY_REQUESTS, _) | (_, "RESOURCE_EXHAUSTED") => {
            ModelError::QuotaExceeded(detail)
        }
        _ => ModelError::classify(detail),
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(rename = "inlineData")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInlineData {
    mime_type: Option<String>,
    data: String,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}
