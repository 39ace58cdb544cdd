//! Gemini model integration
//!
//! Provides:
//! - `ModelClient`, the boundary trait the chat relay drives
//! - `GeminiClient`, the REST implementation
//! - `MockModel`, a scripted client for tests

mod client;
mod mock;

pub use client::{GeminiClient, DEFAULT_MODEL};
pub use mock::MockModel;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use thiserror::Error;

use crate::chat::Prompt;

/// One incremental unit of model output
#[derive(Debug, Clone)]
pub enum Fragment {
    /// A chunk of response text
    Text(String),
    /// A generated image
    Image { data: Vec<u8>, mime_type: String },
}

/// Stream of fragments from one model invocation.
///
/// Dropping the stream cancels the invocation.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, ModelError>> + Send>>;

/// Model invocation errors
///
/// Classification happens at the client boundary: HTTP status and the API's
/// own error status are checked first, with description substring matching
/// only as a fallback. Failures are surfaced once and never retried.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("invalid API credential: {0}")]
    InvalidCredential(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("content blocked: {0}")]
    ContentBlocked(String),

    #[error("model request failed: {0}")]
    Unclassified(String),
}

impl ModelError {
    /// Fixed user-safe message for this error kind
    pub fn user_message(&self) -> &'static str {
        match self {
            ModelError::InvalidCredential(_) => {
                "The configured API key was rejected. Please check the server configuration."
            }
            ModelError::QuotaExceeded(_) => {
                "The API quota has been exhausted. Please try again later."
            }
            ModelError::ContentBlocked(_) => {
                "The request was blocked by the model's safety filters. Please try rephrasing your message."
            }
            ModelError::Unclassified(_) => {
                "Something went wrong while generating a response. Please try again."
            }
        }
    }

    /// Fallback classification from an error description
    pub fn classify(detail: String) -> Self {
        let lower = detail.to_lowercase();
        if lower.contains("api key")
            || lower.contains("api_key_invalid")
            || lower.contains("unauthenticated")
        {
            ModelError::InvalidCredential(detail)
        } else if lower.contains("quota")
            || lower.contains("resource_exhausted")
            || lower.contains("rate limit")
        {
            ModelError::QuotaExceeded(detail)
        } else if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited")
        {
            ModelError::ContentBlocked(detail)
        } else {
            ModelError::Unclassified(detail)
        }
    }
}

/// Boundary trait for the generative model
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Start one model invocation, returning its fragment stream
    async fn generate(&self, prompt: Prompt) -> Result<FragmentStream, ModelError>;
}
