//! Client-visible chat event contract
//!
//! Every event serializes as `{"type": ..., "data": ...}`; the SSE transport
//! closes each stream with a `[DONE]` sentinel frame.

use serde::Serialize;

use super::Message;

/// Terminal sentinel frame closing an event stream
pub const STREAM_DONE: &str = "[DONE]";

/// Events emitted while a reply is generated, in fragment arrival order
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The stored user message opening this exchange
    UserMessage(Message),
    /// Placeholder for the assistant message about to be generated
    AssistantMessageStart(Message),
    /// Incremental response text
    TextChunk(TextChunk),
    /// A newly generated image
    ImageChunk(ImageChunk),
    /// The finalized assistant message
    Complete(Message),
    /// Generation failed; the conversation is unchanged
    Error(ErrorEvent),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChunk {
    pub id: String,
    /// The incremental text of this chunk
    pub content: String,
    /// Accumulated text so far
    pub full_text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageChunk {
    pub id: String,
    /// Reference of the newly stored image
    pub image: String,
    /// All image references so far, in generation order
    pub all_images: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    pub message: String,
}
