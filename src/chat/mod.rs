//! Conversation state and the streaming relay
//!
//! Provides:
//! - Conversation/message data model
//! - In-memory conversation storage
//! - Prompt assembly from conversation history
//! - The relay turning model fragments into ordered client events

mod context;
mod events;
mod message;
mod relay;
mod store;

pub use context::{build_prompt, render_transcript, Attachment, Prompt};
pub use events::{ChatEvent, ErrorEvent, ImageChunk, TextChunk, STREAM_DONE};
pub use message::{Conversation, ConversationSummary, Message, Role};
pub use relay::{generate_reply, stream_reply};
pub use store::ConversationStore;
