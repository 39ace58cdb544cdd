//! Conversation and message data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Name used when rendering transcripts
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One turn in a conversation
///
/// Immutable once appended; the in-flight assistant reply exists only as
/// relay accumulators until it is finalized into a `Message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Input image attached by the user (legacy single-image field)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Images generated by the model, in generation order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a user message
    pub fn user(content: &str, image: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.to_string(),
            image,
            images: None,
            created_at: Utc::now(),
        }
    }

    /// Create an assistant message; an empty image list is omitted entirely
    pub fn assistant(id: String, content: String, images: Vec<String>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content,
            image: None,
            images: if images.is_empty() { None } else { Some(images) },
            created_at: Utc::now(),
        }
    }

    /// References to the model-generated images, if any
    pub fn image_refs(&self) -> &[String] {
        self.images.as_deref().unwrap_or_default()
    }
}

/// A conversation: ordered messages plus metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

/// Listing entry for a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
}
