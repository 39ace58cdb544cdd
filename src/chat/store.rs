//! In-memory conversation storage

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use super::{Conversation, ConversationSummary, Message};

/// Keyed collection of conversations and their ordered message lists.
///
/// All operations are synchronous; per-conversation message order is
/// serialized by the write lock, so concurrent appends against the same
/// identifier never lose or reorder entries. Storage is unbounded and lives
/// for the process lifetime: eviction, if wanted, is the caller's
/// responsibility.
#[derive(Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty conversation and return it
    pub fn create(&self) -> Conversation {
        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
            created_at: Utc::now(),
        };
        self.conversations
            .write()
            .insert(conversation.id.clone(), conversation.clone());
        conversation
    }

    /// Get a snapshot of a conversation
    pub fn get(&self, id: &str) -> Option<Conversation> {
        self.conversations.read().get(id).cloned()
    }

    /// List all conversations, newest first
    pub fn list(&self) -> Vec<ConversationSummary> {
        let mut summaries: Vec<ConversationSummary> = self
            .conversations
            .read()
            .values()
            .map(|c| ConversationSummary {
                id: c.id.clone(),
                message_count: c.messages.len(),
                created_at: c.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Append a message; returns false if the conversation does not exist
    pub fn append_message(&self, id: &str, message: Message) -> bool {
        match self.conversations.write().get_mut(id) {
            Some(conversation) => {
                conversation.messages.push(message);
                true
            }
            None => false,
        }
    }

    /// Delete a conversation; returns false if it does not exist
    pub fn delete(&self, id: &str) -> bool {
        self.conversations.write().remove(id).is_some()
    }
}
