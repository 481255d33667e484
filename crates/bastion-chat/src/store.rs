//! The conversation/message persistence contract the chat driver writes
//! through. The actual store is an external collaborator (spec.md §1);
//! this crate defines the seam plus an in-memory test double, the same
//! posture `bastion-db` takes for the relational store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A stored chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Message id.
    pub id: String,
    /// `"user"` or `"assistant"`.
    pub role: String,
    /// Message text.
    pub content: String,
    /// Free-form metadata (e.g. `interceptedBy`, tool-call summary).
    #[serde(default)]
    pub metadata: Value,
}

/// A conversation: an ordered message history plus a derived title.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation id.
    pub id: String,
    /// Display title, derived from the first prompt once set (§4.9).
    pub title: Option<String>,
    /// Messages in insertion order.
    pub messages: Vec<StoredMessage>,
}

/// Persistence contract for conversations and their messages (§6 "chat
/// persistence layer", out of scope for the core — this is the seam
/// `bastion-chat` dispatches through).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetch a conversation by id, or create a new one with that id (or a
    /// freshly generated one if `id` is `None`).
    async fn fetch_or_create(&self, id: Option<&str>) -> Conversation;

    /// Append `message` to `conversation_id`'s history.
    async fn append_message(&self, conversation_id: &str, message: StoredMessage);

    /// Set the title if the conversation does not already have one.
    async fn set_title_if_absent(&self, conversation_id: &str, title: &str);

    /// Load a conversation's current message history.
    async fn history(&self, conversation_id: &str) -> Vec<StoredMessage>;
}

/// An in-memory conversation store for tests and single-process
/// deployments without an external persistence layer.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: Mutex<HashMap<String, Conversation>>,
}

impl InMemoryConversationStore {
    /// Build an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Conversation>> {
        self.conversations
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn fetch_or_create(&self, id: Option<&str>) -> Conversation {
        let mut conversations = self.lock();
        let id = id.map(str::to_string).unwrap_or_else(|| Uuid::new_v4().to_string());
        conversations
            .entry(id.clone())
            .or_insert_with(|| Conversation {
                id,
                title: None,
                messages: Vec::new(),
            })
            .clone()
    }

    async fn append_message(&self, conversation_id: &str, message: StoredMessage) {
        let mut conversations = self.lock();
        if let Some(conversation) = conversations.get_mut(conversation_id) {
            conversation.messages.push(message);
        }
    }

    async fn set_title_if_absent(&self, conversation_id: &str, title: &str) {
        let mut conversations = self.lock();
        if let Some(conversation) = conversations.get_mut(conversation_id) {
            if conversation.title.is_none() {
                conversation.title = Some(title.to_string());
            }
        }
    }

    async fn history(&self, conversation_id: &str) -> Vec<StoredMessage> {
        self.lock()
            .get(conversation_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }
}
