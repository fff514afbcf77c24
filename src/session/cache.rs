//! In-memory conversation list cache
//!
//! Reflects every conversation known for the visitor so list previews
//! stay fresh without re-querying the backend. Updates never reorder
//! the sequence; renderers that want recency order re-sort at read
//! time.

use crate::gateway::{Conversation, Message};
use std::collections::HashMap;

/// Conversation cache with O(1) id lookup
#[derive(Default)]
pub struct ConversationCache {
    conversations: Vec<Conversation>,
    index: HashMap<String, usize>,
}

impl ConversationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a conversation; replaces any stale entry with the same id
    pub fn push(&mut self, conversation: Conversation) {
        if let Some(&slot) = self.index.get(&conversation.id) {
            self.conversations[slot] = conversation;
            return;
        }
        self.index
            .insert(conversation.id.clone(), self.conversations.len());
        self.conversations.push(conversation);
    }

    pub fn get(&self, conversation_id: &str) -> Option<&Conversation> {
        self.index
            .get(conversation_id)
            .map(|&slot| &self.conversations[slot])
    }

    pub fn contains(&self, conversation_id: &str) -> bool {
        self.index.contains_key(conversation_id)
    }

    /// Replace the cached preview for one conversation, leaving every
    /// other entry and the sequence order untouched
    pub fn update_preview(&mut self, conversation_id: &str, message: &Message) -> bool {
        let Some(&slot) = self.index.get(conversation_id) else {
            return false;
        };
        let conversation = &mut self.conversations[slot];
        conversation.updated_at = message.created_at;
        conversation.last_message = Some(message.clone());
        true
    }

    /// First conversation no message has been posted to, if any
    pub fn first_empty(&self) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.is_empty())
    }

    /// Cache order: insertion order, never resorted on update
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Most recently active first, computed at read time
    pub fn by_recency(&self) -> Vec<Conversation> {
        let mut sorted = self.conversations.clone();
        sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sorted
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
