//! Domain types shared between the gateway and the session layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of characters shown in a conversation list preview
pub const PREVIEW_LENGTH: usize = 32;

/// A registered visitor as the backend sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
}

/// A support agent; absent from a conversation until one joins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Who authored a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageSender {
    Visitor,
    Agent(Agent),
}

/// An immutable chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub sender: MessageSender,
}

impl Message {
    pub fn is_from_agent(&self) -> bool {
        matches!(self.sender, MessageSender::Agent(_))
    }

    /// Short snippet for conversation list previews
    pub fn preview(&self) -> String {
        let mut chars = self.text.chars();
        let snippet: String = chars.by_ref().take(PREVIEW_LENGTH).collect();
        if chars.next().is_some() {
            format!("{snippet}...")
        } else {
            snippet
        }
    }
}

/// A support conversation with its cached last-message projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub channel_name: String,
    pub updated_at: DateTime<Utc>,
    pub agent: Option<Agent>,
    pub last_message: Option<Message>,
}

impl Conversation {
    /// A conversation no message has been posted to yet
    pub fn is_empty(&self) -> bool {
        self.last_message.is_none()
    }
}

/// Result of registering a customer, possibly with a bundled conversation
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub customer: Customer,
    pub conversations: Vec<Conversation>,
}
