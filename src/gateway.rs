//! Backend gateway abstraction
//!
//! The widget talks to the support backend exclusively through the
//! [`SupportGateway`] trait so the orchestration logic can be exercised
//! against mocks without a live connection.

mod error;
mod http;
mod types;

pub use error::{GatewayError, GatewayErrorKind};
pub use http::HttpGateway;
pub use types::{Agent, Conversation, Customer, Message, MessageSender, NewCustomer};

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Stream of newly created messages for one conversation
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message, GatewayError>> + Send>>;

/// A live message subscription with explicit cancellation
pub struct MessageSubscription {
    pub stream: MessageStream,
    cancel: CancellationToken,
}

impl MessageSubscription {
    pub fn new(stream: MessageStream, cancel: CancellationToken) -> Self {
        Self { stream, cancel }
    }

    /// Stop the server push; idempotent
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for MessageSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Operations the widget consumes from the support backend
#[async_trait]
pub trait SupportGateway: Send + Sync {
    /// Register a new customer
    async fn create_customer(&self, display_name: &str) -> Result<Customer, GatewayError>;

    /// Register a new customer bundled with an initial conversation
    async fn create_customer_with_conversation(
        &self,
        display_name: &str,
        channel_name: &str,
    ) -> Result<NewCustomer, GatewayError>;

    /// Open a new conversation channel for an existing customer
    async fn create_conversation(
        &self,
        customer_id: &str,
        channel_name: &str,
    ) -> Result<Conversation, GatewayError>;

    /// All conversations belonging to a customer
    async fn list_conversations(&self, customer_id: &str)
        -> Result<Vec<Conversation>, GatewayError>;

    /// Full message history for a conversation, oldest first
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, GatewayError>;

    /// Create a visitor message in a conversation
    async fn create_message(
        &self,
        text: &str,
        conversation_id: &str,
    ) -> Result<Message, GatewayError>;

    /// Subscribe to messages created in one conversation
    async fn subscribe_new_messages(
        &self,
        conversation_id: &str,
    ) -> Result<MessageSubscription, GatewayError>;
}

#[async_trait]
impl<T: SupportGateway + ?Sized> SupportGateway for Arc<T> {
    async fn create_customer(&self, display_name: &str) -> Result<Customer, GatewayError> {
        (**self).create_customer(display_name).await
    }

    async fn create_customer_with_conversation(
        &self,
        display_name: &str,
        channel_name: &str,
    ) -> Result<NewCustomer, GatewayError> {
        (**self)
            .create_customer_with_conversation(display_name, channel_name)
            .await
    }

    async fn create_conversation(
        &self,
        customer_id: &str,
        channel_name: &str,
    ) -> Result<Conversation, GatewayError> {
        (**self).create_conversation(customer_id, channel_name).await
    }

    async fn list_conversations(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Conversation>, GatewayError> {
        (**self).list_conversations(customer_id).await
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, GatewayError> {
        (**self).list_messages(conversation_id).await
    }

    async fn create_message(
        &self,
        text: &str,
        conversation_id: &str,
    ) -> Result<Message, GatewayError> {
        (**self).create_message(text, conversation_id).await
    }

    async fn subscribe_new_messages(
        &self,
        conversation_id: &str,
    ) -> Result<MessageSubscription, GatewayError> {
        (**self).subscribe_new_messages(conversation_id).await
    }
}
