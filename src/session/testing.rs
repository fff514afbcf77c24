//! Mock implementations for testing
//!
//! These mocks enable orchestration tests without real I/O: the mock
//! gateway records calls, serves seeded data, and lets tests push
//! subscription events by hand.

use crate::gateway::{
    Conversation, Customer, GatewayError, Message, MessageSubscription, NewCustomer,
    SupportGateway,
};
use crate::identity::{IdentityStore, StoreResult};
use crate::upload::{Attachment, FileUploader, UploadReceipt};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Gateway
// ============================================================================

#[derive(Default)]
struct MockGatewayState {
    next_id: u64,
    customers_created: u32,
    conversations_created: u32,
    message_creates: u32,
    fail_create_customer: bool,
    fail_create_conversation: bool,
    fail_create_message: bool,
    conversations: Vec<Conversation>,
    histories: HashMap<String, Vec<Message>>,
    created_channel_names: Vec<String>,
    create_message_calls: Vec<(String, String)>,
    subscribe_count: u32,
    subscribers: HashMap<String, mpsc::Sender<Result<Message, GatewayError>>>,
}

impl MockGatewayState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// Mock gateway serving seeded data and hand-pushed subscription events
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<MockGatewayState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_conversations(&self, conversations: Vec<Conversation>) {
        self.state.lock().unwrap().conversations = conversations;
    }

    pub fn seed_history(&self, conversation_id: &str, messages: Vec<Message>) {
        self.state
            .lock()
            .unwrap()
            .histories
            .insert(conversation_id.to_string(), messages);
    }

    pub fn fail_create_customer(&self, fail: bool) {
        self.state.lock().unwrap().fail_create_customer = fail;
    }

    pub fn fail_create_conversation(&self, fail: bool) {
        self.state.lock().unwrap().fail_create_conversation = fail;
    }

    pub fn fail_create_message(&self, fail: bool) {
        self.state.lock().unwrap().fail_create_message = fail;
    }

    pub fn customers_created(&self) -> u32 {
        self.state.lock().unwrap().customers_created
    }

    pub fn conversations_created(&self) -> u32 {
        self.state.lock().unwrap().conversations_created
    }

    pub fn message_creates(&self) -> u32 {
        self.state.lock().unwrap().message_creates
    }

    pub fn created_channel_names(&self) -> Vec<String> {
        self.state.lock().unwrap().created_channel_names.clone()
    }

    pub fn create_message_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().create_message_calls.clone()
    }

    pub fn subscribe_count(&self) -> u32 {
        self.state.lock().unwrap().subscribe_count
    }

    /// Push a subscription event; returns false when no live
    /// subscription for that conversation is listening
    pub fn push_message(&self, conversation_id: &str, message: Message) -> bool {
        let state = self.state.lock().unwrap();
        match state.subscribers.get(conversation_id) {
            Some(sender) => sender.try_send(Ok(message)).is_ok(),
            None => false,
        }
    }

    /// Push a subscription error frame
    pub fn push_error(&self, conversation_id: &str, error: GatewayError) -> bool {
        let state = self.state.lock().unwrap();
        match state.subscribers.get(conversation_id) {
            Some(sender) => sender.try_send(Err(error)).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl SupportGateway for MockGateway {
    async fn create_customer(&self, display_name: &str) -> Result<Customer, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create_customer {
            return Err(GatewayError::server_error("mock: customer creation failed"));
        }
        state.customers_created += 1;
        let id = state.next_id("customer");
        Ok(Customer {
            id,
            name: display_name.to_string(),
        })
    }

    async fn create_customer_with_conversation(
        &self,
        display_name: &str,
        channel_name: &str,
    ) -> Result<NewCustomer, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create_customer {
            return Err(GatewayError::server_error("mock: customer creation failed"));
        }
        state.customers_created += 1;
        let customer_id = state.next_id("customer");
        let conversation_id = state.next_id("conv");
        let conversation = Conversation {
            id: conversation_id,
            channel_name: channel_name.to_string(),
            updated_at: Utc::now(),
            agent: None,
            last_message: None,
        };
        state.conversations.push(conversation.clone());
        Ok(NewCustomer {
            customer: Customer {
                id: customer_id,
                name: display_name.to_string(),
            },
            conversations: vec![conversation],
        })
    }

    async fn create_conversation(
        &self,
        _customer_id: &str,
        channel_name: &str,
    ) -> Result<Conversation, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create_conversation {
            return Err(GatewayError::server_error(
                "mock: conversation creation failed",
            ));
        }
        state.conversations_created += 1;
        state.created_channel_names.push(channel_name.to_string());
        let id = state.next_id("conv");
        let conversation = Conversation {
            id,
            channel_name: channel_name.to_string(),
            updated_at: Utc::now(),
            agent: None,
            last_message: None,
        };
        state.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn list_conversations(
        &self,
        _customer_id: &str,
    ) -> Result<Vec<Conversation>, GatewayError> {
        Ok(self.state.lock().unwrap().conversations.clone())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, GatewayError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .histories
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_message(
        &self,
        text: &str,
        conversation_id: &str,
    ) -> Result<Message, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create_message {
            return Err(GatewayError::server_error("mock: message creation failed"));
        }
        state.message_creates += 1;
        state
            .create_message_calls
            .push((text.to_string(), conversation_id.to_string()));
        let id = state.next_id("msg");
        Ok(Message {
            id,
            text: text.to_string(),
            created_at: Utc::now(),
            sender: crate::gateway::MessageSender::Visitor,
        })
    }

    async fn subscribe_new_messages(
        &self,
        conversation_id: &str,
    ) -> Result<MessageSubscription, GatewayError> {
        let (tx, rx) = mpsc::channel(32);
        let mut state = self.state.lock().unwrap();
        state.subscribe_count += 1;
        state.subscribers.insert(conversation_id.to_string(), tx);
        drop(state);
        Ok(MessageSubscription::new(
            Box::pin(ReceiverStream::new(rx)),
            CancellationToken::new(),
        ))
    }
}

// ============================================================================
// Mock Uploader
// ============================================================================

/// Mock uploader returning queued results
#[derive(Default)]
pub struct MockUploader {
    results: Mutex<VecDeque<Result<UploadReceipt, GatewayError>>>,
    uploads: Mutex<Vec<Attachment>>,
}

impl MockUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_success(&self) {
        self.results
            .lock()
            .unwrap()
            .push_back(Ok(UploadReceipt(serde_json::json!({"id": "file-1"}))));
    }

    pub fn queue_error(&self, error: GatewayError) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    pub fn uploads(&self) -> Vec<Attachment> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileUploader for MockUploader {
    async fn upload(&self, attachment: Attachment) -> Result<UploadReceipt, GatewayError> {
        self.uploads.lock().unwrap().push(attachment);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::network("No mock upload result queued")))
    }
}

// ============================================================================
// In-memory identity store
// ============================================================================

/// Identity store backed by a plain map
#[derive(Default)]
pub struct MemoryIdentityStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}
