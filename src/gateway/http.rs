//! HTTP implementation of the support gateway
//!
//! Queries and mutations are GraphQL documents POSTed to the backend;
//! the live message subscription is a server-sent-event stream decoded
//! incrementally from the response body.

use super::types::{Agent, Conversation, Customer, Message, MessageSender, NewCustomer};
use super::{GatewayError, MessageSubscription, SupportGateway};
use crate::config::WidgetConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

const CREATE_CUSTOMER: &str = "
mutation createCustomer($name: String!) {
    createCustomer(name: $name) {
        id
        name
    }
}";

const CREATE_CUSTOMER_WITH_CONVERSATION: &str = "
mutation createCustomer($name: String!, $channelName: String!) {
    createCustomer(name: $name, conversations: [{
        channelName: $channelName,
    }]) {
        id
        name
        conversations {
            id
            updatedAt
            channelName
        }
    }
}";

const CREATE_CONVERSATION: &str = "
mutation createConversation($customerId: ID!, $channelName: String!) {
    createConversation(customerId: $customerId, channelName: $channelName) {
        id
        updatedAt
        channelName
        agent {
            id
            displayName
            avatarUrl
        }
        lastMessages {
            id
            text
            createdAt
            agent {
                id
                displayName
                avatarUrl
            }
        }
    }
}";

const LIST_CONVERSATIONS: &str = "
query allConversations($customerId: ID!) {
    allConversations(filter: {
        customer: {
            id: $customerId
        }
    }) {
        id
        updatedAt
        channelName
        agent {
            id
            displayName
            avatarUrl
        }
        lastMessages {
            id
            text
            createdAt
            agent {
                id
                displayName
                avatarUrl
            }
        }
    }
}";

const LIST_MESSAGES: &str = "
query allMessages($conversationId: ID!) {
    allMessages(filter: {
        conversation: {
            id: $conversationId
        }
    }) {
        id
        text
        createdAt
        agent {
            id
            displayName
            avatarUrl
        }
    }
}";

const CREATE_MESSAGE: &str = "
mutation createMessage($text: String!, $conversationId: ID!) {
    createMessage(text: $text, conversationId: $conversationId) {
        id
        text
        createdAt
        agent {
            id
            displayName
            avatarUrl
        }
    }
}";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const EVENTS_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Production gateway speaking GraphQL over HTTP plus SSE
pub struct HttpGateway {
    client: Client,
    events_client: Client,
    backend_url: String,
    events_url: String,
}

impl HttpGateway {
    pub fn new(config: &WidgetConfig) -> Self {
        Self::with_request_timeout(config, REQUEST_TIMEOUT)
    }

    fn with_request_timeout(config: &WidgetConfig, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        // The event stream stays open for the life of the subscription;
        // a total request timeout would sever healthy streams, so only
        // the connect phase gets a deadline here.
        let events_client = Client::builder()
            .connect_timeout(EVENTS_CONNECT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            events_client,
            backend_url: config.backend_url.clone(),
            events_url: config.events_url.clone(),
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, GatewayError> {
        let request = GraphQlRequest { query, variables };

        let response = self
            .client
            .post(&self.backend_url)
            .json(&request)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let envelope: GraphQlResponse<T> = serde_json::from_str(&body)
            .map_err(|e| GatewayError::unknown(format!("Failed to parse response: {e}")))?;

        if let Some(errors) = envelope.errors {
            if !errors.is_empty() {
                let combined = errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(GatewayError::invalid_request(combined));
            }
        }

        envelope
            .data
            .ok_or_else(|| GatewayError::unknown("Response contained no data"))
    }
}

#[async_trait]
impl SupportGateway for HttpGateway {
    async fn create_customer(&self, display_name: &str) -> Result<Customer, GatewayError> {
        let data: CreateCustomerData = self
            .execute(CREATE_CUSTOMER, json!({ "name": display_name }))
            .await?;
        Ok(data.create_customer.into_customer())
    }

    async fn create_customer_with_conversation(
        &self,
        display_name: &str,
        channel_name: &str,
    ) -> Result<NewCustomer, GatewayError> {
        let data: CreateCustomerData = self
            .execute(
                CREATE_CUSTOMER_WITH_CONVERSATION,
                json!({ "name": display_name, "channelName": channel_name }),
            )
            .await?;
        Ok(data.create_customer.into())
    }

    async fn create_conversation(
        &self,
        customer_id: &str,
        channel_name: &str,
    ) -> Result<Conversation, GatewayError> {
        let data: CreateConversationData = self
            .execute(
                CREATE_CONVERSATION,
                json!({ "customerId": customer_id, "channelName": channel_name }),
            )
            .await?;
        Ok(data.create_conversation.into())
    }

    async fn list_conversations(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Conversation>, GatewayError> {
        let data: AllConversationsData = self
            .execute(LIST_CONVERSATIONS, json!({ "customerId": customer_id }))
            .await?;
        Ok(data
            .all_conversations
            .into_iter()
            .map(Conversation::from)
            .collect())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, GatewayError> {
        let data: AllMessagesData = self
            .execute(LIST_MESSAGES, json!({ "conversationId": conversation_id }))
            .await?;
        Ok(data.all_messages.into_iter().map(Message::from).collect())
    }

    async fn create_message(
        &self,
        text: &str,
        conversation_id: &str,
    ) -> Result<Message, GatewayError> {
        let data: CreateMessageData = self
            .execute(
                CREATE_MESSAGE,
                json!({ "text": text, "conversationId": conversation_id }),
            )
            .await?;
        Ok(data.create_message.into())
    }

    async fn subscribe_new_messages(
        &self,
        conversation_id: &str,
    ) -> Result<MessageSubscription, GatewayError> {
        let url = format!("{}?conversation={}", self.events_url, conversation_id);
        let response = self
            .events_client
            .get(&url)
            .header("accept", "text/event-stream")
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let (tx, rx) = mpsc::channel::<Result<Message, GatewayError>>(64);
        let conversation = conversation_id.to_string();
        let mut bytes = Box::pin(response.bytes_stream());

        tokio::spawn(async move {
            let mut decoder = SseDecoder::new();
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    chunk = bytes.next() => match chunk {
                        Some(Ok(chunk)) => {
                            for frame in decoder.feed(&chunk) {
                                if !frame.is_message() {
                                    continue;
                                }
                                match serde_json::from_str::<WireMessage>(&frame.data) {
                                    Ok(wire) => {
                                        if tx.send(Ok(wire.into())).await.is_err() {
                                            return;
                                        }
                                    }
                                    Err(error) => {
                                        tracing::warn!(
                                            conversation = %conversation,
                                            %error,
                                            "Dropping undecodable event frame"
                                        );
                                    }
                                }
                            }
                        }
                        Some(Err(error)) => {
                            let _ = tx
                                .send(Err(GatewayError::network(format!(
                                    "Event stream error: {error}"
                                ))))
                                .await;
                            break;
                        }
                        None => break,
                    },
                }
            }
        });

        Ok(MessageSubscription::new(
            Box::pin(ReceiverStream::new(rx)),
            cancel,
        ))
    }
}

fn request_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::network(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        GatewayError::network(format!("Connection failed: {e}"))
    } else {
        GatewayError::unknown(format!("Request failed: {e}"))
    }
}

fn classify_status(status: reqwest::StatusCode, body: &str) -> GatewayError {
    match status.as_u16() {
        401 | 403 => GatewayError::auth(format!("Authentication failed: {body}")),
        404 => GatewayError::not_found(format!("Not found: {body}")),
        429 => GatewayError::rate_limit(format!("Rate limited: {body}")),
        400 => GatewayError::invalid_request(format!("Invalid request: {body}")),
        500..=599 => GatewayError::server_error(format!("Server error: {body}")),
        _ => GatewayError::unknown(format!("HTTP {status}: {body}")),
    }
}

// GraphQL wire types

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCustomerData {
    create_customer: WireCustomer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateConversationData {
    create_conversation: WireConversation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllConversationsData {
    all_conversations: Vec<WireConversation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllMessagesData {
    all_messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateMessageData {
    create_message: WireMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCustomer {
    id: String,
    name: String,
    #[serde(default)]
    conversations: Vec<WireConversation>,
}

impl WireCustomer {
    fn into_customer(self) -> Customer {
        Customer {
            id: self.id,
            name: self.name,
        }
    }
}

impl From<WireCustomer> for NewCustomer {
    fn from(wire: WireCustomer) -> Self {
        let WireCustomer {
            id,
            name,
            conversations,
        } = wire;
        NewCustomer {
            customer: Customer { id, name },
            conversations: conversations.into_iter().map(Conversation::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireConversation {
    id: String,
    channel_name: String,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    agent: Option<WireAgent>,
    #[serde(default)]
    last_messages: Vec<WireMessage>,
}

impl From<WireConversation> for Conversation {
    fn from(wire: WireConversation) -> Self {
        Conversation {
            id: wire.id,
            channel_name: wire.channel_name,
            updated_at: wire.updated_at,
            agent: wire.agent.map(Agent::from),
            // Backend returns the latest message first when asked for previews
            last_message: wire.last_messages.into_iter().next().map(Message::from),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAgent {
    id: String,
    display_name: String,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl From<WireAgent> for Agent {
    fn from(wire: WireAgent) -> Self {
        Agent {
            id: wire.id,
            display_name: wire.display_name,
            avatar_url: wire.avatar_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    id: String,
    text: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    agent: Option<WireAgent>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        let sender = match wire.agent {
            Some(agent) => MessageSender::Agent(agent.into()),
            None => MessageSender::Visitor,
        };
        Message {
            id: wire.id,
            text: wire.text,
            created_at: wire.created_at,
            sender,
        }
    }
}

// SSE decoding

/// One decoded server-sent event
#[derive(Debug, PartialEq, Eq)]
struct SseFrame {
    event: Option<String>,
    data: String,
}

impl SseFrame {
    /// Frames without an event name default to "message" per the SSE standard
    fn is_message(&self) -> bool {
        self.event.as_deref().map_or(true, |e| e == "message")
    }
}

/// Incremental SSE frame decoder; frames may span chunk boundaries
struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((end, skip)) = frame_boundary(&self.buf) {
            let block: Vec<u8> = self.buf.drain(..end + skip).collect();
            if let Some(frame) = parse_block(&block[..end]) {
                frames.push(frame);
            }
        }
        frames
    }
}

/// Find the first blank-line boundary; returns (frame end, separator len)
fn frame_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    for i in 0..buf.len().saturating_sub(1) {
        if buf[i] == b'\n' {
            if buf[i + 1] == b'\n' {
                return Some((i + 1, 1));
            }
            if buf[i + 1] == b'\r' && buf.get(i + 2) == Some(&b'\n') {
                return Some((i + 1, 2));
            }
        }
    }
    None
}

fn parse_block(block: &[u8]) -> Option<SseFrame> {
    let text = String::from_utf8_lossy(block);
    let mut event = None;
    let mut data = String::new();
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
        // id/retry/comment lines are ignored
    }
    if data.is_empty() {
        return None;
    }
    Some(SseFrame { event, data })
}
