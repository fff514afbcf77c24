//! Live conversation session
//!
//! Owns the message buffer for the open conversation, the live
//! subscription pump, and the send operation. History is loaded fully
//! before the subscription opens; id-based de-duplication in the merge
//! covers messages that still arrive on both paths.

use super::cache::ConversationCache;
use crate::error::WidgetError;
use crate::gateway::{Message, MessageSubscription, SupportGateway};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const BROADCAST_CAPACITY: usize = 128;
const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(500);
const RECONNECT_MAX_SHIFT: u32 = 6;

/// Append-only message sequence with id-based de-duplication
#[derive(Default)]
pub struct MessageBuffer {
    messages: Vec<Message>,
    seen: HashSet<String>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message in arrival order; returns false for duplicates
    pub fn merge(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id.clone()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Handle to the currently open conversation
pub struct LiveConversation<G> {
    gateway: Arc<G>,
    conversation_id: String,
    buffer: Arc<Mutex<MessageBuffer>>,
    broadcast_tx: broadcast::Sender<Message>,
    cancel: CancellationToken,
    pump: Option<JoinHandle<()>>,
}

impl<G: SupportGateway + 'static> LiveConversation<G> {
    /// Load history, then subscribe, then start the pump task
    pub async fn open(
        gateway: Arc<G>,
        cache: Arc<Mutex<ConversationCache>>,
        conversation_id: &str,
    ) -> Result<Self, WidgetError> {
        let history = gateway.list_messages(conversation_id).await?;
        let mut buffer = MessageBuffer::new();
        for message in history {
            buffer.merge(message);
        }

        // Subscribe only after history is fully loaded
        let subscription = gateway.subscribe_new_messages(conversation_id).await?;

        let buffer = Arc::new(Mutex::new(buffer));
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let cancel = CancellationToken::new();

        let pump = tokio::spawn(pump(
            gateway.clone(),
            conversation_id.to_string(),
            subscription,
            buffer.clone(),
            cache,
            broadcast_tx.clone(),
            cancel.clone(),
        ));

        Ok(Self {
            gateway,
            conversation_id: conversation_id.to_string(),
            buffer,
            broadcast_tx,
            cancel,
            pump: Some(pump),
        })
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Snapshot of the in-memory message sequence
    pub fn messages(&self) -> Vec<Message> {
        self.buffer.lock().unwrap().messages().to_vec()
    }

    /// Receiver for messages as they are merged into the buffer
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.broadcast_tx.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Tear down the subscription; idempotent
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Close and wait for the pump to exit; used when switching
    /// conversations so no stale event can still be applied
    pub async fn shutdown(&mut self) {
        self.close();
        if let Some(handle) = self.pump.take() {
            let _ = handle.await;
        }
    }

    /// Send visitor text. No optimistic local insert: the created
    /// message arrives back through the live subscription.
    pub async fn send(&self, text: &str) -> Result<Message, WidgetError> {
        if self.is_closed() {
            return Err(WidgetError::SessionClosed);
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(WidgetError::EmptyMessage);
        }
        let message = self
            .gateway
            .create_message(trimmed, &self.conversation_id)
            .await?;
        Ok(message)
    }
}

impl<G> Drop for LiveConversation<G> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Drive the subscription: merge incoming messages in arrival order,
/// keep the list cache preview synchronized, fan out to watchers, and
/// on stream failure resubscribe with capped backoff, backfilling
/// whatever landed while the stream was down.
async fn pump<G: SupportGateway>(
    gateway: Arc<G>,
    conversation_id: String,
    mut subscription: MessageSubscription,
    buffer: Arc<Mutex<MessageBuffer>>,
    cache: Arc<Mutex<ConversationCache>>,
    broadcast_tx: broadcast::Sender<Message>,
    cancel: CancellationToken,
) {
    use futures::StreamExt;

    let mut attempt: u32 = 0;
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = subscription.stream.next() => match item {
                Some(Ok(message)) => {
                    attempt = 0;
                    let fresh = buffer.lock().unwrap().merge(message.clone());
                    if fresh {
                        cache.lock().unwrap().update_preview(&conversation_id, &message);
                        // Send fails only when nobody is listening
                        let _ = broadcast_tx.send(message);
                    } else {
                        tracing::debug!(
                            conversation_id = %conversation_id,
                            message_id = %message.id,
                            "Dropping duplicate message"
                        );
                    }
                }
                Some(Err(error)) => {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        %error,
                        "Message subscription error"
                    );
                    match resubscribe(gateway.as_ref(), &conversation_id, &cancel, &mut attempt).await {
                        Some(next) => {
                            subscription.cancel();
                            subscription = next;
                            replay_missed(
                                gateway.as_ref(),
                                &conversation_id,
                                &buffer,
                                &cache,
                                &broadcast_tx,
                            )
                            .await;
                        }
                        None => break,
                    }
                }
                None => {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        "Message subscription ended"
                    );
                    match resubscribe(gateway.as_ref(), &conversation_id, &cancel, &mut attempt).await {
                        Some(next) => {
                            subscription.cancel();
                            subscription = next;
                            replay_missed(
                                gateway.as_ref(),
                                &conversation_id,
                                &buffer,
                                &cache,
                                &broadcast_tx,
                            )
                            .await;
                        }
                        None => break,
                    }
                }
            },
        }
    }
    subscription.cancel();
}

/// Backfill messages created while the subscription was down. The
/// merge de-duplicates by id, so replaying the full history is safe
/// and anything already buffered stays put.
async fn replay_missed<G: SupportGateway>(
    gateway: &G,
    conversation_id: &str,
    buffer: &Mutex<MessageBuffer>,
    cache: &Mutex<ConversationCache>,
    broadcast_tx: &broadcast::Sender<Message>,
) {
    match gateway.list_messages(conversation_id).await {
        Ok(history) => {
            for message in history {
                let fresh = buffer.lock().unwrap().merge(message.clone());
                if fresh {
                    cache.lock().unwrap().update_preview(conversation_id, &message);
                    let _ = broadcast_tx.send(message);
                }
            }
        }
        Err(error) => {
            tracing::warn!(
                conversation_id = %conversation_id,
                %error,
                "Failed to backfill messages missed during reconnect"
            );
        }
    }
}

/// Re-establish the subscription with exponential backoff, capped, until
/// it succeeds or the session is cancelled
async fn resubscribe<G: SupportGateway>(
    gateway: &G,
    conversation_id: &str,
    cancel: &CancellationToken,
    attempt: &mut u32,
) -> Option<MessageSubscription> {
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        *attempt += 1;
        let shift = (*attempt - 1).min(RECONNECT_MAX_SHIFT);
        let delay = RECONNECT_BASE_DELAY * 2u32.saturating_pow(shift);

        tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            () = tokio::time::sleep(delay) => {}
        }

        match gateway.subscribe_new_messages(conversation_id).await {
            Ok(subscription) => {
                tracing::info!(
                    conversation_id = %conversation_id,
                    attempt = *attempt,
                    "Resubscribed to message stream"
                );
                return Some(subscription);
            }
            Err(error) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    attempt = *attempt,
                    %error,
                    "Resubscription failed"
                );
            }
        }
    }
}
