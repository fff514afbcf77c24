//! Session orchestration
//!
//! `SupportSession` owns the visitor identity, the conversation list
//! cache, and at most one live conversation. All backend access flows
//! through the gateway trait; identity is threaded explicitly rather
//! than read from ambient storage.

mod bootstrap;
mod cache;
mod channel;
mod live;

#[cfg(test)]
pub mod testing;

#[cfg(test)]
mod proptests;

pub use bootstrap::{bootstrap, BootstrapOutcome};
pub use cache::ConversationCache;
pub use channel::{channel_name, next_position, parse_position, select_or_create};
pub use live::{LiveConversation, MessageBuffer};

use crate::error::WidgetError;
use crate::gateway::{Conversation, Message, SupportGateway};
use crate::identity::{Identity, IdentityStore};
use crate::upload::{Attachment, FileUploader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Fixed text of the message sent after a successful upload; the upload
/// receipt body is deliberately not reflected in the message
pub const UPLOAD_PLACEHOLDER_TEXT: &str = "Uploaded image";

/// The widget's top-level state machine
pub struct SupportSession<G, U> {
    gateway: Arc<G>,
    uploader: U,
    identity: Identity,
    cache: Arc<Mutex<ConversationCache>>,
    active: Option<LiveConversation<G>>,
    uploading: AtomicBool,
}

impl<G: SupportGateway + 'static, U: FileUploader> SupportSession<G, U> {
    /// Bootstrap the visitor identity and conversation list.
    ///
    /// Backend failure here is fatal to initialization.
    pub async fn start<S: IdentityStore>(
        gateway: G,
        store: &S,
        uploader: U,
    ) -> Result<Self, WidgetError> {
        let gateway = Arc::new(gateway);
        let outcome = bootstrap(gateway.as_ref(), store).await?;

        let mut cache = ConversationCache::new();
        for conversation in outcome.conversations {
            cache.push(conversation);
        }

        Ok(Self {
            gateway,
            uploader,
            identity: outcome.identity,
            cache: Arc::new(Mutex::new(cache)),
            active: None,
            uploading: AtomicBool::new(false),
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Conversations in cache order
    pub fn conversations(&self) -> Vec<Conversation> {
        self.cache.lock().unwrap().conversations().to_vec()
    }

    /// Conversations sorted most recently active first
    pub fn conversations_by_recency(&self) -> Vec<Conversation> {
        self.cache.lock().unwrap().by_recency()
    }

    pub fn active_conversation_id(&self) -> Option<String> {
        self.active
            .as_ref()
            .map(|live| live.conversation_id().to_string())
    }

    /// Open a conversation from the list, closing any previous live
    /// session first so stale events can never be applied
    pub async fn open_conversation(&mut self, conversation_id: &str) -> Result<(), WidgetError> {
        if !self.cache.lock().unwrap().contains(conversation_id) {
            return Err(WidgetError::UnknownConversation(
                conversation_id.to_string(),
            ));
        }
        self.close_active().await;
        let live =
            LiveConversation::open(self.gateway.clone(), self.cache.clone(), conversation_id)
                .await?;
        self.active = Some(live);
        Ok(())
    }

    /// "New Conversation": reuse an empty channel or create the next
    /// one, then open it
    pub async fn start_conversation(&mut self) -> Result<String, WidgetError> {
        let conversation_id =
            select_or_create(self.gateway.as_ref(), &self.cache, &self.identity).await?;
        self.open_conversation(&conversation_id).await?;
        Ok(conversation_id)
    }

    /// Close the live session, if any, and wait for its pump to exit
    pub async fn close_active(&mut self) {
        if let Some(mut live) = self.active.take() {
            live.shutdown().await;
        }
    }

    /// Send visitor text to the open conversation
    pub async fn send(&self, text: &str) -> Result<Message, WidgetError> {
        let live = self.active.as_ref().ok_or(WidgetError::NoOpenConversation)?;
        live.send(text).await
    }

    /// Snapshot of the open conversation's message buffer
    pub fn messages(&self) -> Vec<Message> {
        self.active
            .as_ref()
            .map(LiveConversation::messages)
            .unwrap_or_default()
    }

    /// Receiver for messages merged into the open conversation
    pub fn subscribe_messages(&self) -> Option<broadcast::Receiver<Message>> {
        self.active.as_ref().map(LiveConversation::subscribe)
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst)
    }

    /// Handle a file drop: exactly one file, uploaded to the external
    /// endpoint; on success a fixed placeholder message is sent. On
    /// failure the uploading flag is cleared and no message is created.
    pub async fn send_attachment(&self, mut files: Vec<Attachment>) -> Result<(), WidgetError> {
        let live = self.active.as_ref().ok_or(WidgetError::NoOpenConversation)?;
        if files.len() != 1 {
            return Err(WidgetError::MultiFileDrop { count: files.len() });
        }
        let file = files.remove(0);

        if self.uploading.swap(true, Ordering::SeqCst) {
            return Err(WidgetError::UploadInProgress);
        }
        let uploaded = self.uploader.upload(file).await;
        self.uploading.store(false, Ordering::SeqCst);

        match uploaded {
            Ok(_receipt) => {
                live.send(UPLOAD_PLACEHOLDER_TEXT).await?;
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, "Attachment upload failed");
                Err(error.into())
            }
        }
    }
}
