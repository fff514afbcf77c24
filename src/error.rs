//! Widget-level error types

use crate::gateway::GatewayError;
use crate::identity::StoreError;
use thiserror::Error;

/// Errors surfaced to the widget host
#[derive(Debug, Error)]
pub enum WidgetError {
    /// Bootstrap failure is fatal to widget initialization
    #[error("widget bootstrap failed: {0}")]
    Bootstrap(#[source] GatewayError),

    /// A backend operation was rejected
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Identity persistence failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Name generation exhausted its retry budget
    #[error("display name generation exhausted {attempts} attempts")]
    NameGeneration { attempts: u32 },

    /// Message text was empty after trimming
    #[error("message text is empty")]
    EmptyMessage,

    /// The live session was closed before the operation
    #[error("conversation session is closed")]
    SessionClosed,

    /// An operation required an open conversation
    #[error("no conversation is open")]
    NoOpenConversation,

    /// The requested conversation is not in the visitor's list
    #[error("unknown conversation: {0}")]
    UnknownConversation(String),

    /// File drops accept exactly one file
    #[error("expected exactly one file, got {count}")]
    MultiFileDrop { count: usize },

    /// Only one upload may be in flight at a time
    #[error("an upload is already in progress")]
    UploadInProgress,
}

impl WidgetError {
    /// Whether retrying the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            WidgetError::Bootstrap(e) | WidgetError::Gateway(e) => e.kind.is_retryable(),
            _ => false,
        }
    }
}
