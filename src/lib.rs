//! Supportline - embeddable customer-support chat widget core
//!
//! Implements the session and conversation state machine behind a
//! support chat widget: anonymous identity bootstrap, conversation
//! discovery and creation with channel naming, live message
//! synchronization, and local cache reconciliation. Presentation is
//! left entirely to the host.

pub mod config;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod names;
pub mod session;
pub mod upload;

pub use config::WidgetConfig;
pub use error::WidgetError;
pub use gateway::{
    Agent, Conversation, Customer, GatewayError, HttpGateway, Message, MessageSender,
    MessageSubscription, NewCustomer, SupportGateway,
};
pub use identity::{Identity, IdentityStore, SqliteIdentityStore};
pub use session::SupportSession;
pub use upload::{Attachment, FileUploader, HttpUploader, UploadReceipt};
