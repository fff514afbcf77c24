//! Session bootstrap
//!
//! Ensures a visitor identity exists and loads the visitor's
//! conversation list. Backend failure here is fatal to widget
//! initialization; in particular no identity is persisted if customer
//! creation fails partway.

use super::channel;
use crate::error::WidgetError;
use crate::gateway::{Conversation, SupportGateway};
use crate::identity::{self, Identity, IdentityStore};
use crate::names;

/// Result of a successful bootstrap
#[derive(Debug)]
pub struct BootstrapOutcome {
    pub identity: Identity,
    /// Most recently active first
    pub conversations: Vec<Conversation>,
}

/// Ensure an identity exists and load the conversation list
pub async fn bootstrap<G: SupportGateway, S: IdentityStore>(
    gateway: &G,
    store: &S,
) -> Result<BootstrapOutcome, WidgetError> {
    if let Some(identity) = identity::load_identity(store)? {
        tracing::debug!(customer_id = %identity.customer_id, "Found persisted identity");
        let mut conversations = gateway
            .list_conversations(&identity.customer_id)
            .await
            .map_err(WidgetError::Bootstrap)?;
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        return Ok(BootstrapOutcome {
            identity,
            conversations,
        });
    }

    let display_name = names::generate_display_name()?;
    let initial_channel = channel::channel_name(&display_name, channel::INITIAL_POSITION);
    let created = gateway
        .create_customer_with_conversation(&display_name, &initial_channel)
        .await
        .map_err(WidgetError::Bootstrap)?;

    let identity = Identity {
        customer_id: created.customer.id.clone(),
        display_name,
    };
    identity::save_identity(store, &identity)?;
    tracing::info!(
        customer_id = %identity.customer_id,
        display_name = %identity.display_name,
        "Created new visitor identity"
    );

    Ok(BootstrapOutcome {
        identity,
        conversations: created.conversations,
    })
}
