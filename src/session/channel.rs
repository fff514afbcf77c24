//! Channel naming and conversation selection
//!
//! Channel names encode `<displayname>-<position>`, lowercase, with a
//! per-visitor position that only ever grows. Only the segment after
//! the last hyphen is parsed, so hyphenated display names are
//! tolerated.

use super::cache::ConversationCache;
use crate::error::WidgetError;
use crate::gateway::{Conversation, SupportGateway};
use crate::identity::Identity;
use std::sync::Mutex;

/// Position used for the conversation bundled with customer creation
pub const INITIAL_POSITION: u64 = 0;

/// Build a channel name for a display name and position
pub fn channel_name(display_name: &str, position: u64) -> String {
    format!("{display_name}-{position}").to_lowercase()
}

/// Parse the position suffix of a channel name, if it is numeric
pub fn parse_position(channel_name: &str) -> Option<u64> {
    let (_, suffix) = channel_name.rsplit_once('-')?;
    suffix.parse().ok()
}

/// Next channel position for a visitor: 1 for an empty cache, else one
/// past the greatest existing position. Malformed suffixes are skipped
/// rather than poisoning the computation.
pub fn next_position(conversations: &[Conversation]) -> u64 {
    conversations
        .iter()
        .filter_map(|c| parse_position(&c.channel_name))
        .max()
        .map_or(1, |max| max + 1)
}

/// Select an existing empty conversation, or create the next channel.
///
/// The reuse scan runs over the in-memory cache only. On creation
/// failure the cache is left unchanged so the caller can retry.
pub async fn select_or_create<G: SupportGateway>(
    gateway: &G,
    cache: &Mutex<ConversationCache>,
    identity: &Identity,
) -> Result<String, WidgetError> {
    let new_channel = {
        let cache = cache.lock().unwrap();
        if let Some(existing) = cache.first_empty() {
            tracing::debug!(
                conversation_id = %existing.id,
                channel = %existing.channel_name,
                "Reusing empty conversation"
            );
            return Ok(existing.id.clone());
        }
        channel_name(&identity.display_name, next_position(cache.conversations()))
    };

    let conversation = gateway
        .create_conversation(&identity.customer_id, &new_channel)
        .await?;
    tracing::info!(
        conversation_id = %conversation.id,
        channel = %new_channel,
        "Created conversation"
    );

    let id = conversation.id.clone();
    cache.lock().unwrap().push(conversation);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn conversation(channel: &str) -> Conversation {
        Conversation {
            id: format!("id-{channel}"),
            channel_name: channel.to_string(),
            updated_at: Utc::now(),
            agent: None,
            last_message: None,
        }
    }

    #[test]
    fn test_channel_name_is_lowercased() {
        assert_eq!(channel_name("Grumpy-Badger", 0), "grumpy-badger-0");
        assert_eq!(channel_name("Grumpy-Badger", 12), "grumpy-badger-12");
    }

    #[test]
    fn test_parse_position_takes_last_segment() {
        assert_eq!(parse_position("grumpy-badger-3"), Some(3));
        assert_eq!(parse_position("sly-0"), Some(0));
        assert_eq!(parse_position("no-suffix-here"), None);
        assert_eq!(parse_position("nodash"), None);
    }

    #[test]
    fn test_next_position_empty_cache() {
        assert_eq!(next_position(&[]), 1);
    }

    #[test]
    fn test_next_position_is_max_plus_one() {
        let conversations = vec![
            conversation("grumpy-badger-1"),
            conversation("grumpy-badger-3"),
            conversation("grumpy-badger-2"),
        ];
        assert_eq!(next_position(&conversations), 4);
    }

    #[test]
    fn test_next_position_skips_malformed() {
        let conversations = vec![
            conversation("grumpy-badger-1"),
            conversation("renamed-by-support"),
        ];
        assert_eq!(next_position(&conversations), 2);
    }

    #[test]
    fn test_next_position_all_malformed_falls_back() {
        let conversations = vec![conversation("renamed-by-support")];
        assert_eq!(next_position(&conversations), 1);
    }
}
