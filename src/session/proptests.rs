//! Property tests for channel naming and name normalization

use super::channel::{channel_name, next_position, parse_position};
use crate::gateway::Conversation;
use crate::names;
use chrono::Utc;
use proptest::prelude::*;

fn conversation(channel: &str) -> Conversation {
    Conversation {
        id: format!("id-{channel}"),
        channel_name: channel.to_string(),
        updated_at: Utc::now(),
        agent: None,
        last_message: None,
    }
}

proptest! {
    #[test]
    fn prop_next_position_is_max_plus_one(
        positions in proptest::collection::vec(0u64..10_000, 1..20)
    ) {
        let conversations: Vec<Conversation> = positions
            .iter()
            .map(|p| conversation(&format!("some-visitor-{p}")))
            .collect();
        let expected = positions.iter().max().unwrap() + 1;
        prop_assert_eq!(next_position(&conversations), expected);
    }

    #[test]
    fn prop_channel_name_round_trips_position(
        name in "[A-Za-z]{1,8}(-[A-Za-z]{1,8}){0,2}",
        position in 0u64..100_000,
    ) {
        // Display names may themselves contain hyphens; only the
        // trailing segment encodes the position
        let channel = channel_name(&name, position);
        prop_assert_eq!(parse_position(&channel), Some(position));
    }

    #[test]
    fn prop_malformed_suffixes_never_panic(channel in ".{0,40}") {
        let _ = parse_position(&channel);
    }

    #[test]
    fn prop_normalized_names_are_bounded_and_spaceless(raw in ".{0,40}") {
        if let Some(name) = names::normalize(&raw) {
            prop_assert!(name.len() <= names::MAX_DISPLAY_NAME_LEN);
            prop_assert!(!name.contains(' '));
            prop_assert!(!name.is_empty());
        }
    }
}
