//! Display name generation for anonymous visitors
//!
//! Produces `Adjective-Animal` names short enough for channel naming.
//! The retry loop is bounded: if the word lists ever drift toward long
//! candidates, generation fails loudly instead of spinning.

use crate::error::WidgetError;
use rand::seq::SliceRandom;

/// Longest display name the channel-naming scheme tolerates
pub const MAX_DISPLAY_NAME_LEN: usize = 17;

const MAX_ATTEMPTS: u32 = 32;

const ADJECTIVES: &[&str] = &[
    "Grumpy", "Sleepy", "Dizzy", "Jolly", "Sly", "Brave", "Witty", "Fuzzy", "Peppy", "Quirky",
    "Zesty", "Mellow", "Snazzy", "Bouncy", "Dapper", "Frisky", "Plucky", "Breezy", "Spiffy",
    "Magnificent", "Adventurous",
];

const ANIMALS: &[&str] = &[
    "Badger", "Otter", "Lynx", "Heron", "Marmot", "Gecko", "Puffin", "Wombat", "Ferret", "Osprey",
    "Weasel", "Bison", "Jackal", "Toucan", "Gopher", "Walrus", "Mongoose", "Pangolin",
    "Rhinoceros", "Salamander",
];

/// Generate a random display name, at most [`MAX_DISPLAY_NAME_LEN`]
/// characters with no internal spaces
pub fn generate_display_name() -> Result<String, WidgetError> {
    let mut rng = rand::thread_rng();
    generate_with(|| {
        let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("Quiet");
        let animal = ANIMALS.choose(&mut rng).copied().unwrap_or("Fox");
        format!("{adjective} {animal}")
    })
}

/// Generate from an arbitrary candidate source, retrying rejected
/// candidates up to a fixed attempt budget
pub fn generate_with(mut candidates: impl FnMut() -> String) -> Result<String, WidgetError> {
    for _ in 0..MAX_ATTEMPTS {
        if let Some(name) = normalize(&candidates()) {
            return Ok(name);
        }
    }
    Err(WidgetError::NameGeneration {
        attempts: MAX_ATTEMPTS,
    })
}

/// Normalize a raw candidate: spaces become hyphens; rejects empty or
/// over-long results
pub(crate) fn normalize(raw: &str) -> Option<String> {
    let name = raw.trim().replace(' ', "-");
    if name.is_empty() || name.len() > MAX_DISPLAY_NAME_LEN {
        return None;
    }
    Some(name)
}
