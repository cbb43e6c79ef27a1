use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time;

/// Maximum characters stored per chat message. Longer content is
/// truncated, not rejected.
pub const MAX_CONTENT_CHARS: usize = 500;

/// A chat message. Append-only and immutable once created; can only be
/// sent during the discussion phase but stays retrievable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub player_name: String,
    pub content: String,
    pub timestamp: u64,
}

impl Message {
    pub fn new(game_id: Uuid, player_id: Uuid, player_name: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id,
            player_id,
            player_name: player_name.to_string(),
            content: content.chars().take(MAX_CONTENT_CHARS).collect(),
            timestamp: time::unix_millis(),
        }
    }
}
