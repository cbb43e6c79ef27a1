use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::Role;
use crate::time;

/// A registered identity. Immutable after creation; registering the same
/// wallet again returns this record unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    /// Lowercased 0x address, globally unique across the registry.
    pub wallet: String,
    /// Bearer credential issued at registration (`lt_` prefix).
    pub access_key: String,
    /// Short code the player must include in their public proof post.
    pub verification_code: String,
    pub created_at: u64,
}

impl Player {
    pub fn new(name: &str, wallet: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            wallet: wallet.to_ascii_lowercase(),
            access_key: format!("lt_{}", Uuid::new_v4().simple()),
            verification_code: generate_verification_code(),
            created_at: time::unix_millis(),
        }
    }
}

/// Per-game participant snapshot, denormalized from a [`Player`] at
/// create/join time. `role` is written exactly once at game start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePlayer {
    pub player_id: Uuid,
    pub name: String,
    pub wallet: String,
    pub role: Option<Role>,
    pub alive: bool,
    pub has_voted: bool,
}

impl GamePlayer {
    pub fn from_player(player: &Player) -> Self {
        Self {
            player_id: player.id,
            name: player.name.clone(),
            wallet: player.wallet.clone(),
            role: None,
            alive: true,
            has_voted: false,
        }
    }
}

fn generate_verification_code() -> String {
    let mut code = Uuid::new_v4().simple().to_string();
    code.truncate(8);
    code
}
