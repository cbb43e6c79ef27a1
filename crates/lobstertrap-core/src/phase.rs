use serde::{Deserialize, Serialize};

/// Lifecycle phase of a game. Only `Lobby` and `Completed` carry no
/// deadline; every other phase is timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lobby,
    Discussion,
    Voting,
    Reveal,
    Completed,
}

impl Phase {
    pub fn is_timed(self) -> bool {
        !matches!(self, Phase::Lobby | Phase::Completed)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Lobby => "lobby",
            Phase::Discussion => "discussion",
            Phase::Voting => "voting",
            Phase::Reveal => "reveal",
            Phase::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Hidden role dealt to each participant when the game starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Trap,
    Survivor,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Role::Trap => "trap",
            Role::Survivor => "survivor",
        })
    }
}

/// Terminal outcome of a completed game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Trap,
    Survivors,
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Winner::Trap => "trap",
            Winner::Survivors => "survivors",
        })
    }
}
