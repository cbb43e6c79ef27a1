use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;
use crate::phase::{Phase, Role, Winner};
use crate::player::GamePlayer;
use crate::time;

/// A lobby auto-starts the moment the fifth player joins.
pub const MAX_PLAYERS: usize = 5;

/// One ballot in the current round. The vote list is cleared every time a
/// voting phase opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter_id: Uuid,
    pub target_id: Uuid,
}

/// Aggregate root for a single game. Created as a 1-player lobby, mutated
/// by joins/leaves until full, then driven by the phase engine until
/// `Completed`, after which it is never mutated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: Uuid,
    /// Opaque reference to the external settlement contract's game record,
    /// supplied by the lobby creator. Not validated here.
    pub external_ref: Option<String>,
    pub phase: Phase,
    /// 0 in lobby, 1 from game start, +1 each survived round.
    pub round: u32,
    /// Join order; at most [`MAX_PLAYERS`] entries.
    pub players: Vec<GamePlayer>,
    pub messages: Vec<Message>,
    /// Votes of the current round only.
    pub votes: Vec<Vote>,
    /// Eliminated player ids, append-only, in elimination order.
    pub eliminated: Vec<Uuid>,
    /// Cached id of the one player holding [`Role::Trap`].
    pub trap_id: Option<Uuid>,
    pub winner: Option<Winner>,
    pub created_at: u64,
    /// Unix millis; set whenever the phase is timed, cleared otherwise.
    pub phase_deadline: Option<u64>,
}

impl Game {
    pub fn new(creator: GamePlayer, external_ref: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_ref,
            phase: Phase::Lobby,
            round: 0,
            players: vec![creator],
            messages: Vec::new(),
            votes: Vec::new(),
            eliminated: Vec::new(),
            trap_id: None,
            winner: None,
            created_at: time::unix_millis(),
            phase_deadline: None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    pub fn player(&self, player_id: Uuid) -> Option<&GamePlayer> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn player_mut(&mut self, player_id: Uuid) -> Option<&mut GamePlayer> {
        self.players.iter_mut().find(|p| p.player_id == player_id)
    }

    pub fn is_member(&self, player_id: Uuid) -> bool {
        self.player(player_id).is_some()
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }

    pub fn trap_alive(&self) -> bool {
        self.players
            .iter()
            .any(|p| p.alive && p.role == Some(Role::Trap))
    }

    /// Mark a player dead and record the elimination. The alive flag and
    /// the eliminated list change together or not at all. Returns false
    /// for unknown or already-dead players.
    pub fn eliminate(&mut self, player_id: Uuid) -> bool {
        match self.player_mut(player_id) {
            Some(p) if p.alive => {
                p.alive = false;
                self.eliminated.push(player_id);
                true
            },
            _ => false,
        }
    }

    /// True once every living player has a ballot in the current round.
    pub fn all_alive_voted(&self) -> bool {
        let alive = self.alive_count();
        alive > 0 && self.votes.len() >= alive
    }

    /// Clear the round's votes and voting flags ahead of a new round or a
    /// fresh voting phase.
    pub fn reset_votes(&mut self) {
        self.votes.clear();
        for p in &mut self.players {
            p.has_voted = false;
        }
    }

    /// The players owed a payout: the trap if it won, otherwise the
    /// surviving survivors.
    pub fn winning_players(&self) -> Vec<&GamePlayer> {
        match self.winner {
            Some(Winner::Trap) => self
                .players
                .iter()
                .filter(|p| p.role == Some(Role::Trap))
                .collect(),
            Some(Winner::Survivors) => self
                .players
                .iter()
                .filter(|p| p.alive && p.role == Some(Role::Survivor))
                .collect(),
            None => Vec::new(),
        }
    }
}
