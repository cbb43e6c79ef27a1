use std::collections::HashMap;

use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use lobstertrap_core::game::{Game, MAX_PLAYERS, Vote};
use lobstertrap_core::message::Message;
use lobstertrap_core::phase::Phase;
use lobstertrap_core::player::{GamePlayer, Player};

/// A stored game plus its pending phase-deadline task. The handle is
/// aborted before a new deadline is armed and on early transitions, so at
/// most one timer is ever live per game.
pub struct GameEntry {
    pub game: Game,
    pub timer: Option<JoinHandle<()>>,
}

/// Result of a successful lobby join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The join filled the last seat; the caller must start the game.
    pub lobby_full: bool,
}

/// Counts for the health endpoint.
#[derive(Debug, Serialize)]
pub struct RegistryStats {
    pub registered_players: usize,
    pub open_lobbies: usize,
    pub live_games: usize,
    pub completed_games: usize,
}

/// In-memory store of players and games: the single mutation surface shared
/// by the HTTP layer and the phase engine. Constructed once at startup and
/// injected via shared state; lives for the whole process.
///
/// Membership note: nothing here stops a player from joining two active
/// games. Every create/join call path must first consult
/// [`GameRegistry::current_game_for_player`].
#[derive(Default)]
pub struct GameRegistry {
    players: HashMap<Uuid, Player>,
    /// access_key -> player id
    access_keys: HashMap<String, Uuid>,
    /// lowercased wallet -> player id
    wallets: HashMap<String, Uuid>,
    games: HashMap<Uuid, GameEntry>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player, or return the existing record when the wallet is
    /// already known (case-insensitive).
    pub fn register_player(&mut self, name: &str, wallet: &str) -> Player {
        let key = wallet.to_ascii_lowercase();
        if let Some(id) = self.wallets.get(&key)
            && let Some(existing) = self.players.get(id)
        {
            return existing.clone();
        }

        let player = Player::new(name, wallet);
        self.access_keys.insert(player.access_key.clone(), player.id);
        self.wallets.insert(player.wallet.clone(), player.id);
        self.players.insert(player.id, player.clone());
        tracing::info!(player_id = %player.id, name = %player.name, "Player registered");
        player
    }

    pub fn player_by_access_key(&self, key: &str) -> Option<&Player> {
        let id = self.access_keys.get(key)?;
        self.players.get(id)
    }

    pub fn player(&self, id: Uuid) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn game(&self, id: Uuid) -> Option<&Game> {
        self.games.get(&id).map(|e| &e.game)
    }

    pub fn entry_mut(&mut self, id: Uuid) -> Option<&mut GameEntry> {
        self.games.get_mut(&id)
    }

    /// Lobbies still waiting for players.
    pub fn open_lobbies(&self) -> Vec<&Game> {
        self.games
            .values()
            .map(|e| &e.game)
            .filter(|g| g.phase == Phase::Lobby && g.players.len() < MAX_PLAYERS)
            .collect()
    }

    /// Games in progress (neither lobby nor completed), for spectators.
    pub fn live_games(&self) -> Vec<&Game> {
        self.games
            .values()
            .map(|e| &e.game)
            .filter(|g| g.phase != Phase::Lobby && g.phase != Phase::Completed)
            .collect()
    }

    /// The non-completed game the player is currently a member of, if any.
    pub fn current_game_for_player(&self, player_id: Uuid) -> Option<&Game> {
        self.games
            .values()
            .map(|e| &e.game)
            .find(|g| g.phase != Phase::Completed && g.is_member(player_id))
    }

    /// Open a 1-player lobby. Returns the new game id.
    pub fn create_lobby(&mut self, player: &Player, external_ref: Option<String>) -> Uuid {
        let game = Game::new(GamePlayer::from_player(player), external_ref);
        let id = game.id;
        self.games.insert(id, GameEntry { game, timer: None });
        tracing::info!(game = %id, player_id = %player.id, "Lobby created");
        id
    }

    /// Join a lobby. Any join after the lobby phase is rejected, members
    /// included; re-joining a lobby the player is already in is a no-op
    /// success. Membership in any other live game is rejected here, under
    /// the same lock as the join itself.
    pub fn join_lobby(&mut self, game_id: Uuid, player: &Player) -> Result<JoinOutcome, String> {
        if let Some(current) = self.current_game_for_player(player.id)
            && current.id != game_id
        {
            return Err("Already in another game".to_string());
        }
        let entry = self
            .games
            .get_mut(&game_id)
            .ok_or_else(|| "Game not found".to_string())?;

        if entry.game.phase != Phase::Lobby {
            return Err("Game already started".to_string());
        }
        if entry.game.is_member(player.id) {
            return Ok(JoinOutcome { lobby_full: false });
        }
        if entry.game.is_full() {
            return Err("Lobby is full".to_string());
        }

        entry.game.players.push(GamePlayer::from_player(player));
        Ok(JoinOutcome {
            lobby_full: entry.game.is_full(),
        })
    }

    /// Leave a lobby. Returns false when the game is missing, not in the
    /// lobby phase, or the player is not a member. Removing the last
    /// player deletes the lobby.
    pub fn leave_lobby(&mut self, game_id: Uuid, player_id: Uuid) -> bool {
        let Some(entry) = self.games.get_mut(&game_id) else {
            return false;
        };
        if entry.game.phase != Phase::Lobby {
            return false;
        }
        let Some(idx) = entry
            .game
            .players
            .iter()
            .position(|p| p.player_id == player_id)
        else {
            return false;
        };

        entry.game.players.remove(idx);
        if entry.game.players.is_empty() {
            self.games.remove(&game_id);
            tracing::info!(game = %game_id, "Empty lobby removed");
        }
        true
    }

    /// Append a chat message. Only living members may post, and only
    /// during discussion. Content is truncated by [`Message::new`].
    pub fn record_message(
        &mut self,
        game_id: Uuid,
        player_id: Uuid,
        content: &str,
    ) -> Result<Message, String> {
        let entry = self
            .games
            .get_mut(&game_id)
            .ok_or_else(|| "Game not found".to_string())?;
        if entry.game.phase != Phase::Discussion {
            return Err("Messages are only allowed during discussion".to_string());
        }
        let Some(player) = entry.game.player(player_id) else {
            return Err("Not a member of this game".to_string());
        };
        if !player.alive {
            return Err("Eliminated players cannot send messages".to_string());
        }
        let name = player.name.clone();

        let message = Message::new(game_id, player_id, &name, content);
        entry.game.messages.push(message.clone());
        Ok(message)
    }

    /// Messages for a game, optionally only those strictly after `since`
    /// (unix millis). Missing games yield an empty list.
    pub fn messages_since(&self, game_id: Uuid, since: Option<u64>) -> Vec<Message> {
        let Some(game) = self.game(game_id) else {
            return Vec::new();
        };
        match since {
            Some(t) => game
                .messages
                .iter()
                .filter(|m| m.timestamp > t)
                .cloned()
                .collect(),
            None => game.messages.clone(),
        }
    }

    /// Record a ballot for the current round. Returns whether every living
    /// player has now voted (the early-transition condition).
    pub fn record_vote(
        &mut self,
        game_id: Uuid,
        voter_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, String> {
        let entry = self
            .games
            .get_mut(&game_id)
            .ok_or_else(|| "Game not found".to_string())?;
        let game = &mut entry.game;

        if game.phase != Phase::Voting {
            return Err("Voting is not open".to_string());
        }
        if voter_id == target_id {
            return Err("Cannot vote for yourself".to_string());
        }
        let Some(voter) = game.player(voter_id) else {
            return Err("Voter is not in this game".to_string());
        };
        if !voter.alive {
            return Err("Eliminated players cannot vote".to_string());
        }
        if voter.has_voted {
            return Err("Already voted this round".to_string());
        }
        let Some(target) = game.player(target_id) else {
            return Err("Target is not in this game".to_string());
        };
        if !target.alive {
            return Err("Cannot vote for an eliminated player".to_string());
        }

        game.votes.push(Vote {
            voter_id,
            target_id,
        });
        if let Some(voter) = game.player_mut(voter_id) {
            voter.has_voted = true;
        }
        Ok(game.all_alive_voted())
    }

    pub fn stats(&self) -> RegistryStats {
        let mut open_lobbies = 0;
        let mut live = 0;
        let mut completed = 0;
        for e in self.games.values() {
            match e.game.phase {
                Phase::Lobby => open_lobbies += 1,
                Phase::Completed => completed += 1,
                _ => live += 1,
            }
        }
        RegistryStats {
            registered_players: self.players.len(),
            open_lobbies,
            live_games: live,
            completed_games: completed,
        }
    }

    #[cfg(test)]
    pub fn game_exists(&self, id: Uuid) -> bool {
        self.games.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lobstertrap_core::phase::Role;
    use lobstertrap_core::roles;

    fn register_n(reg: &mut GameRegistry, n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| reg.register_player(&format!("Player{i}"), &format!("0x{:040x}", i + 1)))
            .collect()
    }

    /// Push a lobby straight into the voting phase with roles dealt.
    fn force_voting(reg: &mut GameRegistry, game_id: Uuid) {
        let entry = reg.entry_mut(game_id).unwrap();
        let trap_id = roles::assign_roles(&mut entry.game.players, &mut rand::rng());
        entry.game.trap_id = Some(trap_id);
        entry.game.round = 1;
        entry.game.phase = Phase::Voting;
    }

    #[test]
    fn registration_is_idempotent_by_wallet() {
        let mut reg = GameRegistry::new();
        let a = reg.register_player("Alice", "0xAbC0000000000000000000000000000000000001");
        let b = reg.register_player("Alice2", "0xabc0000000000000000000000000000000000001");
        assert_eq!(a.id, b.id);
        assert_eq!(a.name, b.name, "existing record returned unchanged");
        assert_eq!(reg.stats().registered_players, 1);
    }

    #[test]
    fn access_key_lookup_round_trips() {
        let mut reg = GameRegistry::new();
        let p = reg.register_player("Alice", "0x0000000000000000000000000000000000000001");
        let found = reg.player_by_access_key(&p.access_key).unwrap();
        assert_eq!(found.id, p.id);
        assert!(reg.player_by_access_key("lt_bogus").is_none());
    }

    #[test]
    fn create_and_join_lobby() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 2);
        let game_id = reg.create_lobby(&players[0], Some("42".into()));

        let outcome = reg.join_lobby(game_id, &players[1]).unwrap();
        assert!(!outcome.lobby_full);
        assert_eq!(reg.game(game_id).unwrap().players.len(), 2);
    }

    #[test]
    fn fifth_join_reports_lobby_full() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 5);
        let game_id = reg.create_lobby(&players[0], None);
        for p in &players[1..4] {
            assert!(!reg.join_lobby(game_id, p).unwrap().lobby_full);
        }
        assert!(reg.join_lobby(game_id, &players[4]).unwrap().lobby_full);
    }

    #[test]
    fn join_full_lobby_fails() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 6);
        let game_id = reg.create_lobby(&players[0], None);
        for p in &players[1..5] {
            reg.join_lobby(game_id, p).unwrap();
        }
        let err = reg.join_lobby(game_id, &players[5]).unwrap_err();
        assert!(err.contains("full"));
    }

    #[test]
    fn rejoin_is_noop_success() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 2);
        let game_id = reg.create_lobby(&players[0], None);
        reg.join_lobby(game_id, &players[1]).unwrap();
        let outcome = reg.join_lobby(game_id, &players[1]).unwrap();
        assert!(!outcome.lobby_full);
        assert_eq!(reg.game(game_id).unwrap().players.len(), 2);
    }

    #[test]
    fn member_rejoin_after_start_is_rejected() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 2);
        let game_id = reg.create_lobby(&players[0], None);
        reg.join_lobby(game_id, &players[1]).unwrap();
        reg.entry_mut(game_id).unwrap().game.phase = Phase::Discussion;

        let err = reg.join_lobby(game_id, &players[1]).unwrap_err();
        assert!(err.contains("already started"));
    }

    #[test]
    fn join_while_in_another_game_fails() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 2);
        let first = reg.create_lobby(&players[0], None);
        let second = reg.create_lobby(&players[1], None);

        let err = reg.join_lobby(second, &players[0]).unwrap_err();
        assert!(err.contains("Already in another game"));

        // Once the first game completes, the player is free again.
        reg.entry_mut(first).unwrap().game.phase = Phase::Completed;
        assert!(reg.join_lobby(second, &players[0]).is_ok());
    }

    #[test]
    fn join_missing_or_started_game_fails() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 2);
        assert!(reg.join_lobby(Uuid::new_v4(), &players[0]).is_err());

        let game_id = reg.create_lobby(&players[0], None);
        reg.entry_mut(game_id).unwrap().game.phase = Phase::Discussion;
        assert!(reg.join_lobby(game_id, &players[1]).is_err());
    }

    #[test]
    fn leave_last_player_deletes_lobby() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 1);
        let game_id = reg.create_lobby(&players[0], None);
        assert!(reg.leave_lobby(game_id, players[0].id));
        assert!(!reg.game_exists(game_id));
    }

    #[test]
    fn leave_outside_lobby_phase_fails() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 1);
        let game_id = reg.create_lobby(&players[0], None);
        reg.entry_mut(game_id).unwrap().game.phase = Phase::Discussion;
        assert!(!reg.leave_lobby(game_id, players[0].id));
    }

    #[test]
    fn current_game_skips_completed() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 1);
        let game_id = reg.create_lobby(&players[0], None);
        assert_eq!(reg.current_game_for_player(players[0].id).unwrap().id, game_id);

        reg.entry_mut(game_id).unwrap().game.phase = Phase::Completed;
        assert!(reg.current_game_for_player(players[0].id).is_none());
    }

    #[test]
    fn message_requires_discussion_phase() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 1);
        let game_id = reg.create_lobby(&players[0], None);

        assert!(reg.record_message(game_id, players[0].id, "hi").is_err());

        reg.entry_mut(game_id).unwrap().game.phase = Phase::Discussion;
        let msg = reg.record_message(game_id, players[0].id, "hi").unwrap();
        assert_eq!(msg.content, "hi");
        assert_eq!(reg.messages_since(game_id, None).len(), 1);
    }

    #[test]
    fn dead_players_cannot_message() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 2);
        let game_id = reg.create_lobby(&players[0], None);
        reg.join_lobby(game_id, &players[1]).unwrap();
        let entry = reg.entry_mut(game_id).unwrap();
        entry.game.phase = Phase::Discussion;
        entry.game.eliminate(players[1].id);

        assert!(reg.record_message(game_id, players[1].id, "boo").is_err());
    }

    #[test]
    fn messages_since_filters_strictly_after() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 1);
        let game_id = reg.create_lobby(&players[0], None);
        reg.entry_mut(game_id).unwrap().game.phase = Phase::Discussion;

        let first = reg.record_message(game_id, players[0].id, "one").unwrap();
        assert!(reg.messages_since(game_id, Some(first.timestamp)).is_empty());
        assert_eq!(reg.messages_since(game_id, Some(first.timestamp - 1)).len(), 1);
    }

    #[test]
    fn vote_rejects_self_double_and_dead() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 5);
        let game_id = reg.create_lobby(&players[0], None);
        for p in &players[1..] {
            reg.join_lobby(game_id, p).unwrap();
        }
        force_voting(&mut reg, game_id);

        // Self-vote
        assert!(reg.record_vote(game_id, players[0].id, players[0].id).is_err());
        // Valid vote
        assert!(!reg.record_vote(game_id, players[0].id, players[1].id).unwrap());
        // Double vote, any target
        assert!(reg.record_vote(game_id, players[0].id, players[2].id).is_err());

        // Dead voter and dead target
        reg.entry_mut(game_id).unwrap().game.eliminate(players[4].id);
        assert!(reg.record_vote(game_id, players[4].id, players[1].id).is_err());
        assert!(reg.record_vote(game_id, players[1].id, players[4].id).is_err());
    }

    #[test]
    fn vote_outside_voting_phase_fails() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 2);
        let game_id = reg.create_lobby(&players[0], None);
        reg.join_lobby(game_id, &players[1]).unwrap();
        assert!(reg.record_vote(game_id, players[0].id, players[1].id).is_err());
    }

    #[test]
    fn last_living_ballot_reports_all_voted() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 5);
        let game_id = reg.create_lobby(&players[0], None);
        for p in &players[1..] {
            reg.join_lobby(game_id, p).unwrap();
        }
        force_voting(&mut reg, game_id);
        // One player already eliminated: 4 living voters
        reg.entry_mut(game_id).unwrap().game.eliminate(players[4].id);

        assert!(!reg.record_vote(game_id, players[0].id, players[1].id).unwrap());
        assert!(!reg.record_vote(game_id, players[1].id, players[0].id).unwrap());
        assert!(!reg.record_vote(game_id, players[2].id, players[0].id).unwrap());
        assert!(reg.record_vote(game_id, players[3].id, players[0].id).unwrap());
    }

    #[test]
    fn open_and_live_listings() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 3);
        let lobby = reg.create_lobby(&players[0], None);
        let live = reg.create_lobby(&players[1], None);
        let done = reg.create_lobby(&players[2], None);
        reg.entry_mut(live).unwrap().game.phase = Phase::Voting;
        reg.entry_mut(done).unwrap().game.phase = Phase::Completed;

        assert_eq!(reg.open_lobbies().len(), 1);
        assert_eq!(reg.open_lobbies()[0].id, lobby);
        assert_eq!(reg.live_games().len(), 1);
        assert_eq!(reg.live_games()[0].id, live);

        let stats = reg.stats();
        assert_eq!(stats.open_lobbies, 1);
        assert_eq!(stats.live_games, 1);
        assert_eq!(stats.completed_games, 1);
    }

    #[test]
    fn role_assignment_on_forced_start() {
        let mut reg = GameRegistry::new();
        let players = register_n(&mut reg, 5);
        let game_id = reg.create_lobby(&players[0], None);
        for p in &players[1..] {
            reg.join_lobby(game_id, p).unwrap();
        }
        force_voting(&mut reg, game_id);

        let game = reg.game(game_id).unwrap();
        let traps = game
            .players
            .iter()
            .filter(|p| p.role == Some(Role::Trap))
            .count();
        assert_eq!(traps, 1);
        assert_eq!(game.trap_id, game.players.iter().find(|p| p.role == Some(Role::Trap)).map(|p| p.player_id));
    }
}
