pub mod game;
pub mod message;
pub mod phase;
pub mod player;
pub mod roles;
pub mod tally;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use uuid::Uuid;

    use crate::game::{Game, Vote};
    use crate::player::GamePlayer;

    /// Create `n` game participants named Player1..PlayerN with fresh ids.
    pub fn make_game_players(n: usize) -> Vec<GamePlayer> {
        (0..n)
            .map(|i| GamePlayer {
                player_id: Uuid::new_v4(),
                name: format!("Player{}", i + 1),
                wallet: format!("0x{:040x}", i + 1),
                role: None,
                alive: true,
                has_voted: false,
            })
            .collect()
    }

    /// Create a full 5-player lobby-phase game.
    pub fn make_lobby_game(players: &[GamePlayer]) -> Game {
        let mut iter = players.iter().cloned();
        let creator = iter.next().expect("at least one player");
        let mut game = Game::new(creator, Some("42".to_string()));
        for p in iter {
            game.players.push(p);
        }
        game
    }

    pub fn vote(voter_id: Uuid, target_id: Uuid) -> Vote {
        Vote {
            voter_id,
            target_id,
        }
    }
}
