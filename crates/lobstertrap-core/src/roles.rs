use rand::Rng;
use uuid::Uuid;

use crate::phase::Role;
use crate::player::GamePlayer;

/// Deal roles for a starting game: one uniformly random player becomes the
/// trap, everyone else a survivor. Returns the trap's player id.
///
/// Callers must pass an OS-seeded generator (`rand::rng()`); role secrecy
/// depends on the pick being unpredictable to participants. Panics on an
/// empty player list, which the lobby flow never produces.
pub fn assign_roles<R: Rng + ?Sized>(players: &mut [GamePlayer], rng: &mut R) -> Uuid {
    let trap_index = rng.random_range(0..players.len());
    for (i, p) in players.iter_mut().enumerate() {
        p.role = Some(if i == trap_index {
            Role::Trap
        } else {
            Role::Survivor
        });
    }
    players[trap_index].player_id
}
