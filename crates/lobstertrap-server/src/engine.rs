use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use lobstertrap_core::game::Game;
use lobstertrap_core::phase::{Phase, Winner};
use lobstertrap_core::player::Player;
use lobstertrap_core::{roles, tally, time};

use crate::config::TimingConfig;
use crate::registry::GameEntry;
use crate::settlement::SettlementOracle;
use crate::state::SharedRegistry;

/// Drives games through the phase cycle. All transitions happen under the
/// registry write lock, and every timed phase re-checks the expected phase
/// when its deadline task fires, so a transition runs at most once no
/// matter how timer expiry and early-vote completion race.
#[derive(Clone)]
pub struct Engine {
    registry: SharedRegistry,
    timing: TimingConfig,
    settlement: Arc<dyn SettlementOracle>,
}

impl Engine {
    pub fn new(
        registry: SharedRegistry,
        timing: TimingConfig,
        settlement: Arc<dyn SettlementOracle>,
    ) -> Self {
        Self {
            registry,
            timing,
            settlement,
        }
    }

    /// Join a lobby, starting the game when the last seat fills. The join
    /// and the start happen under one lock acquisition, so no other join
    /// or timer can interleave between them.
    pub async fn join_lobby(&self, game_id: Uuid, player: &Player) -> Result<Game, String> {
        let mut reg = self.registry.write().await;
        let outcome = reg.join_lobby(game_id, player)?;
        if outcome.lobby_full
            && let Some(entry) = reg.entry_mut(game_id)
        {
            self.begin_game(entry, game_id);
        }
        reg.game(game_id)
            .cloned()
            .ok_or_else(|| "Game not found".to_string())
    }

    /// Record a ballot. When the last living player votes, the voting
    /// phase closes immediately instead of waiting out the deadline.
    pub async fn cast_vote(
        &self,
        game_id: Uuid,
        voter_id: Uuid,
        target_id: Uuid,
    ) -> Result<(), String> {
        let mut reg = self.registry.write().await;
        let all_voted = reg.record_vote(game_id, voter_id, target_id)?;
        if all_voted
            && let Some(entry) = reg.entry_mut(game_id)
            && entry.game.phase == Phase::Voting
        {
            if let Some(timer) = entry.timer.take() {
                timer.abort();
            }
            tracing::info!(
                game = %game_id,
                round = entry.game.round,
                "All living players voted, closing voting early"
            );
            self.resolve_votes(entry, game_id);
        }
        Ok(())
    }

    fn begin_game(&self, entry: &mut GameEntry, game_id: Uuid) {
        let trap_id = roles::assign_roles(&mut entry.game.players, &mut rand::rng());
        entry.game.trap_id = Some(trap_id);
        entry.game.round = 1;
        entry.game.phase = Phase::Discussion;
        tracing::info!(game = %game_id, players = entry.game.players.len(), "Game started");
        self.arm_timer(entry, game_id, Phase::Discussion, self.timing.discussion());
    }

    /// Replace the game's deadline task. The previous handle is aborted
    /// before the new one is stored.
    fn arm_timer(&self, entry: &mut GameEntry, game_id: Uuid, phase: Phase, duration: Duration) {
        if let Some(old) = entry.timer.take() {
            old.abort();
        }
        entry.game.phase_deadline = Some(time::unix_millis() + duration.as_millis() as u64);

        let engine = self.clone();
        entry.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            engine.advance_phase(game_id, phase).await;
        }));
    }

    /// Deadline expiry for a timed phase. A stale timer (the game already
    /// moved on) is a logged no-op.
    async fn advance_phase(&self, game_id: Uuid, expected: Phase) {
        let mut reg = self.registry.write().await;
        let Some(entry) = reg.entry_mut(game_id) else {
            return;
        };
        if entry.game.phase != expected {
            tracing::debug!(
                game = %game_id,
                expected = %expected,
                actual = %entry.game.phase,
                "Stale phase timer ignored"
            );
            return;
        }
        entry.timer = None;

        match expected {
            Phase::Discussion => self.begin_voting(entry, game_id),
            Phase::Voting => self.resolve_votes(entry, game_id),
            Phase::Reveal => self.evaluate_round(entry, game_id),
            Phase::Lobby | Phase::Completed => {},
        }
    }

    fn begin_voting(&self, entry: &mut GameEntry, game_id: Uuid) {
        entry.game.reset_votes();
        entry.game.phase = Phase::Voting;
        tracing::info!(game = %game_id, round = entry.game.round, "Voting opened");
        self.arm_timer(entry, game_id, Phase::Voting, self.timing.voting());
    }

    /// Close the round's voting: eliminate the plurality target (random
    /// among tied leaders, nobody on zero ballots) and show the result.
    fn resolve_votes(&self, entry: &mut GameEntry, game_id: Uuid) {
        match tally::select_eliminated(&entry.game.votes, &mut rand::rng()) {
            Some(target) => {
                entry.game.eliminate(target);
                let role = entry.game.player(target).and_then(|p| p.role);
                tracing::info!(
                    game = %game_id,
                    round = entry.game.round,
                    player_id = %target,
                    role = ?role,
                    "Player voted out"
                );
            },
            None => {
                tracing::info!(
                    game = %game_id,
                    round = entry.game.round,
                    "No votes cast, nobody eliminated"
                );
            },
        }
        entry.game.phase = Phase::Reveal;
        self.arm_timer(entry, game_id, Phase::Reveal, self.timing.reveal());
    }

    /// After the reveal pause: finish the game if a side has won,
    /// otherwise open the next round.
    fn evaluate_round(&self, entry: &mut GameEntry, game_id: Uuid) {
        if !entry.game.trap_alive() {
            self.complete(entry, game_id, Winner::Survivors);
        } else if entry.game.alive_count() <= 2 {
            // Trap plus at most one survivor left: the trap can no longer
            // be outvoted.
            self.complete(entry, game_id, Winner::Trap);
        } else {
            entry.game.round += 1;
            entry.game.reset_votes();
            entry.game.phase = Phase::Discussion;
            tracing::info!(
                game = %game_id,
                round = entry.game.round,
                alive = entry.game.alive_count(),
                "Next round"
            );
            self.arm_timer(entry, game_id, Phase::Discussion, self.timing.discussion());
        }
    }

    /// Terminal transition. The game is marked completed synchronously;
    /// settlement is submitted fire-and-forget afterwards and its failure
    /// never rolls the game back.
    fn complete(&self, entry: &mut GameEntry, game_id: Uuid, winner: Winner) {
        if let Some(timer) = entry.timer.take() {
            timer.abort();
        }
        entry.game.winner = Some(winner);
        entry.game.phase = Phase::Completed;
        entry.game.phase_deadline = None;

        let wallets: Vec<String> = entry
            .game
            .winning_players()
            .iter()
            .map(|p| p.wallet.clone())
            .collect();
        tracing::info!(
            game = %game_id,
            winner = %winner,
            winners = wallets.len(),
            "Game completed"
        );

        if let Some(external_ref) = entry.game.external_ref.clone() {
            let oracle = Arc::clone(&self.settlement);
            tokio::spawn(async move {
                match oracle.settle_game(&external_ref, &wallets).await {
                    Ok(tx) => {
                        tracing::info!(game = %game_id, tx = %tx, "Settlement submitted");
                    },
                    Err(e) => {
                        tracing::error!(game = %game_id, error = %e, "Settlement failed");
                    },
                }
            });
        }
    }
}
