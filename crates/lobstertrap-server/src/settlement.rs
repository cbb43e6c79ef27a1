use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

/// Failure from the settlement boundary (network or chain error).
#[derive(Debug)]
pub struct SettlementError(pub String);

impl std::fmt::Display for SettlementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SettlementError {}

/// On-chain payout boundary. Called fire-and-forget when a game completes;
/// a failure is logged and never un-completes the game. Retry and
/// reconciliation live outside this process.
#[async_trait]
pub trait SettlementOracle: Send + Sync {
    /// Pay out the winners of the externally-referenced game. Returns a
    /// transaction id.
    async fn settle_game(
        &self,
        external_ref: &str,
        winner_wallets: &[String],
    ) -> Result<String, SettlementError>;
}

/// Default oracle: records settlements in memory and logs them instead of
/// touching a chain. Doubles as the test spy.
#[derive(Default)]
pub struct LogOnlySettlement {
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl LogOnlySettlement {
    /// Settlements recorded so far, as (external_ref, winner wallets).
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SettlementOracle for LogOnlySettlement {
    async fn settle_game(
        &self,
        external_ref: &str,
        winner_wallets: &[String],
    ) -> Result<String, SettlementError> {
        tracing::info!(
            external_ref,
            winners = ?winner_wallets,
            "Log-only settlement recorded"
        );
        self.calls
            .lock()
            .unwrap()
            .push((external_ref.to_string(), winner_wallets.to_vec()));
        Ok(format!("logged-{}", Uuid::new_v4().simple()))
    }
}
