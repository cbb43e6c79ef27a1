use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::ServerConfig;
use crate::engine::Engine;
use crate::identity::{AcceptAllVerifier, IdentityStore, NullIdentityStore, SocialProofVerifier};
use crate::registry::GameRegistry;
use crate::settlement::{LogOnlySettlement, SettlementOracle};

/// The registry behind its single lock. Every game mutation, from HTTP
/// handlers and timer tasks alike, goes through this.
pub type SharedRegistry = Arc<RwLock<GameRegistry>>;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub engine: Engine,
    pub identity: Arc<dyn IdentityStore>,
    pub verifier: Arc<dyn SocialProofVerifier>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// State with the default in-process ports: log-only settlement, no
    /// durable identity store, accept-all proof verifier.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_ports(
            config,
            Arc::new(LogOnlySettlement::default()),
            Arc::new(NullIdentityStore),
            Arc::new(AcceptAllVerifier),
        )
    }

    pub fn with_ports(
        config: ServerConfig,
        settlement: Arc<dyn SettlementOracle>,
        identity: Arc<dyn IdentityStore>,
        verifier: Arc<dyn SocialProofVerifier>,
    ) -> Self {
        let registry: SharedRegistry = Arc::new(RwLock::new(GameRegistry::new()));
        let engine = Engine::new(Arc::clone(&registry), config.timing.clone(), settlement);
        Self {
            registry,
            engine,
            identity,
            verifier,
            config: Arc::new(config),
        }
    }
}
