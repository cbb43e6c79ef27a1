use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::registry::RegistryStats;
use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub games: RegistryStats,
}

/// Structured health check endpoint. Returns server status and registry
/// counts as JSON.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let games = state.registry.read().await.stats();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        games,
    })
}

/// Readiness check. The registry is created at startup; if we can lock it,
/// the server is serving.
pub async fn readiness_check(State(state): State<AppState>) -> &'static str {
    let _ = state.registry.read().await;
    "ready"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "healthy",
            version: "0.1.0",
            games: RegistryStats {
                registered_players: 7,
                open_lobbies: 1,
                live_games: 2,
                completed_games: 3,
            },
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"healthy\""));
        assert!(json.contains("\"registered_players\":7"));
        assert!(json.contains("\"live_games\":2"));
    }
}
