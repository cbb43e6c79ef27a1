pub mod api;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod identity;
pub mod registry;
pub mod settlement;
pub mod state;

use std::time::Duration;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);
    (router(state.clone()), state)
}

/// Build the router around pre-assembled state, for callers that swap in
/// their own settlement or identity ports.
pub fn router(state: AppState) -> Router<()> {
    let request_timeout = Duration::from_secs(state.config.limits.request_timeout_secs);

    let api_routes = Router::new()
        .route("/players/register", axum::routing::post(api::register_player))
        .route("/players/verify", axum::routing::post(api::verify_player))
        .route("/players/me", axum::routing::get(api::me))
        .route(
            "/games",
            axum::routing::get(api::list_games).post(api::create_game),
        )
        .route("/games/{game_id}", axum::routing::get(api::get_game))
        .route("/games/{game_id}/role", axum::routing::get(api::get_role))
        .route("/games/{game_id}/join", axum::routing::post(api::join_game))
        .route("/games/{game_id}/leave", axum::routing::post(api::leave_game))
        .route(
            "/games/{game_id}/messages",
            axum::routing::get(api::get_messages).post(api::post_message),
        )
        .route("/games/{game_id}/vote", axum::routing::post(api::cast_vote));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", axum::routing::get(health::health_check))
        .route("/ready", axum::routing::get(health::readiness_check))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
