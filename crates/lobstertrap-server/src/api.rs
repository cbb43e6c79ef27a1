use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lobstertrap_core::game::Game;
use lobstertrap_core::message::Message;
use lobstertrap_core::phase::{Phase, Role, Winner};
use lobstertrap_core::player::Player;

use crate::auth;
use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Views

/// Per-player projection with the role concealed while it must stay
/// secret. Wallets stay internal; they only matter for settlement.
#[derive(Debug, Serialize)]
pub struct GamePlayerView {
    pub player_id: Uuid,
    pub name: String,
    pub role: Option<Role>,
    pub alive: bool,
    pub has_voted: bool,
}

#[derive(Debug, Serialize)]
pub struct GameView {
    pub id: Uuid,
    pub external_ref: Option<String>,
    pub phase: Phase,
    pub round: u32,
    pub players: Vec<GamePlayerView>,
    pub eliminated: Vec<Uuid>,
    pub winner: Option<Winner>,
    pub message_count: usize,
    pub created_at: u64,
    pub phase_deadline: Option<u64>,
}

impl GameView {
    /// Project a game for a viewer. Roles are revealed per player:
    /// everything once the game completes; until then a participant sees
    /// the roles of the eliminated and nothing else, a spectator sees
    /// none. A living player's own role is never part of the game state;
    /// it is served by the dedicated role endpoint.
    pub fn for_viewer(game: &Game, viewer: Option<Uuid>) -> Self {
        let completed = game.phase == Phase::Completed;
        let viewer_is_member = viewer.is_some_and(|id| game.is_member(id));

        let players = game
            .players
            .iter()
            .map(|p| {
                let reveal = completed || (viewer_is_member && !p.alive);
                GamePlayerView {
                    player_id: p.player_id,
                    name: p.name.clone(),
                    role: if reveal { p.role } else { None },
                    alive: p.alive,
                    has_voted: p.has_voted,
                }
            })
            .collect();

        Self {
            id: game.id,
            external_ref: game.external_ref.clone(),
            phase: game.phase,
            round: game.round,
            players,
            eliminated: game.eliminated.clone(),
            winner: game.winner,
            message_count: game.messages.len(),
            created_at: game.created_at,
            phase_deadline: game.phase_deadline,
        }
    }
}

// ---------------------------------------------------------------------------
// Request/response bodies

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub name: String,
    pub wallet: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialsResponse {
    pub player_id: Uuid,
    pub name: String,
    pub wallet: String,
    pub access_key: String,
    pub verification_code: String,
}

impl CredentialsResponse {
    fn from_player(p: &Player) -> Self {
        Self {
            player_id: p.id,
            name: p.name.clone(),
            wallet: p.wallet.clone(),
            access_key: p.access_key.clone(),
            verification_code: p.verification_code.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    /// Reference to the public post carrying the verification code.
    pub post_ref: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub player_id: Uuid,
    pub name: String,
    pub wallet: String,
    pub verification_code: String,
    pub current_game: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateGameBody {
    pub external_ref: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GameListResponse {
    pub open_lobbies: Vec<GameView>,
    pub live_games: Vec<GameView>,
}

#[derive(Debug, Serialize)]
pub struct LeaveResponse {
    pub left: bool,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    /// Unix millis; only messages strictly newer are returned.
    pub since: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct VoteBody {
    pub target_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub voted: bool,
}

// ---------------------------------------------------------------------------
// Helpers

/// Map a rejection reason from the game core onto an HTTP status.
fn map_reject(msg: String) -> AppError {
    if msg.contains("not found") {
        AppError::NotFound(msg)
    } else if msg.contains("Already in another game") {
        AppError::Conflict(msg)
    } else {
        AppError::BadRequest(msg)
    }
}

fn validate_wallet(wallet: &str) -> Result<(), AppError> {
    let hex = wallet
        .strip_prefix("0x")
        .ok_or_else(|| AppError::BadRequest("Wallet must start with 0x".to_string()))?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::BadRequest(
            "Wallet must be a 40-hex-digit address".to_string(),
        ));
    }
    Ok(())
}

fn validate_name(name: &str, max_chars: usize) -> Result<(), AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("Name must not be empty".to_string()));
    }
    if trimmed.chars().count() > max_chars {
        return Err(AppError::BadRequest(format!(
            "Name must be at most {max_chars} characters"
        )));
    }
    Ok(())
}

/// Viewer id from an Authorization header, if one is present and valid.
/// Spectator requests without credentials are fine.
fn optional_viewer(registry: &crate::registry::GameRegistry, headers: &HeaderMap) -> Option<Uuid> {
    auth::require_player(registry, headers).ok().map(|p| p.id)
}

// ---------------------------------------------------------------------------
// Player handlers

pub async fn register_player(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<Json<CredentialsResponse>, AppError> {
    validate_name(&body.name, state.config.limits.max_name_chars)?;
    validate_wallet(&body.wallet)?;

    let player = state
        .registry
        .write()
        .await
        .register_player(body.name.trim(), &body.wallet);

    // Mirror to the durable store off the request path.
    let identity = Arc::clone(&state.identity);
    let mirrored = player.clone();
    tokio::spawn(async move {
        if let Err(e) = identity
            .persist_player(&mirrored, &mirrored.verification_code)
            .await
        {
            tracing::warn!(player_id = %mirrored.id, error = %e, "Identity mirror failed");
        }
    });

    Ok(Json(CredentialsResponse::from_player(&player)))
}

pub async fn verify_player(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<VerifyBody>,
) -> Result<Json<VerifyResponse>, AppError> {
    let player = {
        let reg = state.registry.read().await;
        auth::require_player(&reg, &headers)?
    };

    let verified = state
        .verifier
        .verify_post(&body.post_ref, &player.verification_code, &player.name)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if verified {
        let identity = Arc::clone(&state.identity);
        let post_ref = body.post_ref.clone();
        let player_id = player.id;
        tokio::spawn(async move {
            if let Err(e) = identity.mark_verified(player_id, &post_ref).await {
                tracing::warn!(player_id = %player_id, error = %e, "Verification mirror failed");
            }
        });
        tracing::info!(player_id = %player.id, "Player verified");
    }

    Ok(Json(VerifyResponse { verified }))
}

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AppError> {
    let reg = state.registry.read().await;
    let player = auth::require_player(&reg, &headers)?;
    let current_game = reg.current_game_for_player(player.id).map(|g| g.id);

    Ok(Json(MeResponse {
        player_id: player.id,
        name: player.name,
        wallet: player.wallet,
        verification_code: player.verification_code,
        current_game,
    }))
}

// ---------------------------------------------------------------------------
// Game handlers

pub async fn list_games(State(state): State<AppState>) -> Json<GameListResponse> {
    let reg = state.registry.read().await;
    let open_lobbies = reg
        .open_lobbies()
        .into_iter()
        .map(|g| GameView::for_viewer(g, None))
        .collect();
    let live_games = reg
        .live_games()
        .into_iter()
        .map(|g| GameView::for_viewer(g, None))
        .collect();
    Json(GameListResponse {
        open_lobbies,
        live_games,
    })
}

pub async fn create_game(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateGameBody>,
) -> Result<Json<GameView>, AppError> {
    let mut reg = state.registry.write().await;
    let player = auth::require_player(&reg, &headers)?;
    auth::ensure_not_in_game(&reg, &player)?;

    let game_id = reg.create_lobby(&player, body.external_ref);
    let game = reg
        .game(game_id)
        .ok_or_else(|| AppError::Internal("Lobby vanished after creation".to_string()))?;
    Ok(Json(GameView::for_viewer(game, Some(player.id))))
}

pub async fn join_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<GameView>, AppError> {
    let player = {
        let reg = state.registry.read().await;
        auth::require_player(&reg, &headers)?
    };

    let game = state
        .engine
        .join_lobby(game_id, &player)
        .await
        .map_err(map_reject)?;
    Ok(Json(GameView::for_viewer(&game, Some(player.id))))
}

pub async fn leave_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<LeaveResponse>, AppError> {
    let mut reg = state.registry.write().await;
    let player = auth::require_player(&reg, &headers)?;

    if !reg.leave_lobby(game_id, player.id) {
        return Err(AppError::BadRequest(
            "Can only leave a lobby you are in".to_string(),
        ));
    }
    Ok(Json(LeaveResponse { left: true }))
}

pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<GameView>, AppError> {
    let reg = state.registry.read().await;
    let game = reg
        .game(game_id)
        .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;
    let viewer = optional_viewer(&reg, &headers);
    Ok(Json(GameView::for_viewer(game, viewer)))
}

/// The caller's own role, for the "learn your role" reveal at game start.
pub async fn get_role(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<RoleResponse>, AppError> {
    let reg = state.registry.read().await;
    let player = auth::require_player(&reg, &headers)?;
    let role = reg
        .game(game_id)
        .and_then(|g| g.player(player.id))
        .and_then(|p| p.role)
        .ok_or_else(|| {
            AppError::NotFound("Not in this game or game not started".to_string())
        })?;
    Ok(Json(RoleResponse { role }))
}

pub async fn post_message(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<MessageBody>,
) -> Result<Json<Message>, AppError> {
    let mut reg = state.registry.write().await;
    let player = auth::require_player(&reg, &headers)?;
    let message = reg
        .record_message(game_id, player.id, &body.content)
        .map_err(map_reject)?;
    Ok(Json(message))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, AppError> {
    let reg = state.registry.read().await;
    if reg.game(game_id).is_none() {
        return Err(AppError::NotFound("Game not found".to_string()));
    }
    Ok(Json(MessagesResponse {
        messages: reg.messages_since(game_id, query.since),
    }))
}

pub async fn cast_vote(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<VoteBody>,
) -> Result<Json<VoteResponse>, AppError> {
    let player = {
        let reg = state.registry.read().await;
        auth::require_player(&reg, &headers)?
    };

    state
        .engine
        .cast_vote(game_id, player.id, body.target_id)
        .await
        .map_err(map_reject)?;
    Ok(Json(VoteResponse { voted: true }))
}
