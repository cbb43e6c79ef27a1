use axum::http::HeaderMap;

use lobstertrap_core::player::Player;

use crate::error::AppError;
use crate::registry::GameRegistry;

/// Resolve the caller from the `Authorization: Bearer lt_...` header.
pub fn require_player(registry: &GameRegistry, headers: &HeaderMap) -> Result<Player, AppError> {
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let key = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Expected Bearer token".to_string()))?;

    registry
        .player_by_access_key(key)
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Invalid access key".to_string()))
}

/// Reject callers already committed to another live game.
pub fn ensure_not_in_game(registry: &GameRegistry, player: &Player) -> Result<(), AppError> {
    if let Some(game) = registry.current_game_for_player(player.id) {
        return Err(AppError::Conflict(format!(
            "Already in game {}",
            game.id
        )));
    }
    Ok(())
}
