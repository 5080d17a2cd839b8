//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::MarketError;

/// `GET /ws/{user_id}`: Upgrade to a notification socket for `user_id`.
///
/// The identity is taken from the path as-is; there is no authentication.
///
/// # Errors
///
/// Returns [`MarketError::NotFound`] if the user does not exist, before
/// the upgrade happens.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(user_id): Path<UserId>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, MarketError> {
    state.store.get_user(user_id).await?;
    let directory = std::sync::Arc::clone(&state.directory);
    Ok(ws.on_upgrade(move |socket| run_connection(socket, user_id, directory)))
}
