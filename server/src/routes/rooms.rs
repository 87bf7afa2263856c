//! Room history read path.
//!
//! Clients fetch a room's stored messages here before joining over the
//! websocket. The read goes to storage, not the live room cache, so it works
//! for rooms nobody has joined since the last restart.

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use shapes::RoomId;
use tracing::{info, warn};

use crate::services::store::StoredMessage;
use crate::state::AppState;

/// Query parameters shared by the token-authenticated routes.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<StoredMessage>,
}

/// `GET /chats/{room_id}?token=...`: stored messages for the room, oldest first.
///
/// # Errors
///
/// `401` for a missing or invalid token, `400` for a blank room id, `503` when
/// storage cannot be read.
pub async fn history(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<HistoryResponse>, StatusCode> {
    let identity = state.auth.verify_opt(query.token.as_deref()).map_err(|e| {
        warn!(error = %e, "history: rejected token");
        StatusCode::UNAUTHORIZED
    })?;

    let room_id = room_id.trim();
    if room_id.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let room_id = RoomId::from(room_id);

    let messages = state.store.query_messages(&room_id).await.map_err(|e| {
        warn!(error = %e, %room_id, "history: store query failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    info!(%room_id, user_id = %identity.user_id, count = messages.len(), "history: served");
    Ok(Json(HistoryResponse { messages }))
}
