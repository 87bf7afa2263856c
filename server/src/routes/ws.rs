//! WebSocket handler: room message relay.
//!
//! DESIGN
//! ======
//! The upgrade is refused with 401 unless the `token` query parameter
//! verifies. On upgrade the connection registers a [`Session`] and enters a
//! `select!` loop:
//! - Incoming client envelopes → parse + dispatch to the room service
//! - Envelopes broadcast by rooms the session joined → forward to client
//! - The session's lag signal → close; the client rejoins and reloads history
//!
//! Room operations broadcast through the members' queues, the sender's own
//! queue included, so the only thing written back directly is an `error`
//! envelope for a rejected operation.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → verify token → `connect`
//! 2. Client sends envelopes → room service → optional error reply
//! 3. Close, send failure or falling behind → `disconnect` drops every
//!    membership

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shapes::{Envelope, ErrorCode};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::rooms::TokenQuery;
use crate::services::auth::Identity;
use crate::services::room::{self, RoomError, Session};
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<TokenQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = match state.auth.verify_opt(params.token.as_deref()) {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "ws: upgrade refused");
            return (StatusCode::UNAUTHORIZED, e.to_string()).into_response();
        }
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, identity))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, identity: Identity) {
    // Per-connection queue for envelopes broadcast by joined rooms.
    let (client_tx, mut client_rx) = mpsc::channel::<Envelope>(state.client_channel_capacity);

    let mut session = match room::connect(Some(identity), client_tx) {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "ws: session refused");
            return;
        }
    };

    let lag = session.lag_signal();
    loop {
        tokio::select! {
            () = lag.raised() => {
                warn!(client_id = %session.client_id, "ws: client fell behind; closing connection");
                if let Err(e) = socket.send(Message::Close(None)).await {
                    debug!(error = %e, "ws: close frame not sent");
                }
                break;
            }
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        if dispatch_text(&state, &mut socket, &mut session, text.as_str()).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(envelope) = client_rx.recv() => {
                if send_envelope(&mut socket, &envelope).await.is_err() {
                    break;
                }
            }
        }
    }

    room::disconnect(&state, session).await;
}

// =============================================================================
// DISPATCH
// =============================================================================

async fn dispatch_text(state: &AppState, socket: &mut WebSocket, session: &mut Session, text: &str) -> Result<(), ()> {
    for reply in process_inbound_text(state, session, text).await {
        send_envelope(socket, &reply).await?;
    }
    Ok(())
}

/// Parse and apply one inbound text message and return envelopes for the
/// sender only. Broadcasts go through the room members' queues.
async fn process_inbound_text(state: &AppState, session: &mut Session, text: &str) -> Vec<Envelope> {
    let envelope = match Envelope::from_json(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(client_id = %session.client_id, error = %e, "ws: dropping malformed message");
            return vec![];
        }
    };

    let result = match envelope {
        Envelope::JoinRoom { room_id } => room::join(state, session, room_id).await,
        Envelope::LeaveRoom { room_id } => {
            room::leave(state, session, &room_id).await;
            Ok(())
        }
        Envelope::Chat { room_id, message } => room::create_shape(state, session, &room_id, message).await.map(drop),
        Envelope::DeleteShapes { room_id, payload } => {
            room::delete_shapes(state, session, &room_id, &payload.ids).await.map(drop)
        }
        Envelope::Error { code, .. } => {
            debug!(client_id = %session.client_id, %code, "ws: ignoring client error envelope");
            Ok(())
        }
    };

    match result {
        Ok(()) => vec![],
        Err(RoomError::InvalidShape(e)) => {
            warn!(client_id = %session.client_id, error = %e, "ws: dropping invalid shape");
            vec![]
        }
        Err(e) => {
            warn!(client_id = %session.client_id, code = e.error_code(), error = %e, "ws: operation rejected");
            vec![Envelope::error_from(&e)]
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_envelope(socket: &mut WebSocket, envelope: &Envelope) -> Result<(), ()> {
    let json = match envelope.to_json() {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize envelope");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|e| {
        info!(error = %e, "ws: send failed; closing connection");
    })
}
