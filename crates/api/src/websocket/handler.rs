//! WebSocket handler for Axum
//!
//! Authenticates the upgrade request and pumps frames between the socket and
//! the [`ChatRelay`](super::relay::ChatRelay).

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::auth::{authenticate, AuthUser};
use crate::error::ApiError;
use crate::state::AppState;

use super::{
    connection::Connection,
    events::{ClientEvent, ServerEvent},
};

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    token: String,
}

/// WebSocket handler - upgrades HTTP connection to WebSocket
/// Authenticates via query parameter token since browsers cannot set headers
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
    Query(params): Query<WebSocketQuery>,
) -> Result<Response, ApiError> {
    let auth_user = authenticate(&app_state.jwt_manager, &params.token)?;

    tracing::info!(
        shop_id = %auth_user.shop_id,
        role = %auth_user.participant.role(),
        "WebSocket connection upgrade requested"
    );

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, auth_user, app_state)))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, auth_user: AuthUser, app_state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Create channel for sending events to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let relay = app_state.relay.clone();
    let conn = relay
        .ws_state()
        .add_connection(Connection::new(auth_user.shop_id, auth_user.participant, tx))
        .await;
    let session_id = conn.session_id;

    let _ = conn.send(ServerEvent::Connected {
        session_id,
        shop_id: conn.shop_id.clone(),
        role: conn.participant.role(),
    });

    // Spawn task to send messages to client
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break; // Connection closed
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, event = event.name(), "Failed to serialize WebSocket event");
                }
            }
        }
    });

    // Events are handled one at a time so a client's messages keep their order
    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(error = ?e, session_id = %session_id, "WebSocket read error");
                break;
            }
        };

        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => relay.handle(&conn, event).await,
                Err(e) => {
                    tracing::warn!(
                        error = ?e,
                        session_id = %session_id,
                        "Failed to parse client event"
                    );
                    conn.send_error("Invalid event format");
                }
            },
            Message::Close(_) => {
                tracing::info!(session_id = %session_id, "WebSocket close frame received");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                // Axum handles ping/pong automatically
            }
            Message::Binary(_) => {
                conn.send_error("Binary frames are not supported");
            }
        }
    }

    tracing::info!(
        session_id = %session_id,
        shop_id = %conn.shop_id,
        "WebSocket connection closing"
    );
    relay.disconnect(&conn).await;

    send_task.abort();
}
