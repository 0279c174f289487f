//! WebSocket upgrade handler with JWT authentication
//!
//! Clients authenticate with `?token=<jwt>`. An authenticated socket is
//! registered with the hub and then only listens: a writer task drains the
//! connection's mailbox onto the socket while the read half just waits for
//! close. The writer stops as soon as the hub cancels the connection's
//! `closed` token, even mid-send to a stalled client.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use super::hub::HubHandle;
use super::messages::{ErrorPayload, ServerMessage};
use crate::services::AuthService;

/// Upper bound on the closing handshake with a client
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Shared state for the WebSocket route
#[derive(Clone)]
pub struct WsState {
    pub hub: HubHandle,
    /// Outbound mailbox size per connection
    pub mailbox_capacity: usize,
}

impl WsState {
    pub fn new(hub: HubHandle, mailbox_capacity: usize) -> Self {
        Self {
            hub,
            mailbox_capacity,
        }
    }
}

/// Create the WebSocket router (`/`)
pub fn ws_router(state: WsState) -> Router {
    Router::new().route("/", get(ws_handler)).with_state(state)
}

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQueryParams {
    /// JWT access token for authentication
    #[serde(default)]
    token: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQueryParams>,
    State(state): State<WsState>,
    Extension(auth_service): Extension<AuthService>,
) -> Response {
    let verified = match params.token.as_deref() {
        Some(token) => auth_service
            .verify_access_token(token)
            .map_err(|e| e.to_string()),
        None => Err("missing token".to_string()),
    };

    let claims = match verified {
        Ok(claims) => claims,
        Err(reason) => {
            tracing::warn!(reason = %reason, "WebSocket auth failed");
            return ws.on_upgrade(|mut socket| async move {
                let error_msg = ServerMessage::Error(ErrorPayload::auth_failed(reason));
                if let Ok(json) = serde_json::to_string(&error_msg) {
                    let _ = socket.send(Message::Text(json)).await;
                }
                let _ = socket.close().await;
            });
        }
    };

    let user = claims.sub;
    tracing::info!(user = %user, "WebSocket connection authenticated");

    ws.on_upgrade(move |socket| handle_socket(socket, user, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, user: String, state: WsState) {
    let (tx, rx) = mpsc::channel::<ServerMessage>(state.mailbox_capacity);
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let connected = ServerMessage::Connected { user: user.clone() };
    if let Ok(json) = serde_json::to_string(&connected) {
        if ws_sender.send(Message::Text(json)).await.is_err() {
            tracing::debug!(user = %user, "Failed to send connected message");
            return;
        }
    }

    let closed = CancellationToken::new();
    let connection_id = match state.hub.register(user.clone(), tx, closed.clone()).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, user = %user, "Could not register connection");
            let _ = ws_sender.close().await;
            return;
        }
    };

    let mut send_task = tokio::spawn(write_outbound(rx, ws_sender, closed, user.clone()));

    let user_recv = user.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    tracing::debug!(user = %user_recv, "WebSocket close received");
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(_) => {
                    tracing::trace!(user = %user_recv, "Ignoring client message");
                }
                Err(e) => {
                    tracing::debug!(error = %e, user = %user_recv, "WebSocket error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(user = %user, "Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            tracing::debug!(user = %user, "Receive task completed");
            send_task.abort();
        }
    }

    state.hub.unregister(connection_id).await;

    tracing::info!(user = %user, connection_id, "WebSocket connection closed");
}

/// Forward mailbox messages to the socket until the mailbox ends, a send
/// fails, or `closed` is cancelled
async fn write_outbound<S>(
    rx: mpsc::Receiver<ServerMessage>,
    mut sink: S,
    closed: CancellationToken,
    user: String,
) where
    S: Sink<Message> + Unpin,
{
    let mut outbound = ReceiverStream::new(rx);
    loop {
        let msg = tokio::select! {
            biased;
            _ = closed.cancelled() => {
                tracing::debug!(user = %user, "Connection closed by hub");
                break;
            }
            msg = outbound.next() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        let json = match serde_json::to_string(&msg) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize message");
                continue;
            }
        };

        tokio::select! {
            biased;
            _ = closed.cancelled() => {
                tracing::debug!(user = %user, "Connection closed by hub mid-send");
                break;
            }
            sent = sink.send(Message::Text(json)) => {
                if sent.is_err() {
                    tracing::debug!(user = %user, "WebSocket send failed");
                    break;
                }
            }
        }
    }

    if tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await.is_err() {
        tracing::debug!(user = %user, "WebSocket close timed out");
    }
}
