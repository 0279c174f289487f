//! Realtime fan-out hub
//!
//! The connection registry lives inside one control loop; everything else
//! talks to it through [`HubHandle`]. Delivery to a connection is a single
//! `try_send` on its bounded mailbox. A full or closed mailbox evicts the
//! connection: its `closed` token is cancelled, which stops the connection's
//! writer without draining the backlog and closes the socket.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::messages::ServerMessage;
use crate::error::{ApiError, ApiResult};

/// Pending hub commands before producers wait
const COMMAND_BUFFER: usize = 1024;

/// Registry-assigned connection identity
pub type ConnectionId = u64;

struct Connection {
    user: String,
    mailbox: mpsc::Sender<ServerMessage>,
    /// Cancelled when the hub lets go of the connection
    closed: CancellationToken,
}

enum Command {
    Register {
        user: String,
        mailbox: mpsc::Sender<ServerMessage>,
        closed: CancellationToken,
        reply: oneshot::Sender<ConnectionId>,
    },
    Unregister(ConnectionId),
    BroadcastAll(ServerMessage),
    BroadcastToUser {
        user: String,
        message: ServerMessage,
    },
    ConnectionCount(oneshot::Sender<usize>),
}

/// Cloneable address of the hub loop
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<Command>,
}

impl HubHandle {
    async fn send(&self, command: Command) -> ApiResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ApiError::Internal("realtime hub stopped".to_string()))
    }

    /// Add a connection; returns once the hub has recorded it
    ///
    /// `closed` is cancelled when the connection is evicted or unregistered.
    pub async fn register(
        &self,
        user: impl Into<String>,
        mailbox: mpsc::Sender<ServerMessage>,
        closed: CancellationToken,
    ) -> ApiResult<ConnectionId> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Register {
            user: user.into(),
            mailbox,
            closed,
            reply,
        })
        .await?;
        rx.await
            .map_err(|_| ApiError::Internal("realtime hub stopped".to_string()))
    }

    /// Remove a connection; unknown or already-evicted ids are ignored
    pub async fn unregister(&self, id: ConnectionId) {
        if self.send(Command::Unregister(id)).await.is_err() {
            tracing::debug!(connection_id = id, "Hub stopped before unregister");
        }
    }

    pub async fn broadcast_all(&self, message: ServerMessage) {
        if self.send(Command::BroadcastAll(message)).await.is_err() {
            tracing::debug!("Hub stopped, dropping broadcast");
        }
    }

    pub async fn broadcast_to_user(&self, user: impl Into<String>, message: ServerMessage) {
        let command = Command::BroadcastToUser {
            user: user.into(),
            message,
        };
        if self.send(command).await.is_err() {
            tracing::debug!("Hub stopped, dropping user message");
        }
    }

    /// Number of live connections
    ///
    /// Answered by the loop, so every command sent earlier from this handle
    /// has been applied by the time it returns.
    pub async fn connection_count(&self) -> ApiResult<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ConnectionCount(reply)).await?;
        rx.await
            .map_err(|_| ApiError::Internal("realtime hub stopped".to_string()))
    }
}

/// The hub control loop and its registry
pub struct Hub {
    commands: mpsc::Receiver<Command>,
    connections: HashMap<ConnectionId, Connection>,
    next_id: ConnectionId,
}

impl Hub {
    pub fn new() -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let hub = Self {
            commands: rx,
            connections: HashMap::new(),
            next_id: 1,
        };
        (hub, HubHandle { commands: tx })
    }

    /// Spawn the control loop on the runtime
    pub fn spawn() -> HubHandle {
        let (hub, handle) = Self::new();
        tokio::spawn(hub.run());
        handle
    }

    /// Process commands until every handle is dropped
    pub async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Register {
                    user,
                    mailbox,
                    closed,
                    reply,
                } => {
                    let id = self.next_id;
                    self.next_id += 1;
                    tracing::debug!(connection_id = id, user = %user, "Connection registered");
                    self.connections.insert(
                        id,
                        Connection {
                            user,
                            mailbox,
                            closed,
                        },
                    );
                    let _ = reply.send(id);
                }
                Command::Unregister(id) => {
                    if let Some(conn) = self.connections.remove(&id) {
                        conn.closed.cancel();
                        tracing::debug!(connection_id = id, user = %conn.user, "Connection unregistered");
                    }
                }
                Command::BroadcastAll(message) => {
                    self.deliver(&message, |_| true);
                }
                Command::BroadcastToUser { user, message } => {
                    self.deliver(&message, |conn| conn.user == user);
                }
                Command::ConnectionCount(reply) => {
                    let _ = reply.send(self.connections.len());
                }
            }
        }

        tracing::debug!(
            remaining = self.connections.len(),
            "Hub stopped"
        );
        for conn in self.connections.values() {
            conn.closed.cancel();
        }
    }

    /// Offer `message` once to each matching connection, evicting any that refuse it
    fn deliver(&mut self, message: &ServerMessage, matches: impl Fn(&Connection) -> bool) {
        let mut evicted = Vec::new();

        for (id, conn) in self.connections.iter().filter(|(_, c)| matches(c)) {
            match conn.mailbox.try_send(message.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(connection_id = id, user = %conn.user, "Mailbox full, evicting connection");
                    evicted.push(*id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(connection_id = id, user = %conn.user, "Mailbox closed, evicting connection");
                    evicted.push(*id);
                }
            }
        }

        for id in evicted {
            if let Some(conn) = self.connections.remove(&id) {
                conn.closed.cancel();
            }
        }
    }
}
