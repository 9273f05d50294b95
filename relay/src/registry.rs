//! Connection, waiting-pool and session bookkeeping for the relay.
//!
//! The registry is an ordinary owned value. The server wraps it in an
//! `Arc<RwLock<_>>` and hands a clone to every connection handler, so its
//! lifetime is the server's lifetime.

use log::{debug, info, warn};
use shared::{Message, Role, SessionId, Variant};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;

pub type ConnectionId = u64;

/// Reason sent with `cleanup` when a join reuses the waiting player's id.
pub const DUPLICATE_PLAYER_ID: &str = "duplicate_player_id";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),
    #[error("connection {0} has already joined")]
    AlreadyJoined(ConnectionId),
    #[error("player id '{0}' is already waiting")]
    DuplicatePlayerId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Waiting,
    Paired(SessionId),
}

struct Connection {
    sender: mpsc::UnboundedSender<Message>,
    player: Option<Player>,
    session: Option<SessionId>,
}

#[derive(Debug, Clone)]
struct Player {
    id: String,
    name: String,
}

struct Waiting {
    connection: ConnectionId,
    player: Player,
}

#[derive(Debug, Clone, Copy)]
struct Session {
    host: ConnectionId,
    guest: ConnectionId,
}

impl Session {
    fn other(&self, connection: ConnectionId) -> ConnectionId {
        if connection == self.host {
            self.guest
        } else {
            self.host
        }
    }
}

#[derive(Default)]
pub struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    /// At most one waiting participant per variant.
    waiting: HashMap<Variant, Waiting>,
    sessions: HashMap<SessionId, Session>,
    next_connection_id: ConnectionId,
    next_session_id: SessionId,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection whose outgoing messages go to `sender`.
    pub fn register(&mut self, sender: mpsc::UnboundedSender<Message>) -> ConnectionId {
        self.next_connection_id += 1;
        let id = self.next_connection_id;
        self.connections.insert(
            id,
            Connection {
                sender,
                player: None,
                session: None,
            },
        );
        id
    }

    /// Puts `connection` in the waiting pool for `variant`, or pairs it with
    /// the participant already waiting there. The first to wait is the host.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        player_id: String,
        display_name: String,
        variant: Variant,
    ) -> Result<JoinOutcome, JoinError> {
        let entry = self
            .connections
            .get(&connection)
            .ok_or(JoinError::UnknownConnection(connection))?;
        if entry.player.is_some() {
            return Err(JoinError::AlreadyJoined(connection));
        }

        // A player id may wait in only one variant's slot at a time.
        if self.waiting.values().any(|w| w.player.id == player_id) {
            warn!("Rejecting duplicate player id '{}'", player_id);
            self.send(
                connection,
                Message::Cleanup {
                    reason: Some(DUPLICATE_PLAYER_ID.to_string()),
                },
            );
            return Err(JoinError::DuplicatePlayerId(player_id));
        }

        let player = Player {
            id: player_id,
            name: display_name,
        };
        if let Some(entry) = self.connections.get_mut(&connection) {
            entry.player = Some(player.clone());
        }

        let Some(waiting) = self.waiting.remove(&variant) else {
            info!("{} waiting for a {} opponent", player.id, variant);
            self.waiting.insert(variant, Waiting { connection, player });
            return Ok(JoinOutcome::Waiting);
        };

        self.next_session_id += 1;
        let session_id = self.next_session_id;
        let session = Session {
            host: waiting.connection,
            guest: connection,
        };
        self.sessions.insert(session_id, session);
        for id in [session.host, session.guest] {
            if let Some(entry) = self.connections.get_mut(&id) {
                entry.session = Some(session_id);
            }
        }

        info!(
            "Session {} ({}): {} hosts {}",
            session_id, variant, waiting.player.id, player.id
        );
        self.send(
            session.host,
            Message::Paired {
                role: Role::Host,
                opponent_id: player.id.clone(),
                opponent_name: player.name.clone(),
                session_id,
            },
        );
        self.send(
            session.guest,
            Message::Paired {
                role: Role::Guest,
                opponent_id: waiting.player.id,
                opponent_name: waiting.player.name,
                session_id,
            },
        );

        Ok(JoinOutcome::Paired(session_id))
    }

    /// Relays a peer message to the other member of the sender's session.
    /// A `cleanup` also dissolves the session. Returns whether the message
    /// was delivered.
    pub fn forward(&mut self, from: ConnectionId, message: Message) -> bool {
        if !message.is_peer_message() {
            warn!(
                "Dropping relay-only message '{}' from connection {}",
                message.name(),
                from
            );
            return false;
        }

        let Some(session_id) = self.connections.get(&from).and_then(|c| c.session) else {
            debug!(
                "Connection {} sent '{}' outside a session",
                from,
                message.name()
            );
            return false;
        };
        let Some(session) = self.sessions.get(&session_id).copied() else {
            return false;
        };

        let dissolve = matches!(message, Message::Cleanup { .. });
        let delivered = self.send(session.other(from), message);

        if dissolve {
            info!("Session {} cleaned up by connection {}", session_id, from);
            self.dissolve(session_id);
        }
        delivered
    }

    /// Forgets a closed connection. If it was in a session, the session is
    /// torn down and the other participant gets `opponentDisconnected`.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        let Some(entry) = self.connections.remove(&connection) else {
            return;
        };

        self.waiting.retain(|_, waiting| waiting.connection != connection);

        if let Some(session_id) = entry.session {
            if let Some(session) = self.sessions.get(&session_id).copied() {
                let survivor = session.other(connection);
                info!(
                    "Connection {} left session {}, notifying {}",
                    connection, session_id, survivor
                );
                self.send(survivor, Message::OpponentDisconnected);
                self.dissolve(session_id);
            }
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Removes a session. Both members become free to join again.
    fn dissolve(&mut self, session_id: SessionId) {
        let Some(session) = self.sessions.remove(&session_id) else {
            return;
        };
        for id in [session.host, session.guest] {
            if let Some(entry) = self.connections.get_mut(&id) {
                entry.session = None;
                entry.player = None;
            }
        }
    }

    fn send(&self, connection: ConnectionId, message: Message) -> bool {
        match self.connections.get(&connection) {
            Some(entry) => {
                if entry.sender.send(message).is_err() {
                    debug!("Connection {} is closing, message dropped", connection);
                    return false;
                }
                true
            }
            None => false,
        }
    }
}
