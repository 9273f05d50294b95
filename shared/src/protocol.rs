//! Message vocabulary exchanged between participants and the relay.
//!
//! Field names follow the logical names used by the browser clients
//! (`playerId`, `winnerName`, ...) so that a JSON encoding of the same
//! types stays interoperable; on the wire we use bincode (see [`crate::codec`]).

use crate::input::{Key, Side};
use crate::sim::{SimState, Variant};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relay-assigned session identifier, stable for the session's lifetime.
pub type SessionId = u64;

/// A participant's role, fixed at pairing time and never renegotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

impl Role {
    /// The side of the field this role controls.
    pub fn side(self) -> Side {
        match self {
            Role::Host => Side::Left,
            Role::Guest => Side::Right,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => f.write_str("host"),
            Role::Guest => f.write_str("guest"),
        }
    }
}

/// A complete copy of the canonical state, tagged with a host-assigned
/// sequence number that increases by one per snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub seq: u64,
    pub state: SimState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// client -> relay: enter the waiting pool for `variant`.
    #[serde(rename = "join")]
    Join {
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(rename = "displayName")]
        display_name: String,
        variant: Variant,
    },
    /// relay -> client: pairing completed.
    #[serde(rename = "paired")]
    Paired {
        role: Role,
        #[serde(rename = "opponentId")]
        opponent_id: String,
        #[serde(rename = "opponentName")]
        opponent_name: String,
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },
    /// peer <-> peer: the sender clicked "start".
    #[serde(rename = "ready")]
    Ready,
    /// host -> guest: simulation begins now.
    #[serde(rename = "game_start")]
    GameStart,
    /// guest -> host: one input edge.
    #[serde(rename = "input")]
    Input { key: Key, pressed: bool },
    /// host -> guest: full-state replication.
    #[serde(rename = "state")]
    State(Snapshot),
    /// host -> guest: terminal result.
    #[serde(rename = "gameOver")]
    GameOver {
        #[serde(rename = "winnerName")]
        winner_name: String,
    },
    /// either -> either: forced termination.
    #[serde(rename = "cleanup")]
    Cleanup { reason: Option<String> },
    /// relay -> survivor: the peer's connection closed.
    #[serde(rename = "opponentDisconnected")]
    OpponentDisconnected,
    /// host -> guest: scores and entities were reset after a finished game.
    #[serde(rename = "restart")]
    Restart,
}

impl Message {
    /// Logical message name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Message::Join { .. } => "join",
            Message::Paired { .. } => "paired",
            Message::Ready => "ready",
            Message::GameStart => "game_start",
            Message::Input { .. } => "input",
            Message::State(_) => "state",
            Message::GameOver { .. } => "gameOver",
            Message::Cleanup { .. } => "cleanup",
            Message::OpponentDisconnected => "opponentDisconnected",
            Message::Restart => "restart",
        }
    }

    /// True for messages a relay forwards verbatim to the other peer of a
    /// session. `join`, `paired` and `opponentDisconnected` only travel
    /// between a client and the relay.
    pub fn is_peer_message(&self) -> bool {
        !matches!(
            self,
            Message::Join { .. } | Message::Paired { .. } | Message::OpponentDisconnected
        )
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
