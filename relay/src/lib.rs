//! # Relay
//!
//! Pairs waiting participants into two-party sessions and forwards opaque
//! peer messages between the two members of each session. The relay never
//! looks inside `state` or `input` payloads and holds no game state.
//!
//! - [`registry`]: connections, the per-variant waiting slot and sessions
//! - [`server`]: the TCP listener and per-connection handler tasks
//!
//! A closed connection tears its session down and the surviving member is
//! sent `opponentDisconnected`; a forwarded `cleanup` dissolves the session
//! before either side closes.

pub mod registry;
pub mod server;

pub use registry::{ConnectionId, JoinError, JoinOutcome, Registry};
pub use server::RelayServer;
