//! # Session Participant Library
//!
//! One side of a two-party game session. Both participants run the same
//! code; the role handed out by the relay at pairing time decides which
//! half of it is active.
//!
//! ## Host
//! The host owns the canonical [`shared::SimState`]. Once per tick it drains
//! the queued input edges (its own and the guest's), steps the simulation and
//! sends a full-state snapshot to the guest. It is the only participant that
//! may declare the game started, and the only one that records results.
//!
//! ## Guest
//! The guest never simulates. It forwards its key presses and releases to
//! the host as edge events and overwrites its local mirror with every newer
//! snapshot that arrives. There is no client-side prediction.
//!
//! ## Module Organization
//!
//! - [`session`]: the per-connection state machine
//!   (`Idle → Waiting → Paired → Negotiating → Running → Ended`)
//! - [`replication`]: snapshot sequencing, the guest mirror and the host
//!   input queue
//! - [`record`]: the fire-and-forget match-result sink
//! - [`runner`]: the async driver that feeds the state machine from a byte
//!   stream, a tick interval and local commands
//!
//! ## Scheduling
//! All handlers for one participant run to completion on a single
//! cooperative loop: a message handler never interleaves with a tick, and a
//! tick never waits on the network.
//!
//! ```rust,no_run
//! use peer::{LogSink, Peer, PeerConfig, PeerDriver};
//! use shared::{GameConfig, Variant};
//! use std::time::Duration;
//! use tokio::net::TcpStream;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PeerConfig::new("p1", "Alice", GameConfig::for_variant(Variant::Pong));
//!     let (peer, outbox) = Peer::channel(config, Box::new(LogSink));
//!     let stream = TcpStream::connect("127.0.0.1:8080").await?;
//!     let (_commands, command_rx) = mpsc::unbounded_channel();
//!
//!     let driver = PeerDriver::new(peer, outbox, Duration::from_millis(16)).auto_start(true);
//!     let peer = driver.run(stream, command_rx).await;
//!     println!("session ended: {}", peer.phase());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod record;
pub mod replication;
pub mod runner;
pub mod session;

pub use config::PeerConfig;
pub use error::ProtocolError;
pub use record::{ChannelSink, LogSink, MatchResult, RecordSink};
pub use runner::{LocalCommand, PeerDriver};
pub use session::{EndReason, Peer, PeerEvent, Phase};
