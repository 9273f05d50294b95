//! Types and logic shared by the relay and both session participants.
//!
//! - [`protocol`]: the message vocabulary exchanged over the relay
//! - [`codec`]: length-prefixed bincode framing for those messages
//! - [`input`]: key names, edge events and the host-side held-key flags
//! - [`sim`]: the authoritative simulation engine for every game variant
//! - [`render`]: turns a simulation state into backend-agnostic draw commands
//!
//! Movement speeds throughout the engine are expressed in units per
//! reference frame (1/60 s) and scaled by the elapsed frame factor, so the
//! host behaves the same regardless of how often it is ticked.

pub mod codec;
pub mod input;
pub mod protocol;
pub mod render;
pub mod sim;

pub use input::{InputEdge, InputState, Key, Side};
pub use protocol::{Message, Role, SessionId, Snapshot};
pub use sim::{GameConfig, SimState, Simulation, StepOutcome, Variant};

pub const FIELD_WIDTH: f32 = 800.0;
pub const FIELD_HEIGHT: f32 = 400.0;

/// Duration of one reference frame; speeds are per reference frame.
pub const REFERENCE_FRAME_SECS: f32 = 1.0 / 60.0;
