//! Input vocabulary: key names, press/release edges and held-key flags.
//!
//! The guest never streams continuous input. It sends one [`InputEdge`] per
//! press or release and the host flips the matching flag in its
//! [`InputState`], which stays authoritative between edges.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Keys understood by the session, named after their DOM `KeyboardEvent.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    KeyW,
    KeyS,
    KeyA,
    KeyD,
    Space,
    KeyP,
}

/// What a key does once it reaches the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Up,
    Down,
    Left,
    Right,
    Fire,
    /// Not a held flag: each press toggles the pause state.
    Pause,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key '{0}'")]
pub struct UnknownKey(pub String);

impl Key {
    pub const ALL: [Key; 10] = [
        Key::ArrowUp,
        Key::ArrowDown,
        Key::ArrowLeft,
        Key::ArrowRight,
        Key::KeyW,
        Key::KeyS,
        Key::KeyA,
        Key::KeyD,
        Key::Space,
        Key::KeyP,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Key::ArrowUp => "ArrowUp",
            Key::ArrowDown => "ArrowDown",
            Key::ArrowLeft => "ArrowLeft",
            Key::ArrowRight => "ArrowRight",
            Key::KeyW => "KeyW",
            Key::KeyS => "KeyS",
            Key::KeyA => "KeyA",
            Key::KeyD => "KeyD",
            Key::Space => "Space",
            Key::KeyP => "KeyP",
        }
    }

    /// Arrow keys and WASD are interchangeable; the side a key drives is
    /// decided by who pressed it, not by the key itself.
    pub fn control(self) -> Control {
        match self {
            Key::ArrowUp | Key::KeyW => Control::Up,
            Key::ArrowDown | Key::KeyS => Control::Down,
            Key::ArrowLeft | Key::KeyA => Control::Left,
            Key::ArrowRight | Key::KeyD => Control::Right,
            Key::Space => Control::Fire,
            Key::KeyP => Control::Pause,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::ALL
            .iter()
            .copied()
            .find(|key| key.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

/// The two sides of the play field. The host always plays left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A discrete press or release of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEdge {
    pub key: Key,
    pub pressed: bool,
}

impl InputEdge {
    pub fn press(key: Key) -> Self {
        Self { key, pressed: true }
    }

    pub fn release(key: Key) -> Self {
        Self {
            key,
            pressed: false,
        }
    }
}

/// Held movement flags for one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideControls {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
}

/// Host-local held-key state for both sides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub left: SideControls,
    pub right: SideControls,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn side(&self, side: Side) -> &SideControls {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut SideControls {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Applies one edge on behalf of `side`.
    ///
    /// Returns true when the edge is a pause press, which the caller turns
    /// into a pause toggle; pause releases are no-ops.
    pub fn apply_edge(&mut self, side: Side, edge: InputEdge) -> bool {
        let controls = self.side_mut(side);
        match edge.key.control() {
            Control::Up => controls.up = edge.pressed,
            Control::Down => controls.down = edge.pressed,
            Control::Left => controls.left = edge.pressed,
            Control::Right => controls.right = edge.pressed,
            Control::Fire => controls.fire = edge.pressed,
            Control::Pause => return edge.pressed,
        }
        false
    }

    /// Releases every held key, used when a game (re)starts.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parse_is_case_insensitive() {
        assert_eq!("ArrowUp".parse::<Key>(), Ok(Key::ArrowUp));
        assert_eq!("arrowdown".parse::<Key>(), Ok(Key::ArrowDown));
        assert_eq!("space".parse::<Key>(), Ok(Key::Space));
    }

    #[test]
    fn test_key_parse_unknown() {
        let err = "Enter".parse::<Key>().unwrap_err();
        assert_eq!(err, UnknownKey("Enter".to_string()));
        assert_eq!(err.to_string(), "unknown key 'Enter'");
    }

    #[test]
    fn test_key_names_roundtrip_through_display() {
        for key in Key::ALL {
            assert_eq!(key.to_string().parse::<Key>(), Ok(key));
        }
    }

    #[test]
    fn test_apply_edge_sets_and_clears_flags() {
        let mut input = InputState::new();

        assert!(!input.apply_edge(Side::Right, InputEdge::press(Key::ArrowUp)));
        assert!(input.right.up);
        assert!(!input.left.up);

        input.apply_edge(Side::Right, InputEdge::release(Key::ArrowUp));
        assert!(!input.right.up);
    }

    #[test]
    fn test_wasd_and_arrows_drive_the_same_control() {
        let mut input = InputState::new();
        input.apply_edge(Side::Left, InputEdge::press(Key::KeyS));
        input.apply_edge(Side::Left, InputEdge::press(Key::ArrowLeft));
        input.apply_edge(Side::Left, InputEdge::press(Key::Space));

        assert!(input.left.down);
        assert!(input.left.left);
        assert!(input.left.fire);
        assert_eq!(input.right, SideControls::default());
    }

    #[test]
    fn test_pause_press_is_reported_not_stored() {
        let mut input = InputState::new();
        assert!(input.apply_edge(Side::Left, InputEdge::press(Key::KeyP)));
        assert!(!input.apply_edge(Side::Left, InputEdge::release(Key::KeyP)));
        assert_eq!(input, InputState::default());
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut input = InputState::new();
        input.apply_edge(Side::Left, InputEdge::press(Key::KeyW));
        input.apply_edge(Side::Right, InputEdge::press(Key::ArrowDown));
        input.clear();
        assert_eq!(input, InputState::default());
    }

    #[test]
    fn test_side_opponent() {
        assert_eq!(Side::Left.opponent(), Side::Right);
        assert_eq!(Side::Right.opponent(), Side::Left);
    }
}
