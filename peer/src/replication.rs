//! Replication between host and guest.
//!
//! Host to guest is always a complete [`Snapshot`]; guest to host is always
//! a single [`InputEdge`]. Nothing is ever merged: the guest replaces its
//! whole mirror, and the host replaces individual held-key flags.

use log::debug;
use shared::{InputEdge, InputState, Side, SimState, Snapshot};
use std::collections::VecDeque;

/// Host side: stamps outgoing snapshots with a sequence number that
/// increases by one per snapshot for the lifetime of the connection.
#[derive(Debug, Default)]
pub struct SnapshotSource {
    next_seq: u64,
}

impl SnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&mut self, state: &SimState) -> Snapshot {
        let seq = self.next_seq;
        self.next_seq += 1;
        Snapshot {
            seq,
            state: state.clone(),
        }
    }
}

/// Guest side: a read-only copy of the host's canonical state.
#[derive(Debug)]
pub struct SnapshotMirror {
    state: SimState,
    last_seq: Option<u64>,
    dropped: u64,
}

impl SnapshotMirror {
    pub fn new(state: SimState) -> Self {
        Self {
            state,
            last_seq: None,
            dropped: 0,
        }
    }

    /// Replaces the mirror with `snapshot` unless it is not newer than the
    /// last applied one. Returns whether it was applied; a duplicate or
    /// reordered snapshot is a no-op.
    pub fn apply(&mut self, snapshot: Snapshot) -> bool {
        if let Some(last) = self.last_seq {
            if snapshot.seq <= last {
                self.dropped += 1;
                debug!(
                    "Dropping stale snapshot {} (last applied {})",
                    snapshot.seq, last
                );
                return false;
            }
        }

        self.state = snapshot.state;
        self.last_seq = Some(snapshot.seq);
        true
    }

    /// Overwrites the local state without touching the sequence watermark;
    /// the host keeps counting across game starts and restarts.
    pub fn reset(&mut self, state: SimState) {
        self.state = state;
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }

    /// Snapshots rejected as stale or duplicate.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Host side: input edges waiting for the next tick, in arrival order.
#[derive(Debug, Default)]
pub struct InputQueue {
    pending: VecDeque<(Side, InputEdge)>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, side: Side, edge: InputEdge) {
        self.pending.push_back((side, edge));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Applies every queued edge to `input` and returns how many pause
    /// presses were seen.
    pub fn drain_into(&mut self, input: &mut InputState) -> usize {
        let mut pause_presses = 0;
        for (side, edge) in self.pending.drain(..) {
            if input.apply_edge(side, edge) {
                pause_presses += 1;
            }
        }
        pause_presses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{GameConfig, Key, Variant};

    fn state_with_scores(left: u32, right: u32) -> SimState {
        let mut state = SimState::initial(&GameConfig::default());
        state.score_left = left;
        state.score_right = right;
        state
    }

    #[test]
    fn test_source_sequences_are_consecutive() {
        let mut source = SnapshotSource::new();
        let state = state_with_scores(0, 0);

        assert_eq!(source.capture(&state).seq, 0);
        assert_eq!(source.capture(&state).seq, 1);
        assert_eq!(source.capture(&state).seq, 2);
    }

    #[test]
    fn test_mirror_overwrites_wholesale() {
        let mut mirror = SnapshotMirror::new(state_with_scores(0, 0));
        let incoming = SimState::initial(&GameConfig::for_variant(Variant::Space));

        assert!(mirror.apply(Snapshot {
            seq: 0,
            state: incoming.clone(),
        }));
        assert_eq!(mirror.state(), &incoming);
        assert_eq!(mirror.last_seq(), Some(0));
    }

    #[test]
    fn test_duplicate_snapshot_is_a_noop() {
        let mut mirror = SnapshotMirror::new(state_with_scores(0, 0));
        let snapshot = Snapshot {
            seq: 4,
            state: state_with_scores(1, 0),
        };

        assert!(mirror.apply(snapshot.clone()));
        let after_first = mirror.state().clone();

        assert!(!mirror.apply(snapshot));
        assert_eq!(mirror.state(), &after_first);
        assert_eq!(mirror.dropped(), 1);
    }

    #[test]
    fn test_reordered_snapshot_is_dropped() {
        let mut mirror = SnapshotMirror::new(state_with_scores(0, 0));
        mirror.apply(Snapshot {
            seq: 10,
            state: state_with_scores(2, 1),
        });

        assert!(!mirror.apply(Snapshot {
            seq: 9,
            state: state_with_scores(1, 1),
        }));
        assert_eq!(mirror.state().score_left, 2);
    }

    #[test]
    fn test_reset_keeps_watermark() {
        let mut mirror = SnapshotMirror::new(state_with_scores(0, 0));
        mirror.apply(Snapshot {
            seq: 3,
            state: state_with_scores(3, 0),
        });

        mirror.reset(state_with_scores(0, 0));
        assert_eq!(mirror.state().score_left, 0);
        assert_eq!(mirror.last_seq(), Some(3));
        assert!(!mirror.apply(Snapshot {
            seq: 3,
            state: state_with_scores(3, 0),
        }));
    }

    #[test]
    fn test_queue_applies_edges_in_order() {
        let mut queue = InputQueue::new();
        queue.push(Side::Right, InputEdge::press(Key::ArrowUp));
        queue.push(Side::Right, InputEdge::release(Key::ArrowUp));
        queue.push(Side::Left, InputEdge::press(Key::KeyS));
        assert_eq!(queue.len(), 3);

        let mut input = InputState::new();
        assert_eq!(queue.drain_into(&mut input), 0);

        assert!(!input.right.up);
        assert!(input.left.down);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_counts_pause_presses() {
        let mut queue = InputQueue::new();
        queue.push(Side::Left, InputEdge::press(Key::KeyP));
        queue.push(Side::Left, InputEdge::release(Key::KeyP));
        queue.push(Side::Right, InputEdge::press(Key::KeyP));

        let mut input = InputState::new();
        assert_eq!(queue.drain_into(&mut input), 2);
    }
}
