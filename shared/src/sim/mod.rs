//! Authoritative simulation engine.
//!
//! One engine drives every variant. The variant-specific entity sets live
//! in the [`World`] enum and implement [`VariantBehavior`]; everything that
//! is common to all variants (phase flags, scores, win detection, time
//! normalization) lives in [`Simulation`].
//!
//! Only the host steps a `Simulation`. The guest holds a [`SimState`] that
//! it overwrites wholesale from snapshots.

mod config;
pub mod physics;
pub mod pong;
pub mod space;

pub use config::{
    GameConfig, InvalidGameConfig, UnknownVariant, Variant, DEFAULT_MAX_FRAME_FACTOR,
    PONG_WIN_SCORE, SPACE_WIN_SCORE,
};

use crate::input::{InputState, Side};
use crate::render::DrawCommand;
use log::{debug, warn};
use pong::PongWorld;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use space::SpaceWorld;
use std::time::Duration;

/// Variant-specific behaviour: how entities move and how they are drawn.
pub trait VariantBehavior {
    /// Advances all entities by `frames` reference frames using the held
    /// controls. Returns the side credited for every point scored.
    fn advance(
        &mut self,
        controls: &InputState,
        frames: f32,
        config: &GameConfig,
        rng: &mut dyn RngCore,
    ) -> Vec<Side>;

    /// Appends the draw commands for the entity set.
    fn render(&self, config: &GameConfig, out: &mut Vec<DrawCommand>);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum World {
    Pong(PongWorld),
    Space(SpaceWorld),
}

impl World {
    pub fn initial(config: &GameConfig) -> Self {
        match config.variant {
            Variant::Pong => World::Pong(PongWorld::new(config)),
            Variant::Space => World::Space(SpaceWorld::new(config)),
        }
    }

    pub fn variant(&self) -> Variant {
        match self {
            World::Pong(_) => Variant::Pong,
            World::Space(_) => Variant::Space,
        }
    }

    pub fn behavior(&self) -> &dyn VariantBehavior {
        match self {
            World::Pong(world) => world,
            World::Space(world) => world,
        }
    }

    pub fn behavior_mut(&mut self) -> &mut dyn VariantBehavior {
        match self {
            World::Pong(world) => world,
            World::Space(world) => world,
        }
    }
}

/// The canonical state: owned by the host, mirrored read-only on the guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    pub world: World,
    #[serde(rename = "scoreLeft")]
    pub score_left: u32,
    #[serde(rename = "scoreRight")]
    pub score_right: u32,
    #[serde(rename = "gameStarted")]
    pub game_started: bool,
    #[serde(rename = "isPaused")]
    pub is_paused: bool,
    #[serde(rename = "gameOver")]
    pub game_over: bool,
    pub winner: Option<Side>,
}

impl SimState {
    pub fn initial(config: &GameConfig) -> Self {
        Self {
            world: World::initial(config),
            score_left: 0,
            score_right: 0,
            game_started: false,
            is_paused: false,
            game_over: false,
            winner: None,
        }
    }

    pub fn score(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.score_left,
            Side::Right => self.score_right,
        }
    }

    fn credit(&mut self, side: Side) {
        match side {
            Side::Left => self.score_left += 1,
            Side::Right => self.score_right += 1,
        }
    }

    /// The side that has reached `win_score`, if any. Left wins ties.
    pub fn leader_at(&self, win_score: u32) -> Option<Side> {
        if self.score_left >= win_score {
            Some(Side::Left)
        } else if self.score_right >= win_score {
            Some(Side::Right)
        } else {
            None
        }
    }
}

/// Result of one [`Simulation::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Not started or paused: nothing moved.
    Idle,
    /// Entities moved; lists the sides that scored this step.
    Advanced { scored: Vec<Side> },
    /// This step ended the game. Reported exactly once per game.
    GameOver { winner: Side },
    /// The game was already over; nothing moved.
    Frozen,
}

/// Host-side engine: configuration, canonical state and the random source
/// used for serves and spawns.
pub struct Simulation {
    config: GameConfig,
    state: SimState,
    rng: StdRng,
    tick: u64,
}

impl Simulation {
    pub fn new(config: GameConfig) -> Self {
        let state = SimState::initial(&config);
        Self::from_parts(config, state, StdRng::from_entropy())
    }

    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        let state = SimState::initial(&config);
        Self::from_parts(config, state, StdRng::seed_from_u64(seed))
    }

    /// Resumes from an existing state, e.g. one captured in a snapshot.
    pub fn from_state(config: GameConfig, state: SimState, seed: u64) -> Self {
        Self::from_parts(config, state, StdRng::seed_from_u64(seed))
    }

    fn from_parts(config: GameConfig, state: SimState, rng: StdRng) -> Self {
        Self {
            config,
            state,
            rng,
            tick: 0,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// Number of steps that advanced the world.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Marks the game as started, clearing pause and game-over flags.
    pub fn start(&mut self) {
        self.state.game_started = true;
        self.state.is_paused = false;
        self.state.game_over = false;
    }

    /// Toggles pause while a game is in progress. Returns the new flag.
    pub fn toggle_pause(&mut self) -> bool {
        if self.state.game_started && !self.state.game_over {
            self.state.is_paused = !self.state.is_paused;
        }
        self.state.is_paused
    }

    /// Resets scores, entities and all phase flags to their initial values.
    pub fn restart(&mut self) {
        self.state = SimState::initial(&self.config);
        self.tick = 0;
    }

    pub fn step(&mut self, input: &InputState, elapsed: Duration) -> StepOutcome {
        if self.state.game_over {
            return StepOutcome::Frozen;
        }
        if !self.state.game_started || self.state.is_paused {
            return StepOutcome::Idle;
        }

        // A score at the threshold without game over means an earlier step
        // went wrong; end now instead of replicating the inconsistency.
        if let Some(winner) = self.state.leader_at(self.config.win_score) {
            warn!(
                "Score {}-{} reached the win threshold without game over, forcing it",
                self.state.score_left, self.state.score_right
            );
            return self.finish(winner);
        }

        let frames = self.config.frame_factor(elapsed);
        if frames >= self.config.max_frame_factor {
            debug!(
                "Frame factor capped at {:.1} (elapsed {:?})",
                frames, elapsed
            );
        }

        let scored = self.state.world.behavior_mut().advance(
            input,
            frames,
            &self.config,
            &mut self.rng,
        );
        self.tick += 1;

        for side in &scored {
            self.state.credit(*side);
            debug!(
                "{:?} scored, now {}-{}",
                side, self.state.score_left, self.state.score_right
            );
        }

        match self.state.leader_at(self.config.win_score) {
            Some(winner) => self.finish(winner),
            None => StepOutcome::Advanced { scored },
        }
    }

    fn finish(&mut self, winner: Side) -> StepOutcome {
        self.state.game_over = true;
        self.state.winner = Some(winner);
        StepOutcome::GameOver { winner }
    }
}
