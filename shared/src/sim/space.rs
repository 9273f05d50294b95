//! Shooter variant: two ships on the bottom edge shoot falling targets.
//! Each destroyed target scores one point for the ship that fired.

use super::physics::{bounded_move, reflect_into, Rect};
use super::{GameConfig, VariantBehavior};
use crate::input::{InputState, Side};
use crate::render::DrawCommand;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

pub const SHIP_WIDTH: f32 = 40.0;
pub const SHIP_HEIGHT: f32 = 20.0;
/// Gap between the ships and the bottom edge.
pub const SHIP_MARGIN: f32 = 10.0;
pub const SHIP_SPEED: f32 = 7.0;
pub const PROJECTILE_WIDTH: f32 = 4.0;
pub const PROJECTILE_HEIGHT: f32 = 12.0;
pub const PROJECTILE_SPEED: f32 = 9.0;
/// Reference frames between two shots of the same ship.
pub const FIRE_COOLDOWN_FRAMES: f32 = 15.0;
pub const TARGET_SIZE: f32 = 30.0;
pub const TARGET_FALL_SPEED: f32 = 1.2;
pub const TARGET_MAX_DRIFT: f32 = 1.5;
/// Reference frames between two target spawns.
pub const SPAWN_INTERVAL_FRAMES: f32 = 45.0;
pub const MAX_TARGETS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub x: f32,
    /// Frames left until the ship may fire again.
    pub cooldown: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub x: f32,
    pub y: f32,
    pub owner: Side,
}

impl Projectile {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, PROJECTILE_WIDTH, PROJECTILE_HEIGHT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Target {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, TARGET_SIZE, TARGET_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceWorld {
    #[serde(rename = "leftShip")]
    pub left_ship: Ship,
    #[serde(rename = "rightShip")]
    pub right_ship: Ship,
    pub projectiles: Vec<Projectile>,
    pub targets: Vec<Target>,
    #[serde(rename = "spawnTimer")]
    pub spawn_timer: f32,
}

impl SpaceWorld {
    pub fn new(config: &GameConfig) -> Self {
        let quarter = config.field_width / 4.0;
        Self {
            left_ship: Ship {
                x: quarter - SHIP_WIDTH / 2.0,
                cooldown: 0.0,
            },
            right_ship: Ship {
                x: 3.0 * quarter - SHIP_WIDTH / 2.0,
                cooldown: 0.0,
            },
            projectiles: Vec::new(),
            targets: Vec::new(),
            spawn_timer: 0.0,
        }
    }

    pub fn ship(&self, side: Side) -> &Ship {
        match side {
            Side::Left => &self.left_ship,
            Side::Right => &self.right_ship,
        }
    }

    fn ship_mut(&mut self, side: Side) -> &mut Ship {
        match side {
            Side::Left => &mut self.left_ship,
            Side::Right => &mut self.right_ship,
        }
    }

    pub fn ship_y(config: &GameConfig) -> f32 {
        config.field_height - SHIP_MARGIN - SHIP_HEIGHT
    }

    fn move_ships(&mut self, controls: &InputState, frames: f32, config: &GameConfig) {
        let max_x = config.field_width - SHIP_WIDTH;
        let step = SHIP_SPEED * frames;

        for side in [Side::Left, Side::Right] {
            let held = *controls.side(side);
            let ship = self.ship_mut(side);
            if held.left {
                ship.x = bounded_move(ship.x, -step, 0.0, max_x);
            }
            if held.right {
                ship.x = bounded_move(ship.x, step, 0.0, max_x);
            }
        }
    }

    fn fire(&mut self, controls: &InputState, frames: f32, config: &GameConfig) {
        let muzzle_y = Self::ship_y(config) - PROJECTILE_HEIGHT;

        for side in [Side::Left, Side::Right] {
            let wants_fire = controls.side(side).fire;
            let ship = self.ship_mut(side);
            ship.cooldown = (ship.cooldown - frames).max(0.0);
            if !wants_fire || ship.cooldown > 0.0 {
                continue;
            }

            ship.cooldown = FIRE_COOLDOWN_FRAMES;
            let x = ship.x + (SHIP_WIDTH - PROJECTILE_WIDTH) / 2.0;
            self.projectiles.push(Projectile {
                x,
                y: muzzle_y,
                owner: side,
            });
        }
    }

    fn spawn_targets(&mut self, frames: f32, config: &GameConfig, rng: &mut dyn RngCore) {
        self.spawn_timer += frames;
        if self.spawn_timer < SPAWN_INTERVAL_FRAMES {
            return;
        }
        self.spawn_timer -= SPAWN_INTERVAL_FRAMES;

        if self.targets.len() >= MAX_TARGETS {
            return;
        }

        let drift = TARGET_MAX_DRIFT * config.speed_multiplier;
        self.targets.push(Target {
            x: rng.gen_range(0.0..config.field_width - TARGET_SIZE),
            y: 0.0,
            vx: rng.gen_range(-drift..=drift),
            vy: TARGET_FALL_SPEED * config.speed_multiplier,
        });
    }

    /// Removes every projectile/target pair that overlaps and returns the
    /// owners of the projectiles that hit.
    fn resolve_hits(&mut self) -> Vec<Side> {
        let mut scored = Vec::new();
        let mut i = 0;

        while i < self.projectiles.len() {
            let shot = self.projectiles[i].rect();
            match self.targets.iter().position(|t| t.rect().overlaps(&shot)) {
                Some(hit) => {
                    self.targets.remove(hit);
                    scored.push(self.projectiles.remove(i).owner);
                }
                None => i += 1,
            }
        }

        scored
    }
}

impl VariantBehavior for SpaceWorld {
    fn advance(
        &mut self,
        controls: &InputState,
        frames: f32,
        config: &GameConfig,
        rng: &mut dyn RngCore,
    ) -> Vec<Side> {
        self.move_ships(controls, frames, config);
        self.fire(controls, frames, config);

        let shot_step = PROJECTILE_SPEED * config.speed_multiplier * frames;
        for shot in &mut self.projectiles {
            shot.y -= shot_step;
        }
        self.projectiles.retain(|p| p.y + PROJECTILE_HEIGHT > 0.0);

        self.spawn_targets(frames, config, rng);

        let max_x = config.field_width - TARGET_SIZE;
        for target in &mut self.targets {
            target.x += target.vx * frames;
            target.y += target.vy * frames;
            target.vx = reflect_into(target.x, target.vx, 0.0, max_x);
        }
        // Targets that reach the bottom are lost without scoring.
        self.targets.retain(|t| t.y < config.field_height);

        self.resolve_hits()
    }

    fn render(&self, config: &GameConfig, out: &mut Vec<DrawCommand>) {
        let ship_y = Self::ship_y(config);
        for side in [Side::Left, Side::Right] {
            out.push(DrawCommand::Rect {
                x: self.ship(side).x,
                y: ship_y,
                w: SHIP_WIDTH,
                h: SHIP_HEIGHT,
            });
        }
        for shot in &self.projectiles {
            out.push(DrawCommand::Rect {
                x: shot.x,
                y: shot.y,
                w: PROJECTILE_WIDTH,
                h: PROJECTILE_HEIGHT,
            });
        }
        for target in &self.targets {
            out.push(DrawCommand::Circle {
                x: target.x + TARGET_SIZE / 2.0,
                y: target.y + TARGET_SIZE / 2.0,
                radius: TARGET_SIZE / 2.0,
            });
        }
    }
}
