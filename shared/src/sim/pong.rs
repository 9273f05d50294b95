//! Paddle variant: two paddles, one ball, first to the win score.

use super::physics::{bounded_move, reflect_into, Rect};
use super::{GameConfig, VariantBehavior};
use crate::input::{InputState, Side};
use crate::render::DrawCommand;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

pub const PADDLE_WIDTH: f32 = 10.0;
pub const PADDLE_HEIGHT: f32 = 80.0;
/// Gap between a paddle and its goal line.
pub const PADDLE_MARGIN: f32 = 10.0;
pub const PADDLE_SPEED: f32 = 6.0;
pub const BALL_RADIUS: f32 = 8.0;
/// Ball speed per axis at a speed multiplier of 1.
pub const BALL_BASE_SPEED: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PongWorld {
    #[serde(rename = "leftPaddleY")]
    pub left_paddle_y: f32,
    #[serde(rename = "rightPaddleY")]
    pub right_paddle_y: f32,
    pub ball: Ball,
}

impl PongWorld {
    pub fn new(config: &GameConfig) -> Self {
        let paddle_y = (config.field_height - PADDLE_HEIGHT) / 2.0;
        let speed = serve_speed(config);

        Self {
            left_paddle_y: paddle_y,
            right_paddle_y: paddle_y,
            ball: Ball {
                x: config.field_width / 2.0,
                y: config.field_height / 2.0,
                vx: speed,
                vy: speed,
            },
        }
    }

    pub fn paddle_y(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.left_paddle_y,
            Side::Right => self.right_paddle_y,
        }
    }

    pub fn paddle_rect(&self, side: Side, config: &GameConfig) -> Rect {
        let x = match side {
            Side::Left => PADDLE_MARGIN,
            Side::Right => config.field_width - PADDLE_MARGIN - PADDLE_WIDTH,
        };
        Rect::new(x, self.paddle_y(side), PADDLE_WIDTH, PADDLE_HEIGHT)
    }

    pub fn ball_rect(&self) -> Rect {
        Rect::centered(self.ball.x, self.ball.y, BALL_RADIUS)
    }

    fn move_paddles(&mut self, controls: &InputState, frames: f32, config: &GameConfig) {
        let max_y = config.field_height - PADDLE_HEIGHT;
        let step = PADDLE_SPEED * frames;

        for side in [Side::Left, Side::Right] {
            let held = controls.side(side);
            let paddle = match side {
                Side::Left => &mut self.left_paddle_y,
                Side::Right => &mut self.right_paddle_y,
            };
            if held.up {
                *paddle = bounded_move(*paddle, -step, 0.0, max_y);
            }
            if held.down {
                *paddle = bounded_move(*paddle, step, 0.0, max_y);
            }
        }
    }

    fn bounce_off_paddles(&mut self, config: &GameConfig) {
        let ball = self.ball_rect();

        let left = self.paddle_rect(Side::Left, config);
        if self.ball.vx < 0.0 && ball.overlaps(&left) {
            self.ball.vx = -self.ball.vx;
            self.ball.x = left.right() + BALL_RADIUS;
            return;
        }

        let right = self.paddle_rect(Side::Right, config);
        if self.ball.vx > 0.0 && ball.overlaps(&right) {
            self.ball.vx = -self.ball.vx;
            self.ball.x = right.x - BALL_RADIUS;
        }
    }

    /// Re-centres the ball and serves it toward `toward` with a random
    /// vertical direction.
    fn serve(&mut self, toward: Side, config: &GameConfig, rng: &mut dyn RngCore) {
        let speed = serve_speed(config);
        self.ball.x = config.field_width / 2.0;
        self.ball.y = config.field_height / 2.0;
        self.ball.vx = match toward {
            Side::Left => -speed,
            Side::Right => speed,
        };
        self.ball.vy = if rng.gen_bool(0.5) { speed } else { -speed };
    }
}

fn serve_speed(config: &GameConfig) -> f32 {
    BALL_BASE_SPEED * config.speed_multiplier
}

impl VariantBehavior for PongWorld {
    fn advance(
        &mut self,
        controls: &InputState,
        frames: f32,
        config: &GameConfig,
        rng: &mut dyn RngCore,
    ) -> Vec<Side> {
        self.move_paddles(controls, frames, config);

        self.ball.x += self.ball.vx * frames;
        self.ball.y += self.ball.vy * frames;

        self.ball.vy = reflect_into(
            self.ball.y,
            self.ball.vy,
            BALL_RADIUS,
            config.field_height - BALL_RADIUS,
        );

        self.bounce_off_paddles(config);

        // Past a goal line: the other side scores and the ball is served
        // back toward the side that conceded.
        if self.ball.x > config.field_width {
            self.serve(Side::Right, config, rng);
            vec![Side::Left]
        } else if self.ball.x < 0.0 {
            self.serve(Side::Left, config, rng);
            vec![Side::Right]
        } else {
            Vec::new()
        }
    }

    fn render(&self, config: &GameConfig, out: &mut Vec<DrawCommand>) {
        out.push(DrawCommand::Line {
            x1: config.field_width / 2.0,
            y1: 0.0,
            x2: config.field_width / 2.0,
            y2: config.field_height,
        });
        for side in [Side::Left, Side::Right] {
            let paddle = self.paddle_rect(side, config);
            out.push(DrawCommand::Rect {
                x: paddle.x,
                y: paddle.y,
                w: paddle.w,
                h: paddle.h,
            });
        }
        out.push(DrawCommand::Circle {
            x: self.ball.x,
            y: self.ball.y,
            radius: BALL_RADIUS,
        });
    }
}
