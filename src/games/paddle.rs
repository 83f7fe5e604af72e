//! Paddle ball: keep the ball off the floor
//!
//! `World::speed` is the ball's speed. It only changes on paddle contact
//! (wall bounces preserve it), so the per-frame ramp is replaced by the
//! per-hit increment from the pace table.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::Variant;
use crate::sim::collision::{
    ball_out_of_bounds, ball_paddle_contact, ball_wall_collisions, paddle_bounce,
    paddle_hit_position, reflect_velocity,
};
use crate::sim::{EntityKind, Extent, Game, Resolution, TerminalCause, World};
use crate::tuning::{Pace, Tuning};

pub const FIELD_WIDTH: f32 = 800.0;
pub const FIELD_HEIGHT: f32 = 600.0;

pub const BALL_RADIUS: f32 = 12.0;
pub const PADDLE_SIZE: Vec2 = Vec2::new(120.0, 15.0);
pub const PADDLE_Y: f32 = FIELD_HEIGHT - 40.0;
/// Paddle travel per key press
pub const PADDLE_KEY_STEP: f32 = 8.0;
/// Vertical speed never drops below this after a paddle hit
pub const MIN_DY: f32 = 2.0;
/// Initial velocity components are drawn from base speed times this range
pub const LAUNCH_SPREAD: std::ops::Range<f32> = 0.7..1.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaddleInput {
    /// Centre the paddle under the pointer
    PointerX(f32),
    /// Nudge the paddle (keyboard)
    Nudge(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaddleState {
    /// Where the paddle centre is heading
    pub target_x: f32,
}

impl Default for PaddleState {
    fn default() -> Self {
        Self {
            target_x: FIELD_WIDTH / 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Paddle {
    pace: Pace,
}

impl Paddle {
    pub fn new(pace: Pace) -> Self {
        Self { pace }
    }

    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self::new(tuning.paddle)
    }
}

impl Default for Paddle {
    fn default() -> Self {
        Self::from_tuning(&Tuning::default())
    }
}

/// The ball, if the world has one
pub fn find_ball<E>(world: &World<E>) -> Option<&crate::sim::Entity> {
    world.entities.iter().find(|e| e.kind == EntityKind::Ball)
}

impl Game for Paddle {
    type Input = PaddleInput;
    type Extra = PaddleState;

    fn variant(&self) -> Variant {
        Variant::Paddle
    }

    fn pace(&self) -> &Pace {
        &self.pace
    }

    fn reset(&self, world: &mut World<PaddleState>, rng: &mut Pcg32) {
        world.extra = PaddleState::default();
        world.player.pos = Vec2::new((FIELD_WIDTH - PADDLE_SIZE.x) / 2.0, PADDLE_Y);
        world.player.extent = Extent::Box(PADDLE_SIZE);

        let base = self.pace.base_speed;
        let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        let vel = Vec2::new(
            sign * base * rng.random_range(LAUNCH_SPREAD),
            base * rng.random_range(LAUNCH_SPREAD),
        );
        let id = world.spawn(
            EntityKind::Ball,
            Vec2::new(FIELD_WIDTH / 2.0, FIELD_HEIGHT / 2.0),
            Extent::Circle(BALL_RADIUS),
        );
        if let Some(ball) = world.entities.iter_mut().find(|e| e.id == id) {
            ball.vel = vel;
        }
        world.speed = vel.length();
    }

    fn apply_input(&self, world: &mut World<PaddleState>, input: PaddleInput) {
        let target = &mut world.extra.target_x;
        match input {
            PaddleInput::PointerX(x) => *target = x,
            PaddleInput::Nudge(dx) => *target += dx,
        }
        let half = PADDLE_SIZE.x / 2.0;
        *target = target.clamp(half, FIELD_WIDTH - half);
    }

    fn integrate(&self, world: &mut World<PaddleState>) {
        let left = world.extra.target_x - PADDLE_SIZE.x / 2.0;
        world.player.pos.x = left.clamp(0.0, FIELD_WIDTH - PADDLE_SIZE.x);

        for ball in world.entities.iter_mut() {
            ball.pos += ball.vel;
            world.distance += ball.vel.length();
        }
    }

    fn spawn(&self, world: &mut World<PaddleState>, _rng: &mut Pcg32) {
        // The ball is never retired: leaving the field ends the run instead
        world.retire(|_| false);
    }

    fn resolve(&self, world: &mut World<PaddleState>, _rng: &mut Pcg32) -> Resolution {
        let paddle = world.player.bounds();
        let mut resolution = Resolution::default();
        let mut speed = world.speed;

        for ball in world.entities.iter_mut().filter(|e| e.kind == EntityKind::Ball) {
            let r = ball.radius();

            for wall in ball_wall_collisions(ball.pos, r, FIELD_WIDTH) {
                if ball.vel.dot(wall.normal) < 0.0 {
                    ball.pos += wall.normal * wall.penetration;
                    ball.vel = reflect_velocity(ball.vel, wall.normal);
                }
            }

            if ball.vel.y > 0.0 && ball_paddle_contact(ball.pos, r, &paddle) {
                let hit = paddle_hit_position(ball.pos.x, &paddle);
                ball.vel = paddle_bounce(
                    ball.vel,
                    hit,
                    self.pace.speed_increment,
                    self.pace.speed_cap,
                    MIN_DY,
                );
                speed = speed.max(ball.vel.length());
                resolution.score_delta += 1;
            }

            if ball_out_of_bounds(ball.pos, r, FIELD_HEIGHT) {
                resolution.terminal = Some(TerminalCause::OutOfBounds);
            }
        }

        world.speed = speed;
        resolution
    }

    /// Speed changes on paddle contact only
    fn accelerate(&self, _world: &mut World<PaddleState>) {}

    fn map_key(&self, code: &str) -> Option<PaddleInput> {
        match code {
            "ArrowLeft" | "KeyA" => Some(PaddleInput::Nudge(-PADDLE_KEY_STEP)),
            "ArrowRight" | "KeyD" => Some(PaddleInput::Nudge(PADDLE_KEY_STEP)),
            _ => None,
        }
    }

    fn map_pointer(&self, x: f32, _y: f32) -> Option<PaddleInput> {
        Some(PaddleInput::PointerX(x))
    }

    fn autopilot(&self, world: &World<PaddleState>) -> Option<PaddleInput> {
        let ball = find_ball(world)?;
        // Off-centre hits keep the rally from settling into a vertical line
        let offset = if (world.frame / 90) % 2 == 0 { 25.0 } else { -25.0 };
        Some(PaddleInput::PointerX(ball.pos.x + offset))
    }
}
