//! Dragon runner: jump over pillars scrolling in from the right

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::Variant;
use crate::sim::collision::aabb_overlap_inset;
use crate::sim::{
    EntityKind, Extent, Game, ObstacleKind, Resolution, TerminalCause, World,
};
use crate::tuning::{Pace, Tuning};

pub const FIELD_WIDTH: f32 = 800.0;
pub const FIELD_HEIGHT: f32 = 400.0;
pub const GROUND_Y: f32 = 320.0;

pub const PLAYER_X: f32 = 80.0;
pub const PLAYER_SIZE: f32 = 40.0;
pub const GRAVITY: f32 = 0.6;
pub const JUMP_VELOCITY: f32 = -12.0;
/// Jumps are accepted this close to the ground
pub const JUMP_TOLERANCE: f32 = 5.0;

pub const PILLAR_WIDTH: f32 = 30.0;
pub const PILLAR_MIN_HEIGHT: f32 = 40.0;
pub const PILLAR_MAX_HEIGHT: f32 = 100.0;
pub const PILLAR_SPAWN_X: f32 = 850.0;
/// A new pillar appears once the last one is this far left of the right edge
pub const PILLAR_GAP: f32 = 250.0;
pub const HIT_INSET: f32 = 5.0;

const PILLAR: EntityKind = EntityKind::Obstacle(ObstacleKind::Pillar);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragonInput {
    Jump,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DragonState {
    /// Airborne after a jump, cleared on landing
    pub jumping: bool,
}

#[derive(Debug, Clone)]
pub struct Dragon {
    pace: Pace,
}

impl Dragon {
    pub fn new(pace: Pace) -> Self {
        Self { pace }
    }

    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self::new(tuning.dragon)
    }

    fn ground_top() -> f32 {
        GROUND_Y - PLAYER_SIZE
    }
}

impl Default for Dragon {
    fn default() -> Self {
        Self::from_tuning(&Tuning::default())
    }
}

impl Game for Dragon {
    type Input = DragonInput;
    type Extra = DragonState;

    fn variant(&self) -> Variant {
        Variant::Dragon
    }

    fn pace(&self) -> &Pace {
        &self.pace
    }

    fn reset(&self, world: &mut World<DragonState>, _rng: &mut Pcg32) {
        world.player.pos = Vec2::new(PLAYER_X, Self::ground_top());
        world.player.extent = Extent::Box(Vec2::splat(PLAYER_SIZE));
        world.player.vel = Vec2::ZERO;
        world.extra = DragonState::default();
    }

    fn apply_input(&self, world: &mut World<DragonState>, input: DragonInput) {
        match input {
            DragonInput::Jump => {
                if world.player.pos.y >= Self::ground_top() - JUMP_TOLERANCE {
                    world.player.vel.y = JUMP_VELOCITY;
                    world.extra.jumping = true;
                }
            }
        }
    }

    fn integrate(&self, world: &mut World<DragonState>) {
        let ground = Self::ground_top();
        let player = &mut world.player;
        if player.pos.y < ground || player.vel.y < 0.0 {
            player.vel.y += GRAVITY;
            player.pos.y += player.vel.y;
        }
        if player.pos.y >= ground {
            player.pos.y = ground;
            player.vel.y = 0.0;
            world.extra.jumping = false;
        }

        let speed = world.speed;
        for pillar in world.entities.iter_mut() {
            pillar.pos.x -= speed;
        }
        world.distance += speed;
    }

    fn spawn(&self, world: &mut World<DragonState>, rng: &mut Pcg32) {
        world.retire(|e| e.bounds().right() < 0.0);

        let due = world
            .last_of(PILLAR)
            .is_none_or(|last| last.pos.x < FIELD_WIDTH - PILLAR_GAP);
        if due {
            let height = rng.random_range(PILLAR_MIN_HEIGHT..PILLAR_MAX_HEIGHT);
            let id = world.spawn(
                PILLAR,
                Vec2::new(PILLAR_SPAWN_X, GROUND_Y - height),
                Extent::Box(Vec2::new(PILLAR_WIDTH, height)),
            );
            log::debug!("dragon: pillar {} (height {:.0})", id, height);
        }
    }

    fn resolve(&self, world: &mut World<DragonState>, _rng: &mut Pcg32) -> Resolution {
        let player = world.player.bounds();
        let mut resolution = Resolution::default();

        for pillar in world.entities.iter_mut() {
            if !pillar.passed && pillar.bounds().right() < player.left() {
                pillar.passed = true;
                resolution.score_delta += 1;
            }
        }

        if world
            .hazards()
            .any(|h| aabb_overlap_inset(player, h.bounds(), HIT_INSET))
        {
            resolution.terminal = Some(TerminalCause::HazardContact);
        }
        resolution
    }

    fn map_key(&self, code: &str) -> Option<DragonInput> {
        match code {
            "Space" | "ArrowUp" | "KeyW" => Some(DragonInput::Jump),
            _ => None,
        }
    }

    fn map_pointer(&self, _x: f32, _y: f32) -> Option<DragonInput> {
        Some(DragonInput::Jump)
    }

    fn autopilot(&self, world: &World<DragonState>) -> Option<DragonInput> {
        let front = world.player.bounds().right();
        // Leave enough run-up to clear the pillar at the top of the arc
        let reach = world.speed * 14.0;
        world
            .hazards()
            .filter(|h| !h.passed && h.bounds().right() > PLAYER_X)
            .any(|h| h.pos.x - front < reach)
            .then_some(DragonInput::Jump)
    }
}
