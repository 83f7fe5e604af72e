//! The per-game strategy plugged into the engine
//!
//! A `Game` supplies the input vocabulary, the motion integrator, the spawn
//! policy and the collision/scoring policy. The engine supplies the order
//! they run in, score clamping, speed ramping, phase handling and fault
//! capture.

use std::fmt::Debug;

use rand_pcg::Pcg32;
use serde::Serialize;

use super::state::World;
use crate::Variant;
use crate::tuning::Pace;

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalCause {
    /// Player overlapped a hazard (or, for the snake, itself)
    HazardContact,
    /// Player or ball left the playfield
    OutOfBounds,
}

/// Outcome of the collision/scoring pass of one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Signed score change, clamped by the engine
    pub score_delta: i64,
    pub terminal: Option<TerminalCause>,
}

impl Resolution {
    pub fn scored(delta: i64) -> Self {
        Self {
            score_delta: delta,
            terminal: None,
        }
    }

    pub fn ended(cause: TerminalCause) -> Self {
        Self {
            score_delta: 0,
            terminal: Some(cause),
        }
    }
}

pub trait Game {
    /// Commands the host translates raw key/pointer events into
    type Input: Copy + Debug;
    /// Game-specific world payload
    type Extra: Clone + Debug + Default + Serialize;

    fn variant(&self) -> Variant;

    fn pace(&self) -> &Pace;

    /// Place the player and any initial entities in a fresh world
    fn reset(&self, world: &mut World<Self::Extra>, rng: &mut Pcg32);

    /// Step (a): apply one queued command
    fn apply_input(&self, world: &mut World<Self::Extra>, input: Self::Input);

    /// Step (b): move the player and every entity
    fn integrate(&self, world: &mut World<Self::Extra>);

    /// Step (c): retire spent entities and spawn new ones
    fn spawn(&self, world: &mut World<Self::Extra>, rng: &mut Pcg32);

    /// Step (d): collisions, scoring and terminal detection
    fn resolve(&self, world: &mut World<Self::Extra>, rng: &mut Pcg32) -> Resolution;

    /// Step (f): ramp the speed
    fn accelerate(&self, world: &mut World<Self::Extra>) {
        world.speed = self.pace().accelerate(world.speed);
    }

    /// Minimum milliseconds between accepted steps
    fn min_interval_ms(&self, _world: &World<Self::Extra>) -> Option<f64> {
        self.pace().frame_interval_ms
    }

    /// Translate a `KeyboardEvent.code`
    fn map_key(&self, _code: &str) -> Option<Self::Input> {
        None
    }

    /// Translate a pointer position (canvas coordinates)
    fn map_pointer(&self, _x: f32, _y: f32) -> Option<Self::Input> {
        None
    }

    /// Demo mode: pick a command for the current world
    fn autopilot(&self, _world: &World<Self::Extra>) -> Option<Self::Input> {
        None
    }
}
