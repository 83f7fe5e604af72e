//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - One step per accepted frame, in a fixed order
//! - Seeded RNG only
//! - Entities kept in spawn order
//! - No rendering or platform dependencies

pub mod collision;
pub mod engine;
pub mod game;
pub mod hooks;
pub mod scheduler;
pub mod state;

pub use collision::{CollisionResult, Rect, aabb_overlap_inset};
pub use engine::{Engine, PaidTicket, StepOutcome};
pub use game::{Game, Resolution, TerminalCause};
pub use hooks::{LogHooks, LoopEvent, LoopHooks};
pub use scheduler::{FrameScheduler, FrameToken, ManualScheduler, Runner};
pub use state::{
    Entity, EntityKind, Extent, FoodKind, GamePhase, ObstacleKind, RngState, World,
};
