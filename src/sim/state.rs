//! World state and core simulation types
//!
//! Everything one run of one game needs lives in a `World`. The engine owns
//! it; the host only reads it.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Rect;

/// Coarse state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// No run yet, or the last run was reset
    #[default]
    Idle,
    /// Active gameplay, one step per frame
    Running,
    /// Run ended, final score readable
    Over,
}

/// Hazards the player must avoid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Dragon runner pillar
    Pillar,
    Car,
    Cone,
    Truck,
    /// Snake grid block
    Block,
}

/// Snake food tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoodKind {
    Normal,
    Special,
    Poison,
}

impl FoodKind {
    /// Signed score change when eaten
    pub fn points(&self) -> i64 {
        match self {
            FoodKind::Normal => 1,
            FoodKind::Special => 2,
            FoodKind::Poison => -2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Obstacle(ObstacleKind),
    Food(FoodKind),
    Ball,
}

impl EntityKind {
    /// Touching this entity ends the run
    pub fn is_hazard(&self) -> bool {
        matches!(self, EntityKind::Obstacle(_))
    }
}

/// Physical extent of an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Extent {
    /// Axis-aligned box; position is the top-left corner
    Box(Vec2),
    /// Circle; position is the centre
    Circle(f32),
}

/// Anything that moves, collides, or scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    pub kind: EntityKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub extent: Extent,
    /// Already counted for pass-based scoring
    pub passed: bool,
    /// Eaten or otherwise spent; retired on the next spawn pass
    pub consumed: bool,
}

impl Entity {
    pub fn new(id: u32, kind: EntityKind, pos: Vec2, extent: Extent) -> Self {
        Self {
            id,
            kind,
            pos,
            vel: Vec2::ZERO,
            extent,
            passed: false,
            consumed: false,
        }
    }

    /// Bounding box (exact for boxes, enclosing square for circles)
    pub fn bounds(&self) -> Rect {
        match self.extent {
            Extent::Box(size) => Rect::new(self.pos, size),
            Extent::Circle(r) => Rect::new(self.pos - Vec2::splat(r), Vec2::splat(2.0 * r)),
        }
    }

    pub fn radius(&self) -> f32 {
        match self.extent {
            Extent::Box(size) => size.x.max(size.y) / 2.0,
            Extent::Circle(r) => r,
        }
    }

    fn is_finite(&self) -> bool {
        let extent_ok = match self.extent {
            Extent::Box(size) => size.is_finite(),
            Extent::Circle(r) => r.is_finite(),
        };
        self.pos.is_finite() && self.vel.is_finite() && extent_ok
    }
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed)
    }
}

/// Complete state of one run (deterministic, serializable)
///
/// `E` carries what a single game needs beyond the shared model (snake body,
/// car lane, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World<E> {
    pub phase: GamePhase,
    pub score: u32,
    /// Game-specific pace; never decreases during a run
    pub speed: f32,
    pub player: Entity,
    /// Non-player entities in spawn order (= draw order)
    pub entities: Vec<Entity>,
    /// Accepted steps since start
    pub frame: u64,
    /// Accumulated travel, for distance-based scoring
    pub distance: f32,
    pub rng_state: RngState,
    pub extra: E,
    next_id: u32,
}

impl<E: Default> World<E> {
    /// Fresh idle world for the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            phase: GamePhase::Idle,
            score: 0,
            speed: 0.0,
            player: Entity::new(0, EntityKind::Player, Vec2::ZERO, Extent::Box(Vec2::ZERO)),
            entities: Vec::new(),
            frame: 0,
            distance: 0.0,
            rng_state: RngState::new(seed),
            extra: E::default(),
            next_id: 1,
        }
    }
}

impl<E> World<E> {
    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Append a new entity and return its ID
    pub fn spawn(&mut self, kind: EntityKind, pos: Vec2, extent: Extent) -> u32 {
        let id = self.next_entity_id();
        self.entities.push(Entity::new(id, kind, pos, extent));
        id
    }

    /// Most recently spawned entity of the given kind
    pub fn last_of(&self, kind: EntityKind) -> Option<&Entity> {
        self.entities.iter().rev().find(|e| e.kind == kind)
    }

    /// Drop consumed entities and those the predicate marks as off-field
    pub fn retire(&mut self, off_field: impl Fn(&Entity) -> bool) -> usize {
        let before = self.entities.len();
        self.entities.retain(|e| !e.consumed && !off_field(e));
        before - self.entities.len()
    }

    pub fn hazards(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.kind.is_hazard())
    }

    /// No NaN or infinity anywhere in the simulated geometry
    pub fn is_finite(&self) -> bool {
        self.speed.is_finite()
            && self.distance.is_finite()
            && self.player.is_finite()
            && self.entities.iter().all(Entity::is_finite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_allocates_increasing_ids_in_draw_order() {
        let mut world: World<()> = World::new(7);
        let a = world.spawn(EntityKind::Ball, Vec2::ZERO, Extent::Circle(1.0));
        let b = world.spawn(
            EntityKind::Obstacle(ObstacleKind::Cone),
            Vec2::ONE,
            Extent::Box(Vec2::ONE),
        );
        assert!(b > a);
        assert_eq!(world.entities[0].id, a);
        assert_eq!(world.entities[1].id, b);
        assert_eq!(world.last_of(EntityKind::Ball).map(|e| e.id), Some(a));
    }

    #[test]
    fn retire_drops_consumed_and_off_field() {
        let mut world: World<()> = World::new(1);
        world.spawn(EntityKind::Food(FoodKind::Normal), Vec2::ZERO, Extent::Box(Vec2::ONE));
        world.spawn(
            EntityKind::Obstacle(ObstacleKind::Pillar),
            Vec2::new(-50.0, 0.0),
            Extent::Box(Vec2::ONE),
        );
        world.spawn(
            EntityKind::Obstacle(ObstacleKind::Pillar),
            Vec2::new(10.0, 0.0),
            Extent::Box(Vec2::ONE),
        );
        world.entities[0].consumed = true;

        let removed = world.retire(|e| e.bounds().right() < 0.0);
        assert_eq!(removed, 2);
        assert_eq!(world.entities.len(), 1);
        assert_eq!(world.entities[0].pos.x, 10.0);
    }

    #[test]
    fn circle_bounds_enclose_the_circle() {
        let ball = Entity::new(1, EntityKind::Ball, Vec2::new(10.0, 20.0), Extent::Circle(5.0));
        let b = ball.bounds();
        assert_eq!(b.left(), 5.0);
        assert_eq!(b.bottom(), 25.0);
        assert_eq!(ball.radius(), 5.0);
    }

    #[test]
    fn non_finite_positions_are_detected() {
        let mut world: World<()> = World::new(1);
        assert!(world.is_finite());
        world.player.pos.x = f32::NAN;
        assert!(!world.is_finite());
    }

    #[test]
    fn only_obstacles_are_hazards() {
        assert!(EntityKind::Obstacle(ObstacleKind::Truck).is_hazard());
        assert!(!EntityKind::Food(FoodKind::Poison).is_hazard());
        assert!(!EntityKind::Ball.is_hazard());
        assert_eq!(FoodKind::Poison.points(), -2);
    }
}
