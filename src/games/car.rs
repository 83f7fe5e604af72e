//! Car runner: three lanes, oncoming traffic, score by distance

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
pub const FIELD_HEIGHT: f32 = 600.0;
pub const LANES: u8 = 3;
pub const LANE_WIDTH: f32 = FIELD_WIDTH / LANES as f32;

pub const CAR_SIZE: Vec2 = Vec2::new(60.0, 100.0);
pub const CAR_Y: f32 = FIELD_HEIGHT - CAR_SIZE.y - 50.0;
/// Fraction of the remaining lane offset closed per frame
pub const LANE_EASING: f32 = 0.15;
/// Snap to the lane centre once this close
pub const LANE_SNAP: f32 = 2.0;

/// Chance per frame that an obstacle appears
pub const SPAWN_CHANCE: f64 = 0.015;
pub const DISTANCE_PER_POINT: f32 = 100.0;
pub const HIT_INSET: f32 = 10.0;

/// Obstacle mix as cumulative thresholds: 60% car, 20% cone, 20% truck
const OBSTACLE_TABLE: [(f32, ObstacleKind); 3] = [
    (0.6, ObstacleKind::Car),
    (0.8, ObstacleKind::Cone),
    (1.0, ObstacleKind::Truck),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarInput {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarState {
    /// Target lane, 0 = leftmost
    pub lane: u8,
}

impl Default for CarState {
    fn default() -> Self {
        Self { lane: 1 }
    }
}

/// Left edge of a `width`-wide box centred in `lane`
pub fn lane_x(lane: u8, width: f32) -> f32 {
    lane as f32 * LANE_WIDTH + (LANE_WIDTH - width) / 2.0
}

pub fn obstacle_size(kind: ObstacleKind) -> Vec2 {
    match kind {
        ObstacleKind::Cone => Vec2::new(30.0, 40.0),
        ObstacleKind::Truck => Vec2::new(80.0, 120.0),
        _ => CAR_SIZE,
    }
}

#[derive(Debug, Clone)]
pub struct Car {
    pace: Pace,
}

impl Car {
    pub fn new(pace: Pace) -> Self {
        Self { pace }
    }

    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self::new(tuning.car)
    }

    fn roll_obstacle(rng: &mut Pcg32) -> ObstacleKind {
        let roll: f32 = rng.random();
        OBSTACLE_TABLE
            .iter()
            .find(|(threshold, _)| roll < *threshold)
            .map_or(ObstacleKind::Truck, |(_, kind)| *kind)
    }

    /// Lanes with an obstacle between the top of the field and just below the car
    fn blocked_lanes(world: &World<CarState>) -> [bool; LANES as usize] {
        let mut blocked = [false; LANES as usize];
        for hazard in world.hazards() {
            let b = hazard.bounds();
            if b.bottom() < CAR_Y - 260.0 || b.top() > CAR_Y + CAR_SIZE.y {
                continue;
            }
            let centre = b.left() + b.size.x / 2.0;
            let lane = ((centre / LANE_WIDTH) as usize).min(LANES as usize - 1);
            blocked[lane] = true;
        }
        blocked
    }
}

impl Default for Car {
    fn default() -> Self {
        Self::from_tuning(&Tuning::default())
    }
}

impl Game for Car {
    type Input = CarInput;
    type Extra = CarState;

    fn variant(&self) -> Variant {
        Variant::Car
    }

    fn pace(&self) -> &Pace {
        &self.pace
    }

    fn reset(&self, world: &mut World<CarState>, _rng: &mut Pcg32) {
        world.extra = CarState::default();
        world.player.pos = Vec2::new(lane_x(world.extra.lane, CAR_SIZE.x), CAR_Y);
        world.player.extent = Extent::Box(CAR_SIZE);
    }

    fn apply_input(&self, world: &mut World<CarState>, input: CarInput) {
        let lane = &mut world.extra.lane;
        *lane = match input {
            CarInput::Left => lane.saturating_sub(1),
            CarInput::Right => (*lane + 1).min(LANES - 1),
        };
    }

    fn integrate(&self, world: &mut World<CarState>) {
        let target = lane_x(world.extra.lane, CAR_SIZE.x);
        let dx = target - world.player.pos.x;
        if dx.abs() > LANE_SNAP {
            world.player.pos.x += dx * LANE_EASING;
        } else {
            world.player.pos.x = target;
        }

        let speed = world.speed;
        let car_bottom = world.player.bounds().bottom();
        for obstacle in world.entities.iter_mut() {
            obstacle.pos.y += speed;
            if !obstacle.passed && obstacle.pos.y > car_bottom {
                obstacle.passed = true;
            }
        }
        world.distance += speed;
    }

    fn spawn(&self, world: &mut World<CarState>, rng: &mut Pcg32) {
        world.retire(|e| e.pos.y > FIELD_HEIGHT);

        if rng.random_bool(SPAWN_CHANCE) {
            let kind = Self::roll_obstacle(rng);
            let lane = rng.random_range(0..LANES);
            let size = obstacle_size(kind);
            let id = world.spawn(
                EntityKind::Obstacle(kind),
                Vec2::new(lane_x(lane, size.x), -size.y),
                Extent::Box(size),
            );
            log::debug!("car: {:?} {} in lane {}", kind, id, lane);
        }
    }

    fn resolve(&self, world: &mut World<CarState>, _rng: &mut Pcg32) -> Resolution {
        let earned = (world.distance / DISTANCE_PER_POINT).floor() as i64;
        let earned = earned.min(i64::from(self.pace.max_score));
        let mut resolution = Resolution::scored((earned - i64::from(world.score)).max(0));

        let car = world.player.bounds();
        if world
            .hazards()
            .any(|h| aabb_overlap_inset(car, h.bounds(), HIT_INSET))
        {
            resolution.terminal = Some(TerminalCause::HazardContact);
        }
        resolution
    }

    fn map_key(&self, code: &str) -> Option<CarInput> {
        match code {
            "ArrowLeft" | "KeyA" => Some(CarInput::Left),
            "ArrowRight" | "KeyD" => Some(CarInput::Right),
            _ => None,
        }
    }

    fn map_pointer(&self, x: f32, _y: f32) -> Option<CarInput> {
        if x < FIELD_WIDTH / 2.0 {
            Some(CarInput::Left)
        } else {
            Some(CarInput::Right)
        }
    }

    fn autopilot(&self, world: &World<CarState>) -> Option<CarInput> {
        let lane = world.extra.lane;
        let blocked = Self::blocked_lanes(world);
        if !blocked[lane as usize] {
            return None;
        }
        if lane > 0 && !blocked[lane as usize - 1] {
            Some(CarInput::Left)
        } else if lane + 1 < LANES && !blocked[lane as usize + 1] {
            Some(CarInput::Right)
        } else if lane > 0 {
            Some(CarInput::Left)
        } else {
            Some(CarInput::Right)
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::sim::{Engine, LoopEvent, PaidTicket, StepOutcome};

    fn started() -> Engine<Car> {
        let mut engine = Engine::new(Car::default());
        engine.start(PaidTicket::new(), 5).unwrap();
        engine
    }

    /// Step with traffic cleared so nothing can end the run
    fn cruise(engine: &mut Engine<Car>, frames: usize, events: &mut Vec<LoopEvent>) {
        for _ in 0..frames {
            engine.world_mut().entities.clear();
            assert_eq!(engine.step(0.0, events), StepOutcome::Advanced);
        }
    }

    #[test]
    fn test_starts_centred_in_middle_lane() {
        let engine = started();
        let car = engine.world().player.bounds();
        assert_eq!(car.left(), lane_x(1, CAR_SIZE.x));
        assert_eq!(car.top(), 450.0);
    }

    #[test]
    fn test_lane_change_eases_then_snaps() {
        let mut engine = started();
        engine.queue_input(CarInput::Left);
        engine.queue_input(CarInput::Left);
        engine.queue_input(CarInput::Left);
        cruise(&mut engine, 1, &mut Vec::new());
        assert_eq!(engine.world().extra.lane, 0);

        let start = lane_x(1, CAR_SIZE.x);
        let target = lane_x(0, CAR_SIZE.x);
        let x = engine.world().player.pos.x;
        assert!((x - (start + (target - start) * LANE_EASING)).abs() < 1e-3);

        cruise(&mut engine, 60, &mut Vec::new());
        assert_eq!(engine.world().player.pos.x, target);
    }

    #[test]
    fn test_score_counts_distance_quanta() {
        let mut engine = started();
        let mut events = Vec::new();
        // 25 frames at speed >= 4 covers 100 units
        cruise(&mut engine, 24, &mut events);
        assert!(engine.world().distance < DISTANCE_PER_POINT);
        assert!(events.is_empty());

        cruise(&mut engine, 1, &mut events);
        assert_eq!(events, vec![LoopEvent::ScoreChanged(1)]);
        assert_eq!(engine.score(), 1);
    }

    #[test]
    fn test_score_stops_at_max() {
        let mut engine = started();
        engine.world_mut().distance = 10_000.0;
        let mut events = Vec::new();
        cruise(&mut engine, 3, &mut events);
        assert_eq!(engine.score(), 25);
        assert_eq!(events, vec![LoopEvent::ScoreChanged(25)]);
    }

    #[test]
    fn test_collision_uses_forgiving_hitbox() {
        let mut engine = started();
        let car = engine.world().player.bounds();
        let size = obstacle_size(ObstacleKind::Cone);

        // Grazes the car by 15px from above: inside the 10px insets of both boxes
        let grazing = car.top() - size.y + 15.0 - engine.world().speed;
        engine.world_mut().spawn(
            EntityKind::Obstacle(ObstacleKind::Cone),
            Vec2::new(lane_x(1, size.x), grazing),
            Extent::Box(size),
        );
        assert_eq!(engine.step(0.0, &mut ()), StepOutcome::Advanced);

        engine.world_mut().entities[0].pos.y += 20.0;
        assert_eq!(
            engine.step(0.0, &mut ()),
            StepOutcome::Finished(TerminalCause::HazardContact)
        );
    }

    #[test]
    fn test_obstacle_table_covers_every_roll() {
        let mut rng = Pcg32::seed_from_u64(99);
        let mut seen = [0usize; 3];
        for _ in 0..2000 {
            match Car::roll_obstacle(&mut rng) {
                ObstacleKind::Car => seen[0] += 1,
                ObstacleKind::Cone => seen[1] += 1,
                ObstacleKind::Truck => seen[2] += 1,
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(seen[0] > seen[1] && seen[0] > seen[2]);
        assert!(seen[1] > 250 && seen[2] > 250);
    }

    #[test]
    fn test_autopilot_dodges_blocked_lane() {
        let mut engine = started();
        let size = obstacle_size(ObstacleKind::Truck);
        engine.world_mut().spawn(
            EntityKind::Obstacle(ObstacleKind::Truck),
            Vec2::new(lane_x(1, size.x), CAR_Y - 200.0),
            Extent::Box(size),
        );
        let game = Car::default();
        assert_eq!(game.autopilot(engine.world()), Some(CarInput::Left));
    }
}
