//! Snake on a 40x30 grid
//!
//! Positions are grid cells. The step interval shortens as the score grows;
//! `World::speed` holds the rate in steps per second so the shared
//! never-decreasing speed rule applies.

use std::collections::VecDeque;

use glam::{IVec2, Vec2};
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::Variant;
use crate::sim::{
    EntityKind, Extent, FoodKind, Game, ObstacleKind, Resolution, TerminalCause, World,
};
use crate::tuning::{Pace, Tuning};

pub const GRID_WIDTH: i32 = 40;
pub const GRID_HEIGHT: i32 = 30;
/// Pixels per cell on the 800x600 canvas
pub const CELL_SIZE: f32 = 20.0;
pub const INITIAL_LENGTH: i32 = 4;

/// Step interval shrinks by this many milliseconds per point
pub const MS_PER_POINT: f32 = 3.0;
/// Tiered food starts above this score
pub const TIERED_FOOD_AFTER: u32 = 10;
/// One grid obstacle per this many points
pub const POINTS_PER_OBSTACLE: u32 = 5;
/// Obstacle layout is regenerated whenever the score lands on a multiple of this
pub const OBSTACLE_REFRESH: u32 = 3;
/// Obstacles stay this many cells away from the border
pub const OBSTACLE_MARGIN: i32 = 5;

const FOOD_ATTEMPTS: usize = 100;
const OBSTACLE_ATTEMPTS: usize = 50;
const BLOCK: EntityKind = EntityKind::Obstacle(ObstacleKind::Block);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    #[default]
    Right,
}

impl Direction {
    pub fn delta(self) -> IVec2 {
        match self {
            Direction::Up => IVec2::NEG_Y,
            Direction::Down => IVec2::Y,
            Direction::Left => IVec2::NEG_X,
            Direction::Right => IVec2::X,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnakeState {
    /// Head first
    pub body: VecDeque<IVec2>,
    /// Direction of the last step
    pub direction: Direction,
    /// Direction of the next step
    pub next_direction: Direction,
    /// Cell vacated by the last step
    pub last_tail: Option<IVec2>,
}

pub fn in_grid(cell: IVec2) -> bool {
    (0..GRID_WIDTH).contains(&cell.x) && (0..GRID_HEIGHT).contains(&cell.y)
}

fn cell_of(pos: Vec2) -> IVec2 {
    pos.round().as_ivec2()
}

/// Food tier for a freshly placed food
pub fn roll_food(score: u32, rng: &mut Pcg32) -> FoodKind {
    if score <= TIERED_FOOD_AFTER {
        return FoodKind::Normal;
    }
    let roll: f32 = rng.random();
    if roll < 0.1 {
        FoodKind::Poison
    } else if roll < 0.3 {
        FoodKind::Special
    } else {
        FoodKind::Normal
    }
}

#[derive(Debug, Clone)]
pub struct Snake {
    pace: Pace,
}

impl Snake {
    pub fn new(pace: Pace) -> Self {
        Self { pace }
    }

    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self::new(tuning.snake)
    }

    /// Steps per second for a score: 150 ms per step, 3 ms faster per point,
    /// never faster than the cap
    fn rate_for(&self, score: u32) -> f32 {
        let base_ms = 1000.0 / self.pace.base_speed;
        let floor_ms = 1000.0 / self.pace.speed_cap;
        let ms = (base_ms - MS_PER_POINT * score as f32).max(floor_ms);
        1000.0 / ms
    }

    fn occupied(world: &World<SnakeState>, cell: IVec2) -> bool {
        world.extra.body.contains(&cell)
            || world
                .entities
                .iter()
                .any(|e| !e.consumed && cell_of(e.pos) == cell)
    }

    fn place_food(world: &mut World<SnakeState>, score: u32, rng: &mut Pcg32) {
        let mut cell = IVec2::ZERO;
        for _ in 0..FOOD_ATTEMPTS {
            cell = IVec2::new(
                rng.random_range(0..GRID_WIDTH),
                rng.random_range(0..GRID_HEIGHT),
            );
            if !Self::occupied(world, cell) {
                break;
            }
        }
        let kind = roll_food(score, rng);
        let id = world.spawn(EntityKind::Food(kind), cell.as_vec2(), Extent::Box(Vec2::ONE));
        log::debug!("snake: {:?} food {} at {}", kind, id, cell);
    }

    fn place_obstacles(world: &mut World<SnakeState>, score: u32, rng: &mut Pcg32) {
        world.entities.retain(|e| e.kind != BLOCK);
        let count = score / POINTS_PER_OBSTACLE;
        for _ in 0..count {
            let mut cell = IVec2::ZERO;
            for _ in 0..OBSTACLE_ATTEMPTS {
                cell = IVec2::new(
                    rng.random_range(OBSTACLE_MARGIN..=GRID_WIDTH - OBSTACLE_MARGIN),
                    rng.random_range(OBSTACLE_MARGIN..=GRID_HEIGHT - OBSTACLE_MARGIN),
                );
                if !Self::occupied(world, cell) {
                    break;
                }
            }
            world.spawn(BLOCK, cell.as_vec2(), Extent::Box(Vec2::ONE));
        }
        log::debug!("snake: {} obstacles at score {}", count, score);
    }
}

impl Default for Snake {
    fn default() -> Self {
        Self::from_tuning(&Tuning::default())
    }
}

impl Game for Snake {
    type Input = Direction;
    type Extra = SnakeState;

    fn variant(&self) -> Variant {
        Variant::Snake
    }

    fn pace(&self) -> &Pace {
        &self.pace
    }

    fn reset(&self, world: &mut World<SnakeState>, rng: &mut Pcg32) {
        let centre = IVec2::new(GRID_WIDTH / 2, GRID_HEIGHT / 2);
        world.extra = SnakeState {
            body: (0..INITIAL_LENGTH).map(|i| centre - IVec2::new(i, 0)).collect(),
            ..SnakeState::default()
        };
        world.player.pos = centre.as_vec2();
        world.player.extent = Extent::Box(Vec2::ONE);
        Self::place_food(world, 0, rng);
    }

    fn apply_input(&self, world: &mut World<SnakeState>, input: Direction) {
        if input == world.extra.direction.opposite() {
            log::debug!("snake: reverse to {:?} ignored", input);
            return;
        }
        world.extra.next_direction = input;
    }

    fn integrate(&self, world: &mut World<SnakeState>) {
        let state = &mut world.extra;
        state.direction = state.next_direction;
        let Some(&head) = state.body.front() else {
            return;
        };
        let head = head + state.direction.delta();
        state.body.push_front(head);
        state.last_tail = state.body.pop_back();

        world.player.pos = head.as_vec2();
        world.distance += 1.0;
    }

    fn spawn(&self, world: &mut World<SnakeState>, _rng: &mut Pcg32) {
        world.retire(|_| false);
    }

    fn resolve(&self, world: &mut World<SnakeState>, rng: &mut Pcg32) -> Resolution {
        let head = cell_of(world.player.pos);
        if !in_grid(head) {
            return Resolution::ended(TerminalCause::OutOfBounds);
        }

        let state = &world.extra;
        let bitten = state.body.iter().skip(1).any(|&c| c == head) || state.last_tail == Some(head);
        let blocked = world.hazards().any(|e| cell_of(e.pos) == head);
        if bitten || blocked {
            return Resolution::ended(TerminalCause::HazardContact);
        }

        let Some(food) = world
            .entities
            .iter_mut()
            .find(|e| !e.consumed && matches!(e.kind, EntityKind::Food(_)) && cell_of(e.pos) == head)
        else {
            return Resolution::default();
        };
        let EntityKind::Food(kind) = food.kind else {
            return Resolution::default();
        };
        food.consumed = true;

        // Eating grows the snake by keeping the tail
        if let Some(tail) = world.extra.last_tail.take() {
            world.extra.body.push_back(tail);
        }

        let points = kind.points();
        let max = i64::from(self.pace.max_score);
        let next = (i64::from(world.score) + points).clamp(0, max) as u32;
        if next > 0 && next % OBSTACLE_REFRESH == 0 {
            Self::place_obstacles(world, next, rng);
        }
        Self::place_food(world, next, rng);

        Resolution::scored(points)
    }

    fn accelerate(&self, world: &mut World<SnakeState>) {
        let rate = self.rate_for(world.score);
        world.speed = world.speed.max(rate).min(self.pace.speed_cap);
    }

    fn min_interval_ms(&self, world: &World<SnakeState>) -> Option<f64> {
        if world.speed > 0.0 {
            Some(1000.0 / f64::from(world.speed))
        } else {
            self.pace.frame_interval_ms
        }
    }

    fn map_key(&self, code: &str) -> Option<Direction> {
        match code {
            "ArrowUp" | "KeyW" => Some(Direction::Up),
            "ArrowDown" | "KeyS" => Some(Direction::Down),
            "ArrowLeft" | "KeyA" => Some(Direction::Left),
            "ArrowRight" | "KeyD" => Some(Direction::Right),
            _ => None,
        }
    }

    /// Greedy toward the food, never into a wall, a block or the body
    fn autopilot(&self, world: &World<SnakeState>) -> Option<Direction> {
        let state = &world.extra;
        let head = *state.body.front()?;
        let food = world
            .entities
            .iter()
            .find(|e| !e.consumed && matches!(e.kind, EntityKind::Food(_)))
            .map(|e| cell_of(e.pos));

        let safe = |dir: Direction| {
            let cell = head + dir.delta();
            let tail = state.body.back().copied();
            in_grid(cell)
                && !world.hazards().any(|e| cell_of(e.pos) == cell)
                && !state.body.iter().any(|&c| c == cell && Some(c) != tail)
        };

        let candidates = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];
        let mut options: Vec<Direction> = candidates
            .into_iter()
            .filter(|d| *d != state.direction.opposite() && safe(*d))
            .collect();
        if let Some(food) = food {
            options.sort_by_key(|d| {
                let cell = head + d.delta();
                (cell - food).abs().element_sum()
            });
        }
        options
            .first()
            .copied()
            .filter(|d| *d != state.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Engine, LoopEvent, PaidTicket, StepOutcome};

    fn started() -> Engine<Snake> {
        let mut engine = Engine::new(Snake::default());
        engine.start(PaidTicket::new(), 21).unwrap();
        engine
    }

    /// Put a single food of `kind` right in front of the head
    fn food_ahead(engine: &mut Engine<Snake>, kind: FoodKind) {
        let world = engine.world_mut();
        world.entities.retain(|e| !matches!(e.kind, EntityKind::Food(_)));
        let state = &world.extra;
        let cell = state.body[0] + state.next_direction.delta();
        world.spawn(EntityKind::Food(kind), cell.as_vec2(), Extent::Box(Vec2::ONE));
    }

    fn food_count(engine: &Engine<Snake>) -> usize {
        engine
            .world()
            .entities
            .iter()
            .filter(|e| !e.consumed && matches!(e.kind, EntityKind::Food(_)))
            .count()
    }

    #[test]
    fn test_initial_layout() {
        let engine = started();
        let state = &engine.world().extra;
        assert_eq!(state.body.len(), 4);
        assert_eq!(state.body[0], IVec2::new(20, 15));
        assert_eq!(state.body[3], IVec2::new(17, 15));
        assert_eq!(state.direction, Direction::Right);
        assert_eq!(food_count(&engine), 1);
    }

    #[test]
    fn test_steps_follow_the_interval() {
        let mut engine = started();
        assert_eq!(engine.step(0.0, &mut ()), StepOutcome::Advanced);
        assert_eq!(engine.step(100.0, &mut ()), StepOutcome::Gated);
        assert_eq!(engine.step(151.0, &mut ()), StepOutcome::Advanced);
        assert_eq!(engine.world().extra.body[0], IVec2::new(22, 15));
    }

    #[test]
    fn test_eating_grows_and_scores() {
        let mut engine = started();
        let mut events = Vec::new();
        food_ahead(&mut engine, FoodKind::Normal);
        engine.step(0.0, &mut events);

        assert_eq!(events, vec![LoopEvent::ScoreChanged(1)]);
        assert_eq!(engine.world().extra.body.len(), 5);
        assert_eq!(food_count(&engine), 1);
    }

    #[test]
    fn test_score_is_capped_at_max() {
        let mut engine = started();
        engine.world_mut().score = 25;
        let mut events = Vec::new();
        food_ahead(&mut engine, FoodKind::Special);
        engine.step(0.0, &mut events);
        assert_eq!(engine.score(), 25);
        assert!(events.is_empty());
    }

    #[test]
    fn test_poison_floors_at_zero() {
        let mut engine = started();
        engine.world_mut().score = 1;
        let mut events = Vec::new();
        food_ahead(&mut engine, FoodKind::Poison);
        engine.step(0.0, &mut events);
        assert_eq!(engine.score(), 0);
        assert_eq!(events, vec![LoopEvent::ScoreChanged(0)]);
    }

    #[test]
    fn test_reverse_direction_is_rejected() {
        let mut engine = started();
        engine.queue_input(Direction::Left);
        engine.step(0.0, &mut ());
        assert_eq!(engine.world().extra.direction, Direction::Right);

        engine.queue_input(Direction::Up);
        engine.step(1000.0, &mut ());
        assert_eq!(engine.world().extra.direction, Direction::Up);
        assert_eq!(engine.world().extra.body[0], IVec2::new(21, 14));
    }

    #[test]
    fn test_wall_ends_run() {
        let mut engine = started();
        engine.world_mut().entities.clear();
        let mut now = 0.0;
        let outcome = loop {
            let outcome = engine.step(now, &mut ());
            now += 1000.0;
            if outcome != StepOutcome::Advanced {
                break outcome;
            }
            engine.world_mut().entities.clear();
        };
        assert_eq!(outcome, StepOutcome::Finished(TerminalCause::OutOfBounds));
        assert_eq!(engine.world().extra.body[0].x, GRID_WIDTH);
    }

    #[test]
    fn test_biting_the_body_ends_run() {
        let mut engine = started();
        engine.world_mut().entities.clear();
        engine.world_mut().extra.body = [(5, 5), (6, 5), (6, 6), (5, 6), (4, 6)]
            .into_iter()
            .map(IVec2::from)
            .collect();
        engine.world_mut().extra.direction = Direction::Down;
        engine.world_mut().extra.next_direction = Direction::Down;
        assert_eq!(
            engine.step(0.0, &mut ()),
            StepOutcome::Finished(TerminalCause::HazardContact)
        );
    }

    #[test]
    fn test_obstacles_regenerate_on_multiples_of_three() {
        let mut engine = started();
        engine.world_mut().score = 14;
        food_ahead(&mut engine, FoodKind::Normal);
        engine.step(0.0, &mut ());
        assert_eq!(engine.score(), 15);

        let blocks: Vec<_> = engine.world().hazards().collect();
        assert_eq!(blocks.len(), 3);
        for block in blocks {
            let cell = cell_of(block.pos);
            assert!(cell.x >= OBSTACLE_MARGIN && cell.x <= GRID_WIDTH - OBSTACLE_MARGIN);
            assert!(cell.y >= OBSTACLE_MARGIN && cell.y <= GRID_HEIGHT - OBSTACLE_MARGIN);
        }
    }

    #[test]
    fn test_rate_rises_with_score_and_never_falls() {
        let mut engine = started();
        engine.world_mut().entities.clear();
        engine.world_mut().score = 10;
        engine.step(0.0, &mut ());
        let fast = engine.world().speed;
        assert!((fast - 1000.0 / 120.0).abs() < 1e-3);

        engine.world_mut().entities.clear();
        engine.world_mut().score = 0;
        engine.step(1000.0, &mut ());
        assert_eq!(engine.world().speed, fast);

        engine.world_mut().entities.clear();
        engine.world_mut().score = 25;
        engine.step(2000.0, &mut ());
        assert!((engine.world().speed - 12.5).abs() < 1e-4);
    }

    #[test]
    fn test_food_tiers() {
        let mut rng = crate::sim::RngState::new(4).to_rng();
        for _ in 0..50 {
            assert_eq!(roll_food(10, &mut rng), FoodKind::Normal);
        }
        let tiers: Vec<_> = (0..500).map(|_| roll_food(11, &mut rng)).collect();
        assert!(tiers.contains(&FoodKind::Poison));
        assert!(tiers.contains(&FoodKind::Special));
    }
}
