//! Per-frame simulation loop
//!
//! Advances one world by exactly one step per accepted frame, in a fixed
//! order: input, motion, spawn, collisions, clamp, speed, terminal check.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::game::{Game, Resolution, TerminalCause};
use super::hooks::LoopHooks;
use super::state::{GamePhase, World};
use crate::error::{CommandError, FrameFault};

/// Proof that the run was paid for
///
/// Only the payment bridge mints these, so a run cannot start without a
/// successful payment.
#[derive(Debug)]
pub struct PaidTicket {
    _private: (),
}

impl PaidTicket {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// What a call to [`Engine::step`] did
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Not running; nothing happened
    Inactive,
    /// Too soon since the last accepted step; nothing happened
    Gated,
    /// One step taken, run continues
    Advanced,
    /// One step taken and the run ended
    Finished(TerminalCause),
    /// The frame failed and was discarded; the run ended
    Faulted(FrameFault),
}

pub struct Engine<G: Game> {
    game: G,
    world: World<G::Extra>,
    rng: Pcg32,
    pending: VecDeque<G::Input>,
    last_step_ms: Option<f64>,
}

impl<G: Game> Engine<G> {
    /// Idle engine; nothing runs until [`Engine::start`]
    pub fn new(game: G) -> Self {
        Self {
            game,
            world: World::new(0),
            rng: Pcg32::seed_from_u64(0),
            pending: VecDeque::new(),
            last_step_ms: None,
        }
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    /// Read-only view of the current world
    pub fn world(&self) -> &World<G::Extra> {
        &self.world
    }

    /// Owned copy of the current world
    pub fn snapshot(&self) -> World<G::Extra> {
        self.world.clone()
    }

    pub fn phase(&self) -> GamePhase {
        self.world.phase
    }

    pub fn score(&self) -> u32 {
        self.world.score
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut World<G::Extra> {
        &mut self.world
    }

    /// Begin a new run
    ///
    /// Rejected while a run is live. From `Idle` or `Over` the world is
    /// rebuilt from `seed`.
    pub fn start(&mut self, _ticket: PaidTicket, seed: u64) -> Result<(), CommandError> {
        if self.world.phase == GamePhase::Running {
            log::warn!("{}: start rejected, run already in progress", self.game.variant());
            return Err(CommandError::AlreadyRunning);
        }

        let mut world = World::new(seed);
        let mut rng = world.rng_state.to_rng();
        world.speed = self.game.pace().base_speed;
        self.game.reset(&mut world, &mut rng);
        world.phase = GamePhase::Running;

        self.world = world;
        self.rng = rng;
        self.pending.clear();
        self.last_step_ms = None;

        log::info!("{}: run started (seed {})", self.game.variant(), seed);
        Ok(())
    }

    /// Queue a command for the next step; dropped unless running
    pub fn queue_input(&mut self, input: G::Input) {
        if self.world.phase == GamePhase::Running {
            self.pending.push_back(input);
        }
    }

    /// Advance one step if running and the frame gate allows it
    pub fn step(&mut self, now_ms: f64, hooks: &mut dyn LoopHooks) -> StepOutcome {
        if self.world.phase != GamePhase::Running {
            return StepOutcome::Inactive;
        }

        if let (Some(interval), Some(last)) = (self.game.min_interval_ms(&self.world), self.last_step_ms)
        {
            if now_ms - last < interval {
                return StepOutcome::Gated;
            }
        }
        self.last_step_ms = Some(now_ms);

        let before = self.world.clone();
        let rng_before = self.rng.clone();
        let inputs: Vec<G::Input> = self.pending.drain(..).collect();

        let game = &self.game;
        let world = &mut self.world;
        let rng = &mut self.rng;
        // wasm32-unknown-unknown aborts on panic, so there the finiteness
        // check below is the only fault a frame can report
        let result = panic::catch_unwind(AssertUnwindSafe(|| advance(game, world, rng, inputs)));

        let resolution = match result {
            Ok(resolution) if self.world.is_finite() => resolution,
            Ok(_) => {
                let fault = FrameFault::NonFinite { frame: before.frame };
                return self.abort(before, rng_before, fault, hooks);
            }
            Err(payload) => {
                let fault = FrameFault::Panicked {
                    frame: before.frame,
                    message: panic_message(payload.as_ref()),
                };
                return self.abort(before, rng_before, fault, hooks);
            }
        };

        if self.world.score != before.score {
            hooks.on_score_changed(self.world.score);
        }

        match resolution.terminal {
            Some(cause) => {
                log::info!(
                    "{}: run over ({:?}) at score {} after {} frames",
                    self.game.variant(),
                    cause,
                    self.world.score,
                    self.world.frame
                );
                self.finish(hooks);
                StepOutcome::Finished(cause)
            }
            None => StepOutcome::Advanced,
        }
    }

    /// Force the run to end without a terminal check (teardown)
    ///
    /// Fires no hooks. Returns whether a live run was stopped.
    pub fn stop(&mut self) -> bool {
        self.pending.clear();
        if self.world.phase != GamePhase::Running {
            return false;
        }
        self.world.phase = GamePhase::Over;
        log::info!("{}: run stopped at score {}", self.game.variant(), self.world.score);
        true
    }

    /// Discard the finished run and return to `Idle`
    pub fn reset(&mut self) -> Result<(), CommandError> {
        if self.world.phase == GamePhase::Running {
            return Err(CommandError::StillRunning);
        }
        self.world = World::new(self.world.rng_state.seed);
        self.pending.clear();
        self.last_step_ms = None;
        Ok(())
    }

    /// Discard the faulty frame and end the run at the pre-frame score
    fn abort(
        &mut self,
        before: World<G::Extra>,
        rng_before: Pcg32,
        fault: FrameFault,
        hooks: &mut dyn LoopHooks,
    ) -> StepOutcome {
        log::warn!("{}: {}; run aborted", self.game.variant(), fault);
        self.world = before;
        self.rng = rng_before;
        self.finish(hooks);
        StepOutcome::Faulted(fault)
    }

    fn finish(&mut self, hooks: &mut dyn LoopHooks) {
        self.pending.clear();
        self.world.phase = GamePhase::Over;
        hooks.on_game_over(self.world.score);
    }
}

/// One full step over the world, steps (a) to (f)
fn advance<G: Game>(
    game: &G,
    world: &mut World<G::Extra>,
    rng: &mut Pcg32,
    inputs: Vec<G::Input>,
) -> Resolution {
    for input in inputs {
        game.apply_input(world, input);
    }
    game.integrate(world);
    game.spawn(world, rng);
    let resolution = game.resolve(world, rng);

    let max = i64::from(game.pace().max_score);
    let score = (i64::from(world.score) + resolution.score_delta).clamp(0, max);
    world.score = score as u32;

    game.accelerate(world);
    world.frame += 1;
    resolution
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
