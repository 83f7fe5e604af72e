//! Frame scheduling and cancellation
//!
//! The host decides when frames happen (`requestAnimationFrame` in the
//! browser, a plain loop natively). The runner asks for exactly one
//! continuation per live step and cancels it on stop, so a stopped run never
//! sees another frame.

use std::collections::VecDeque;

use super::engine::{Engine, PaidTicket, StepOutcome};
use super::game::Game;
use super::hooks::LoopHooks;
use super::state::GamePhase;
use crate::error::CommandError;

/// Handle of one requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

pub trait FrameScheduler {
    /// Ask the host for one more frame
    fn request(&mut self) -> FrameToken;

    /// Withdraw a request; unknown or already-fired tokens are ignored
    fn cancel(&mut self, token: FrameToken);
}

/// In-process scheduler: the host pops due frames itself
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next: u64,
    queue: VecDeque<FrameToken>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next frame to run, if any
    pub fn pop_due(&mut self) -> Option<FrameToken> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request(&mut self) -> FrameToken {
        self.next += 1;
        let token = FrameToken(self.next);
        self.queue.push_back(token);
        token
    }

    fn cancel(&mut self, token: FrameToken) {
        self.queue.retain(|t| *t != token);
    }
}

/// Engine plus its continuation bookkeeping
pub struct Runner<G: Game, S: FrameScheduler> {
    engine: Engine<G>,
    scheduler: S,
    pending: Option<FrameToken>,
}

impl<G: Game, S: FrameScheduler> Runner<G, S> {
    pub fn new(engine: Engine<G>, scheduler: S) -> Self {
        Self {
            engine,
            scheduler,
            pending: None,
        }
    }

    pub fn engine(&self) -> &Engine<G> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine<G> {
        &mut self.engine
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Frame the runner is waiting for
    pub fn pending(&self) -> Option<FrameToken> {
        self.pending
    }

    /// Start a run and schedule its first frame
    pub fn begin(&mut self, ticket: PaidTicket, seed: u64) -> Result<(), CommandError> {
        self.engine.start(ticket, seed)?;
        self.cancel_pending();
        self.pending = Some(self.scheduler.request());
        Ok(())
    }

    /// Host callback for a frame
    ///
    /// Stale tokens (cancelled or superseded) are ignored.
    pub fn on_frame(&mut self, token: FrameToken, now_ms: f64, hooks: &mut dyn LoopHooks) -> StepOutcome {
        if self.pending != Some(token) {
            log::debug!("Ignoring stale frame {:?}", token);
            return StepOutcome::Inactive;
        }
        self.pending = None;

        let outcome = self.engine.step(now_ms, hooks);
        if self.engine.phase() == GamePhase::Running {
            self.pending = Some(self.scheduler.request());
        }
        outcome
    }

    /// End the run and cancel its scheduled continuation (idempotent)
    pub fn stop(&mut self) -> bool {
        self.cancel_pending();
        self.engine.stop()
    }

    fn cancel_pending(&mut self) {
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::Paddle;
    use crate::games::paddle::PaddleInput;
    use crate::sim::hooks::LoopEvent;

    fn running() -> Runner<Paddle, ManualScheduler> {
        let mut runner = Runner::new(Engine::new(Paddle::default()), ManualScheduler::new());
        runner.begin(PaidTicket::new(), 3).unwrap();
        runner
    }

    #[test]
    fn test_one_continuation_per_frame() {
        let mut runner = running();
        assert_eq!(runner.scheduler().pending(), 1);

        let mut now = 0.0;
        for _ in 0..5 {
            let token = runner.scheduler_mut().pop_due().unwrap();
            runner.on_frame(token, now, &mut ());
            now += 20.0;
            assert_eq!(runner.scheduler().pending(), 1);
        }
    }

    #[test]
    fn test_stop_cancels_next_frame() {
        let mut runner = running();
        let mut events = Vec::new();
        let token = runner.scheduler_mut().pop_due().unwrap();
        runner.on_frame(token, 0.0, &mut events);
        let next = runner.pending().unwrap();

        assert!(runner.stop());
        assert_eq!(runner.scheduler().pending(), 0);
        assert!(runner.pending().is_none());

        // A host that still delivers the cancelled frame gets nothing
        runner.engine_mut().queue_input(PaddleInput::PointerX(10.0));
        assert_eq!(runner.on_frame(next, 20.0, &mut events), StepOutcome::Inactive);
        assert!(!events.iter().any(|e| matches!(e, LoopEvent::GameOver(_))));
        assert!(!runner.stop());
    }

    #[test]
    fn test_stale_token_is_ignored() {
        let mut runner = running();
        let first = runner.scheduler_mut().pop_due().unwrap();
        runner.on_frame(first, 0.0, &mut ());
        let frame = runner.engine().world().frame;

        assert_eq!(runner.on_frame(first, 20.0, &mut ()), StepOutcome::Inactive);
        assert_eq!(runner.engine().world().frame, frame);
    }
}
