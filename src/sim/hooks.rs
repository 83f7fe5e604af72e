//! Outbound notifications from the loop

/// Callbacks fired by the engine while a run is live
pub trait LoopHooks {
    /// Score changed during `Running` (value after clamping)
    fn on_score_changed(&mut self, _score: u32) {}

    /// The run ended; fired exactly once per run
    fn on_game_over(&mut self, _final_score: u32) {}
}

/// Ignore every notification
impl LoopHooks for () {}

/// Notification record, for hosts that poll instead of reacting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    ScoreChanged(u32),
    GameOver(u32),
}

impl LoopHooks for Vec<LoopEvent> {
    fn on_score_changed(&mut self, score: u32) {
        self.push(LoopEvent::ScoreChanged(score));
    }

    fn on_game_over(&mut self, final_score: u32) {
        self.push(LoopEvent::GameOver(final_score));
    }
}

/// Log every notification
#[derive(Debug, Default)]
pub struct LogHooks;

impl LoopHooks for LogHooks {
    fn on_score_changed(&mut self, score: u32) {
        log::debug!("Score: {}", score);
    }

    fn on_game_over(&mut self, final_score: u32) {
        log::info!("Game over, final score {}", final_score);
    }
}
