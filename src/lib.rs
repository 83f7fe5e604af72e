//! Dragon Arcade - token-gated arcade mini-games
//!
//! Core modules:
//! - `sim`: Deterministic simulation loop shared by every game (state, collisions, engine)
//! - `games`: The four game variants plugged into the loop (dragon, car, snake, paddle)
//! - `bridge`: Pay-to-start and score-claim boundary to the wallet collaborators
//! - `highscores`: Best score per game, persisted in a key-value store
//! - `leaderboard`: Ranking of accounts by minted score NFTs
//! - `tuning`: Data-driven game balance
//! - `settings` / `storage`: Preferences and the key-value stores behind them

pub mod bridge;
pub mod error;
pub mod games;
pub mod highscores;
pub mod leaderboard;
pub mod settings;
pub mod sim;
pub mod storage;
pub mod tuning;

pub use bridge::{ClaimLedger, PaymentGate, ScoreMinter, Session};
pub use error::{ArcadeError, AuthorizationError, CommandError, FrameFault};
pub use highscores::BestScore;
pub use settings::Settings;
pub use tuning::{Pace, Tuning};

use serde::{Deserialize, Serialize};

/// Arcade-wide constants
pub mod consts {
    /// Nominal display refresh interval (60 Hz)
    pub const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Tokens spent to start one run
    pub const GAME_COST_TOKENS: u32 = 1;
}

/// The four games offered by the arcade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    Dragon,
    Car,
    Snake,
    Paddle,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Dragon,
        Variant::Car,
        Variant::Snake,
        Variant::Paddle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Dragon => "dragon",
            Variant::Car => "car",
            Variant::Snake => "snake",
            Variant::Paddle => "paddle",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dragon" | "runner" => Some(Variant::Dragon),
            "car" | "racer" => Some(Variant::Car),
            "snake" | "serpent" => Some(Variant::Snake),
            "paddle" | "wallball" => Some(Variant::Paddle),
            _ => None,
        }
    }

    /// Fixed storage key of this game's best score
    pub fn best_score_key(&self) -> &'static str {
        match self {
            Variant::Dragon => "dragonHighScore",
            Variant::Car => "carRunnerHighScore",
            Variant::Snake => "snakeHighScore",
            Variant::Paddle => "ballPaddleHighScore",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_names_round_trip() {
        for variant in Variant::ALL {
            assert_eq!(Variant::from_name(variant.as_str()), Some(variant));
        }
        assert_eq!(Variant::from_name("WallBall"), Some(Variant::Paddle));
        assert_eq!(Variant::from_name("tetris"), None);
    }

    #[test]
    fn best_score_keys_are_distinct() {
        let mut keys: Vec<_> = Variant::ALL.iter().map(|v| v.best_score_key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 4);
    }
}
