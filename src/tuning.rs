//! Data-driven game balance
//!
//! Defaults reproduce the shipped arcade. A JSON document may override any
//! subset of fields; missing fields keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Variant;
use crate::error::ConfigError;

/// Score ceiling and speed curve of one game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pace {
    /// Highest score a run can reach
    pub max_score: u32,
    /// Speed at the start of a run
    pub base_speed: f32,
    /// Speed gained per frame (per paddle contact for the paddle game)
    pub speed_increment: f32,
    /// Speed never grows past this
    pub speed_cap: f32,
    /// Minimum milliseconds between accepted steps (None = every frame)
    pub frame_interval_ms: Option<f64>,
}

impl Default for Pace {
    fn default() -> Self {
        Self::dragon()
    }
}

impl Pace {
    pub fn dragon() -> Self {
        Self {
            max_score: 25,
            base_speed: 3.0,
            speed_increment: 0.003,
            speed_cap: 8.0,
            frame_interval_ms: None,
        }
    }

    pub fn car() -> Self {
        Self {
            max_score: 25,
            base_speed: 4.0,
            speed_increment: 0.002,
            speed_cap: 8.0,
            frame_interval_ms: None,
        }
    }

    /// Grid steps per second: 150 ms per step, floor 80 ms
    pub fn snake() -> Self {
        Self {
            max_score: 25,
            base_speed: 1000.0 / 150.0,
            speed_increment: 0.0,
            speed_cap: 1000.0 / 80.0,
            frame_interval_ms: None,
        }
    }

    /// Speed is the ball's velocity magnitude
    pub fn paddle() -> Self {
        Self {
            max_score: 20,
            base_speed: 5.0,
            speed_increment: 0.2,
            speed_cap: 12.5,
            frame_interval_ms: Some(16.67),
        }
    }

    /// Next speed after one monotonic increment
    pub fn accelerate(&self, speed: f32) -> f32 {
        if speed >= self.speed_cap {
            return speed;
        }
        (speed + self.speed_increment).min(self.speed_cap)
    }
}

/// Fields a tuning file may set for one game; the rest keep that game's defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PaceOverride {
    max_score: Option<u32>,
    base_speed: Option<f32>,
    speed_increment: Option<f32>,
    speed_cap: Option<f32>,
    frame_interval_ms: Option<f64>,
}

impl PaceOverride {
    fn apply(self, mut pace: Pace) -> Pace {
        if let Some(v) = self.max_score {
            pace.max_score = v;
        }
        if let Some(v) = self.base_speed {
            pace.base_speed = v;
        }
        if let Some(v) = self.speed_increment {
            pace.speed_increment = v;
        }
        if let Some(v) = self.speed_cap {
            pace.speed_cap = v;
        }
        if let Some(v) = self.frame_interval_ms {
            pace.frame_interval_ms = Some(v);
        }
        pace
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TuningFile {
    dragon: PaceOverride,
    car: PaceOverride,
    snake: PaceOverride,
    paddle: PaceOverride,
}

impl From<TuningFile> for Tuning {
    fn from(file: TuningFile) -> Self {
        Self {
            dragon: file.dragon.apply(Pace::dragon()),
            car: file.car.apply(Pace::car()),
            snake: file.snake.apply(Pace::snake()),
            paddle: file.paddle.apply(Pace::paddle()),
        }
    }
}

/// Balance table for every game
///
/// A JSON document overrides field by field on top of each game's own defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TuningFile")]
pub struct Tuning {
    pub dragon: Pace,
    pub car: Pace,
    pub snake: Pace,
    pub paddle: Pace,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            dragon: Pace::dragon(),
            car: Pace::car(),
            snake: Pace::snake(),
            paddle: Pace::paddle(),
        }
    }
}

impl Tuning {
    pub fn pace(&self, variant: Variant) -> Pace {
        match variant {
            Variant::Dragon => self.dragon,
            Variant::Car => self.car,
            Variant::Snake => self.snake,
            Variant::Paddle => self.paddle,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "car": { "max_score": 30 } }"#).unwrap();
        assert_eq!(tuning.car.max_score, 30);
        assert_eq!(tuning.car.base_speed, 4.0);
        assert_eq!(tuning.dragon, Pace::dragon());
        assert_eq!(tuning.paddle.max_score, 20);
    }

    #[test]
    fn override_keeps_each_game_defaults() {
        let tuning = Tuning::from_json(r#"{ "paddle": { "max_score": 30 } }"#).unwrap();
        assert_eq!(
            tuning.paddle,
            Pace {
                max_score: 30,
                ..Pace::paddle()
            }
        );
        assert_eq!(tuning.paddle.frame_interval_ms, Some(16.67));

        let tuning = Tuning::from_json(r#"{ "snake": { "speed_cap": 20.0 } }"#).unwrap();
        assert_eq!(tuning.snake.speed_increment, 0.0);
        assert_eq!(tuning.snake.base_speed, Pace::snake().base_speed);
        assert_eq!(tuning.snake.speed_cap, 20.0);
    }

    #[test]
    fn empty_json_is_the_default_table() {
        assert_eq!(Tuning::from_json("{}").unwrap(), Tuning::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            Tuning::from_json(r#"{ "car": { "top_speed": 9 } }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        assert!(matches!(
            Tuning::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn accelerate_is_capped_and_monotonic() {
        let pace = Pace::default();
        let mut speed = pace.base_speed;
        for _ in 0..10_000 {
            let next = pace.accelerate(speed);
            assert!(next >= speed);
            speed = next;
        }
        assert_eq!(speed, pace.speed_cap);
    }
}
