//! Best score per game
//!
//! One decimal string per game under a fixed key. Unreadable or unparsable
//! values count as 0, and a value is only ever replaced by a higher one.

use crate::Variant;
use crate::error::StorageError;
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestScore {
    variant: Variant,
    value: u32,
}

impl BestScore {
    /// Read the stored best score for `variant`
    pub fn load(store: &dyn KeyValueStore, variant: Variant) -> Self {
        let key = variant.best_score_key();
        let value = match store.get(key) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("Ignoring unparsable best score {:?} under {}", raw, key);
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                log::warn!("Could not read {}: {}", key, e);
                0
            }
        };
        Self { variant, value }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    /// Whether `score` would replace the stored value
    pub fn beaten_by(&self, score: u32) -> bool {
        score > self.value
    }

    /// Record a finished run's score; returns whether it was a new best
    pub fn submit(&mut self, score: u32, store: &mut dyn KeyValueStore) -> Result<bool, StorageError> {
        if !self.beaten_by(score) {
            return Ok(false);
        }
        store.set(self.variant.best_score_key(), &score.to_string())?;
        log::info!("New best score for {}: {} (was {})", self.variant, score, self.value);
        self.value = score;
        Ok(true)
    }
}
