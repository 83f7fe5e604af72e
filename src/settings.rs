//! Session settings and preferences
//!
//! Persisted as one JSON document in the key-value store.

use serde::{Deserialize, Serialize};

use crate::consts::GAME_COST_TOKENS;
use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// Environment variable that pins the run seed (native only)
pub const SEED_ENV: &str = "ARCADE_SEED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tokens spent to start one run
    pub game_cost: u32,
    /// Seed every run with this value instead of a fresh one (replays, demos)
    pub fixed_seed: Option<u64>,
    /// `log` filter for the native binary, e.g. "info" or "dragon_arcade=debug"
    pub log_level: String,
    /// Let the autopilot play in the browser (attract mode)
    pub autopilot: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            game_cost: GAME_COST_TOKENS,
            fixed_seed: None,
            log_level: "info".to_string(),
            autopilot: false,
        }
    }
}

impl Settings {
    const STORAGE_KEY: &'static str = "dragon_arcade_settings";

    /// Load settings, falling back to defaults when absent or unreadable
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(Self::STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings");
                    return settings;
                }
                Err(e) => log::warn!("Ignoring unreadable settings: {}", e),
            },
            Ok(None) => {}
            Err(e) => log::warn!("Could not read settings: {}", e),
        }

        log::info!("Using default settings");
        Self::default()
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        let json = serde_json::to_string(self)?;
        store.set(Self::STORAGE_KEY, &json)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Apply `ARCADE_SEED` if set to a valid integer
    #[cfg(not(target_arch = "wasm32"))]
    pub fn with_env(mut self) -> Self {
        if let Ok(raw) = std::env::var(SEED_ENV) {
            match raw.trim().parse() {
                Ok(seed) => self.fixed_seed = Some(seed),
                Err(_) => log::warn!("Ignoring {}={:?}: not an integer", SEED_ENV, raw),
            }
        }
        self
    }

    /// Seed for the next run: the pinned seed, or `fresh`
    pub fn seed_or(&self, fresh: u64) -> u64 {
        self.fixed_seed.unwrap_or(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn round_trips_through_store() {
        let mut store = MemoryStore::new();
        let settings = Settings {
            fixed_seed: Some(99),
            ..Settings::default()
        };
        settings.save(&mut store).unwrap();
        assert_eq!(Settings::load(&store), settings);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let mut store = MemoryStore::new();
        store
            .set(Settings::STORAGE_KEY, r#"{"game_cost": 3}"#)
            .unwrap();
        let settings = Settings::load(&store);
        assert_eq!(settings.game_cost, 3);
        assert_eq!(settings.fixed_seed, None);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let mut store = MemoryStore::new();
        store.set(Settings::STORAGE_KEY, "{").unwrap();
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn fixed_seed_wins() {
        let mut settings = Settings::default();
        assert_eq!(settings.seed_or(5), 5);
        settings.fixed_seed = Some(1);
        assert_eq!(settings.seed_or(5), 1);
    }
}
