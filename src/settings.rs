//! Run settings
//!
//! Loaded from a JSON file. Every field is optional in the file; missing fields
//! take their defaults.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::GameError;
use crate::levels::{LevelKey, LevelRegistry};
use crate::sim::{LevelConfig, ScreenGeometry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Simulation rate (ticks per second)
    pub tick_rate_hz: u32,
    /// Cap on ticks run for a single clock advance
    pub max_catch_up_ticks: u32,

    pub screen_width: f32,
    pub screen_height: f32,

    /// Fixed run seed; a time-based seed is used when absent
    pub seed: Option<u64>,
    pub starting_level: String,
    /// Tick budget for headless runs
    pub max_ticks: u64,

    /// Replacement configurations for individual levels
    pub levels: BTreeMap<LevelKey, LevelConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICK_RATE_HZ,
            max_catch_up_ticks: MAX_CATCH_UP_TICKS,
            screen_width: SCREEN_WIDTH,
            screen_height: SCREEN_HEIGHT,
            seed: None,
            starting_level: LevelKey::LevelOne.as_str().into(),
            max_ticks: 60 * 60 * 10,
            levels: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GameError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GameError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.tick_rate_hz == 0 {
            return Err(GameError::InvalidConfig {
                field: "tick_rate_hz",
                reason: "must be positive".into(),
            });
        }
        if !(self.screen_width > 0.0) {
            return Err(GameError::InvalidConfig {
                field: "screen_width",
                reason: format!("{} is not positive", self.screen_width),
            });
        }
        // Enemies spawn above the bottom margin, so the screen must be taller
        if !(self.screen_height > ENEMY_Y_MARGIN) {
            return Err(GameError::InvalidConfig {
                field: "screen_height",
                reason: format!("{} leaves no room above the {} margin", self.screen_height, ENEMY_Y_MARGIN),
            });
        }
        self.starting_level.parse::<LevelKey>()?;
        Ok(())
    }

    pub fn screen(&self) -> ScreenGeometry {
        ScreenGeometry::new(self.screen_width, self.screen_height)
    }

    /// The configured seed, or one taken from the system clock
    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_nanos() as u64)
        })
    }

    /// Standard levels with this file's overrides applied
    pub fn registry(&self) -> Result<LevelRegistry, GameError> {
        self.levels.iter().try_fold(
            LevelRegistry::standard().with_screen(self.screen()),
            |registry, (key, config)| registry.with_config(*key, config.clone()),
        )
    }
}
