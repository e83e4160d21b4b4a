//! Crate error types

use thiserror::Error;

use crate::levels::LevelKey;

/// Fatal errors surfaced to whoever drives the game
#[derive(Debug, Error)]
pub enum GameError {
    /// A transition named a level key that is not in the level table
    #[error("unknown level key `{0}`")]
    UnknownLevel(String),

    /// The key is valid but the registry has no constructor for it
    #[error("no level registered for {0}")]
    UnregisteredLevel(LevelKey),

    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("failed to read settings: {0}")]
    SettingsIo(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    SettingsJson(#[from] serde_json::Error),
}

/// Non-fatal spawn failures; the level keeps running without the candidate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("no free position found after {attempts} attempts")]
    PlacementFailed { attempts: u32 },
}

/// Reject probabilities outside [0, 1] before any RNG sees them
pub(crate) fn check_probability(field: &'static str, p: f64) -> Result<(), GameError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(GameError::InvalidConfig {
            field,
            reason: format!("probability {p} is outside [0, 1]"),
        })
    }
}
