//! Sky Siege - simulation core of a side-scrolling arcade shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, pools, collisions, spawning, boss, level state)
//! - `presentation`: Outbound command queue to the presentation thread
//! - `levels`: Level identifiers, standard level scripts and the level registry
//! - `controller`: Drives the clock and swaps levels on transition
//! - `settings`: Run configuration

pub mod controller;
pub mod error;
pub mod levels;
pub mod presentation;
pub mod settings;
pub mod sim;

pub use controller::LevelController;
pub use error::GameError;
pub use levels::{LevelKey, LevelRegistry};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Simulation rate (ticks per second)
    pub const TICK_RATE_HZ: u32 = 60;
    /// Maximum ticks run per clock advance to prevent spiral of death
    pub const MAX_CATCH_UP_TICKS: u32 = 8;

    /// Screen dimensions
    pub const SCREEN_WIDTH: f32 = 1300.0;
    pub const SCREEN_HEIGHT: f32 = 750.0;
    /// Enemies never spawn lower than `screen_height - ENEMY_Y_MARGIN`
    pub const ENEMY_Y_MARGIN: f32 = 85.0;

    /// Player craft
    pub const PLAYER_SIZE: (f32, f32) = (110.0, 40.0);
    pub const PLAYER_START: (f32, f32) = (5.0, 300.0);
    pub const PLAYER_SPEED: f32 = 8.0;
    pub const PLAYER_UPPER_BOUND: f32 = -40.0;
    pub const PLAYER_LOWER_BOUND: f32 = 600.0;
    /// Player may not cross into the right half of the screen
    pub const PLAYER_RIGHT_BOUND: f32 = 650.0;
    pub const PLAYER_FIRE_OFFSET: (f32, f32) = (110.0, 20.0);

    /// Enemy craft
    pub const ENEMY_SIZE: (f32, f32) = (100.0, 50.0);
    pub const ENEMY_FIRE_OFFSET: (f32, f32) = (-100.0, 50.0);

    /// Projectiles
    pub const PROJECTILE_SIZE: (f32, f32) = (40.0, 12.0);
    pub const PLAYER_PROJECTILE_SPEED: f32 = 15.0;
    pub const ENEMY_PROJECTILE_SPEED: f32 = 10.0;
    pub const BOSS_PROJECTILE_SPEED: f32 = 15.0;

    /// Boss craft
    pub const BOSS_SIZE: (f32, f32) = (220.0, 120.0);
    pub const BOSS_START: (f32, f32) = (1000.0, 400.0);
    pub const BOSS_FIRE_OFFSET: (f32, f32) = (0.0, 75.0);
    /// Moves of each direction queued per shuffle cycle
    pub const BOSS_MOVES_PER_CYCLE: usize = 5;
    /// Ticks between move-queue reshuffles
    pub const BOSS_MAX_TICKS_SAME_MOVE: u32 = 10;
}
