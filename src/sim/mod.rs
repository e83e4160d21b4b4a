//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (insertion order within each pool)
//! - No rendering or platform dependencies; visuals go out as commands

pub mod boss;
pub mod clock;
pub mod collision;
pub mod entity;
pub mod input;
pub mod level;
pub mod pool;
pub mod spawner;

pub use boss::{BossConfig, BossController, BossPhase, BossState, FirePattern};
pub use clock::GameClock;
pub use entity::{
    BoundingBox, EnemyProfile, Entity, EntityId, EntityIds, EntityKind, MotionBounds,
    ScreenGeometry, Shot, Weapon,
};
pub use input::{InputLatch, InputSnapshot, RawKeys};
pub use level::{
    Level, LevelConfig, LevelProgress, LevelSnapshot, LevelState, LevelStateMachine, LevelStats,
    PendingTransition, SpawnContext, TransitionSink, Verdict, World,
};
pub use pool::{EntityPool, PoolCategory};
pub use spawner::{MAX_PLACEMENT_ATTEMPTS, Spawner};
