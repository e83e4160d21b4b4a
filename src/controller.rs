//! Level controller
//!
//! Owns the clock and the running level. Feeds wall time and raw key state in,
//! runs whatever ticks are due, and replaces the level when it hands over to
//! another one.

use std::time::Duration;

use crate::error::GameError;
use crate::levels::LevelRegistry;
use crate::presentation::CommandQueue;
use crate::settings::Settings;
use crate::sim::{
    GameClock, InputLatch, LevelSnapshot, LevelState, LevelStateMachine, PendingTransition, RawKeys,
};

pub struct LevelController {
    registry: LevelRegistry,
    level: LevelStateMachine,
    clock: GameClock,
    latch: InputLatch,
    pending: PendingTransition,
    render: CommandQueue,
    base_seed: u64,
    levels_started: u32,
    /// Final snapshot of every level that has ended
    history: Vec<LevelSnapshot>,
}

impl LevelController {
    pub fn new(
        registry: LevelRegistry,
        start_key: &str,
        seed: u64,
        clock: GameClock,
        render: CommandQueue,
    ) -> Result<Self, GameError> {
        let level = registry.build_named(start_key, level_seed(seed, 0), render.clone())?;
        Ok(Self {
            registry,
            level,
            clock,
            latch: InputLatch::default(),
            pending: PendingTransition::default(),
            render,
            base_seed: seed,
            levels_started: 1,
            history: Vec::new(),
        })
    }

    pub fn from_settings(settings: &Settings, render: CommandQueue) -> Result<Self, GameError> {
        Self::new(
            settings.registry()?,
            &settings.starting_level,
            settings.effective_seed(),
            GameClock::new(settings.tick_rate_hz, settings.max_catch_up_ticks),
            render,
        )
    }

    /// Advance by `elapsed` wall time with `keys` held.
    ///
    /// A pause press is handled before any tick runs. Fire presses reach only
    /// the first tick of a catch-up burst.
    pub fn advance(&mut self, elapsed: Duration, keys: RawKeys) -> Result<LevelState, GameError> {
        let mut input = self.latch.sample(keys);
        if input.pause {
            self.toggle_pause();
        }

        let due = self.clock.advance(elapsed);
        for _ in 0..due {
            let state = self.level.tick(&input, &mut self.pending);
            input.fire = false;
            input.pause = false;

            match state {
                LevelState::Transitioning => {
                    self.history.push(self.level.snapshot());
                    if let Some(key) = self.pending.take() {
                        self.start_level(&key)?;
                    }
                    break;
                }
                LevelState::Won | LevelState::Lost => {
                    self.history.push(self.level.snapshot());
                    self.clock.stop();
                    log::info!("Run over: {:?}", state);
                    break;
                }
                LevelState::Active | LevelState::Paused => {}
            }
        }
        Ok(self.level.state())
    }

    pub fn toggle_pause(&mut self) {
        self.level.toggle_pause();
        if self.level.state() == LevelState::Paused {
            self.clock.pause();
        } else {
            self.clock.resume();
        }
    }

    fn start_level(&mut self, key: &str) -> Result<(), GameError> {
        log::info!("Transitioning from {} to {}", self.level.name(), key);
        let seed = level_seed(self.base_seed, self.levels_started);
        self.level = self.registry.build_named(key, seed, self.render.clone())?;
        self.levels_started += 1;
        Ok(())
    }

    pub fn level(&self) -> &LevelStateMachine {
        &self.level
    }

    pub fn level_mut(&mut self) -> &mut LevelStateMachine {
        &mut self.level
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    /// True once the run is won or lost
    pub fn is_finished(&self) -> bool {
        matches!(self.level.state(), LevelState::Won | LevelState::Lost)
    }

    pub fn history(&self) -> &[LevelSnapshot] {
        &self.history
    }

    pub fn levels_started(&self) -> u32 {
        self.levels_started
    }
}

/// Per-level seed derived from the run seed
fn level_seed(base: u64, index: u32) -> u64 {
    base.wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::LevelKey;
    use crate::presentation::{Overlay, PresentationCommand, command_queue};
    use crate::sim::{EnemyProfile, LevelConfig};

    fn frame() -> Duration {
        Duration::from_secs(1) / 60
    }

    fn controller(registry: LevelRegistry, start: &str) -> LevelController {
        LevelController::new(
            registry,
            start,
            42,
            GameClock::new(60, 8),
            CommandQueue::detached(),
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_start_level() {
        let err = LevelController::new(
            LevelRegistry::standard(),
            "LEVEL_NINE",
            1,
            GameClock::new(60, 8),
            CommandQueue::detached(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, GameError::UnknownLevel(k) if k == "LEVEL_NINE"));
    }

    #[test]
    fn test_transition_builds_next_level() {
        // Cleared on the first tick: zero kills needed
        let instant = LevelConfig {
            kill_target_to_advance: 0,
            enemy_spawn_probability: 0.0,
            next_level_key: Some("LEVEL_TWO".into()),
            ..LevelConfig::default()
        };
        let registry = LevelRegistry::standard()
            .with_config(LevelKey::LevelOne, instant)
            .unwrap();
        let mut c = controller(registry, "LEVEL_ONE");

        let state = c.advance(frame(), RawKeys::default()).unwrap();
        assert_eq!(state, LevelState::Active);
        assert_eq!(c.level().name(), "LEVEL_TWO");
        assert_eq!(c.levels_started(), 2);
        assert_eq!(c.history().len(), 1);
        assert_eq!(c.history()[0].state, LevelState::Transitioning);
    }

    #[test]
    fn test_unknown_transition_key_is_fatal() {
        let broken = LevelConfig {
            kill_target_to_advance: 0,
            next_level_key: Some("LEVEL_SECRET".into()),
            ..LevelConfig::default()
        };
        let registry = LevelRegistry::standard()
            .with_config(LevelKey::LevelOne, broken)
            .unwrap();
        let mut c = controller(registry, "LEVEL_ONE");
        let err = c.advance(frame(), RawKeys::default()).unwrap_err();
        assert!(matches!(err, GameError::UnknownLevel(k) if k == "LEVEL_SECRET"));
    }

    #[test]
    fn test_last_level_cleared_wins() {
        let last = LevelConfig {
            kill_target_to_advance: 0,
            next_level_key: None,
            ..LevelConfig::default()
        };
        let registry = LevelRegistry::standard()
            .with_config(LevelKey::LevelOne, last)
            .unwrap();
        let mut c = controller(registry, "LEVEL_ONE");
        assert_eq!(c.advance(frame(), RawKeys::default()).unwrap(), LevelState::Won);
        assert!(c.is_finished());
        assert!(!c.clock().is_running());
        // Further time does nothing
        assert_eq!(c.advance(frame() * 10, RawKeys::default()).unwrap(), LevelState::Won);
    }

    #[test]
    fn test_pause_edge_freezes_level() {
        let (render, rx) = command_queue();
        let mut c = LevelController::new(
            LevelRegistry::standard(),
            "LEVEL_ONE",
            3,
            GameClock::new(60, 8),
            render,
        )
        .unwrap();
        c.advance(frame(), RawKeys::default()).unwrap();
        let ticks = c.level().stats().ticks;

        let pause = RawKeys { pause: true, ..Default::default() };
        assert_eq!(c.advance(frame(), pause).unwrap(), LevelState::Paused);
        // Held key is not a second press
        assert_eq!(c.advance(frame() * 5, pause).unwrap(), LevelState::Paused);
        assert_eq!(c.level().stats().ticks, ticks);

        c.advance(frame(), RawKeys::default()).unwrap();
        assert_eq!(c.level().stats().ticks, ticks);
        // Resuming restarts the accumulator, so this frame runs exactly one tick
        assert_eq!(c.advance(frame(), pause).unwrap(), LevelState::Active);
        assert_eq!(c.level().stats().ticks, ticks + 1);

        let overlay: Vec<bool> = rx
            .try_iter()
            .filter_map(|cmd| match cmd {
                PresentationCommand::SetVisibility { overlay: Overlay::Pause, visible } => Some(visible),
                _ => None,
            })
            .collect();
        assert_eq!(overlay, vec![true, false]);
    }

    #[test]
    fn test_fire_press_fires_once_per_burst() {
        let calm = LevelConfig {
            enemy_spawn_probability: 0.0,
            enemy_profile: EnemyProfile { fire_rate: 0.0, ..Default::default() },
            ..LevelKey::LevelOne.standard_config()
        };
        let registry = LevelRegistry::standard()
            .with_config(LevelKey::LevelOne, calm)
            .unwrap();
        let mut c = controller(registry, "LEVEL_ONE");
        let fire = RawKeys { fire: true, ..Default::default() };
        c.advance(frame() * 4, fire).unwrap();
        assert_eq!(c.level().world().player_projectiles.len(), 1);
    }

    #[test]
    fn test_level_seeds_differ() {
        assert_ne!(level_seed(7, 0), level_seed(7, 1));
        assert_eq!(level_seed(7, 0), 7);
    }
}
