//! Level identifiers, the standard level scripts and the level registry
//!
//! Levels name their successor by string key. The registry is the only place
//! that turns a key back into a running `LevelStateMachine`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::presentation::CommandQueue;
use crate::sim::{
    BossConfig, EnemyProfile, Level, LevelConfig, LevelProgress, LevelStateMachine,
    ScreenGeometry, SpawnContext, Verdict,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LevelKey {
    #[serde(rename = "LEVEL_ONE")]
    LevelOne,
    #[serde(rename = "LEVEL_TWO")]
    LevelTwo,
    #[serde(rename = "LEVEL_BOSS")]
    LevelBoss,
    #[serde(rename = "LEVEL_FINAL_BOSS")]
    LevelFinalBoss,
}

impl LevelKey {
    pub const ALL: [LevelKey; 4] = [
        LevelKey::LevelOne,
        LevelKey::LevelTwo,
        LevelKey::LevelBoss,
        LevelKey::LevelFinalBoss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LevelKey::LevelOne => "LEVEL_ONE",
            LevelKey::LevelTwo => "LEVEL_TWO",
            LevelKey::LevelBoss => "LEVEL_BOSS",
            LevelKey::LevelFinalBoss => "LEVEL_FINAL_BOSS",
        }
    }

    pub fn is_boss_level(&self) -> bool {
        matches!(self, LevelKey::LevelBoss | LevelKey::LevelFinalBoss)
    }

    /// Shipped configuration for this level
    pub fn standard_config(&self) -> LevelConfig {
        match self {
            LevelKey::LevelOne => LevelConfig {
                background_ref: "background1".into(),
                player_initial_health: 5,
                enemy_total_target: 5,
                enemy_spawn_probability: 0.2,
                kill_target_to_advance: 10,
                next_level_key: Some(LevelKey::LevelTwo.as_str().into()),
                enemy_profile: EnemyProfile::default(),
                boss: None,
            },
            LevelKey::LevelTwo => LevelConfig {
                background_ref: "background2".into(),
                player_initial_health: 5,
                enemy_total_target: 7,
                enemy_spawn_probability: 0.2,
                kill_target_to_advance: 15,
                next_level_key: Some(LevelKey::LevelBoss.as_str().into()),
                enemy_profile: EnemyProfile {
                    health: 2,
                    ..EnemyProfile::default()
                },
                boss: None,
            },
            LevelKey::LevelBoss => LevelConfig {
                background_ref: "background3".into(),
                player_initial_health: 5,
                enemy_total_target: 0,
                enemy_spawn_probability: 0.0,
                kill_target_to_advance: 0,
                next_level_key: Some(LevelKey::LevelFinalBoss.as_str().into()),
                enemy_profile: EnemyProfile::default(),
                boss: Some(BossConfig::default()),
            },
            LevelKey::LevelFinalBoss => LevelConfig {
                background_ref: "background4".into(),
                player_initial_health: 5,
                enemy_total_target: 0,
                enemy_spawn_probability: 0.0,
                kill_target_to_advance: 0,
                next_level_key: None,
                enemy_profile: EnemyProfile::default(),
                boss: Some(BossConfig {
                    pattern_phase_threshold: Some(0.5),
                    ..BossConfig::default()
                }),
            },
        }
    }

    /// Fresh script instance for this level
    pub fn script(&self) -> Box<dyn Level> {
        if self.is_boss_level() {
            Box::new(BossLevel)
        } else {
            Box::new(WaveLevel)
        }
    }
}

impl fmt::Display for LevelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LevelKey {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LevelKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| GameError::UnknownLevel(s.to_string()))
    }
}

/// Keeps up to `enemy_total_target` enemies on screen, one spawn roll per
/// missing slot per tick. Cleared at the kill target.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveLevel;

impl Level for WaveLevel {
    fn spawn_enemy_units(&mut self, ctx: &mut SpawnContext<'_>) {
        let missing = ctx
            .config
            .enemy_total_target
            .saturating_sub(ctx.enemy_count());
        for _ in 0..missing {
            if ctx.should_spawn() {
                ctx.spawn_enemy();
            }
        }
    }

    fn check_game_over(&self, progress: &LevelProgress, config: &LevelConfig) -> Verdict {
        if progress.player_destroyed {
            Verdict::Lost
        } else if progress.kills >= config.kill_target_to_advance {
            Verdict::advance_or_win(config)
        } else {
            Verdict::Continue
        }
    }
}

/// Spawns the boss on the first tick. Cleared when the boss goes down.
#[derive(Debug, Clone, Copy, Default)]
pub struct BossLevel;

impl Level for BossLevel {
    fn spawn_enemy_units(&mut self, ctx: &mut SpawnContext<'_>) {
        if !ctx.boss_spawned() {
            ctx.spawn_boss();
        }
    }

    fn check_game_over(&self, progress: &LevelProgress, config: &LevelConfig) -> Verdict {
        if progress.player_destroyed {
            Verdict::Lost
        } else if progress.boss_defeated {
            Verdict::advance_or_win(config)
        } else {
            Verdict::Continue
        }
    }
}

/// Builds levels by key
#[derive(Debug, Clone)]
pub struct LevelRegistry {
    configs: BTreeMap<LevelKey, LevelConfig>,
    screen: ScreenGeometry,
}

impl Default for LevelRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl LevelRegistry {
    /// All four shipped levels on the default screen
    pub fn standard() -> Self {
        Self {
            configs: LevelKey::ALL
                .into_iter()
                .map(|k| (k, k.standard_config()))
                .collect(),
            screen: ScreenGeometry::default(),
        }
    }

    /// Registry with no levels; register them with [`Self::with_config`]
    pub fn empty() -> Self {
        Self {
            configs: BTreeMap::new(),
            screen: ScreenGeometry::default(),
        }
    }

    pub fn with_screen(mut self, screen: ScreenGeometry) -> Self {
        self.screen = screen;
        self
    }

    /// Register or replace the configuration of a level
    pub fn with_config(mut self, key: LevelKey, config: LevelConfig) -> Result<Self, GameError> {
        config.validate()?;
        self.configs.insert(key, config);
        Ok(self)
    }

    pub fn config(&self, key: LevelKey) -> Option<&LevelConfig> {
        self.configs.get(&key)
    }

    pub fn screen(&self) -> ScreenGeometry {
        self.screen
    }

    /// Resolve a level key string and build the level
    pub fn build_named(&self, key: &str, seed: u64, render: CommandQueue) -> Result<LevelStateMachine, GameError> {
        self.build(key.parse()?, seed, render)
    }

    pub fn build(&self, key: LevelKey, seed: u64, render: CommandQueue) -> Result<LevelStateMachine, GameError> {
        let construct = self.constructor(key)?;
        construct(seed, render)
    }

    /// Constructor for one level, taking the level seed and the render queue
    pub fn constructor(
        &self,
        key: LevelKey,
    ) -> Result<impl Fn(u64, CommandQueue) -> Result<LevelStateMachine, GameError> + '_, GameError> {
        let config = self
            .configs
            .get(&key)
            .ok_or(GameError::UnregisteredLevel(key))?;
        let screen = self.screen;
        Ok(move |seed, render| {
            LevelStateMachine::new(key.as_str(), config.clone(), key.script(), screen, seed, render)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::{PresentationCommand, command_queue};
    use crate::sim::{EntityKind, InputSnapshot, LevelState, PendingTransition};

    fn progress() -> LevelProgress {
        LevelProgress {
            kills: 0,
            ticks: 1,
            player_destroyed: false,
            boss_spawned: false,
            boss_defeated: false,
        }
    }

    #[test]
    fn test_key_round_trip() {
        for key in LevelKey::ALL {
            assert_eq!(key.as_str().parse::<LevelKey>().unwrap(), key);
            assert_eq!(key.to_string(), key.as_str());
        }
        assert!(matches!(
            "LEVEL_NINE".parse::<LevelKey>(),
            Err(GameError::UnknownLevel(k)) if k == "LEVEL_NINE"
        ));
    }

    #[test]
    fn test_standard_configs_are_valid_and_chained() {
        let registry = LevelRegistry::standard();
        let mut key = Some(LevelKey::LevelOne);
        let mut visited = Vec::new();
        while let Some(k) = key {
            let config = registry.config(k).unwrap();
            config.validate().unwrap();
            visited.push(k);
            key = config.next_level_key.as_deref().map(|s| s.parse().unwrap());
        }
        assert_eq!(visited, LevelKey::ALL.to_vec());
    }

    #[test]
    fn test_wave_level_verdicts() {
        let config = LevelKey::LevelOne.standard_config();
        let wave = WaveLevel;
        assert_eq!(wave.check_game_over(&progress(), &config), Verdict::Continue);

        let cleared = LevelProgress { kills: 10, ..progress() };
        assert_eq!(
            wave.check_game_over(&cleared, &config),
            Verdict::Advance("LEVEL_TWO".into())
        );

        let dead = LevelProgress { kills: 10, player_destroyed: true, ..progress() };
        assert_eq!(wave.check_game_over(&dead, &config), Verdict::Lost);
    }

    #[test]
    fn test_final_boss_win() {
        let config = LevelKey::LevelFinalBoss.standard_config();
        let done = LevelProgress { boss_spawned: true, boss_defeated: true, ..progress() };
        assert_eq!(BossLevel.check_game_over(&done, &config), Verdict::Won);
        let fighting = LevelProgress { boss_spawned: true, ..progress() };
        assert_eq!(BossLevel.check_game_over(&fighting, &config), Verdict::Continue);
    }

    #[test]
    fn test_build_unregistered_level() {
        let err = LevelRegistry::empty()
            .build(LevelKey::LevelOne, 1, CommandQueue::detached())
            .unwrap_err();
        assert!(matches!(err, GameError::UnregisteredLevel(LevelKey::LevelOne)));
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let bad = LevelConfig {
            enemy_spawn_probability: -0.1,
            ..LevelConfig::default()
        };
        assert!(LevelRegistry::standard().with_config(LevelKey::LevelOne, bad).is_err());
    }

    #[test]
    fn test_boss_level_spawns_boss_once() {
        let (render, rx) = command_queue();
        let mut level = LevelRegistry::standard()
            .build(LevelKey::LevelBoss, 11, render)
            .unwrap();
        let mut sink = PendingTransition::default();
        for _ in 0..5 {
            assert_eq!(level.tick(&InputSnapshot::default(), &mut sink), LevelState::Active);
        }
        let bosses = level
            .world()
            .enemies
            .iter()
            .filter(|e| e.kind == EntityKind::Boss)
            .count();
        assert_eq!(bosses, 1);
        let cmds: Vec<_> = rx.try_iter().collect();
        assert_eq!(cmds[0], PresentationCommand::SetBackground("background3".into()));
        assert!(cmds.contains(&PresentationCommand::UpdateHealthBar(1.0)));
    }

    #[test]
    fn test_wave_level_respects_enemy_target() {
        let mut level = LevelRegistry::standard()
            .build(LevelKey::LevelTwo, 5, CommandQueue::detached())
            .unwrap();
        let mut sink = PendingTransition::default();
        for _ in 0..60 {
            level.tick(&InputSnapshot::default(), &mut sink);
            assert!(level.world().enemies.len() <= 7);
        }
        assert!(level.world().enemies.iter().all(|e| e.max_health() == 2));
    }
}
