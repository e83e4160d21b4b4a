//! Level state machine
//!
//! One `LevelStateMachine` runs one level. Each tick executes the same fixed
//! sequence; later steps read what earlier steps wrote:
//!
//! 1. level script spawns enemies
//! 2. boss controller, then every pool updates
//! 3. enemy and boss fire
//! 4. enemy count is recorded
//! 5. penetration breaches damage the player
//! 6. collisions, in fixed pool-pair order
//! 7. destroyed and off-screen entities are pruned
//! 8. kills are counted
//! 9. the level script decides whether the level is over
//! 10. input becomes the player's movement and fire for the next tick
//!
//! `Won`, `Lost` and `Transitioning` are terminal. Entering any of them clears
//! every pool and the scene before the tick returns.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::boss::{BossConfig, BossController};
use super::collision;
use super::entity::{EnemyProfile, Entity, EntityId, EntityIds, EntityKind, ScreenGeometry};
use super::input::InputSnapshot;
use super::pool::{EntityPool, PoolCategory};
use super::spawner::Spawner;
use crate::consts::*;
use crate::error::{GameError, check_probability};
use crate::presentation::{CommandQueue, Overlay, Screen, SoundEffect};

/// Per-level configuration, immutable once the level is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub background_ref: String,
    pub player_initial_health: u32,
    /// Enemies the script tries to keep on screen
    pub enemy_total_target: usize,
    /// Per-slot, per-tick spawn probability
    pub enemy_spawn_probability: f64,
    pub kill_target_to_advance: u32,
    /// Level to move to when this one is cleared; `None` means the run is won
    pub next_level_key: Option<String>,
    pub enemy_profile: EnemyProfile,
    pub boss: Option<BossConfig>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            background_ref: "background1".into(),
            player_initial_health: 5,
            enemy_total_target: 5,
            enemy_spawn_probability: 0.2,
            kill_target_to_advance: 10,
            next_level_key: None,
            enemy_profile: EnemyProfile::default(),
            boss: None,
        }
    }
}

impl LevelConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        check_probability("enemy_spawn_probability", self.enemy_spawn_probability)?;
        check_probability("enemy_profile.fire_rate", self.enemy_profile.fire_rate)?;
        if self.player_initial_health == 0 {
            return Err(GameError::InvalidConfig {
                field: "player_initial_health",
                reason: "must be positive".into(),
            });
        }
        if self.enemy_profile.health == 0 {
            return Err(GameError::InvalidConfig {
                field: "enemy_profile.health",
                reason: "must be positive".into(),
            });
        }
        if let Some(boss) = &self.boss {
            boss.validate()?;
        }
        Ok(())
    }
}

/// Observable level state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelState {
    Active,
    Paused,
    Won,
    Lost,
    Transitioning,
}

impl LevelState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LevelState::Won | LevelState::Lost | LevelState::Transitioning)
    }
}

/// A level script's decision at the end of a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Won,
    Lost,
    /// Hand over to the level with this key
    Advance(String),
}

impl Verdict {
    /// Advance to the configured next level, or win if there is none
    pub fn advance_or_win(config: &LevelConfig) -> Self {
        match &config.next_level_key {
            Some(key) => Verdict::Advance(key.clone()),
            None => Verdict::Won,
        }
    }
}

/// Read-only facts a level script judges the level by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    pub kills: u32,
    pub ticks: u64,
    pub player_destroyed: bool,
    pub boss_spawned: bool,
    pub boss_defeated: bool,
}

/// Level-specific behavior plugged into the state machine
pub trait Level: std::fmt::Debug {
    /// Step 1 of the tick: add zero or more enemies through the spawner
    fn spawn_enemy_units(&mut self, ctx: &mut SpawnContext<'_>);

    /// Step 9 of the tick: decide whether the level is over
    fn check_game_over(&self, progress: &LevelProgress, config: &LevelConfig) -> Verdict;
}

/// Receives the next level's key when a level hands over
pub trait TransitionSink {
    fn on_transition(&mut self, next_level_key: &str);
}

/// Transition sink that just remembers the last key
#[derive(Debug, Clone, Default)]
pub struct PendingTransition(Option<String>);

impl PendingTransition {
    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn peek(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl TransitionSink for PendingTransition {
    fn on_transition(&mut self, next_level_key: &str) {
        self.0 = Some(next_level_key.to_string());
    }
}

/// The four entity pools of a level plus the id source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub friendlies: EntityPool,
    pub enemies: EntityPool,
    pub player_projectiles: EntityPool,
    pub enemy_projectiles: EntityPool,
    pub ids: EntityIds,
    pub player_id: EntityId,
    pub screen: ScreenGeometry,
}

impl World {
    fn new(screen: ScreenGeometry, player_health: u32, render: &CommandQueue) -> Self {
        let mut ids = EntityIds::default();
        let mut friendlies = EntityPool::new(PoolCategory::Friendly);
        let player_id = friendlies.add(Entity::player(ids.next_id(), player_health), render);
        Self {
            friendlies,
            enemies: EntityPool::new(PoolCategory::Enemy),
            player_projectiles: EntityPool::new(PoolCategory::PlayerProjectile),
            enemy_projectiles: EntityPool::new(PoolCategory::EnemyProjectile),
            ids,
            player_id,
            screen,
        }
    }

    pub fn player(&self) -> Option<&Entity> {
        self.friendlies.get(self.player_id)
    }

    pub fn player_destroyed(&self) -> bool {
        self.player().is_none_or(|p| p.is_destroyed())
    }

    fn pools_mut(&mut self) -> [&mut EntityPool; 4] {
        [
            &mut self.friendlies,
            &mut self.enemies,
            &mut self.player_projectiles,
            &mut self.enemy_projectiles,
        ]
    }

    fn clear(&mut self) {
        for pool in self.pools_mut() {
            pool.clear();
        }
    }
}

/// What a level script may touch while spawning
pub struct SpawnContext<'a> {
    pub world: &'a mut World,
    pub spawner: &'a mut Spawner,
    pub config: &'a LevelConfig,
    pub render: &'a CommandQueue,
    boss: &'a mut Option<BossController>,
    boss_spawned: &'a mut bool,
    boss_seed: u64,
}

impl SpawnContext<'_> {
    /// Live enemies currently on screen (the boss included)
    pub fn enemy_count(&self) -> usize {
        self.world.enemies.live_count()
    }

    /// Independent spawn roll at the level's spawn probability
    pub fn should_spawn(&mut self) -> bool {
        self.spawner.roll(self.config.enemy_spawn_probability)
    }

    /// Place a standard enemy at the right edge at a random height.
    ///
    /// Returns `None` when no free spot was found; the failure is logged and
    /// counted by the spawner.
    pub fn spawn_enemy(&mut self) -> Option<EntityId> {
        let y = self.spawner.random_enemy_y(ENEMY_SIZE.1);
        let pos = Vec2::new(self.world.screen.width, y);
        let candidate = Entity::enemy(self.world.ids.next_id(), pos, &self.config.enemy_profile);
        match self
            .spawner
            .add_enemy(candidate, &mut self.world.enemies, self.render)
        {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("Enemy dropped: {}", e);
                None
            }
        }
    }

    pub fn boss_spawned(&self) -> bool {
        *self.boss_spawned
    }

    /// Spawn the level's boss; a no-op if one was already spawned this level
    pub fn spawn_boss(&mut self) -> Option<EntityId> {
        if *self.boss_spawned {
            return None;
        }
        let config = self.config.boss.unwrap_or_default();
        let controller = BossController::spawn(
            config,
            Pcg32::seed_from_u64(self.boss_seed),
            &mut self.world.ids,
            &mut self.world.enemies,
            self.render,
        );
        let id = controller.boss_id();
        *self.boss = Some(controller);
        *self.boss_spawned = true;
        Some(id)
    }
}

/// Running totals for one level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    pub ticks: u64,
    /// Enemies destroyed by damage and pruned
    pub kills: u32,
    /// Enemies that crossed the defended edge
    pub breaches: u32,
}

/// Serializable summary for observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub level: String,
    pub state: LevelState,
    pub stats: LevelStats,
    pub placement_failures: u32,
    pub player_health: Option<u32>,
    pub boss_health: Option<u32>,
    pub enemies: usize,
    pub player_projectiles: usize,
    pub enemy_projectiles: usize,
}

#[derive(Debug)]
pub struct LevelStateMachine {
    name: String,
    config: LevelConfig,
    script: Box<dyn Level>,
    world: World,
    spawner: Spawner,
    boss: Option<BossController>,
    boss_seed: u64,
    boss_spawned: bool,
    boss_defeated: bool,
    /// Never `Paused`; pausing is the separate flag below
    state: LevelState,
    paused: bool,
    stats: LevelStats,
    next_level: Option<String>,
    last_player_health: u32,
    render: CommandQueue,
}

impl LevelStateMachine {
    /// Build a level in the `Active` state
    pub fn new(
        name: impl Into<String>,
        config: LevelConfig,
        script: Box<dyn Level>,
        screen: ScreenGeometry,
        seed: u64,
        render: CommandQueue,
    ) -> Result<Self, GameError> {
        config.validate()?;
        let name = name.into();

        render.set_background(&config.background_ref);
        let world = World::new(screen, config.player_initial_health, &render);
        render.player_health(config.player_initial_health);

        let boss_seed = seed.wrapping_mul(2654435761).wrapping_add(1);
        log::info!("Level {} started (seed {})", name, seed);

        Ok(Self {
            name,
            last_player_health: config.player_initial_health,
            config,
            script,
            world,
            spawner: Spawner::new(Pcg32::seed_from_u64(seed), screen),
            boss: None,
            boss_seed,
            boss_spawned: false,
            boss_defeated: false,
            state: LevelState::Active,
            paused: false,
            stats: LevelStats::default(),
            next_level: None,
            render,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    /// Current state; `Paused` is reported for a paused active level
    pub fn state(&self) -> LevelState {
        if self.paused && self.state == LevelState::Active {
            LevelState::Paused
        } else {
            self.state
        }
    }

    pub fn is_running(&self) -> bool {
        !self.state.is_terminal()
    }

    pub fn stats(&self) -> LevelStats {
        self.stats
    }

    pub fn kills(&self) -> u32 {
        self.stats.kills
    }

    /// Key emitted on transition, if any
    pub fn next_level(&self) -> Option<&str> {
        self.next_level.as_deref()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct pool access for scripted setups
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn boss(&self) -> Option<&BossController> {
        self.boss.as_ref()
    }

    pub fn render(&self) -> &CommandQueue {
        &self.render
    }

    pub fn pause(&mut self) {
        if self.state == LevelState::Active && !self.paused {
            self.paused = true;
            self.render.set_visibility(Overlay::Pause, true);
            log::info!("Level {} paused", self.name);
        }
    }

    pub fn resume(&mut self) {
        if self.state == LevelState::Active && self.paused {
            self.paused = false;
            self.render.set_visibility(Overlay::Pause, false);
            log::info!("Level {} resumed", self.name);
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Raise the boss shield immediately, bypassing its probability roll
    pub fn force_boss_shield(&mut self) {
        if let Some(boss) = &mut self.boss {
            boss.force_shield(&mut self.world.enemies, &self.render);
        }
    }

    /// Pin the boss's fire decision (`None` restores the random roll)
    pub fn force_boss_fire(&mut self, decision: Option<bool>) {
        if let Some(boss) = &mut self.boss {
            boss.force_fire(decision);
        }
    }

    /// Run one tick. Does nothing unless the level is active and not paused.
    pub fn tick(&mut self, input: &InputSnapshot, transitions: &mut dyn TransitionSink) -> LevelState {
        if self.state != LevelState::Active || self.paused {
            return self.state();
        }
        self.stats.ticks += 1;

        // 1. Spawn
        {
            let mut ctx = SpawnContext {
                world: &mut self.world,
                spawner: &mut self.spawner,
                config: &self.config,
                render: &self.render,
                boss: &mut self.boss,
                boss_spawned: &mut self.boss_spawned,
                boss_seed: self.boss_seed,
            };
            self.script.spawn_enemy_units(&mut ctx);
        }

        // 2. Update
        if let Some(boss) = &mut self.boss {
            boss.tick(&mut self.world.enemies, &self.render);
        }
        for pool in self.world.pools_mut() {
            pool.update_all();
        }

        // 3. Fire
        self.spawner.generate_fire(
            &self.world.enemies,
            &mut self.world.enemy_projectiles,
            &mut self.world.ids,
            &self.render,
        );
        if let Some(boss) = &mut self.boss {
            boss.fire(
                &self.world.enemies,
                &mut self.world.enemy_projectiles,
                &mut self.world.ids,
                &self.render,
            );
        }

        // 4. Enemy count before pruning
        let enemies_before = self.world.enemies.len();

        // 5. Penetration
        self.resolve_breaches();

        // 6. Collisions
        self.resolve_collisions();
        if let Some(boss) = &mut self.boss {
            boss.observe(&self.world.enemies, &self.render);
        }

        // 7. Prune
        let removed = self.world.enemies.prune_destroyed(&self.render);
        self.world.friendlies.prune_destroyed(&self.render);
        self.world.player_projectiles.prune_destroyed(&self.render);
        self.world.enemy_projectiles.prune_destroyed(&self.render);
        let width = self.world.screen.width;
        self.world
            .player_projectiles
            .prune_out_of_bounds(width, &self.render);
        self.world
            .enemy_projectiles
            .prune_out_of_bounds(width, &self.render);

        // 8. Score
        debug_assert_eq!(enemies_before - self.world.enemies.len(), removed.len());
        let breached = removed.iter().filter(|e| e.is_breached()).count() as u32;
        self.stats.kills += removed.len() as u32 - breached;
        self.stats.breaches += breached;
        self.report_health();

        // 9. Game over
        self.check_game_over(transitions);

        // 10. Input for the next tick
        if self.state == LevelState::Active {
            self.apply_input(input);
        }

        self.state()
    }

    fn resolve_breaches(&mut self) {
        let width = self.world.screen.width;
        let mut breaches = 0;
        for enemy in self.world.enemies.iter_mut().filter(|e| !e.is_destroyed()) {
            if enemy.horizontal_travel() > width {
                enemy.breach();
                breaches += 1;
            }
        }
        if breaches == 0 {
            return;
        }
        log::debug!("{} enemies broke through", breaches);
        if let Some(player) = self.world.friendlies.get_mut(self.world.player_id) {
            for _ in 0..breaches {
                player.take_damage();
            }
        }
    }

    fn resolve_collisions(&mut self) {
        let world = &mut self.world;
        let render = &self.render;

        collision::detect_and_apply_with_effect(
            &mut world.player_projectiles,
            &mut world.enemies,
            |_| render.play_effect(SoundEffect::Explosion),
        );
        collision::detect_and_apply(&mut world.enemy_projectiles, &mut world.friendlies);
        collision::detect_and_apply(&mut world.player_projectiles, &mut world.enemy_projectiles);
        collision::detect_and_apply(&mut world.friendlies, &mut world.enemies);
    }

    fn report_health(&mut self) {
        if let Some(boss) = &self.boss {
            if boss.is_defeated(&self.world.enemies) {
                log::info!("Boss {} defeated", boss.boss_id());
                self.boss = None;
                self.boss_defeated = true;
            }
        }

        let health = self.world.player().map_or(0, |p| p.health());
        if health != self.last_player_health {
            self.last_player_health = health;
            self.render.player_health(health);
        }
    }

    fn progress(&self) -> LevelProgress {
        LevelProgress {
            kills: self.stats.kills,
            ticks: self.stats.ticks,
            player_destroyed: self.world.player_destroyed(),
            boss_spawned: self.boss_spawned,
            boss_defeated: self.boss_defeated,
        }
    }

    /// Ask the level script whether the level is over and act on the answer.
    ///
    /// A paused level is never judged.
    pub fn check_game_over(&mut self, transitions: &mut dyn TransitionSink) -> LevelState {
        if self.state != LevelState::Active || self.paused {
            return self.state();
        }
        match self.script.check_game_over(&self.progress(), &self.config) {
            Verdict::Continue => {}
            Verdict::Won => {
                self.end(LevelState::Won);
                self.render.play_effect(SoundEffect::Victory);
                self.render.show_screen(Screen::Win);
            }
            Verdict::Lost => {
                self.end(LevelState::Lost);
                self.render.play_effect(SoundEffect::Defeat);
                self.render.show_screen(Screen::Lose);
            }
            Verdict::Advance(key) => {
                self.end(LevelState::Transitioning);
                transitions.on_transition(&key);
                self.next_level = Some(key);
            }
        }
        self.state()
    }

    /// Enter a terminal state: drop every entity and wipe the scene
    fn end(&mut self, state: LevelState) {
        log::info!(
            "Level {} ended {:?} after {} ticks ({} kills)",
            self.name,
            state,
            self.stats.ticks,
            self.stats.kills
        );
        self.state = state;
        self.boss = None;
        self.world.clear();
        self.render.clear_scene();
    }

    fn apply_input(&mut self, input: &InputSnapshot) {
        let Some(player) = self
            .world
            .friendlies
            .get_mut(self.world.player_id)
            .filter(|p| !p.is_destroyed())
        else {
            return;
        };
        let (dx, dy) = input.direction();
        player.vel = Vec2::new(dx, dy) * PLAYER_SPEED;

        if !input.fire {
            return;
        }
        if let Some(shot) = player.muzzle_shot() {
            let projectile =
                Entity::projectile(self.world.ids.next_id(), EntityKind::PlayerProjectile, shot);
            self.world.player_projectiles.add(projectile, &self.render);
            self.render.play_effect(SoundEffect::PlayerShot);
        }
    }

    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            level: self.name.clone(),
            state: self.state(),
            stats: self.stats,
            placement_failures: self.spawner.placement_failures(),
            player_health: self.world.player().map(|p| p.health()),
            boss_health: self
                .boss
                .as_ref()
                .and_then(|b| self.world.enemies.get(b.boss_id()))
                .map(|b| b.health()),
            enemies: self.world.enemies.len(),
            player_projectiles: self.world.player_projectiles.len(),
            enemy_projectiles: self.world.enemy_projectiles.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::{PresentationCommand, command_queue};
    use crate::sim::entity::Shot;

    /// Never spawns; lost on player death, advances at the kill target
    #[derive(Debug, Default)]
    struct Quiet;

    impl Level for Quiet {
        fn spawn_enemy_units(&mut self, _ctx: &mut SpawnContext<'_>) {}

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

    fn machine(config: LevelConfig) -> (LevelStateMachine, std::sync::mpsc::Receiver<PresentationCommand>) {
        let (render, rx) = command_queue();
        let m = LevelStateMachine::new(
            "TEST",
            config,
            Box::new(Quiet),
            ScreenGeometry::default(),
            7,
            render,
        )
        .unwrap();
        (m, rx)
    }

    fn quiet_config() -> LevelConfig {
        LevelConfig {
            enemy_profile: EnemyProfile { fire_rate: 0.0, ..Default::default() },
            next_level_key: Some("LEVEL_TWO".into()),
            ..Default::default()
        }
    }

    fn enemy_at(m: &mut LevelStateMachine, pos: Vec2, health: u32) -> EntityId {
        let world = m.world_mut();
        let profile = EnemyProfile { health, fire_rate: 0.0, speed: 0.0 };
        let enemy = Entity::enemy(world.ids.next_id(), pos, &profile);
        world.enemies.add(enemy, &CommandQueue::detached())
    }

    fn shot_at(m: &mut LevelStateMachine, kind: EntityKind, pos: Vec2) -> EntityId {
        let world = m.world_mut();
        let p = Entity::projectile(world.ids.next_id(), kind, Shot { pos, vel: Vec2::ZERO });
        let pool = match kind {
            EntityKind::PlayerProjectile => &mut world.player_projectiles,
            _ => &mut world.enemy_projectiles,
        };
        pool.add(p, &CommandQueue::detached())
    }

    #[test]
    fn test_kill_target_triggers_transition() {
        let (mut m, rx) = machine(quiet_config());
        m.stats.kills = 10;
        let mut sink = PendingTransition::default();

        assert_eq!(m.check_game_over(&mut sink), LevelState::Transitioning);
        assert_eq!(sink.take().as_deref(), Some("LEVEL_TWO"));
        assert_eq!(m.next_level(), Some("LEVEL_TWO"));
        assert!(m.world().friendlies.is_empty());
        assert!(rx.try_iter().any(|c| c == PresentationCommand::ClearScene));

        // Terminal: ticking does nothing and the key is not emitted again
        assert_eq!(m.tick(&InputSnapshot::default(), &mut sink), LevelState::Transitioning);
        assert!(sink.take().is_none());
    }

    #[test]
    fn test_player_killed_by_enemy_projectile() {
        let config = LevelConfig {
            player_initial_health: 1,
            ..quiet_config()
        };
        let (mut m, rx) = machine(config);
        let player_pos = m.world().player().unwrap().pos;
        shot_at(&mut m, EntityKind::EnemyProjectile, player_pos + Vec2::new(10.0, 10.0));

        let mut sink = PendingTransition::default();
        assert_eq!(m.tick(&InputSnapshot::default(), &mut sink), LevelState::Lost);
        assert!(sink.peek().is_none());
        assert!(m.world().enemy_projectiles.is_empty());
        let cmds: Vec<_> = rx.try_iter().collect();
        assert!(cmds.contains(&PresentationCommand::PlayerHealth(0)));
        assert!(cmds.contains(&PresentationCommand::ShowScreen(Screen::Lose)));
    }

    #[test]
    fn test_two_hits_one_kill() {
        let (mut m, rx) = machine(quiet_config());
        enemy_at(&mut m, Vec2::new(600.0, 100.0), 2);
        shot_at(&mut m, EntityKind::PlayerProjectile, Vec2::new(610.0, 105.0));
        shot_at(&mut m, EntityKind::PlayerProjectile, Vec2::new(620.0, 120.0));

        let mut sink = PendingTransition::default();
        m.tick(&InputSnapshot::default(), &mut sink);
        assert_eq!(m.kills(), 1);
        assert!(m.world().enemies.is_empty());
        assert!(m.world().player_projectiles.is_empty());
        let explosions = rx
            .try_iter()
            .filter(|c| *c == PresentationCommand::PlayEffect(SoundEffect::Explosion))
            .count();
        assert_eq!(explosions, 1);
    }

    #[test]
    fn test_kills_count_every_enemy_destroyed_in_one_tick() {
        let (mut m, rx) = machine(quiet_config());
        // Two shot down, one rammed by the player, one untouched
        enemy_at(&mut m, Vec2::new(600.0, 100.0), 1);
        enemy_at(&mut m, Vec2::new(800.0, 100.0), 2);
        enemy_at(&mut m, Vec2::new(50.0, 290.0), 1);
        enemy_at(&mut m, Vec2::new(1000.0, 500.0), 1);
        shot_at(&mut m, EntityKind::PlayerProjectile, Vec2::new(610.0, 105.0));
        shot_at(&mut m, EntityKind::PlayerProjectile, Vec2::new(810.0, 105.0));
        shot_at(&mut m, EntityKind::PlayerProjectile, Vec2::new(820.0, 120.0));
        assert_eq!(m.kills(), 0);

        m.tick(&InputSnapshot::default(), &mut PendingTransition::default());
        assert_eq!(m.kills(), 3);
        assert_eq!(m.stats().breaches, 0);
        assert_eq!(m.world().enemies.len(), 1);
        assert_eq!(m.world().player().unwrap().health(), 4);
        let explosions = rx
            .try_iter()
            .filter(|c| *c == PresentationCommand::PlayEffect(SoundEffect::Explosion))
            .count();
        assert_eq!(explosions, 2);
    }

    #[test]
    fn test_paused_level_is_not_judged() {
        let (mut m, rx) = machine(quiet_config());
        m.stats.kills = 10;
        m.pause();
        let mut sink = PendingTransition::default();

        assert_eq!(m.check_game_over(&mut sink), LevelState::Paused);
        assert!(sink.peek().is_none());
        assert!(!m.world().friendlies.is_empty());

        m.resume();
        assert_eq!(m.check_game_over(&mut sink), LevelState::Transitioning);
        let overlay: Vec<bool> = rx
            .try_iter()
            .filter_map(|c| match c {
                PresentationCommand::SetVisibility { overlay: Overlay::Pause, visible } => Some(visible),
                _ => None,
            })
            .collect();
        assert_eq!(overlay, vec![true, false]);
    }

    #[test]
    fn test_breach_damages_player_without_kill() {
        let (mut m, _rx) = machine(quiet_config());
        let id = enemy_at(&mut m, Vec2::new(1300.0, 100.0), 1);
        // Already travelled past the full screen width
        m.world_mut().enemies.get_mut(id).unwrap().pos.x = -1.0;

        m.tick(&InputSnapshot::default(), &mut PendingTransition::default());
        assert_eq!(m.kills(), 0);
        assert_eq!(m.stats().breaches, 1);
        assert_eq!(m.world().player().unwrap().health(), 4);
        assert!(m.world().enemies.is_empty());
    }

    #[test]
    fn test_out_of_bounds_projectile_not_a_kill() {
        let (mut m, _rx) = machine(quiet_config());
        shot_at(&mut m, EntityKind::PlayerProjectile, Vec2::new(1301.0, 10.0));
        shot_at(&mut m, EntityKind::EnemyProjectile, Vec2::new(-41.0, 10.0));

        m.tick(&InputSnapshot::default(), &mut PendingTransition::default());
        assert!(m.world().player_projectiles.is_empty());
        assert!(m.world().enemy_projectiles.is_empty());
        assert_eq!(m.kills(), 0);
    }

    #[test]
    fn test_pause_preserves_state() {
        let (mut m, rx) = machine(quiet_config());
        let mut sink = PendingTransition::default();
        let fire = InputSnapshot { fire: true, ..Default::default() };
        m.tick(&fire, &mut sink);

        m.pause();
        assert_eq!(m.state(), LevelState::Paused);
        let before = m.snapshot();
        for _ in 0..10 {
            m.tick(&InputSnapshot::default(), &mut sink);
        }
        assert_eq!(m.snapshot(), before);
        let x_before = m.world().player_projectiles.iter().next().unwrap().pos.x;

        m.resume();
        assert_eq!(m.state(), LevelState::Active);
        m.tick(&InputSnapshot::default(), &mut sink);
        let x_after = m.world().player_projectiles.iter().next().unwrap().pos.x;
        assert_eq!(x_after - x_before, PLAYER_PROJECTILE_SPEED);

        let overlays: Vec<_> = rx
            .try_iter()
            .filter(|c| matches!(c, PresentationCommand::SetVisibility { overlay: Overlay::Pause, .. }))
            .collect();
        assert_eq!(overlays.len(), 2);
    }

    #[test]
    fn test_input_moves_player_next_tick() {
        let (mut m, _rx) = machine(quiet_config());
        let start = m.world().player().unwrap().pos;
        let down = InputSnapshot { down: true, ..Default::default() };
        let mut sink = PendingTransition::default();

        m.tick(&down, &mut sink);
        assert_eq!(m.world().player().unwrap().pos, start);
        m.tick(&InputSnapshot::default(), &mut sink);
        assert_eq!(m.world().player().unwrap().pos, start + Vec2::new(0.0, PLAYER_SPEED));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = LevelConfig {
            enemy_spawn_probability: 1.5,
            ..Default::default()
        };
        let err = LevelStateMachine::new(
            "BAD",
            config,
            Box::new(Quiet),
            ScreenGeometry::default(),
            1,
            CommandQueue::detached(),
        )
        .unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig { field: "enemy_spawn_probability", .. }));
    }
}
