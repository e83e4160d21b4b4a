//! Boss behavior: movement cycling, timed shield, and fire patterns
//!
//! The boss itself is an ordinary entity living in the enemy pool (so it takes
//! part in every enemy collision). This controller drives it from outside:
//! - Movement: a shuffled queue of up/down/hold moves, reshuffled every
//!   `BOSS_MAX_TICKS_SAME_MOVE` ticks
//! - Shield: random activation, then a fixed window during which damage is ignored
//! - Fire: single shots, or three-shot patterns once health drops into the pattern phase

use glam::Vec2;
use rand::Rng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId, EntityIds, EntityKind, MotionBounds, Shot};
use super::pool::EntityPool;
use crate::consts::*;
use crate::error::{GameError, check_probability};
use crate::presentation::{CommandQueue, Overlay, SoundEffect};

/// Boss tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    pub health: u32,
    /// Vertical pixels per tick for up/down moves
    pub velocity: f32,
    /// Per-tick fire probability
    pub fire_rate: f64,
    /// Per-tick shield activation probability while the shield is down
    pub shield_probability: f64,
    pub max_shield_frames: u32,
    /// Highest y the boss's top edge may reach
    pub upper_bound: f32,
    /// Lowest y the boss's top edge may reach
    pub lower_bound: f32,
    /// Health fraction at or below which fire switches to patterns (None = never)
    pub pattern_phase_threshold: Option<f32>,
    /// Vertical spacing between pattern projectiles
    pub pattern_spread: f32,
    /// Vertical speed of converging/diverging pattern projectiles
    pub pattern_vertical_speed: f32,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            health: 100,
            velocity: 8.0,
            fire_rate: 0.04,
            shield_probability: 0.002,
            max_shield_frames: 500,
            upper_bound: -100.0,
            lower_bound: 475.0,
            pattern_phase_threshold: None,
            pattern_spread: 50.0,
            pattern_vertical_speed: 3.0,
        }
    }
}

impl BossConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        check_probability("boss.fire_rate", self.fire_rate)?;
        check_probability("boss.shield_probability", self.shield_probability)?;
        if self.health == 0 {
            return Err(GameError::InvalidConfig {
                field: "boss.health",
                reason: "must be positive".into(),
            });
        }
        if self.upper_bound > self.lower_bound {
            return Err(GameError::InvalidConfig {
                field: "boss.upper_bound",
                reason: format!("{} is below lower bound {}", self.upper_bound, self.lower_bound),
            });
        }
        Ok(())
    }
}

/// Three-projectile burst shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirePattern {
    /// Three parallel lanes
    Horizontal,
    /// Lanes converging on the center line
    Vertical,
    /// Lanes fanning out
    Diagonal,
}

impl FirePattern {
    pub const ALL: [FirePattern; 3] = [
        FirePattern::Horizontal,
        FirePattern::Vertical,
        FirePattern::Diagonal,
    ];

    /// Projectiles for this pattern fired from `muzzle`
    pub fn shots(self, muzzle: Vec2, speed: f32, spread: f32, vertical_speed: f32) -> [Shot; 3] {
        let vy = match self {
            FirePattern::Horizontal => [0.0, 0.0, 0.0],
            FirePattern::Vertical => [vertical_speed, 0.0, -vertical_speed],
            FirePattern::Diagonal => [-vertical_speed, 0.0, vertical_speed],
        };
        let offsets = [-spread, 0.0, spread];
        std::array::from_fn(|i| Shot {
            pos: muzzle + Vec2::new(0.0, offsets[i]),
            vel: Vec2::new(-speed, vy[i]),
        })
    }
}

/// Which fire mode the boss is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BossPhase {
    /// Single shots
    Opening,
    /// Three-shot patterns
    Pattern,
}

/// Movement and shield bookkeeping, mutated once per tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossState {
    /// Vertical displacements (+v, -v, 0), shuffled
    pub movement_queue: Vec<f32>,
    pub cursor: usize,
    pub consecutive_same_move_count: u32,
    pub shield_active: bool,
    pub shield_frames: u32,
    pub max_shield_frames: u32,
    pub shield_probability: f64,
}

#[derive(Debug, Clone)]
pub struct BossController {
    boss_id: EntityId,
    config: BossConfig,
    state: BossState,
    phase: BossPhase,
    rng: Pcg32,
    /// Overrides the random fire decision when set
    forced_fire: Option<bool>,
    last_reported_health: u32,
}

impl BossController {
    /// Create the boss entity in `enemies` and the controller that drives it
    pub fn spawn(
        config: BossConfig,
        mut rng: Pcg32,
        ids: &mut EntityIds,
        enemies: &mut EntityPool,
        render: &CommandQueue,
    ) -> Self {
        let boss = Entity::new(
            ids.next_id(),
            EntityKind::Boss,
            Vec2::from(BOSS_START),
            Vec2::from(BOSS_SIZE),
            config.health,
        )
        .with_bounds(MotionBounds::vertical(config.upper_bound, config.lower_bound));
        let boss_id = enemies.add(boss, render);

        let mut movement_queue = Vec::with_capacity(BOSS_MOVES_PER_CYCLE * 3);
        for _ in 0..BOSS_MOVES_PER_CYCLE {
            movement_queue.push(config.velocity);
            movement_queue.push(-config.velocity);
            movement_queue.push(0.0);
        }
        movement_queue.shuffle(&mut rng);

        render.update_health_bar(1.0);
        log::info!("Boss {} spawned with {} health", boss_id, config.health);

        Self {
            boss_id,
            config,
            state: BossState {
                movement_queue,
                cursor: 0,
                consecutive_same_move_count: 0,
                shield_active: false,
                shield_frames: 0,
                max_shield_frames: config.max_shield_frames,
                shield_probability: config.shield_probability,
            },
            phase: BossPhase::Opening,
            rng,
            forced_fire: None,
            last_reported_health: config.health,
        }
    }

    pub fn boss_id(&self) -> EntityId {
        self.boss_id
    }

    pub fn state(&self) -> &BossState {
        &self.state
    }

    pub fn phase(&self) -> BossPhase {
        self.phase
    }

    /// True once the boss entity is destroyed or gone from the pool
    pub fn is_defeated(&self, enemies: &EntityPool) -> bool {
        enemies.get(self.boss_id).is_none_or(|b| b.is_destroyed())
    }

    /// Next vertical displacement from the move queue
    fn next_move(&mut self) -> f32 {
        let current = self.state.movement_queue[self.state.cursor];
        self.state.consecutive_same_move_count += 1;
        if self.state.consecutive_same_move_count == BOSS_MAX_TICKS_SAME_MOVE {
            self.state.movement_queue.shuffle(&mut self.rng);
            self.state.consecutive_same_move_count = 0;
            self.state.cursor += 1;
        }
        if self.state.cursor == self.state.movement_queue.len() {
            self.state.cursor = 0;
        }
        current
    }

    /// Per-tick movement choice and shield timing.
    ///
    /// Sets the boss's velocity for this tick; the enemy pool's update applies
    /// it, reverting moves that would leave the vertical bounds.
    pub fn tick(&mut self, enemies: &mut EntityPool, render: &CommandQueue) {
        if self.is_defeated(enemies) {
            return;
        }
        let dy = self.next_move();

        let activate = !self.state.shield_active && self.rng.random_bool(self.state.shield_probability);
        let Some(boss) = enemies.get_mut(self.boss_id) else {
            return;
        };
        boss.vel = Vec2::new(0.0, dy);

        if self.state.shield_active {
            self.state.shield_frames += 1;
        } else if activate {
            Self::raise_shield(&mut self.state, boss, render);
        }
        if self.state.shield_active && self.state.shield_frames >= self.state.max_shield_frames {
            self.state.shield_active = false;
            self.state.shield_frames = 0;
            boss.set_shielded(false);
            render.set_visibility(Overlay::BossShield, false);
            log::debug!("Boss shield down");
        }
    }

    fn raise_shield(state: &mut BossState, boss: &mut Entity, render: &CommandQueue) {
        state.shield_active = true;
        boss.set_shielded(true);
        render.set_visibility(Overlay::BossShield, true);
        render.play_effect(SoundEffect::ShieldUp);
        log::debug!("Boss shield up");
    }

    /// Raise the shield now, bypassing the activation roll
    pub fn force_shield(&mut self, enemies: &mut EntityPool, render: &CommandQueue) {
        if self.state.shield_active {
            return;
        }
        if let Some(boss) = enemies.get_mut(self.boss_id).filter(|b| !b.is_destroyed()) {
            Self::raise_shield(&mut self.state, boss, render);
        }
    }

    /// Pin every following fire decision (`None` restores the random roll)
    pub fn force_fire(&mut self, decision: Option<bool>) {
        self.forced_fire = decision;
    }

    /// Roll the fire decision and queue this tick's projectiles
    pub fn fire(
        &mut self,
        enemies: &EntityPool,
        projectiles: &mut EntityPool,
        ids: &mut EntityIds,
        render: &CommandQueue,
    ) -> usize {
        let Some(boss) = enemies.get(self.boss_id).filter(|b| !b.is_destroyed()) else {
            return 0;
        };
        let fires = match self.forced_fire {
            Some(decision) => decision,
            None => self.rng.random_bool(self.config.fire_rate),
        };
        if !fires {
            return 0;
        }

        let muzzle = boss.pos + Vec2::from(BOSS_FIRE_OFFSET);
        let shots: Vec<Shot> = match self.phase {
            BossPhase::Opening => vec![Shot {
                pos: muzzle,
                vel: Vec2::new(-BOSS_PROJECTILE_SPEED, 0.0),
            }],
            BossPhase::Pattern => {
                let pattern = FirePattern::ALL[self.rng.random_range(0..FirePattern::ALL.len())];
                log::debug!("Boss fires {:?}", pattern);
                pattern
                    .shots(
                        muzzle,
                        BOSS_PROJECTILE_SPEED,
                        self.config.pattern_spread,
                        self.config.pattern_vertical_speed,
                    )
                    .to_vec()
            }
        };

        for shot in &shots {
            projectiles.add(
                Entity::projectile(ids.next_id(), EntityKind::EnemyProjectile, *shot),
                render,
            );
        }
        shots.len()
    }

    /// Post-collision bookkeeping: health bar and phase changes
    pub fn observe(&mut self, enemies: &EntityPool, render: &CommandQueue) {
        let Some(boss) = enemies.get(self.boss_id) else {
            return;
        };
        if boss.health() == self.last_reported_health {
            return;
        }
        self.last_reported_health = boss.health();
        let fraction = boss.health_fraction();
        render.update_health_bar(fraction);

        if self.phase == BossPhase::Opening
            && self
                .config
                .pattern_phase_threshold
                .is_some_and(|threshold| fraction <= threshold)
        {
            self.phase = BossPhase::Pattern;
            log::debug!("Boss {} enters pattern phase at {:.0}% health", self.boss_id, fraction * 100.0);
        }
    }
}
