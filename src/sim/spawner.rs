//! Enemy placement and enemy fire
//!
//! Placement retries a bounded number of times to find a spot that does not
//! overlap any enemy already on screen. Candidates that never fit are dropped.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::entity::{Entity, EntityId, EntityIds, EntityKind, ScreenGeometry};
use super::pool::EntityPool;
use crate::error::SpawnError;
use crate::presentation::CommandQueue;

/// Placement checks before a candidate is dropped
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone)]
pub struct Spawner {
    rng: Pcg32,
    screen: ScreenGeometry,
    placement_failures: u32,
}

impl Spawner {
    pub fn new(rng: Pcg32, screen: ScreenGeometry) -> Self {
        Self {
            rng,
            screen,
            placement_failures: 0,
        }
    }

    /// Independent probability check, used by level scripts for spawn decisions
    pub fn roll(&mut self, probability: f64) -> bool {
        probability > 0.0 && self.rng.random_bool(probability)
    }

    /// Random top-edge y for an entity of the given height, within the enemy band
    pub fn random_enemy_y(&mut self, height: f32) -> f32 {
        let max_y = (self.screen.enemy_lower_bound() - height).max(0.0);
        self.rng.random::<f32>() * max_y
    }

    /// Place `candidate` without overlapping any existing enemy.
    ///
    /// Each attempt checks the current position against every enemy; on overlap
    /// the candidate is moved to the right edge at a fresh random height. After
    /// [`MAX_PLACEMENT_ATTEMPTS`] failed checks the candidate is dropped.
    pub fn add_enemy(
        &mut self,
        mut candidate: Entity,
        enemies: &mut EntityPool,
        render: &CommandQueue,
    ) -> Result<EntityId, SpawnError> {
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let bbox = candidate.bbox();
            let overlaps = enemies.iter().any(|e| e.bbox().intersects(&bbox));
            if !overlaps {
                return Ok(enemies.add(candidate, render));
            }
            let x = self.screen.width - candidate.size.x;
            let y = self.random_enemy_y(candidate.size.y);
            candidate.place(Vec2::new(x, y));
        }

        self.placement_failures += 1;
        Err(SpawnError::PlacementFailed {
            attempts: MAX_PLACEMENT_ATTEMPTS,
        })
    }

    /// Roll the fire decision of every armed enemy craft and queue the shots.
    ///
    /// Bosses are skipped; their fire is owned by the boss controller.
    pub fn generate_fire(
        &mut self,
        enemies: &EntityPool,
        projectiles: &mut EntityPool,
        ids: &mut EntityIds,
        render: &CommandQueue,
    ) -> usize {
        let shots: Vec<_> = enemies
            .iter()
            .filter(|e| e.kind == EntityKind::EnemyCraft)
            .filter_map(|e| e.fire(&mut self.rng))
            .collect();

        for shot in &shots {
            let projectile = Entity::projectile(ids.next_id(), EntityKind::EnemyProjectile, *shot);
            projectiles.add(projectile, render);
        }
        shots.len()
    }

    pub fn placement_failures(&self) -> u32 {
        self.placement_failures
    }
}
