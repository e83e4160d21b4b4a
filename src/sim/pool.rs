//! Entity pools
//!
//! A pool exclusively owns one category of entities and tracks which of them
//! currently have a visual on the presentation side. Pruning is the only place
//! visuals are removed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId};
use crate::presentation::CommandQueue;

/// Which category of entities a pool holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolCategory {
    Friendly,
    Enemy,
    PlayerProjectile,
    EnemyProjectile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityPool {
    category: PoolCategory,
    /// Insertion order
    entities: Vec<Entity>,
    /// Ids with a live visual
    exposed: BTreeSet<EntityId>,
}

impl EntityPool {
    pub fn new(category: PoolCategory) -> Self {
        Self {
            category,
            entities: Vec::new(),
            exposed: BTreeSet::new(),
        }
    }

    pub fn category(&self) -> PoolCategory {
        self.category
    }

    /// Append an entity and ask the presentation side to draw it
    pub fn add(&mut self, entity: Entity, render: &CommandQueue) -> EntityId {
        let id = entity.id;
        render.add_visual(id, entity.kind);
        self.exposed.insert(id);
        self.entities.push(entity);
        id
    }

    /// Per-tick update of every live entity, in insertion order
    pub fn update_all(&mut self) {
        for entity in self.entities.iter_mut().filter(|e| !e.is_destroyed()) {
            entity.update();
        }
    }

    /// Remove every destroyed entity and its visual, returning what was removed
    pub fn prune_destroyed(&mut self, render: &CommandQueue) -> Vec<Entity> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.entities.drain(..).partition(|e| e.is_destroyed());
        self.entities = kept;
        for entity in &removed {
            self.hide(entity.id, render);
        }
        removed
    }

    /// Remove entities lying entirely outside `[0, screen_width]` horizontally.
    ///
    /// This is not a kill; the removed entities are simply gone.
    pub fn prune_out_of_bounds(&mut self, screen_width: f32, render: &CommandQueue) -> usize {
        let before = self.entities.len();
        let mut gone = Vec::new();
        self.entities.retain(|e| {
            let bbox = e.bbox();
            let outside = bbox.max.x < 0.0 || bbox.min.x > screen_width;
            if outside {
                gone.push(e.id);
            }
            !outside
        });
        for id in gone {
            self.hide(id, render);
        }
        before - self.entities.len()
    }

    fn hide(&mut self, id: EntityId, render: &CommandQueue) {
        if self.exposed.remove(&id) {
            render.remove_visual(id);
        }
    }

    /// Drop everything without per-entity notifications (the scene is cleared wholesale)
    pub fn clear(&mut self) {
        self.entities.clear();
        self.exposed.clear();
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.entities.iter().filter(|e| !e.is_destroyed()).count()
    }

    pub fn is_exposed(&self, id: EntityId) -> bool {
        self.exposed.contains(&id)
    }
}
