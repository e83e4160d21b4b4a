//! Pairwise collision resolution between two pools
//!
//! Every ordered pair `(a, b)` is visited exactly once per call; overlapping
//! pairs deal one unit of damage to each side through the entities' own damage
//! handlers. An entity destroyed earlier in the same call still deals its hits
//! to the rest of its overlaps; its own further damage is a no-op.
//!
//! O(|a| x |b|) by design; pools hold tens of entities.

use super::entity::Entity;
use super::pool::EntityPool;

/// Resolve collisions between two pools, returning the number of colliding pairs
pub fn detect_and_apply(pool_a: &mut EntityPool, pool_b: &mut EntityPool) -> usize {
    resolve(pool_a, pool_b, |_| {})
}

/// Like [`detect_and_apply`], but calls `on_destroyed` exactly once for each
/// entity of `pool_b` that this call destroys.
pub fn detect_and_apply_with_effect<F>(
    pool_a: &mut EntityPool,
    pool_b: &mut EntityPool,
    on_destroyed: F,
) -> usize
where
    F: FnMut(&Entity),
{
    resolve(pool_a, pool_b, on_destroyed)
}

fn resolve<F>(pool_a: &mut EntityPool, pool_b: &mut EntityPool, mut on_destroyed: F) -> usize
where
    F: FnMut(&Entity),
{
    let mut hits = 0;
    let others = pool_b.as_mut_slice();

    for e1 in pool_a.as_mut_slice().iter_mut() {
        for e2 in others.iter_mut() {
            if !e1.bbox().intersects(&e2.bbox()) {
                continue;
            }
            e1.take_damage();
            if e2.take_damage() {
                on_destroyed(e2);
            }
            hits += 1;
        }
    }

    if hits > 0 {
        log::trace!(
            "{} collisions between {:?} and {:?}",
            hits,
            pool_a.category(),
            pool_b.category()
        );
    }
    hits
}
