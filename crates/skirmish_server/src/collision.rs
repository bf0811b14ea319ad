//! # Collision Resolver
//!
//! Pairwise circle-circle overlap detection over all live entities.
//!
//! ## Design
//!
//! The scan is a plain O(n^2) sweep. At the arena's reference scale
//! (tens of entities) that comfortably fits the tick budget; if entity
//! counts ever grow past that, the hook is to index entities into a
//! uniform spatial grid keyed by cell coordinates and only test entities
//! in neighboring cells - the pair contract below stays identical.
//!
//! Reaction scripts are cross-wired on purpose: when A and B overlap, A's
//! `onCollision` runs against B and B's against A. A spike that carries
//! `onCollision: [damage]` hurts whatever touches it, not itself.

use skirmish_shared::protocol::EntityId;

use crate::world::World;

/// An unordered pair of overlapping entities.
pub type CollisionPair = (EntityId, EntityId);

/// Finds every pair of entities whose circles overlap.
///
/// Two entities collide when the distance between centers is strictly less
/// than the sum of their radii (defaulted when an instance has no size).
/// Each pair appears once.
#[must_use]
pub fn overlapping_pairs(world: &World) -> Vec<CollisionPair> {
    let entities: Vec<_> = world.iter().collect();
    let mut pairs = Vec::new();

    for (i, a) in entities.iter().enumerate() {
        for b in &entities[i + 1..] {
            let reach = a.radius() + b.radius();
            if a.pos.distance_squared(b.pos) < reach * reach {
                pairs.push((a.id, b.id));
            }
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_shared::content::EntityDef;
    use skirmish_shared::Vec2;

    fn def(radius: f32) -> EntityDef {
        EntityDef {
            type_name: "disc".to_owned(),
            color: "gray".to_owned(),
            radius,
            health: None,
            behavior: None,
            visual: None,
        }
    }

    #[test]
    fn test_overlap_uses_radius_sum() {
        let mut world = World::with_seed(1);
        let a = world.spawn_from_def(&def(10.0), Vec2::new(0.0, 0.0));
        let b = world.spawn_from_def(&def(10.0), Vec2::new(19.0, 0.0));

        let pairs = overlapping_pairs(&world);
        assert_eq!(pairs.len(), 1);
        let (x, y) = pairs[0];
        assert_eq!(
            [x, y].into_iter().collect::<std::collections::HashSet<_>>(),
            [a, b].into_iter().collect()
        );
    }

    #[test]
    fn test_touching_circles_do_not_collide() {
        let mut world = World::with_seed(1);
        world.spawn_from_def(&def(10.0), Vec2::new(0.0, 0.0));
        world.spawn_from_def(&def(10.0), Vec2::new(20.0, 0.0));

        assert!(overlapping_pairs(&world).is_empty());
    }

    #[test]
    fn test_default_radius_applies_when_size_missing() {
        let mut world = World::with_seed(1);
        let a = world.spawn_from_def(&def(10.0), Vec2::new(0.0, 0.0));
        world.get_mut(a).unwrap().size = None;
        world.spawn_from_def(&def(10.0), Vec2::new(15.0, 0.0));

        // Effective radii 10 (default) + 10 > 15 apart.
        assert_eq!(overlapping_pairs(&world).len(), 1);
    }

    #[test]
    fn test_each_pair_reported_once() {
        let mut world = World::with_seed(1);
        for i in 0..4 {
            world.spawn_from_def(&def(50.0), Vec2::new(i as f32, 0.0));
        }
        // All four mutually overlap: C(4,2) = 6 pairs.
        assert_eq!(overlapping_pairs(&world).len(), 6);
    }
}
