//! # Entity Store
//!
//! The authoritative collection of live entity instances.
//!
//! ## Design
//!
//! - Instances are the wire type ([`EntityState`]): a snapshot is a clone
//!   of the map, never a re-encoding
//! - Ids are allocated monotonically and never reused within a run
//! - All operations are synchronous and run to completion; the scheduler
//!   never observes a half-applied mutation

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skirmish_shared::content::EntityDef;
use skirmish_shared::protocol::{EntityId, EntityPatch, EntityState, WorldSnapshot, CHAT_BUBBLE_SECS, PLAYER_TYPE};
use skirmish_shared::{Bounds, Vec2};
use std::collections::{HashMap, HashSet};

/// Owns every live entity instance.
pub struct World {
    entities: HashMap<EntityId, EntityState>,
    next_id: u64,
    rng: StdRng,
}

impl World {
    /// Creates an empty world with an OS-seeded rng.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Creates an empty world with a fixed rng seed (deterministic tests).
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Instantiates a definition at the given position.
    ///
    /// Copies the definition's visuals onto the new instance: color,
    /// radius as size, health as both health and ceiling, and the visual
    /// descriptor. Does not run `onSpawn` - the simulation layer owns
    /// script execution.
    pub fn spawn_from_def(&mut self, def: &EntityDef, pos: Vec2) -> EntityId {
        let id = self.allocate_id();
        self.entities.insert(
            id,
            EntityState {
                id,
                type_name: def.type_name.clone(),
                pos,
                color: Some(def.color.clone()),
                size: Some(def.radius),
                health: def.health,
                max_health: def.health,
                visual: def.visual,
                chat_message: None,
                chat_timer: None,
                nickname: None,
            },
        );
        tracing::debug!(%id, type_name = %def.type_name, "spawned entity");
        id
    }

    /// Creates a player instance, bypassing the definition lookup.
    ///
    /// Players have a fixed size and land at a uniformly random position
    /// inside `bounds` (the margin-inset world).
    pub fn spawn_player(&mut self, nickname: &str, color: &str, size: f32, bounds: Bounds) -> EntityId {
        let pos = self.random_point(bounds);
        let id = self.allocate_id();
        self.entities.insert(
            id,
            EntityState {
                id,
                type_name: PLAYER_TYPE.to_owned(),
                pos,
                color: Some(color.to_owned()),
                size: Some(size),
                health: None,
                max_health: None,
                visual: None,
                chat_message: None,
                chat_timer: None,
                nickname: Some(nickname.to_owned()),
            },
        );
        tracing::info!(%id, nickname, "player joined");
        id
    }

    /// A uniformly random point inside the region.
    pub fn random_point(&mut self, bounds: Bounds) -> Vec2 {
        Vec2::new(
            self.rng.gen_range(bounds.min.x..=bounds.max.x),
            self.rng.gen_range(bounds.min.y..=bounds.max.y),
        )
    }

    /// Overwrites an entity's position. Unknown ids are ignored.
    pub fn set_position(&mut self, id: EntityId, pos: Vec2) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.pos = pos;
        }
    }

    /// Attaches a chat bubble and starts its countdown.
    pub fn set_chat_message(&mut self, id: EntityId, text: &str) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.chat_message = Some(text.to_owned());
            entity.chat_timer = Some(CHAT_BUBBLE_SECS);
        }
    }

    /// Applies a partial edit from the admin surface.
    ///
    /// Returns false when the entity does not exist.
    pub fn update_properties(&mut self, id: EntityId, patch: &EntityPatch) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            tracing::warn!(%id, "property edit for unknown entity");
            return false;
        };
        if let Some(color) = &patch.color {
            entity.color = Some(color.clone());
        }
        if let Some(size) = patch.size {
            entity.size = Some(size);
        }
        if let Some(pos) = patch.pos {
            entity.pos = pos;
        }
        if let Some(health) = patch.health {
            entity.health = Some(health);
        }
        true
    }

    /// Removes an entity. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let removed = self.entities.remove(&id).is_some();
        if removed {
            tracing::debug!(%id, "removed entity");
        }
        removed
    }

    /// Removes every entity whose id is not in the retained set.
    ///
    /// Used to reset the world while preserving connected players.
    pub fn clear_except(&mut self, keep: &HashSet<EntityId>) {
        let before = self.entities.len();
        self.entities.retain(|id, _| keep.contains(id));
        tracing::info!(removed = before - self.entities.len(), kept = self.entities.len(), "world cleared");
    }

    /// Produces the full snapshot for this instant.
    #[must_use]
    pub fn snapshot(&self, timestamp: u64) -> WorldSnapshot {
        WorldSnapshot { entities: self.entities.clone(), timestamp }
    }

    /// Looks up one entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntityState> {
        self.entities.get(&id)
    }

    /// Looks up one entity mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityState> {
        self.entities.get_mut(&id)
    }

    /// One entity plus the world rng, for script execution.
    ///
    /// The two borrows are disjoint fields, so opcodes can roll dice while
    /// mutating the entity they run against.
    pub fn entity_and_rng(&mut self, id: EntityId) -> Option<(&mut EntityState, &mut StdRng)> {
        let rng = &mut self.rng;
        self.entities.get_mut(&id).map(|entity| (entity, rng))
    }

    /// Iterates over all live entities.
    pub fn iter(&self) -> impl Iterator<Item = &EntityState> {
        self.entities.values()
    }

    /// Ids of all live entities, in no particular order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when no entities are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
