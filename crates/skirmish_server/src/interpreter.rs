//! # Behavior Interpreter
//!
//! A small opcode VM: each invocation runs one entity's script against a
//! per-tick context.
//!
//! ## Design
//!
//! The context is built once per tick, before any script runs. It carries a
//! read copy of every live position, the player-owned id set, and the
//! destroy set. Scripts therefore see the world as it stood at the start of
//! the pass, and destruction is always deferred: opcodes mark ids, the
//! scheduler purges after every script for the tick has run. A half-deleted
//! world is never observable.
//!
//! Failure policy: an unknown opcode is a logged no-op, a missing target is
//! a no-op. Nothing a script does can abort the tick.

use rand::rngs::StdRng;
use rand::Rng;
use skirmish_shared::content::{Action, Target};
use skirmish_shared::protocol::{EntityId, EntityState};
use skirmish_shared::{Bounds, Vec2};
use std::collections::{HashMap, HashSet};

use crate::world::World;

/// Distance under which `follow` considers itself arrived.
const FOLLOW_ARRIVAL_DISTANCE: f32 = 1.0;

/// Per-tick execution context shared by every script in the pass.
pub struct TickContext {
    /// Start-of-pass read view: id to position.
    positions: HashMap<EntityId, Vec2>,
    /// Ids of player-controlled entities.
    players: HashSet<EntityId>,
    /// Entities marked for destruction this pass.
    destroyed: HashSet<EntityId>,
    /// World extent scripts clamp and wrap against.
    bounds: Bounds,
    /// Wall-clock seconds since server start. Drives `orbit`.
    elapsed_secs: f32,
}

impl TickContext {
    /// Captures the read view of the world for one pass.
    #[must_use]
    pub fn capture(world: &World, players: &HashSet<EntityId>, bounds: Bounds, elapsed_secs: f32) -> Self {
        Self {
            positions: world.iter().map(|e| (e.id, e.pos)).collect(),
            players: players.clone(),
            destroyed: HashSet::new(),
            bounds,
            elapsed_secs,
        }
    }

    /// Nearest entity matching the target selector, by straight-line
    /// distance, excluding the asking entity itself.
    #[must_use]
    pub fn nearest_target(&self, target: Target, from: Vec2, exclude: EntityId) -> Option<Vec2> {
        match target {
            Target::Player => self
                .players
                .iter()
                .filter(|id| **id != exclude)
                .filter_map(|id| self.positions.get(id))
                .copied()
                .min_by(|a, b| {
                    from.distance_squared(*a)
                        .total_cmp(&from.distance_squared(*b))
                }),
        }
    }

    /// Marks an entity for destruction at the end of the pass.
    pub fn mark_destroyed(&mut self, id: EntityId) {
        self.destroyed.insert(id);
    }

    /// True when the entity has been marked this pass.
    #[must_use]
    pub fn is_marked(&self, id: EntityId) -> bool {
        self.destroyed.contains(&id)
    }

    /// Drains the destroy set for the scheduler's purge.
    pub fn take_destroyed(&mut self) -> HashSet<EntityId> {
        std::mem::take(&mut self.destroyed)
    }
}

/// Runs a script against one entity, action by action, in list order.
pub fn execute(
    entity: &mut EntityState,
    rng: &mut StdRng,
    actions: &[Action],
    dt: f32,
    ctx: &mut TickContext,
) {
    for action in actions {
        run_action(entity, rng, action, dt, ctx);
    }
}

fn run_action(
    entity: &mut EntityState,
    rng: &mut StdRng,
    action: &Action,
    dt: f32,
    ctx: &mut TickContext,
) {
    match action {
        Action::RandomWalk { speed } => {
            let amount = speed * dt;
            let jitter = Vec2::new(rng.gen::<f32>() - 0.5, rng.gen::<f32>() - 0.5);
            entity.pos = ctx.bounds.clamp(entity.pos + jitter * amount);
        }
        Action::MoveDir { speed, dir } => {
            entity.pos = ctx.bounds.wrap(entity.pos + *dir * (speed * dt));
        }
        Action::Follow { speed, target } => {
            let Some(goal) = ctx.nearest_target(*target, entity.pos, entity.id) else {
                return;
            };
            if entity.pos.distance(goal) <= FOLLOW_ARRIVAL_DISTANCE {
                return;
            }
            let step = (goal - entity.pos).normalize_or_zero() * (speed * dt);
            entity.pos = ctx.bounds.clamp(entity.pos + step);
        }
        Action::Flee { speed } => {
            let Some(threat) = ctx.nearest_target(Target::Player, entity.pos, entity.id) else {
                return;
            };
            let step = (entity.pos - threat).normalize_or_zero() * (speed * dt);
            entity.pos = ctx.bounds.clamp(entity.pos + step);
        }
        Action::Orbit { speed, radius, target } => {
            let Some(center) = ctx.nearest_target(*target, entity.pos, entity.id) else {
                return;
            };
            let angle = ctx.elapsed_secs * speed.to_radians();
            entity.pos = center + Vec2::new(angle.cos(), angle.sin()) * *radius;
        }
        Action::Damage { amount } => {
            // Entities without a health pool shrug damage off.
            let Some(health) = entity.health else {
                return;
            };
            let remaining = health - amount;
            entity.health = Some(remaining);
            if remaining <= 0.0 {
                ctx.mark_destroyed(entity.id);
            }
        }
        Action::DestroySelf => {
            ctx.mark_destroyed(entity.id);
        }
        Action::Unknown { opcode, .. } => {
            tracing::debug!(%opcode, entity = %entity.id, "ignoring unknown opcode");
        }
    }
}
