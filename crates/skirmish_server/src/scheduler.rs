//! # Simulation Scheduler
//!
//! Advances the world in fixed ticks and produces the broadcastable
//! snapshot.
//!
//! ## Tick order
//!
//! 1. Capture the interpreter context (positions, players, destroy set)
//! 2. Resolve collisions - each side's `onCollision` runs against the other
//! 3. Per entity: decay chat bubbles, then run its `onTick` script
//! 4. Purge everything marked for destruction
//! 5. Snapshot
//!
//! A tick runs to completion atomically with respect to snapshot
//! production: no snapshot ever observes a world mid-pass. The world-speed
//! multiplier scales the delta handed to scripts and chat decay without
//! touching the wall-clock tick period.

use skirmish_shared::protocol::{EntityId, EntityState, WorldSnapshot};
use skirmish_shared::{GameConfig, Vec2};
use std::collections::HashSet;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::content::ContentStore;
use crate::interpreter::{self, TickContext};
use crate::world::World;
use crate::collision;

/// The authoritative simulation: world, content, and the tick pipeline.
pub struct Simulation {
    config: GameConfig,
    content: ContentStore,
    world: World,
    players: HashSet<EntityId>,
    started: Instant,
    tick_count: u64,
}

impl Simulation {
    /// Creates a simulation with the built-in content pack loaded.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        Self::with_seed(config, rand::random())
    }

    /// Creates a simulation with a fixed rng seed (deterministic tests).
    #[must_use]
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self {
            config,
            content: ContentStore::with_defaults(),
            world: World::with_seed(seed),
            players: HashSet::new(),
            started: Instant::now(),
            tick_count: 0,
        }
    }

    /// Spawns the handful of demo entities a fresh arena starts with.
    pub fn seed_demo_entities(&mut self) {
        self.spawn("blob", Vec2::new(400.0, 300.0));
        self.spawn("runner", Vec2::new(100.0, 100.0));
    }

    /// Current configuration snapshot.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Replaces the configuration with a new snapshot.
    pub fn set_config(&mut self, config: GameConfig) {
        tracing::info!(world_speed = config.world_speed, tick_rate = config.tick_rate, "config replaced");
        self.config = config;
    }

    /// The content store.
    #[must_use]
    pub const fn content(&self) -> &ContentStore {
        &self.content
    }

    /// Mutable access to the content store (uploads, hot reload).
    pub fn content_mut(&mut self) -> &mut ContentStore {
        &mut self.content
    }

    /// The entity store.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the entity store (inbound session writes).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Ids of player-controlled entities.
    #[must_use]
    pub const fn players(&self) -> &HashSet<EntityId> {
        &self.players
    }

    /// Ticks executed so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Wall-clock seconds since the simulation started.
    #[must_use]
    pub fn elapsed_secs(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    /// Spawns an instance of a content-defined type.
    ///
    /// Unknown types are logged and produce no entity; a stale `/spawn`
    /// must not halt anything.
    pub fn spawn(&mut self, type_name: &str, pos: Vec2) -> Option<EntityId> {
        let Some(def) = self.content.get(type_name) else {
            tracing::warn!(type_name, "spawn of unknown entity type");
            return None;
        };
        let id = self.world.spawn_from_def(def, pos);

        if let Some(actions) = self.content.on_spawn(type_name) {
            let mut ctx = TickContext::capture(
                &self.world,
                &self.players,
                self.config.world_rect(),
                self.elapsed_secs(),
            );
            if let Some((entity, rng)) = self.world.entity_and_rng(id) {
                interpreter::execute(entity, rng, actions, 0.0, &mut ctx);
            }
            // A spawn script may refuse to live (`destroy_self`).
            for dead in ctx.take_destroyed() {
                self.world.remove(dead);
            }
        }
        self.world.get(id).is_some().then_some(id)
    }

    /// Spawns a player avatar and registers it as player-owned.
    pub fn spawn_player(&mut self, nickname: &str, color: &str) -> EntityId {
        let id = self.world.spawn_player(
            nickname,
            color,
            self.config.player_size,
            self.config.player_bounds(),
        );
        self.players.insert(id);
        id
    }

    /// Removes a player avatar (disconnect).
    pub fn despawn_player(&mut self, id: EntityId) {
        self.world.remove(id);
        self.players.remove(&id);
    }

    /// A uniformly random point in the full world extent.
    pub fn random_world_point(&mut self) -> Vec2 {
        let rect = self.config.world_rect();
        self.world.random_point(rect)
    }

    /// Advances the world by one tick and returns the snapshot to broadcast.
    ///
    /// `dt_real` is the wall-clock tick interval; scripts and chat decay see
    /// it scaled by the world-speed multiplier.
    pub fn tick(&mut self, dt_real: f32) -> WorldSnapshot {
        self.tick_count += 1;
        let dt = dt_real * self.config.world_speed;

        let mut ctx = TickContext::capture(
            &self.world,
            &self.players,
            self.config.world_rect(),
            self.elapsed_secs(),
        );

        // Collisions first, so reactions see pre-movement positions.
        for (a, b) in collision::overlapping_pairs(&self.world) {
            self.run_collision_script(a, b, dt, &mut ctx);
            self.run_collision_script(b, a, dt, &mut ctx);
        }

        // Chat decay, then each entity's onTick script.
        for id in self.world.ids() {
            if let Some(entity) = self.world.get_mut(id) {
                decay_chat(entity, dt);
            }
            let Some(type_name) = self.world.get(id).map(|e| e.type_name.clone()) else {
                continue;
            };
            if let Some(actions) = self.content.on_tick(&type_name) {
                if let Some((entity, rng)) = self.world.entity_and_rng(id) {
                    interpreter::execute(entity, rng, actions, dt, &mut ctx);
                }
            }
        }

        // Deferred destruction: scripts only marked, the purge happens once.
        for id in ctx.take_destroyed() {
            self.world.remove(id);
            self.players.remove(&id);
        }

        self.world.snapshot(unix_millis())
    }

    /// The snapshot as of right now, outside the tick cadence.
    ///
    /// Used to bring a freshly connected client up to date immediately.
    #[must_use]
    pub fn snapshot_now(&self) -> WorldSnapshot {
        self.world.snapshot(unix_millis())
    }

    /// Runs `source`'s collision reaction against `target`.
    fn run_collision_script(
        &mut self,
        source: EntityId,
        target: EntityId,
        dt: f32,
        ctx: &mut TickContext,
    ) {
        let Some(source_type) = self.world.get(source).map(|e| e.type_name.clone()) else {
            return;
        };
        let Some(actions) = self.content.on_collision(&source_type) else {
            return;
        };
        if let Some((entity, rng)) = self.world.entity_and_rng(target) {
            interpreter::execute(entity, rng, actions, dt, ctx);
        }
    }
}

fn decay_chat(entity: &mut EntityState, dt: f32) {
    if let Some(timer) = entity.chat_timer {
        let remaining = timer - dt;
        if remaining <= 0.0 {
            entity.chat_timer = None;
            entity.chat_message = None;
        } else {
            entity.chat_timer = Some(remaining);
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

/// Fixed-timestep tick loop controller.
///
/// Keeps the simulation at its configured rate regardless of how long an
/// individual tick takes, using an accumulator plus a sleep/spin wait.
pub struct TickLoop {
    /// Target tick duration.
    tick_duration: Duration,
    /// Time of last tick check.
    last_tick: Instant,
    /// Accumulated time since the last executed tick.
    accumulator: Duration,
    /// Total ticks executed.
    tick_count: u64,
    /// Number of ticks that overran their budget.
    late_ticks: u64,
}

impl TickLoop {
    /// Creates a tick loop at the given rate.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_duration: Duration::from_micros(1_000_000 / u64::from(tick_rate.max(1))),
            last_tick: Instant::now(),
            accumulator: Duration::ZERO,
            tick_count: 0,
            late_ticks: 0,
        }
    }

    /// Returns true if a tick is due. Call in a loop until it returns false.
    #[must_use]
    pub fn should_tick(&mut self) -> bool {
        let now = Instant::now();
        self.accumulator += now.duration_since(self.last_tick);
        self.last_tick = now;
        self.accumulator >= self.tick_duration
    }

    /// Marks the start of a tick; returns its start time.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.accumulator = self.accumulator.saturating_sub(self.tick_duration);
        self.tick_count += 1;
        Instant::now()
    }

    /// Marks the end of a tick, recording overruns.
    pub fn end_tick(&mut self, start: Instant) {
        if start.elapsed() > self.tick_duration {
            self.late_ticks += 1;
        }
    }

    /// Sleeps until the next tick is due, spin-waiting the final stretch.
    pub fn wait_for_next_tick(&self) {
        let elapsed = Instant::now().duration_since(self.last_tick);
        if elapsed < self.tick_duration {
            let remaining = self.tick_duration - elapsed;
            if remaining > Duration::from_micros(1000) {
                std::thread::sleep(remaining - Duration::from_micros(500));
            }
            while Instant::now().duration_since(self.last_tick) < self.tick_duration {
                std::hint::spin_loop();
            }
        }
    }

    /// Ticks executed so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Ticks that overran their budget.
    #[must_use]
    pub const fn late_ticks(&self) -> u64 {
        self.late_ticks
    }

    /// The target tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
