//! # Client World Mirror
//!
//! Glues the two client time domains together: the render/prediction loop
//! (high frequency) and the network loop (tick frequency). Holds the last
//! authoritative snapshot, the predicted local avatar, and the smoothed
//! display positions for everyone else, and turns them into something a
//! renderer can draw.

use skirmish_shared::protocol::{
    ClientMessage, EntityId, EntityState, ServerMessage, WorldSnapshot, BROADCAST_DISPLAY_SECS,
};
use skirmish_shared::{GameConfig, Vec2};

use crate::interpolation::RemoteSmoother;
use crate::prediction::{InputState, LocalAvatar};

/// One drawable entity: authoritative fields plus the position to draw at.
#[derive(Clone, Debug)]
pub struct RenderEntity<'a> {
    /// The authoritative state from the last snapshot.
    pub state: &'a EntityState,
    /// Where to draw it this frame.
    pub display_pos: Vec2,
    /// True when this is the locally controlled avatar.
    pub is_local: bool,
}

/// The client-local mirror of the arena.
pub struct ClientWorld {
    config: GameConfig,
    local_id: Option<EntityId>,
    local_placed: bool,
    local: LocalAvatar,
    smoother: RemoteSmoother,
    snapshot: Option<WorldSnapshot>,
    broadcasts: Vec<(String, f32)>,
}

impl ClientWorld {
    /// Creates a mirror with the configuration received out of band (or the
    /// defaults until the first `ConfigSync` lands).
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            local_id: None,
            local_placed: false,
            local: LocalAvatar::new(Vec2::ZERO),
            smoother: RemoteSmoother::new(),
            snapshot: None,
            broadcasts: Vec::new(),
        }
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The entity this client controls, once the server assigned one.
    #[must_use]
    pub const fn local_id(&self) -> Option<EntityId> {
        self.local_id
    }

    /// Ingests one server message.
    pub fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Welcome { id } => {
                tracing::info!(%id, "joined as");
                self.local_id = Some(id);
                self.local_placed = false;
            }
            ServerMessage::Snapshot(snapshot) => {
                // The local avatar is client-authoritative: we only read its
                // server position once, to learn our spawn point.
                if !self.local_placed {
                    if let Some(me) = self.local_id.and_then(|id| snapshot.entities.get(&id)) {
                        self.local.place(me.pos);
                        self.local_placed = true;
                    }
                }
                self.smoother.apply_snapshot(&snapshot, self.local_id);
                self.snapshot = Some(snapshot);
            }
            ServerMessage::ConfigSync(config) => {
                tracing::info!(world_speed = config.world_speed, "config synced");
                self.config = config;
            }
            ServerMessage::Broadcast { text } => {
                self.broadcasts.push((text, BROADCAST_DISPLAY_SECS));
            }
            ServerMessage::ContentAccepted { message } => {
                tracing::info!(%message, "content accepted");
            }
            ServerMessage::ContentRejected { error } => {
                tracing::warn!(%error, "content rejected");
            }
            ServerMessage::CommandResult { ok, detail } => {
                if ok {
                    tracing::info!(%detail, "command ok");
                } else {
                    tracing::warn!(%detail, "command failed");
                }
            }
            ServerMessage::DevState { .. } => {
                // Consumed by the dev console shell, not the mirror.
            }
        }
    }

    /// Advances one render frame: local prediction, remote smoothing,
    /// broadcast decay.
    pub fn advance_frame(&mut self, input: InputState, dt: f32) {
        if self.local_placed {
            let obstacles = self.obstacles();
            self.local.step(input, dt, &self.config, &obstacles);
        }
        if let Some(snapshot) = &self.snapshot {
            self.smoother.advance(snapshot, dt, &self.config);
        }
        for entry in &mut self.broadcasts {
            entry.1 -= dt;
        }
        self.broadcasts.retain(|(_, remaining)| *remaining > 0.0);
    }

    /// Every known entity except the local avatar, as (center, radius).
    fn obstacles(&self) -> Vec<(Vec2, f32)> {
        let Some(snapshot) = &self.snapshot else {
            return Vec::new();
        };
        snapshot
            .entities
            .values()
            .filter(|e| Some(e.id) != self.local_id)
            .map(|e| (e.pos, e.radius()))
            .collect()
    }

    /// The position report to push to the server this network tick.
    ///
    /// `None` until we have joined and learned our spawn point.
    #[must_use]
    pub fn position_report(&self) -> Option<ClientMessage> {
        if !self.local_placed {
            return None;
        }
        let pos = self.local.position();
        Some(ClientMessage::Position { x: pos.x, y: pos.y })
    }

    /// Everything to draw this frame.
    ///
    /// Remote entities appear at their smoothed display position, the local
    /// avatar at its predicted position.
    #[must_use]
    pub fn render_entities(&self) -> Vec<RenderEntity<'_>> {
        let Some(snapshot) = &self.snapshot else {
            return Vec::new();
        };
        snapshot
            .entities
            .values()
            .map(|state| {
                let is_local = Some(state.id) == self.local_id;
                let display_pos = if is_local && self.local_placed {
                    self.local.position()
                } else {
                    self.smoother.display(state.id).unwrap_or(state.pos)
                };
                RenderEntity { state, display_pos, is_local }
            })
            .collect()
    }

    /// Server broadcasts still within their display window.
    #[must_use]
    pub fn active_broadcasts(&self) -> impl Iterator<Item = &str> {
        self.broadcasts.iter().map(|(text, _)| text.as_str())
    }

    /// Milliseconds between the last snapshot's send time and `now_ms`.
    #[must_use]
    pub fn ping_ms(&self, now_ms: u64) -> Option<u64> {
        self.snapshot.as_ref().map(|s| now_ms.saturating_sub(s.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entity(id: u64, pos: Vec2, type_name: &str) -> EntityState {
        EntityState {
            id: EntityId(id),
            type_name: type_name.to_owned(),
            pos,
            color: None,
            size: Some(15.0),
            health: None,
            max_health: None,
            visual: None,
            chat_message: None,
            chat_timer: None,
            nickname: None,
        }
    }

    fn snapshot(entries: Vec<EntityState>, timestamp: u64) -> WorldSnapshot {
        let entities: HashMap<_, _> = entries.into_iter().map(|e| (e.id, e)).collect();
        WorldSnapshot { entities, timestamp }
    }

    fn joined_world() -> ClientWorld {
        let mut world = ClientWorld::new(GameConfig::default());
        world.handle_message(ServerMessage::Welcome { id: EntityId(1) });
        world.handle_message(ServerMessage::Snapshot(snapshot(
            vec![
                entity(1, Vec2::new(400.0, 300.0), "player"),
                entity(2, Vec2::new(100.0, 100.0), "blob"),
            ],
            1000,
        )));
        world
    }

    #[test]
    fn test_spawn_point_adopted_once() {
        let mut world = joined_world();
        assert_eq!(world.position_report(), Some(ClientMessage::Position { x: 400.0, y: 300.0 }));

        // The server echoes back stale positions; prediction ignores them.
        world.advance_frame(InputState { right: true, ..InputState::default() }, 0.1);
        world.handle_message(ServerMessage::Snapshot(snapshot(
            vec![
                entity(1, Vec2::new(400.0, 300.0), "player"),
                entity(2, Vec2::new(100.0, 100.0), "blob"),
            ],
            1010,
        )));

        let reported = world.position_report().unwrap();
        assert_eq!(reported, ClientMessage::Position { x: 440.0, y: 300.0 });
    }

    #[test]
    fn test_render_uses_smoothed_positions_for_remotes() {
        let mut world = joined_world();
        // The blob jumps 60 units; display should lag behind.
        world.handle_message(ServerMessage::Snapshot(snapshot(
            vec![
                entity(1, Vec2::new(400.0, 300.0), "player"),
                entity(2, Vec2::new(160.0, 100.0), "blob"),
            ],
            1010,
        )));
        world.advance_frame(InputState::default(), 1.0 / 60.0);

        let rendered = world.render_entities();
        let blob = rendered.iter().find(|r| r.state.id == EntityId(2)).unwrap();
        assert!(blob.display_pos.x > 100.0);
        assert!(blob.display_pos.x < 160.0);

        let me = rendered.iter().find(|r| r.is_local).unwrap();
        assert_eq!(me.display_pos, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn test_no_report_before_join_completes() {
        let mut world = ClientWorld::new(GameConfig::default());
        assert_eq!(world.position_report(), None);

        world.handle_message(ServerMessage::Welcome { id: EntityId(1) });
        // Still no snapshot containing us.
        assert_eq!(world.position_report(), None);
    }

    #[test]
    fn test_config_sync_replaces_tunables() {
        let mut world = joined_world();
        let mut config = GameConfig::default();
        config.player_speed = 100.0;
        world.handle_message(ServerMessage::ConfigSync(config));

        world.advance_frame(InputState { right: true, ..InputState::default() }, 0.1);
        let reported = world.position_report().unwrap();
        assert_eq!(reported, ClientMessage::Position { x: 410.0, y: 300.0 });
    }

    #[test]
    fn test_broadcasts_expire() {
        let mut world = joined_world();
        world.handle_message(ServerMessage::Broadcast { text: "round over".to_owned() });
        assert_eq!(world.active_broadcasts().count(), 1);

        world.advance_frame(InputState::default(), 2.0);
        assert_eq!(world.active_broadcasts().count(), 1);

        world.advance_frame(InputState::default(), 4.0);
        assert_eq!(world.active_broadcasts().count(), 0);
    }

    #[test]
    fn test_ping_from_snapshot_timestamp() {
        let world = joined_world();
        assert_eq!(world.ping_ms(1045), Some(45));
    }
}
