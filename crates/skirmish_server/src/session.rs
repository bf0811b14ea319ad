//! # Session Layer
//!
//! Maps each connection to the entity it controls and dispatches inbound
//! messages into the simulation.
//!
//! ## Design
//!
//! - Position updates are client-authoritative: the server stores what the
//!   client reports, last write wins
//! - Chat text starting with `/` goes through the whitelisted admin command
//!   interpreter; everything else becomes a chat bubble
//! - Every admin action answers with a structured result; a failed command
//!   never disturbs the simulation

use skirmish_shared::content::ContentPack;
use skirmish_shared::protocol::{ClientMessage, EntityId, ServerMessage};
use skirmish_shared::Vec2;
use std::collections::{HashMap, HashSet};

use crate::command::{self, AdminCommand};
use crate::net::{BroadcastHub, ConnectionId, SessionEvent};
use crate::scheduler::Simulation;

/// One connected client.
#[derive(Clone, Debug)]
struct Session {
    /// The entity this connection controls.
    entity: EntityId,
    /// Display name claimed at join.
    nickname: String,
}

/// Tracks connections and routes their messages.
#[derive(Default)]
pub struct SessionManager {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionManager {
    /// Creates an empty session manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity ids of all connected players.
    #[must_use]
    pub fn player_entities(&self) -> HashSet<EntityId> {
        self.sessions.values().map(|s| s.entity).collect()
    }

    /// Number of connected, joined players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when nobody has joined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Applies one inbound event to the simulation.
    pub fn handle_event(&mut self, event: SessionEvent, sim: &mut Simulation, hub: &BroadcastHub) {
        match event {
            SessionEvent::Connected(conn) => {
                // Bring the newcomer up to date before their first tick.
                hub.send_to(conn, ServerMessage::ConfigSync(sim.config().clone()));
                hub.send_to(conn, ServerMessage::Snapshot(sim.snapshot_now()));
            }
            SessionEvent::Message(conn, message) => self.handle_message(conn, message, sim, hub),
            SessionEvent::Disconnected(conn) => {
                if let Some(session) = self.sessions.remove(&conn) {
                    tracing::info!(%conn, nickname = %session.nickname, "player left");
                    sim.despawn_player(session.entity);
                }
            }
        }
    }

    fn handle_message(
        &mut self,
        conn: ConnectionId,
        message: ClientMessage,
        sim: &mut Simulation,
        hub: &BroadcastHub,
    ) {
        match message {
            ClientMessage::Join { nickname, color } => {
                if self.sessions.contains_key(&conn) {
                    tracing::warn!(%conn, "duplicate join ignored");
                    return;
                }
                let entity = sim.spawn_player(&nickname, &color);
                self.sessions.insert(conn, Session { entity, nickname });
                hub.send_to(conn, ServerMessage::Welcome { id: entity });
            }
            ClientMessage::Position { x, y } => {
                if let Some(session) = self.sessions.get(&conn) {
                    sim.world_mut().set_position(session.entity, Vec2::new(x, y));
                }
            }
            ClientMessage::Chat { payload } => match command::parse(&payload) {
                Some(Ok(cmd)) => self.execute_admin(conn, cmd, sim, hub),
                Some(Err(e)) => {
                    hub.send_to(conn, ServerMessage::CommandResult { ok: false, detail: e.to_string() });
                }
                None => {
                    if let Some(session) = self.sessions.get(&conn) {
                        sim.world_mut().set_chat_message(session.entity, &payload);
                    }
                }
            },
            ClientMessage::DevGetState => {
                hub.send_to(
                    conn,
                    ServerMessage::DevState {
                        entities: sim.snapshot_now().entities,
                        definitions: sim.content().definitions().clone(),
                        config: sim.config().clone(),
                    },
                );
            }
            ClientMessage::DevUpdateEntity { id, props } => {
                let ok = sim.world_mut().update_properties(id, &props);
                let detail = if ok {
                    format!("updated {id}")
                } else {
                    format!("no entity {id}")
                };
                hub.send_to(conn, ServerMessage::CommandResult { ok, detail });
            }
            ClientMessage::DevDeleteEntity { id } => {
                // Works on players too; their connection just loses its avatar.
                let existed = sim.world().get(id).is_some();
                sim.despawn_player(id);
                let detail = if existed { format!("deleted {id}") } else { format!("no entity {id}") };
                hub.send_to(conn, ServerMessage::CommandResult { ok: existed, detail });
            }
            ClientMessage::DevUpdateDefinition { type_name, def } => {
                sim.content_mut().upsert(type_name.clone(), def);
                hub.send_to(
                    conn,
                    ServerMessage::CommandResult { ok: true, detail: format!("definition `{type_name}` saved") },
                );
            }
        }
    }

    fn execute_admin(
        &mut self,
        conn: ConnectionId,
        cmd: AdminCommand,
        sim: &mut Simulation,
        hub: &BroadcastHub,
    ) {
        match cmd {
            AdminCommand::Spawn { type_name, count } => {
                let mut spawned = 0;
                for _ in 0..count {
                    let pos = sim.random_world_point();
                    if sim.spawn(&type_name, pos).is_none() {
                        break;
                    }
                    spawned += 1;
                }
                let (ok, detail) = if spawned == count {
                    (true, format!("spawned {spawned} `{type_name}`"))
                } else {
                    (false, format!("unknown entity type `{type_name}`"))
                };
                hub.send_to(conn, ServerMessage::CommandResult { ok, detail });
            }
            AdminCommand::Clear => {
                let keep = self.player_entities();
                sim.world_mut().clear_except(&keep);
                hub.send_to(
                    conn,
                    ServerMessage::CommandResult { ok: true, detail: "world cleared".to_owned() },
                );
            }
            AdminCommand::Broadcast { text } => {
                hub.broadcast(&ServerMessage::Broadcast { text });
                hub.send_to(
                    conn,
                    ServerMessage::CommandResult { ok: true, detail: "broadcast sent".to_owned() },
                );
            }
            AdminCommand::Speed { multiplier } => {
                let config = sim.config().with_world_speed(multiplier);
                sim.set_config(config.clone());
                hub.broadcast(&ServerMessage::ConfigSync(config));
                hub.send_to(
                    conn,
                    ServerMessage::CommandResult { ok: true, detail: format!("world speed set to {multiplier}") },
                );
            }
            AdminCommand::Upload { document } => {
                let result = ContentPack::from_json(&document);
                let ack = ServerMessage::upload_ack(&result);
                if let Ok(pack) = result {
                    sim.content_mut().load_pack(pack);
                }
                hub.send_to(conn, ack);
            }
        }
    }
}
