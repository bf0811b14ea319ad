//! Wire protocol between client and server.
//!
//! Every message is one JSON object with a `type` tag. Both directions are
//! full messages, never deltas: a [`WorldSnapshot`] is the complete
//! authoritative world and replaces whatever the client held before.

use crate::config::GameConfig;
use crate::content::{ContentPack, EntityDef, VisualDescriptor};
use crate::math::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Collision and render radius used when an instance has no explicit size.
pub const DEFAULT_ENTITY_RADIUS: f32 = 10.0;

/// Seconds a chat bubble stays attached to an entity.
pub const CHAT_BUBBLE_SECS: f32 = 5.0;

/// Seconds a server broadcast stays on screen (client display hint).
pub const BROADCAST_DISPLAY_SECS: f32 = 5.0;

/// Type name given to player-controlled instances.
pub const PLAYER_TYPE: &str = "player";

/// Unique identifier of a live entity instance.
///
/// Allocated monotonically by the entity store; stable for the lifetime of
/// the instance and never reused within a server run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Serialize for EntityId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

// Ids appear both as values and as JSON map keys. Map keys are always
// strings on the wire, so deserialization accepts either form.
impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl serde::de::Visitor<'_> for IdVisitor {
            type Value = EntityId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an entity id as integer or string")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(EntityId(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(EntityId)
                    .map_err(|_| E::custom(format!("negative entity id {v}")))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse::<u64>()
                    .map(EntityId)
                    .map_err(|_| E::custom(format!("bad entity id `{v}`")))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// One live, mutable entity as it appears in snapshots.
///
/// This is both the store's instance record and the wire form; the server
/// serializes it as-is. `type_name` may dangle (its definition edited away
/// mid-flight) - that only disables behavior execution, the instance lives
/// on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityState {
    /// Stable unique id.
    pub id: EntityId,
    /// Definition key this instance was spawned from.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Position in world space.
    pub pos: Vec2,
    /// Fill color copied from the definition (or chosen by the player).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Radius. Falls back to [`DEFAULT_ENTITY_RADIUS`] when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    /// Current health, for entities that can take damage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
    /// Health ceiling copied from the definition at spawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_health: Option<f32>,
    /// Visual shape override copied from the definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual: Option<VisualDescriptor>,
    /// Chat bubble text, while one is showing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_message: Option<String>,
    /// Seconds until the chat bubble clears.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_timer: Option<f32>,
    /// Player nickname, present on player-controlled instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl EntityState {
    /// Effective collision radius.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.size.unwrap_or(DEFAULT_ENTITY_RADIUS)
    }

    /// True for player-controlled instances.
    #[must_use]
    pub fn is_player(&self) -> bool {
        self.type_name == PLAYER_TYPE
    }
}

/// Full point-in-time copy of the world, emitted once per tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Every live instance, keyed by id.
    pub entities: HashMap<EntityId, EntityState>,
    /// Unix milliseconds at snapshot time. Clients derive ping from it.
    pub timestamp: u64,
}

/// Partial entity edit applied through the admin surface.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityPatch {
    /// New fill color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// New radius.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    /// New position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<Vec2>,
    /// New health value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
}

/// Messages a client sends to the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First message on a connection: claim a nickname and color.
    Join {
        /// Display name.
        nickname: String,
        /// Avatar color.
        color: String,
    },
    /// Client-authoritative position for the controlled entity.
    Position {
        /// New x coordinate.
        x: f32,
        /// New y coordinate.
        y: f32,
    },
    /// Free text. A leading `/` makes it an admin command, otherwise it
    /// becomes a chat bubble on the sender's entity.
    Chat {
        /// The raw text.
        payload: String,
    },
    /// Request a full dev-state dump (entities + definitions + config).
    DevGetState,
    /// Edit properties of one entity.
    DevUpdateEntity {
        /// Target entity.
        id: EntityId,
        /// Fields to change.
        props: EntityPatch,
    },
    /// Delete one entity.
    DevDeleteEntity {
        /// Target entity.
        id: EntityId,
    },
    /// Create or replace one definition.
    DevUpdateDefinition {
        /// Definition key.
        type_name: String,
        /// The new definition.
        def: EntityDef,
    },
}

/// Messages the server sends to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to [`ClientMessage::Join`]: the entity this connection controls.
    Welcome {
        /// Assigned entity id.
        id: EntityId,
    },
    /// Periodic full world state.
    Snapshot(WorldSnapshot),
    /// Current configuration, sent on connect and after every config change.
    ConfigSync(GameConfig),
    /// Ad hoc server text, shown for [`BROADCAST_DISPLAY_SECS`].
    Broadcast {
        /// Message text.
        text: String,
    },
    /// A content upload was applied.
    ContentAccepted {
        /// Confirmation text.
        message: String,
    },
    /// A content upload was rejected; prior content is untouched.
    ContentRejected {
        /// Why it was rejected.
        error: String,
    },
    /// Structured result of an admin command.
    CommandResult {
        /// Whether the command succeeded.
        ok: bool,
        /// Outcome description or error text.
        detail: String,
    },
    /// Dev-state dump for the inspection surface.
    DevState {
        /// Every live instance.
        entities: HashMap<EntityId, EntityState>,
        /// Every loaded definition.
        definitions: BTreeMap<String, EntityDef>,
        /// Current configuration.
        config: GameConfig,
    },
}

impl ServerMessage {
    /// Builds the acceptance/rejection ack for a content upload attempt.
    #[must_use]
    pub fn upload_ack(result: &Result<ContentPack, crate::content::ContentError>) -> Self {
        match result {
            Ok(pack) => Self::ContentAccepted {
                message: format!("Content loaded: {} definition(s)", pack.definitions.len()),
            },
            Err(e) => Self::ContentRejected { error: e.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entity(id: u64) -> EntityState {
        EntityState {
            id: EntityId(id),
            type_name: "blob".to_owned(),
            pos: Vec2::new(400.0, 300.0),
            color: Some("red".to_owned()),
            size: Some(15.0),
            health: Some(30.0),
            max_health: Some(30.0),
            visual: None,
            chat_message: Some("hi".to_owned()),
            chat_timer: Some(3.5),
            nickname: None,
        }
    }

    #[test]
    fn test_snapshot_round_trip_preserves_every_field() {
        let mut entities = HashMap::new();
        for id in [1, 7, 42] {
            entities.insert(EntityId(id), sample_entity(id));
        }
        let snapshot = WorldSnapshot { entities, timestamp: 1_700_000_000_123 };

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: WorldSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, back);
    }

    #[test]
    fn test_client_message_tagging() {
        let msg: ClientMessage =
            serde_json::from_str(r##"{"type": "join", "nickname": "ada", "color": "#00ff00"}"##)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join { nickname: "ada".to_owned(), color: "#00ff00".to_owned() }
        );

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "position", "x": 10.5, "y": -3.0}"#).unwrap();
        assert_eq!(msg, ClientMessage::Position { x: 10.5, y: -3.0 });
    }

    #[test]
    fn test_server_message_snapshot_embeds_fields() {
        let msg = ServerMessage::Snapshot(WorldSnapshot::default());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"snapshot""#));
        assert!(json.contains(r#""entities""#));
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let entity = EntityState {
            id: EntityId(1),
            type_name: "runner".to_owned(),
            pos: Vec2::ZERO,
            color: None,
            size: None,
            health: None,
            max_health: None,
            visual: None,
            chat_message: None,
            chat_timer: None,
            nickname: None,
        };
        let json = serde_json::to_string(&entity).unwrap();
        assert!(!json.contains("health"));
        assert!(!json.contains("chatMessage"));
    }

    #[test]
    fn test_default_radius_fallback() {
        let mut entity = sample_entity(1);
        entity.size = None;
        assert_eq!(entity.radius(), DEFAULT_ENTITY_RADIUS);
    }
}
