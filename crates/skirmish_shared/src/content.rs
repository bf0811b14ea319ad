//! # Content Schema
//!
//! Entity definitions and the behavior scripts that drive them.
//!
//! ## Design
//!
//! A definition is template data: visuals plus up to three scripts
//! (`onSpawn`, `onTick`, `onCollision`), each a list of [`Action`]s. On the
//! wire an action is `{"opcode": "...", "params": {...}}`; at load time that
//! raw form is converted into a closed enum with typed, defaulted
//! parameters. Malformed parameters are rejected when content is loaded,
//! not rediscovered every tick. Unknown opcodes are *not* an error: they
//! parse into [`Action::Unknown`] and execute as a no-op, so older servers
//! tolerate newer content.

use crate::math::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Errors produced while loading or validating content.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    /// An action parameter had the wrong shape or an out-of-range value.
    #[error("opcode `{opcode}`: parameter `{param}` {reason}")]
    BadParam {
        /// Opcode the parameter belongs to.
        opcode: String,
        /// Parameter name.
        param: String,
        /// Human-readable explanation.
        reason: String,
    },
    /// A definition failed validation.
    #[error("definition `{type_name}`: {reason}")]
    BadDefinition {
        /// Definition key.
        type_name: String,
        /// Human-readable explanation.
        reason: String,
    },
    /// The document was not valid JSON for a content pack.
    #[error("malformed content pack: {0}")]
    Parse(String),
}

/// Script target selector.
///
/// Only players can be targeted today; the selector is an enum so that new
/// targets extend the schema instead of a stringly-typed convention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Target {
    /// The nearest player-controlled entity.
    #[default]
    Player,
}

impl Target {
    fn parse(opcode: &str, value: &Value) -> Result<Self, ContentError> {
        match value.as_str() {
            Some("player") => Ok(Self::Player),
            _ => Err(ContentError::BadParam {
                opcode: opcode.to_owned(),
                param: "target".to_owned(),
                reason: format!("must be \"player\", got {value}"),
            }),
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
        }
    }
}

/// One instruction in a behavior script.
///
/// Parameters carry their defaults; an empty or absent `params` object is
/// always a legal script.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAction", into = "RawAction")]
pub enum Action {
    /// Jitter by a uniformly random offset, clamped to world bounds.
    RandomWalk {
        /// Movement scale in units per second.
        speed: f32,
    },
    /// Move along a fixed direction, wrapping at world edges.
    MoveDir {
        /// Movement speed in units per second.
        speed: f32,
        /// Direction of travel (not required to be normalized).
        dir: Vec2,
    },
    /// Step toward the nearest target.
    Follow {
        /// Movement speed in units per second.
        speed: f32,
        /// What to chase.
        target: Target,
    },
    /// Step directly away from the nearest player.
    Flee {
        /// Movement speed in units per second.
        speed: f32,
    },
    /// Sit on a circle around the target, angle advancing with time.
    Orbit {
        /// Angular advance in degrees per second.
        speed: f32,
        /// Circle radius.
        radius: f32,
        /// What to circle.
        target: Target,
    },
    /// Subtract health from the executing entity.
    Damage {
        /// Health to subtract.
        amount: f32,
    },
    /// Mark the executing entity for destruction.
    DestroySelf,
    /// An opcode this build does not know. Executes as a no-op.
    Unknown {
        /// The unrecognized opcode string.
        opcode: String,
        /// Raw parameters, preserved for round-tripping.
        params: Map<String, Value>,
    },
}

/// Wire form of an action: `{"opcode": ..., "params": {...}}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RawAction {
    opcode: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    params: Map<String, Value>,
}

fn f32_param(
    opcode: &str,
    params: &Map<String, Value>,
    key: &str,
    default: f32,
) -> Result<f32, ContentError> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => match value.as_f64() {
            Some(n) if n.is_finite() => Ok(n as f32),
            _ => Err(ContentError::BadParam {
                opcode: opcode.to_owned(),
                param: key.to_owned(),
                reason: format!("must be a finite number, got {value}"),
            }),
        },
    }
}

fn vec2_param(
    opcode: &str,
    params: &Map<String, Value>,
    key: &str,
    default: Vec2,
) -> Result<Vec2, ContentError> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => serde_json::from_value(value.clone()).map_err(|_| ContentError::BadParam {
            opcode: opcode.to_owned(),
            param: key.to_owned(),
            reason: format!("must be {{\"x\", \"y\"}}, got {value}"),
        }),
    }
}

fn target_param(
    opcode: &str,
    params: &Map<String, Value>,
) -> Result<Target, ContentError> {
    match params.get("target") {
        None => Ok(Target::default()),
        Some(value) => Target::parse(opcode, value),
    }
}

impl TryFrom<RawAction> for Action {
    type Error = ContentError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        let RawAction { opcode, params } = raw;
        match opcode.as_str() {
            "random_walk" => Ok(Self::RandomWalk {
                speed: f32_param(&opcode, &params, "speed", 50.0)?,
            }),
            "move_dir" => Ok(Self::MoveDir {
                speed: f32_param(&opcode, &params, "speed", 50.0)?,
                dir: vec2_param(&opcode, &params, "dir", Vec2::X)?,
            }),
            "follow" => Ok(Self::Follow {
                speed: f32_param(&opcode, &params, "speed", 100.0)?,
                target: target_param(&opcode, &params)?,
            }),
            "flee" => Ok(Self::Flee {
                speed: f32_param(&opcode, &params, "speed", 100.0)?,
            }),
            "orbit" => Ok(Self::Orbit {
                speed: f32_param(&opcode, &params, "speed", 50.0)?,
                radius: f32_param(&opcode, &params, "radius", 100.0)?,
                target: target_param(&opcode, &params)?,
            }),
            "damage" => Ok(Self::Damage {
                amount: f32_param(&opcode, &params, "amount", 10.0)?,
            }),
            "destroy_self" => Ok(Self::DestroySelf),
            _ => Ok(Self::Unknown { opcode, params }),
        }
    }
}

impl From<Action> for RawAction {
    fn from(action: Action) -> Self {
        fn num(v: f32) -> Value {
            serde_json::Number::from_f64(f64::from(v)).map_or(Value::Null, Value::Number)
        }

        let mut params = Map::new();
        let opcode = match action {
            Action::RandomWalk { speed } => {
                params.insert("speed".to_owned(), num(speed));
                "random_walk"
            }
            Action::MoveDir { speed, dir } => {
                params.insert("speed".to_owned(), num(speed));
                params.insert(
                    "dir".to_owned(),
                    serde_json::to_value(dir).unwrap_or(Value::Null),
                );
                "move_dir"
            }
            Action::Follow { speed, target } => {
                params.insert("speed".to_owned(), num(speed));
                params.insert("target".to_owned(), Value::from(target.as_str()));
                "follow"
            }
            Action::Flee { speed } => {
                params.insert("speed".to_owned(), num(speed));
                "flee"
            }
            Action::Orbit { speed, radius, target } => {
                params.insert("speed".to_owned(), num(speed));
                params.insert("radius".to_owned(), num(radius));
                params.insert("target".to_owned(), Value::from(target.as_str()));
                "orbit"
            }
            Action::Damage { amount } => {
                params.insert("amount".to_owned(), num(amount));
                "damage"
            }
            Action::DestroySelf => "destroy_self",
            Action::Unknown { opcode, params: raw } => {
                return Self { opcode, params: raw };
            }
        };
        Self { opcode: opcode.to_owned(), params }
    }
}

/// Behavior scripts attached to a definition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Behavior {
    /// Runs once when an instance is created.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_spawn: Vec<Action>,
    /// Runs every simulation tick.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_tick: Vec<Action>,
    /// Runs against the *other* party when two entities overlap.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_collision: Vec<Action>,
}

/// Visual shape hint for the client renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    /// Filled circle (the default avatar shape).
    Circle,
    /// Axis-aligned rectangle, optionally rotated.
    Rect,
}

/// Optional visual descriptor carried from definition to instance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualDescriptor {
    /// Shape kind.
    pub kind: VisualKind,
    /// Shape width, when the kind has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    /// Shape height, when the kind has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    /// Rotation in radians.
    #[serde(default)]
    pub rotation: f32,
}

/// Template data shared by every instance of a type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDef {
    /// Type name. The content store keys definitions by this.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Fill color.
    pub color: String,
    /// Collision and render radius.
    pub radius: f32,
    /// Starting health. Entities without health never die from damage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
    /// Behavior scripts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<Behavior>,
    /// Visual shape override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual: Option<VisualDescriptor>,
}

impl EntityDef {
    fn validate(&self, key: &str) -> Result<(), ContentError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ContentError::BadDefinition {
                type_name: key.to_owned(),
                reason: format!("radius must be positive and finite, got {}", self.radius),
            });
        }
        if let Some(health) = self.health {
            if !(health.is_finite() && health > 0.0) {
                return Err(ContentError::BadDefinition {
                    type_name: key.to_owned(),
                    reason: format!("health must be positive and finite, got {health}"),
                });
            }
        }
        Ok(())
    }
}

/// A mapping of type name to definition, uploaded or loaded as one unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPack {
    /// Definitions keyed by type name.
    pub definitions: BTreeMap<String, EntityDef>,
}

impl ContentPack {
    /// Parses and validates a pack from a JSON document.
    ///
    /// A rejected pack leaves no trace: callers only merge packs that made
    /// it through here.
    pub fn from_json(document: &str) -> Result<Self, ContentError> {
        let pack: Self =
            serde_json::from_str(document).map_err(|e| ContentError::Parse(e.to_string()))?;
        pack.validate()?;
        Ok(pack)
    }

    /// Validates every definition in the pack.
    pub fn validate(&self) -> Result<(), ContentError> {
        for (key, def) in &self.definitions {
            def.validate(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_defaults_apply() {
        let action: Action = serde_json::from_str(r#"{"opcode": "random_walk"}"#).unwrap();
        assert_eq!(action, Action::RandomWalk { speed: 50.0 });

        let action: Action = serde_json::from_str(r#"{"opcode": "move_dir", "params": {}}"#).unwrap();
        assert_eq!(action, Action::MoveDir { speed: 50.0, dir: Vec2::X });

        let action: Action = serde_json::from_str(r#"{"opcode": "damage"}"#).unwrap();
        assert_eq!(action, Action::Damage { amount: 10.0 });
    }

    #[test]
    fn test_action_explicit_params() {
        let action: Action = serde_json::from_str(
            r#"{"opcode": "move_dir", "params": {"speed": 200, "dir": {"x": 0, "y": -1}}}"#,
        )
        .unwrap();
        assert_eq!(action, Action::MoveDir { speed: 200.0, dir: Vec2::new(0.0, -1.0) });
    }

    #[test]
    fn test_unknown_opcode_is_not_an_error() {
        let action: Action =
            serde_json::from_str(r#"{"opcode": "teleport", "params": {"x": 1}}"#).unwrap();
        assert!(matches!(action, Action::Unknown { ref opcode, .. } if opcode == "teleport"));
    }

    #[test]
    fn test_malformed_params_rejected_at_load() {
        let result: Result<Action, _> =
            serde_json::from_str(r#"{"opcode": "damage", "params": {"amount": "lots"}}"#);
        assert!(result.is_err());

        let result: Result<Action, _> =
            serde_json::from_str(r#"{"opcode": "follow", "params": {"target": "tree"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_action_round_trip() {
        let action = Action::Orbit { speed: 75.0, radius: 40.0, target: Target::Player };
        let json = serde_json::to_string(&action).unwrap();
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(action, back);
    }

    #[test]
    fn test_pack_parses_original_shape() {
        let document = r#"{
            "definitions": {
                "blob": {
                    "type": "blob",
                    "color": "red",
                    "radius": 15,
                    "behavior": {
                        "onTick": [{"opcode": "random_walk", "params": {"speed": 100}}]
                    }
                }
            }
        }"#;
        let pack = ContentPack::from_json(document).unwrap();
        let blob = &pack.definitions["blob"];
        assert_eq!(blob.color, "red");
        let behavior = blob.behavior.as_ref().unwrap();
        assert_eq!(behavior.on_tick, vec![Action::RandomWalk { speed: 100.0 }]);
        assert!(behavior.on_spawn.is_empty());
    }

    #[test]
    fn test_pack_rejects_bad_radius() {
        let document = r#"{"definitions": {"ghost": {"type": "ghost", "color": "white", "radius": -3}}}"#;
        assert!(matches!(
            ContentPack::from_json(document),
            Err(ContentError::BadDefinition { .. })
        ));
    }
}
