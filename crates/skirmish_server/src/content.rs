//! # Content Store
//!
//! Entity definitions keyed by type name.
//!
//! ## Design
//!
//! - Merging is last-writer-wins: an uploaded pack overwrites same-named
//!   definitions, no versioning, no rollback
//! - Definitions are immutable during a tick; edits land between ticks
//! - Removing or replacing a definition never destroys live instances,
//!   it only changes which scripts they run from now on

use skirmish_shared::content::{Action, Behavior, ContentPack, EntityDef};
use skirmish_shared::Vec2;
use std::collections::BTreeMap;

/// Holds every loaded entity definition.
#[derive(Clone, Debug, Default)]
pub struct ContentStore {
    definitions: BTreeMap<String, EntityDef>,
}

impl ContentStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { definitions: BTreeMap::new() }
    }

    /// Creates a store pre-loaded with the built-in pack.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store.load_pack(Self::default_pack());
        store
    }

    /// The pack every server starts with: a wandering blob and a runner
    /// that sweeps across the world.
    #[must_use]
    pub fn default_pack() -> ContentPack {
        let mut definitions = BTreeMap::new();
        definitions.insert(
            "blob".to_owned(),
            EntityDef {
                type_name: "blob".to_owned(),
                color: "red".to_owned(),
                radius: 15.0,
                health: None,
                behavior: Some(Behavior {
                    on_tick: vec![Action::RandomWalk { speed: 100.0 }],
                    ..Behavior::default()
                }),
                visual: None,
            },
        );
        definitions.insert(
            "runner".to_owned(),
            EntityDef {
                type_name: "runner".to_owned(),
                color: "cyan".to_owned(),
                radius: 10.0,
                health: None,
                behavior: Some(Behavior {
                    on_tick: vec![Action::MoveDir { speed: 200.0, dir: Vec2::X }],
                    ..Behavior::default()
                }),
                visual: None,
            },
        );
        ContentPack { definitions }
    }

    /// Merges a pack into the store, overwriting same-named definitions.
    pub fn load_pack(&mut self, pack: ContentPack) {
        for (key, def) in pack.definitions {
            tracing::info!(definition = %key, "loaded definition");
            self.definitions.insert(key, def);
        }
    }

    /// Creates or replaces a single definition.
    pub fn upsert(&mut self, key: String, def: EntityDef) {
        tracing::info!(definition = %key, "definition updated");
        self.definitions.insert(key, def);
    }

    /// Looks up a definition by type name.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&EntityDef> {
        self.definitions.get(type_name)
    }

    /// The `onTick` script for a type, if both definition and script exist.
    #[must_use]
    pub fn on_tick(&self, type_name: &str) -> Option<&[Action]> {
        self.script(type_name, |b| &b.on_tick)
    }

    /// The `onCollision` script for a type, if both definition and script exist.
    #[must_use]
    pub fn on_collision(&self, type_name: &str) -> Option<&[Action]> {
        self.script(type_name, |b| &b.on_collision)
    }

    /// The `onSpawn` script for a type, if both definition and script exist.
    #[must_use]
    pub fn on_spawn(&self, type_name: &str) -> Option<&[Action]> {
        self.script(type_name, |b| &b.on_spawn)
    }

    fn script(
        &self,
        type_name: &str,
        pick: impl Fn(&Behavior) -> &Vec<Action>,
    ) -> Option<&[Action]> {
        let behavior = self.definitions.get(type_name)?.behavior.as_ref()?;
        let actions = pick(behavior);
        if actions.is_empty() {
            None
        } else {
            Some(actions.as_slice())
        }
    }

    /// All loaded definitions.
    #[must_use]
    pub const fn definitions(&self) -> &BTreeMap<String, EntityDef> {
        &self.definitions
    }

    /// Number of loaded definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True when no definitions are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
