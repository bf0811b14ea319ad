//! # SKIRMISH Shared - Common Types for Client & Server
//!
//! Everything both sides of the wire must agree on:
//!
//! - **Math**: 2D vectors and world bounds
//! - **Config**: the immutable tunable set, synced to clients on connect
//! - **Content**: entity definitions and behavior scripts, validated at load
//! - **Protocol**: JSON message envelopes and the world snapshot
//!
//! This crate does no I/O. Sockets, files, and clocks live in the server
//! and client crates.

pub mod config;
pub mod content;
pub mod math;
pub mod protocol;

// Re-exports for convenience
pub use config::GameConfig;
pub use content::{Action, Behavior, ContentError, ContentPack, EntityDef, Target, VisualDescriptor, VisualKind};
pub use math::{Bounds, Vec2};
pub use protocol::{
    ClientMessage, EntityId, EntityPatch, EntityState, ServerMessage, WorldSnapshot,
    CHAT_BUBBLE_SECS, DEFAULT_ENTITY_RADIUS, PLAYER_TYPE,
};
