//! Game configuration.
//!
//! A [`GameConfig`] is an immutable value: the server constructs one at
//! startup (defaults, optionally overridden by a `config.json` document),
//! hands copies to the scheduler, the stores, and every connecting client,
//! and replaces it wholesale when an admin edit or a file reload produces a
//! new snapshot. Nothing mutates a config in place.

use crate::math::{Bounds, Vec2};
use serde::{Deserialize, Serialize};

/// Tunable parameters shared by server and client.
///
/// Every field has a serde default so partial config documents work: an
/// operator can override just `tick_rate` and keep the rest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    /// TCP port the server listens on.
    pub server_port: u16,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// World width in world units.
    pub world_width: f32,
    /// World height in world units.
    pub world_height: f32,
    /// Player movement speed (units per second).
    pub player_speed: f32,
    /// Player avatar radius.
    pub player_size: f32,
    /// Background grid cell size (client rendering hint).
    pub grid_size: f32,
    /// Background color (client rendering hint).
    pub background_color: String,
    /// Grid line color (client rendering hint).
    pub grid_color: String,
    /// Client smoothing rate `k` for remote entities (per second).
    pub smoothing_rate: f32,
    /// Distance beyond which the client snaps instead of smoothing.
    pub snap_threshold: f32,
    /// Global simulation speed multiplier (1.0 = real time).
    pub world_speed: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            tick_rate: 120,
            world_width: 800.0,
            world_height: 600.0,
            player_speed: 400.0,
            player_size: 30.0,
            grid_size: 50.0,
            background_color: "#ffffff".to_owned(),
            grid_color: "#eee".to_owned(),
            smoothing_rate: 6.0,
            snap_threshold: 100.0,
            world_speed: 1.0,
        }
    }
}

impl GameConfig {
    /// Full world extent: `[0, width] x [0, height]`.
    ///
    /// Scripted entities clamp and wrap against this region.
    #[must_use]
    pub fn world_rect(&self) -> Bounds {
        Bounds::new(Vec2::ZERO, Vec2::new(self.world_width, self.world_height))
    }

    /// World extent inset by the player radius on every edge.
    ///
    /// Player avatars spawn and move inside this region so they never
    /// protrude past the world edge.
    #[must_use]
    pub fn player_bounds(&self) -> Bounds {
        Bounds::new(
            Vec2::new(self.player_size, self.player_size),
            Vec2::new(self.world_width - self.player_size, self.world_height - self.player_size),
        )
    }

    /// Duration of one tick in seconds, before the speed multiplier.
    #[must_use]
    pub fn tick_interval_secs(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Returns a new config snapshot with a different world speed.
    #[must_use]
    pub fn with_world_speed(&self, multiplier: f32) -> Self {
        Self { world_speed: multiplier, ..self.clone() }
    }
}
