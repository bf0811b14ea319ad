//! # Remote Entity Smoothing
//!
//! Remote entities only change position when a snapshot arrives, which is
//! far less often than we render. Each remote entity therefore keeps a
//! *display* position separate from its last authoritative position, and
//! every frame the display position decays exponentially toward the
//! authoritative one:
//!
//! ```text
//! display += (authoritative - display) * (1 - e^(-k * dt))
//! ```
//!
//! Deriving the blend factor from the frame delta makes catch-up speed
//! frame-rate independent: 30fps and 144fps clients see the same motion.
//! The approach is monotonic and never overshoots. When the gap exceeds
//! the snap threshold (teleports, world resets), smoothing would look like
//! flying across the arena, so the display position snaps instead.

use skirmish_shared::protocol::{EntityId, WorldSnapshot};
use skirmish_shared::{GameConfig, Vec2};
use std::collections::HashMap;

/// Per-entity smoothed display positions.
#[derive(Clone, Debug, Default)]
pub struct RemoteSmoother {
    displays: HashMap<EntityId, Vec2>,
}

impl RemoteSmoother {
    /// Creates an empty smoother.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconciles tracked entities with a freshly arrived snapshot.
    ///
    /// Entities no longer present are forgotten; newly seen entities start
    /// displayed exactly at their authoritative position (nothing to smooth
    /// from). `local` is the client's own avatar, which is predicted, not
    /// smoothed.
    pub fn apply_snapshot(&mut self, snapshot: &WorldSnapshot, local: Option<EntityId>) {
        self.displays.retain(|id, _| snapshot.entities.contains_key(id));
        for (id, entity) in &snapshot.entities {
            if Some(*id) == local {
                continue;
            }
            self.displays.entry(*id).or_insert(entity.pos);
        }
    }

    /// Advances every display position one frame toward its authoritative
    /// position from the latest snapshot.
    pub fn advance(&mut self, snapshot: &WorldSnapshot, dt: f32, config: &GameConfig) {
        let blend = 1.0 - (-config.smoothing_rate * dt).exp();
        for (id, display) in &mut self.displays {
            let Some(entity) = snapshot.entities.get(id) else {
                continue;
            };
            let gap = entity.pos - *display;
            if gap.length() > config.snap_threshold {
                *display = entity.pos;
            } else {
                *display += gap * blend;
            }
        }
    }

    /// The smoothed display position for an entity, if tracked.
    #[must_use]
    pub fn display(&self, id: EntityId) -> Option<Vec2> {
        self.displays.get(&id).copied()
    }

    /// Number of tracked entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.displays.len()
    }

    /// True when nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }
}
