//! # Local Player Prediction
//!
//! The controlled avatar's position is computed entirely client-side, at
//! render rate, from directional input. The server accepts what we report
//! (client-authoritative), so there is no reconciliation against server
//! positions for the local avatar - only bounds clamping and local
//! circle-circle resolution against everything else we know about.

use skirmish_shared::{GameConfig, Vec2};

/// Directional input sampled each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    /// Moving up (negative y).
    pub up: bool,
    /// Moving down (positive y).
    pub down: bool,
    /// Moving left (negative x).
    pub left: bool,
    /// Moving right (positive x).
    pub right: bool,
}

impl InputState {
    /// Unit direction for this input, zero when idle or cancelled out.
    ///
    /// Diagonals are normalized so they are no faster than straight lines.
    #[must_use]
    pub fn direction(self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.up {
            dir.y -= 1.0;
        }
        if self.down {
            dir.y += 1.0;
        }
        if self.left {
            dir.x -= 1.0;
        }
        if self.right {
            dir.x += 1.0;
        }
        dir.normalize_or_zero()
    }
}

/// The locally simulated avatar.
#[derive(Clone, Copy, Debug)]
pub struct LocalAvatar {
    pos: Vec2,
}

impl LocalAvatar {
    /// Creates an avatar at the given position.
    #[must_use]
    pub const fn new(pos: Vec2) -> Self {
        Self { pos }
    }

    /// Current predicted position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.pos
    }

    /// Overwrites the position (initial placement from the first snapshot).
    pub fn place(&mut self, pos: Vec2) {
        self.pos = pos;
    }

    /// Advances one render frame.
    ///
    /// Input drives the move, the result is clamped to the margin-inset
    /// world, then pushed out of any overlap with the known entities in
    /// `obstacles` (center, radius pairs).
    pub fn step(&mut self, input: InputState, dt: f32, config: &GameConfig, obstacles: &[(Vec2, f32)]) {
        self.pos += input.direction() * (config.player_speed * dt);
        self.pos = config.player_bounds().clamp(self.pos);

        for &(center, radius) in obstacles {
            let reach = radius + config.player_size;
            let delta = self.pos - center;
            let dist_sq = delta.length_squared();
            if dist_sq < reach * reach {
                let dir = if dist_sq > f32::EPSILON {
                    delta.normalize_or_zero()
                } else {
                    // Dead center overlap has no separating axis; pick one.
                    Vec2::X
                };
                self.pos = center + dir * reach;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RIGHT: InputState = InputState { up: false, down: false, left: false, right: true };

    #[test]
    fn test_direction_normalizes_diagonals() {
        let diagonal = InputState { up: true, right: true, ..InputState::default() };
        assert!((diagonal.direction().length() - 1.0).abs() < 1e-6);

        let cancelled = InputState { left: true, right: true, ..InputState::default() };
        assert_eq!(cancelled.direction(), Vec2::ZERO);
    }

    #[test]
    fn test_step_moves_at_player_speed() {
        let config = GameConfig::default();
        let mut avatar = LocalAvatar::new(Vec2::new(400.0, 300.0));

        avatar.step(RIGHT, 0.1, &config, &[]);
        assert!((avatar.position().x - 440.0).abs() < 1e-4);
        assert_eq!(avatar.position().y, 300.0);
    }

    #[test]
    fn test_step_clamps_to_inset_bounds() {
        let config = GameConfig::default();
        let mut avatar = LocalAvatar::new(Vec2::new(760.0, 300.0));

        for _ in 0..20 {
            avatar.step(RIGHT, 0.1, &config, &[]);
        }
        // 800 wide world, 30 player size: never past 770.
        assert_eq!(avatar.position().x, 770.0);
    }

    #[test]
    fn test_overlap_pushes_out_to_touching() {
        let config = GameConfig::default();
        let mut avatar = LocalAvatar::new(Vec2::new(400.0, 300.0));
        let obstacle = (Vec2::new(430.0, 300.0), 15.0);

        // Walking right into the obstacle; resolution holds us at the rim.
        avatar.step(RIGHT, 0.05, &config, &[obstacle]);
        let gap = avatar.position().distance(obstacle.0);
        assert!((gap - (15.0 + config.player_size)).abs() < 1e-3);
        assert!(avatar.position().x < 430.0 - 15.0);
    }

    #[test]
    fn test_idle_input_is_stationary() {
        let config = GameConfig::default();
        let mut avatar = LocalAvatar::new(Vec2::new(123.0, 456.0));
        avatar.step(InputState::default(), 0.1, &config, &[]);
        assert_eq!(avatar.position(), Vec2::new(123.0, 456.0));
    }
}
