//! Mathematical types shared between client and server.
//!
//! These are the canonical representations used in the wire protocol.

use serde::{Deserialize, Serialize};

/// 2D vector - positions, directions, displacements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vec2 {
    /// Creates a new Vec2
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Unit X vector
    pub const X: Self = Self::new(1.0, 0.0);

    /// Unit Y vector
    pub const Y: Self = Self::new(0.0, 1.0);

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Distance squared (avoids sqrt)
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        (self - other).length_squared()
    }

    /// Unit vector in the same direction, or zero for degenerate input.
    #[must_use]
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len > f32::EPSILON {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::ZERO
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangular region of the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner.
    pub min: Vec2,
    /// Maximum corner.
    pub max: Vec2,
}

impl Bounds {
    /// Creates bounds from corner coordinates.
    #[must_use]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Clamps a point onto the region on both axes.
    #[must_use]
    pub fn clamp(self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(self.min.x, self.max.x), p.y.clamp(self.min.y, self.max.y))
    }

    /// Wraps a point that crossed an edge to the opposite edge.
    ///
    /// A point strictly past `max` lands on `min` and vice versa; points on
    /// the boundary itself are left alone.
    #[must_use]
    pub fn wrap(self, p: Vec2) -> Vec2 {
        let mut out = p;
        if out.x > self.max.x {
            out.x = self.min.x;
        } else if out.x < self.min.x {
            out.x = self.max.x;
        }
        if out.y > self.max.y {
            out.y = self.min.y;
        } else if out.y < self.min.y {
            out.y = self.max.y;
        }
        out
    }

    /// Returns true when the point lies within the region on both axes.
    #[must_use]
    pub fn contains(self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_operations() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(4.0, 6.0);

        let sum = a + b;
        assert_eq!(sum.x, 5.0);
        assert_eq!(sum.y, 8.0);

        assert_eq!(a.dot(b), 16.0); // 1*4 + 2*6
        assert_eq!(a.distance(b), 5.0); // 3-4-5 triangle
    }

    #[test]
    fn test_normalize_degenerate() {
        assert_eq!(Vec2::ZERO.normalize_or_zero(), Vec2::ZERO);

        let unit = Vec2::new(3.0, 4.0).normalize_or_zero();
        assert!((unit.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_clamp() {
        let bounds = Bounds::new(Vec2::ZERO, Vec2::new(800.0, 600.0));
        let clamped = bounds.clamp(Vec2::new(-5.0, 700.0));
        assert_eq!(clamped, Vec2::new(0.0, 600.0));
    }

    #[test]
    fn test_bounds_wrap_crosses_to_opposite_edge() {
        let bounds = Bounds::new(Vec2::ZERO, Vec2::new(800.0, 600.0));

        // Past the right edge lands on the left edge, not the right.
        let wrapped = bounds.wrap(Vec2::new(800.0 + f32::EPSILON * 800.0, 300.0));
        assert_eq!(wrapped.x, 0.0);

        // Exactly on the edge is untouched.
        let on_edge = bounds.wrap(Vec2::new(800.0, 300.0));
        assert_eq!(on_edge.x, 800.0);

        let wrapped_neg = bounds.wrap(Vec2::new(-1.0, -1.0));
        assert_eq!(wrapped_neg, Vec2::new(800.0, 600.0));
    }
}
