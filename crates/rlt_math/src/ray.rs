use crate::{Interval, Vec3, EPSILON};

/// A ray segment in 3D space.
///
/// Rays are the unit of every index query: a line starting at `origin`
/// traveling along `direction`, restricted to parameters in `[mint, maxt]`.
/// Nearest-hit queries shrink `maxt` on a private copy as closer hits are
/// found.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub mint: f32,
    pub maxt: f32,
}

impl Ray {
    /// Create a ray spanning `[EPSILON, inf)`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self::with_extent(origin, direction, EPSILON, f32::INFINITY)
    }

    /// Create a ray restricted to `[mint, maxt]`.
    pub fn with_extent(origin: Vec3, direction: Vec3, mint: f32, maxt: f32) -> Self {
        Self {
            origin,
            direction,
            mint,
            maxt,
        }
    }

    /// A shadow-style segment from `from` towards `to`, stopping just short
    /// of the target so the target surface itself does not count as a hit.
    pub fn between(from: Vec3, to: Vec3) -> Self {
        Self::with_extent(from, to - from, EPSILON, 1.0 - EPSILON)
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// The parameter range as an interval.
    #[inline]
    pub fn extent(&self) -> Interval {
        Interval::new(self.mint, self.maxt)
    }
}
