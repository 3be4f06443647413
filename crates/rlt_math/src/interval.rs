/// A closed range `[min, max]` of ray parameters.
///
/// The slab test narrows a ray's `[mint, maxt]` to the span inside a box;
/// the octree orders children by the `min` of that span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// True if the interval contains no values.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// The overlap of two intervals (may be empty). A NaN bound in `other`
    /// leaves the matching bound of `self` unchanged.
    pub fn intersection(&self, other: &Interval) -> Interval {
        Interval::new(self.min.max(other.min), self.max.min(other.max))
    }
}
