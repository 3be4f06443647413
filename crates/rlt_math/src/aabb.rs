use crate::{Interval, Ray, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box given by its min and max corners.
///
/// Boxes are closed: a point on a face is inside, and two boxes that only
/// share a face overlap. The octree relies on this when it replicates a
/// triangle lying on a split plane into both neighbouring octants.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from its corners. The caller guarantees `min <= max`.
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from two arbitrary corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Smallest box holding every point of the iterator (EMPTY if none).
    pub fn from_point_iter(points: impl IntoIterator<Item = Vec3>) -> Self {
        points
            .into_iter()
            .fold(Aabb::EMPTY, |acc, p| acc.expand_to(p))
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            min: box0.min.min(box1.min),
            max: box0.max.max(box1.max),
        }
    }

    /// Grow the box so it also contains `p`.
    pub fn expand_to(&self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Closed box overlap; boxes that share only a face still overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// One of the eight octants obtained by splitting at the box midpoint.
    ///
    /// Bit `k` of `index` selects the upper half along axis `k`.
    pub fn octant(&self, index: usize) -> Aabb {
        debug_assert!(index < 8);
        let mid = self.centroid();
        let mut min = self.min;
        let mut max = self.max;
        for axis in 0..3 {
            if index & (1 << axis) != 0 {
                min[axis] = mid[axis];
            } else {
                max[axis] = mid[axis];
            }
        }
        Aabb { min, max }
    }

    /// Slab test against the ray's current `[mint, maxt]`.
    ///
    /// Returns the parameter range in which the ray is inside the box, or
    /// `None` if it misses.
    pub fn ray_intersect(&self, ray: &Ray) -> Option<Interval> {
        let mut ray_t = ray.extent();

        for axis in 0..3 {
            let adinv = 1.0 / ray.direction[axis];
            let mut t0 = (self.min[axis] - ray.origin[axis]) * adinv;
            let mut t1 = (self.max[axis] - ray.origin[axis]) * adinv;
            if adinv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            // f32::max/min drop NaN (0 * inf on a slab face), keeping the old bound
            ray_t = ray_t.intersection(&Interval::new(t0, t1));
            if ray_t.is_empty() {
                return None;
            }
        }

        Some(ray_t)
    }

    /// Test if a ray intersects this AABB.
    pub fn hit(&self, ray: &Ray) -> bool {
        self.ray_intersect(ray).is_some()
    }

    /// Static constants
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}
