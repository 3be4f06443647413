//! Uniform spatial grid over the scene and direction binning.

use rlt_math::{warp, Aabb, Vec3, EPSILON, INV_TWO_PI};

use crate::config::MAX_SCENE_RESOLUTION;

/// Regular `resolution^3` grid of spatial cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialGrid {
    bounds: Aabb,
    resolution: u32,
    cell_size: Vec3,
}

impl SpatialGrid {
    /// Grid over the scene box, with the max corner pushed out by `EPSILON`
    /// so points on the max faces land inside the last cell.
    pub fn new(scene_bounds: Aabb, resolution: u32) -> Self {
        let bounds = Aabb::new(scene_bounds.min, scene_bounds.max + Vec3::splat(EPSILON));
        Self::from_expanded(bounds, resolution)
    }

    /// Grid over a box that is already expanded (e.g. read back from a table).
    ///
    /// The resolution is clamped to `[1, MAX_SCENE_RESOLUTION]`.
    pub fn from_expanded(bounds: Aabb, resolution: u32) -> Self {
        let resolution = resolution.clamp(1, MAX_SCENE_RESOLUTION);
        Self {
            bounds,
            resolution,
            cell_size: bounds.extent() / resolution as f32,
        }
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Flattened index `(x * R + y) * R + z` of the cell holding `p`. Points
    /// outside the grid clamp to the nearest border cell.
    pub fn cell_index(&self, p: Vec3) -> u32 {
        let r = self.resolution;
        let rel = (p - self.bounds.min) / self.cell_size;
        // `as` saturates: negatives and NaN become 0
        let axis = |v: f32| (v as u32).min(r - 1) as u64;
        let (x, y, z) = (axis(rel.x), axis(rel.y), axis(rel.z));
        let r = r as u64;
        // Below R^3 <= i32::MAX by the resolution clamp
        ((x * r + y) * r + z) as u32
    }

    pub fn cell_count(&self) -> u32 {
        (self.resolution as u64).pow(3) as u32
    }
}

/// Bin of a local hemisphere direction on an `r x r` grid over
/// `(cos theta, phi / 2pi)`.
///
/// Directions below the tangent plane fold onto their mirror image, so
/// transmitted directions still address a valid bin.
#[inline]
pub fn hemisphere_bin(d: Vec3, r: usize) -> (usize, usize) {
    let x = d.z.abs().min(1.0 - 1e-6);
    let y = if x < 1.0 - 1e-6 {
        warp::spherical_phi(d) * INV_TWO_PI
    } else {
        0.0
    };
    (to_bin(x, r), to_bin(y, r))
}

/// Bin of a direction on the `2r x r` sphere grid over
/// `((z + 1) / 2, phi / 2pi)`.
#[inline]
pub fn sphere_bin(d: Vec3, r: usize) -> (usize, usize) {
    let x = 0.5 * (d.z + 1.0);
    let y = if d.z.abs() < 1.0 - 1e-6 {
        warp::spherical_phi(d) * INV_TWO_PI
    } else {
        0.0
    };
    (to_bin(x, 2 * r), to_bin(y, r))
}

#[inline]
fn to_bin(x: f32, n: usize) -> usize {
    if x.is_nan() {
        return 0;
    }
    ((x * n as f32) as usize).min(n - 1)
}
