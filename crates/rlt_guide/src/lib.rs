//! RLT Guide - Learned directional sampling for path guiding.
//!
//! The scene box is divided into a uniform grid of spatial cells. Each cell
//! owns a histogram over directions which is learned online from the light
//! transport the renderer observes: every `update` blends a one-step
//! estimate of the radiance arriving along a path segment into the bin of
//! the direction that was taken. `sample` then draws directions in
//! proportion to the learned weights.
//!
//! Two variants are provided:
//!
//! - [`QTableGuider`]: a hemisphere histogram per cell in the local shading
//!   frame, sampled with a two-level range tree in O(log n).
//! - [`SphereGuider`]: one sphere histogram per cell shared by all surface
//!   normals through a precomputed hemisphere map, sampled with linear scans.
//!
//! All methods except `init` take `&self` and may be called concurrently
//! from any number of render threads.

mod config;
mod engine;
mod error;
mod flat_table;
mod grid;
mod lifecycle;
mod persist;
mod qtable;
mod range_tree;
mod sphere;
mod storage;
mod table;

pub use config::{
    GuiderConfig, GuiderKind, LearningRate, MAX_ANGLE_RESOLUTION, MAX_SCENE_RESOLUTION,
};
pub use error::{GuideError, GuideResult};
pub use flat_table::FlatTable;
pub use grid::{hemisphere_bin, sphere_bin, SpatialGrid};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use persist::{read_table, write_table, TableRecord};
pub use qtable::QTableGuider;
pub use range_tree::RangeTree;
pub use sphere::SphereGuider;
pub use storage::{CellRecord, CellStore};
pub use table::{DirectionalTable, TableSample};

use rlt_core::{Intersection, Sampler};
use rlt_math::{Aabb, Frame, Vec2, Vec3};

/// A direction drawn from a guider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionSample {
    /// Unit direction in the local coordinates of the frame passed to `sample`
    pub direction: Vec3,
    /// Solid-angle density
    pub pdf: f32,
}

/// Online learned directional distribution over the scene.
pub trait Guider: Send + Sync {
    /// Fix the spatial grid over `scene_bounds` (or the imported table's
    /// bounds) and start accepting queries.
    ///
    /// # Panics
    ///
    /// If called more than once.
    fn init(&mut self, scene_bounds: &Aabb) -> GuideResult<()>;

    /// Draw a direction at `p` in the hemisphere around `frame.n`.
    fn sample(&self, u: Vec2, p: Vec3, frame: &Frame) -> DirectionSample;

    /// Learn from the path segment `origin -> dest`.
    fn update(&self, origin: &Intersection, dest: &Intersection, sampler: &mut dyn Sampler);

    /// Density with which `sample` would produce `wo` (local to `frame`).
    fn pdf(&self, wo: Vec3, p: Vec3, frame: &Frame) -> f32;

    /// Stop learning and export the table if configured.
    fn done(&self) -> GuideResult<()>;

    fn lifecycle(&self) -> LifecycleState;

    /// Number of spatial cells created so far.
    fn cell_count(&self) -> usize;
}

/// Construct the guider variant selected by `kind`.
pub fn create_guider(kind: GuiderKind, config: GuiderConfig) -> GuideResult<Box<dyn Guider>> {
    Ok(match kind {
        GuiderKind::QTable => Box::new(QTableGuider::new(config)?),
        GuiderKind::Sphere => Box::new(SphereGuider::new(config)?),
    })
}
