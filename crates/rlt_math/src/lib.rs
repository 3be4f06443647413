//! Math types shared by the index, the guider and the renderer.
//!
//! Re-exports glam and adds the handful of geometric types the tracer
//! needs on top of it.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod frame;
mod interval;
mod ray;
pub mod warp;

pub use aabb::Aabb;
pub use frame::Frame;
pub use interval::Interval;
pub use ray::Ray;

/// Color type alias (linear RGB)
pub type Color = Vec3;

/// Offset used to keep secondary rays off the surface they start on and to
/// pad scene bounds.
pub const EPSILON: f32 = 1e-4;

pub const INV_PI: f32 = std::f32::consts::FRAC_1_PI;
pub const INV_TWO_PI: f32 = 0.5 * std::f32::consts::FRAC_1_PI;
