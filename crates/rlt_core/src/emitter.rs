//! Light sources attached to meshes.

use std::fmt::Debug;

use rlt_math::{Color, Frame, Vec2, Vec3};

use crate::mesh::Mesh;

/// A point sampled on an emitter as seen from a reference point.
#[derive(Debug, Clone, Copy)]
pub struct EmitterSample {
    pub p: Vec3,
    pub n: Vec3,
    /// Emitted radiance towards the reference point
    pub radiance: Color,
    /// Area density of `p`
    pub pdf: f32,
}

pub trait Emitter: Send + Sync + Debug {
    /// Radiance leaving point `p` along `wi`, given in the local frame of the
    /// emitting surface (towards the observer).
    fn radiance(&self, p: Vec3, wi: Vec3) -> Color;

    /// Area density with which `sample` produces `p`.
    fn pdf(&self, mesh: &Mesh, p: Vec3) -> f32;

    /// Sample a point on the emitter for direct illumination of `reference`.
    fn sample(&self, mesh: &Mesh, reference: Vec3, u: Vec2) -> Option<EmitterSample>;
}

/// One-sided diffuse area light with constant radiance.
#[derive(Debug, Clone)]
pub struct AreaLight {
    radiance: Color,
}

impl AreaLight {
    pub fn new(radiance: Color) -> Self {
        Self { radiance }
    }
}

impl Emitter for AreaLight {
    fn radiance(&self, _p: Vec3, wi: Vec3) -> Color {
        if Frame::cos_theta(wi) > 0.0 {
            self.radiance
        } else {
            Color::ZERO
        }
    }

    fn pdf(&self, mesh: &Mesh, _p: Vec3) -> f32 {
        let area = mesh.total_area();
        if area > 0.0 {
            1.0 / area
        } else {
            0.0
        }
    }

    fn sample(&self, mesh: &Mesh, reference: Vec3, u: Vec2) -> Option<EmitterSample> {
        let s = mesh.sample_position(u)?;
        let towards = reference - s.p;
        let radiance = if towards.dot(s.n) > 0.0 {
            self.radiance
        } else {
            Color::ZERO
        };
        Some(EmitterSample {
            p: s.p,
            n: s.n,
            radiance,
            pdf: s.pdf,
        })
    }
}
