//! Surface hit records.

use rlt_math::{Color, Frame, Ray, Vec2, Vec3};

use crate::bsdf::Bsdf;
use crate::mesh::Mesh;

/// Record of a ray-triangle hit, resolved against the owning mesh.
#[derive(Clone, Copy)]
pub struct Intersection<'a> {
    /// Point of intersection
    pub p: Vec3,
    /// Ray parameter of the hit
    pub t: f32,
    /// Texture coordinates if the mesh has them, else barycentric (u, v)
    pub uv: Vec2,
    /// Frame built from the face normal
    pub geo_frame: Frame,
    /// Frame built from interpolated vertex normals (equal to geo_frame without normals)
    pub sh_frame: Frame,
    /// Mesh owning the triangle
    pub mesh: &'a Mesh,
    /// Triangle index within `mesh`
    pub triangle: u32,
    /// Triangle index within the aggregated triangle set
    pub prim: u32,
}

impl<'a> Intersection<'a> {
    /// Fill in the surface description of a hit on triangle `f` of `mesh`
    /// with barycentric `(u, v)` at ray parameter `t`.
    pub fn resolve(mesh: &'a Mesh, f: u32, prim: u32, u: f32, v: f32, t: f32) -> Self {
        let bary = Vec3::new(1.0 - u - v, u, v);
        let [i0, i1, i2] = mesh.face(f);
        let [p0, p1, p2] = mesh.triangle(f);

        // Recompute the position from barycentrics rather than origin + t*d
        let p = bary.x * p0 + bary.y * p1 + bary.z * p2;

        let uv = match &mesh.uvs {
            Some(uvs) => bary.x * uvs[i0] + bary.y * uvs[i1] + bary.z * uvs[i2],
            None => Vec2::new(u, v),
        };

        let geo_n = (p1 - p0).cross(p2 - p0).try_normalize().unwrap_or(Vec3::Z);
        let geo_frame = Frame::from_normal(geo_n);

        let sh_frame = mesh
            .normals
            .as_ref()
            .and_then(|n| (bary.x * n[i0] + bary.y * n[i1] + bary.z * n[i2]).try_normalize())
            .map(Frame::from_normal)
            .unwrap_or(geo_frame);

        Self {
            p,
            t,
            uv,
            geo_frame,
            sh_frame,
            mesh,
            triangle: f,
            prim,
        }
    }

    /// Bare record of an occluding hit: position from the ray, barycentric
    /// `uv`, and default frames. No mesh attributes are interpolated.
    pub fn occluder(mesh: &'a Mesh, f: u32, prim: u32, u: f32, v: f32, ray: &Ray, t: f32) -> Self {
        Self {
            p: ray.at(t),
            t,
            uv: Vec2::new(u, v),
            geo_frame: Frame::default(),
            sh_frame: Frame::default(),
            mesh,
            triangle: f,
            prim,
        }
    }

    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        self.sh_frame.to_local(v)
    }

    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.sh_frame.to_world(v)
    }

    pub fn bsdf(&self) -> &'a dyn Bsdf {
        self.mesh.bsdf()
    }

    pub fn is_emitter(&self) -> bool {
        self.mesh.is_emitter()
    }

    /// Radiance emitted from the hit towards `towards` (world space, pointing
    /// away from the surface).
    pub fn emitted(&self, towards: Vec3) -> Color {
        match self.mesh.emitter() {
            Some(emitter) => emitter.radiance(self.p, self.to_local(towards)),
            None => Color::ZERO,
        }
    }

    /// A ray leaving the surface in world direction `d`.
    pub fn spawn_ray(&self, d: Vec3) -> Ray {
        Ray::new(self.p, d)
    }
}

impl std::fmt::Debug for Intersection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Intersection")
            .field("p", &self.p)
            .field("t", &self.t)
            .field("uv", &self.uv)
            .field("n", &self.sh_frame.n)
            .field("mesh", &self.mesh.name)
            .field("triangle", &self.triangle)
            .finish()
    }
}
