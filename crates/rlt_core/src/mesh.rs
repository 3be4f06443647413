//! Triangle mesh geometry.
//!
//! A mesh owns its vertex buffers plus the BSDF and (optional) emitter that
//! shade it. The octree never owns any of this: it stores triangle ids and
//! reads positions, normals and texcoords back through the mesh.

use std::fmt;
use std::sync::Arc;

use rlt_math::{warp, Aabb, Ray, Vec2, Vec3};

use crate::bsdf::{Bsdf, Diffuse};
use crate::emitter::Emitter;

/// A triangle mesh with its material binding.
#[derive(Clone)]
pub struct Mesh {
    /// Mesh name (from the OBJ object or the builder)
    pub name: String,

    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional, one per vertex)
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates (optional, one per vertex)
    pub uvs: Option<Vec<Vec2>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,

    bsdf: Arc<dyn Bsdf>,
    emitter: Option<Arc<dyn Emitter>>,

    /// Running sum of triangle areas, used for uniform surface sampling
    area_cdf: Vec<f32>,
}

/// A point sampled uniformly on the mesh surface.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceSample {
    pub p: Vec3,
    pub n: Vec3,
    /// Area density (1 / total area)
    pub pdf: f32,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    ///
    /// The mesh is shaded with a grey diffuse BSDF until `with_bsdf` is used.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Aabb::from_point_iter(positions.iter().copied());
        let area_cdf = Self::compute_area_cdf(&positions, &indices);
        Self {
            name: String::new(),
            positions,
            normals,
            uvs: None,
            indices,
            bounds,
            bsdf: Arc::new(Diffuse::new(Vec3::splat(0.5))),
            emitter: None,
            area_cdf,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    pub fn with_bsdf(mut self, bsdf: Arc<dyn Bsdf>) -> Self {
        self.bsdf = bsdf;
        self
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn Emitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    fn compute_area_cdf(positions: &[Vec3], indices: &[u32]) -> Vec<f32> {
        let mut total = 0.0;
        indices
            .chunks_exact(3)
            .map(|f| {
                let fetch = |i: u32| positions.get(i as usize).copied().unwrap_or(Vec3::ZERO);
                let (p0, p1, p2) = (fetch(f[0]), fetch(f[1]), fetch(f[2]));
                total += 0.5 * (p1 - p0).cross(p2 - p0).length();
                total
            })
            .collect()
    }

    pub fn bsdf(&self) -> &dyn Bsdf {
        self.bsdf.as_ref()
    }

    pub fn emitter(&self) -> Option<&dyn Emitter> {
        self.emitter.as_deref()
    }

    pub fn is_emitter(&self) -> bool {
        self.emitter.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Vertex indices of triangle `f`.
    #[inline]
    pub fn face(&self, f: u32) -> [usize; 3] {
        let base = f as usize * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Corner positions of triangle `f`.
    #[inline]
    pub fn triangle(&self, f: u32) -> [Vec3; 3] {
        let [i0, i1, i2] = self.face(f);
        [self.positions[i0], self.positions[i1], self.positions[i2]]
    }

    /// Bounding box of a single triangle.
    pub fn triangle_bounds(&self, f: u32) -> Aabb {
        let [p0, p1, p2] = self.triangle(f);
        Aabb::from_points(p0, p1).expand_to(p2)
    }

    pub fn total_area(&self) -> f32 {
        self.area_cdf.last().copied().unwrap_or(0.0)
    }

    /// Möller-Trumbore ray-triangle intersection.
    ///
    /// Returns the barycentric `(u, v)` of the hit (weights of the second and
    /// third vertex) and the ray parameter, if `t` lies within the ray extent.
    pub fn intersect_triangle(&self, f: u32, ray: &Ray) -> Option<(f32, f32, f32)> {
        let [p0, p1, p2] = self.triangle(f);
        let edge1 = p1 - p0;
        let edge2 = p2 - p0;

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-12 {
            return None;
        }

        let inv_a = 1.0 / a;
        let s = ray.origin - p0;
        let u = inv_a * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = inv_a * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = inv_a * edge2.dot(q);
        if t >= ray.mint && t <= ray.maxt {
            Some((u, v, t))
        } else {
            None
        }
    }

    /// Uniformly sample a point on the surface.
    ///
    /// `u.x` picks the triangle (area weighted) and is then reused, rescaled,
    /// as the first coordinate inside it.
    pub fn sample_position(&self, u: Vec2) -> Option<SurfaceSample> {
        let total = self.total_area();
        if total <= 0.0 {
            return None;
        }

        let target = u.x * total;
        let f = self
            .area_cdf
            .partition_point(|&c| c <= target)
            .min(self.area_cdf.len() - 1);
        let lo = if f == 0 { 0.0 } else { self.area_cdf[f - 1] };
        let width = self.area_cdf[f] - lo;
        let ux = if width > 0.0 {
            ((target - lo) / width).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let bary = warp::square_to_uniform_triangle(Vec2::new(ux, u.y));
        let [i0, i1, i2] = self.face(f as u32);
        let [p0, p1, p2] = self.triangle(f as u32);
        let w0 = 1.0 - bary.x - bary.y;
        let p = w0 * p0 + bary.x * p1 + bary.y * p2;

        let n = match &self.normals {
            Some(normals) => w0 * normals[i0] + bary.x * normals[i1] + bary.y * normals[i2],
            None => (p1 - p0).cross(p2 - p0),
        }
        .try_normalize()?;

        Some(SurfaceSample {
            p,
            n,
            pdf: 1.0 / total,
        })
    }
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("name", &self.name)
            .field("vertices", &self.vertex_count())
            .field("triangles", &self.triangle_count())
            .field("bounds", &self.bounds)
            .field("bsdf", &self.bsdf)
            .field("emitter", &self.emitter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> Mesh {
        let positions = vec![
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -1.0),
        ];
        Mesh::new(positions, vec![0, 1, 2], None)
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = single_triangle();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.normals.is_none());
        assert!(!mesh.is_emitter());
        assert!((mesh.total_area() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_triangle_hit() {
        let mesh = single_triangle();
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));

        let (u, v, t) = mesh.intersect_triangle(0, &ray).unwrap();
        assert!((t - 1.0).abs() < 0.001);
        assert!(u >= 0.0 && v >= 0.0 && u + v <= 1.0);
    }

    #[test]
    fn test_triangle_miss() {
        let mesh = single_triangle();

        // Ray pointing away
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0));
        assert!(mesh.intersect_triangle(0, &ray).is_none());

        // Hit lies beyond maxt
        let short = Ray::with_extent(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), 0.0, 0.5);
        assert!(mesh.intersect_triangle(0, &short).is_none());
    }

    #[test]
    fn test_triangle_bounds() {
        let mesh = Mesh::new(
            vec![
                Vec3::new(-1.0, -2.0, -3.0),
                Vec3::new(4.0, 5.0, 6.0),
                Vec3::new(0.0, 0.0, 0.0),
            ],
            vec![0, 1, 2],
            None,
        );

        let b = mesh.triangle_bounds(0);
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(b.max, Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(b, mesh.bounds);
    }

    #[test]
    fn test_sample_position_on_surface() {
        // Two triangles of different size forming an L
        let mesh = Mesh::new(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::Y,
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(4.0, 0.0, 0.0),
                Vec3::new(2.0, 2.0, 0.0),
            ],
            vec![0, 1, 2, 3, 4, 5],
            None,
        );

        for &(a, b) in &[(0.05, 0.5), (0.5, 0.1), (0.99, 0.9)] {
            let s = mesh.sample_position(Vec2::new(a, b)).unwrap();
            assert!(s.p.z.abs() < 1e-6);
            assert!((s.n - Vec3::Z).length() < 1e-5);
            assert!((s.pdf - 1.0 / 2.5).abs() < 1e-5);
        }
        // u.x above the first triangle's share (0.5 / 2.5) lands on the big one
        let s = mesh.sample_position(Vec2::new(0.5, 0.5)).unwrap();
        assert!(s.p.x >= 2.0);
    }
}
