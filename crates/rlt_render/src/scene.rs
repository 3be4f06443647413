//! Renderable scene: the indexed geometry and its light sources.

use std::sync::Arc;

use rlt_accel::{Octree, OctreeConfig};
use rlt_core::{Intersection, Mesh, MeshSet};
use rlt_math::{Aabb, Ray};

use crate::error::{RenderError, RenderResult};

#[derive(Debug)]
pub struct Scene {
    octree: Octree,
    emitters: Vec<Arc<Mesh>>,
}

impl Scene {
    /// Index `geometry` and collect its emitters.
    pub fn new(geometry: MeshSet, config: OctreeConfig) -> RenderResult<Self> {
        if geometry.is_empty() {
            return Err(RenderError::Load(rlt_core::LoadError::NoGeometry(
                "scene has no triangles".to_string(),
            )));
        }
        let emitters: Vec<Arc<Mesh>> = geometry.emitters().cloned().collect();
        if emitters.is_empty() {
            log::warn!("Scene has no emitters, only black images can be rendered");
        }

        let mut octree = Octree::new(config);
        octree.add_geometry(Arc::new(geometry))?;
        octree.build()?;

        log::info!(
            "Scene: {} triangles, {} emitters, bounds {:?}",
            octree.triangle_count(),
            emitters.len(),
            octree.bounding_box()
        );
        Ok(Self { octree, emitters })
    }

    #[inline]
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection<'_>> {
        self.octree.intersect(ray, false)
    }

    #[inline]
    pub fn occluded(&self, ray: &Ray) -> bool {
        self.octree.intersect_shadow(ray)
    }

    pub fn bounding_box(&self) -> Aabb {
        self.octree.bounding_box()
    }

    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    pub fn emitters(&self) -> &[Arc<Mesh>] {
        &self.emitters
    }

    /// Probability of picking any one emitter.
    pub fn emitter_pick_pdf(&self) -> f32 {
        if self.emitters.is_empty() {
            0.0
        } else {
            1.0 / self.emitters.len() as f32
        }
    }

    /// Pick an emitter uniformly, returning it with its selection probability.
    pub fn sample_emitter(&self, u: f32) -> Option<(&Mesh, f32)> {
        let n = self.emitters.len();
        if n == 0 {
            return None;
        }
        let i = ((u * n as f32) as usize).min(n - 1);
        Some((&self.emitters[i], 1.0 / n as f32))
    }
}
