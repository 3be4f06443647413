//! Octree over an aggregated triangle set.
//!
//! Nodes live in a flat arena addressed by `NodeId`; the root is node 0.
//! Once built the tree is immutable, so `intersect` takes `&self` and can be
//! called from any number of render threads.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rlt_core::{Intersection, MeshSet};
use rlt_math::{Aabb, Ray};
use smallvec::SmallVec;

use crate::config::OctreeConfig;
use crate::construct::{BuildStats, Builder};
use crate::error::AccelError;
use crate::node::{Node, NodeId};

/// Closest hit found so far during traversal.
#[derive(Debug, Clone, Copy)]
struct Hit {
    prim: u32,
    u: f32,
    v: f32,
    t: f32,
}

/// Octree acceleration structure.
#[derive(Debug, Default)]
pub struct Octree {
    config: OctreeConfig,
    geometry: Option<Arc<MeshSet>>,
    nodes: Vec<Node>,
    bounds: Aabb,
    stats: BuildStats,
    built: bool,
}

impl Octree {
    pub fn new(config: OctreeConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Register the triangle set to index. Only one set can be registered.
    pub fn add_geometry(&mut self, geometry: Arc<MeshSet>) -> Result<(), AccelError> {
        if self.geometry.is_some() {
            return Err(AccelError::GeometryAlreadyRegistered);
        }
        self.bounds = geometry.bounding_box();
        self.geometry = Some(geometry);
        Ok(())
    }

    /// Build the tree over the registered geometry.
    pub fn build(&mut self) -> Result<(), AccelError> {
        if self.built {
            return Err(AccelError::AlreadyBuilt);
        }
        let geometry = self.geometry.clone().ok_or(AccelError::NoGeometry)?;

        let start = Instant::now();
        let triangle_bounds: Vec<Aabb> = (0..geometry.triangle_count())
            .into_par_iter()
            .map(|prim| geometry.triangle_bounds(prim))
            .collect();

        let builder = Builder {
            config: &self.config,
            triangle_bounds: &triangle_bounds,
            stats: &self.stats,
        };
        let all: Vec<u32> = (0..geometry.triangle_count()).collect();
        self.nodes = builder.build(self.bounds, all, 0);
        self.built = true;

        log::info!(
            "Octree: {} triangles -> {} interior nodes, {} leaves (avg {:.2} triangles/leaf) in {:.2?}",
            geometry.triangle_count(),
            self.interior_count(),
            self.leaf_count(),
            self.average_leaf_size(),
            start.elapsed()
        );
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Bounding box of the registered geometry.
    pub fn bounding_box(&self) -> Aabb {
        self.bounds
    }

    pub fn geometry(&self) -> Option<&Arc<MeshSet>> {
        self.geometry.as_ref()
    }

    pub fn triangle_count(&self) -> u32 {
        self.geometry.as_ref().map_or(0, |g| g.triangle_count())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn interior_count(&self) -> usize {
        self.stats.interior.load(Ordering::Relaxed)
    }

    pub fn leaf_count(&self) -> usize {
        self.stats.leaves.load(Ordering::Relaxed)
    }

    /// Sum of the triangle counts of all leaves (replicas counted once per leaf).
    pub fn leaf_triangle_total(&self) -> usize {
        self.stats.leaf_triangles.load(Ordering::Relaxed)
    }

    pub fn average_leaf_size(&self) -> f32 {
        match self.leaf_count() {
            0 => 0.0,
            n => self.leaf_triangle_total() as f32 / n as f32,
        }
    }

    /// Root handle, once built.
    pub fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId(0))
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Trace `ray` against the indexed triangles.
    ///
    /// With `shadow` set the search stops at the first hit found, which is
    /// not necessarily the closest one, and the hit is returned as a bare
    /// [`Intersection::occluder`] without shading data. Returns `None` on a
    /// miss or when the tree has not been built.
    pub fn intersect(&self, ray: &Ray, shadow: bool) -> Option<Intersection<'_>> {
        let geometry = self.geometry.as_deref()?;
        let hit = self.trace(geometry, ray, shadow)?;
        let (mesh, f) = geometry.resolve(hit.prim);
        Some(if shadow {
            Intersection::occluder(mesh, f, hit.prim, hit.u, hit.v, ray, hit.t)
        } else {
            Intersection::resolve(mesh, f, hit.prim, hit.u, hit.v, hit.t)
        })
    }

    /// True if anything lies on `ray` within its extent.
    pub fn intersect_shadow(&self, ray: &Ray) -> bool {
        self.geometry
            .as_deref()
            .and_then(|g| self.trace(g, ray, true))
            .is_some()
    }

    fn trace(&self, geometry: &MeshSet, ray: &Ray, shadow: bool) -> Option<Hit> {
        let root = self.root()?;
        if !self.bounds.hit(ray) {
            return None;
        }

        // maxt shrinks as hits are found
        let mut ray = *ray;
        let mut hit = None;
        self.traverse(geometry, root, &mut ray, shadow, &mut hit);
        hit
    }

    fn traverse(
        &self,
        geometry: &MeshSet,
        id: NodeId,
        ray: &mut Ray,
        shadow: bool,
        hit: &mut Option<Hit>,
    ) -> bool {
        match self.node(id) {
            Node::Leaf { triangles } => {
                let mut found = false;
                for &prim in triangles {
                    if let Some((u, v, t)) = geometry.intersect_triangle(prim, ray) {
                        *hit = Some(Hit { prim, u, v, t });
                        if shadow {
                            return true;
                        }
                        ray.maxt = t;
                        found = true;
                    }
                }
                found
            }
            Node::Interior { children, boxes } => {
                let mut candidates: SmallVec<[(f32, NodeId); 4]> = SmallVec::new();
                for (child, b) in children.iter().zip(boxes) {
                    if let Some(child) = child {
                        if let Some(span) = b.ray_intersect(ray) {
                            candidates.push((span.min, *child));
                        }
                    }
                }
                candidates.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

                let mut found = false;
                for (entry, child) in candidates {
                    // Every later candidate starts beyond the closest hit so far
                    if entry > ray.maxt {
                        break;
                    }
                    if self.traverse(geometry, child, ray, shadow, hit) {
                        found = true;
                        if shadow {
                            return true;
                        }
                    }
                }
                found
            }
        }
    }
}
