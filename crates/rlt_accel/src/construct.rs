//! Octree construction.
//!
//! Recursive midpoint split into eight octants. A triangle is assigned to
//! every octant its bounding box touches, so triangles straddling a split
//! plane are replicated. Large nodes are partitioned with a rayon fold over
//! fixed-size blocks and their eight children are built as parallel tasks;
//! each task returns its own arena fragment which the parent splices in.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use rlt_math::Aabb;

use crate::config::OctreeConfig;
use crate::node::{Node, NodeId};

type Buckets = [Vec<u32>; 8];

/// Counters shared by all build tasks.
#[derive(Debug, Default)]
pub(crate) struct BuildStats {
    pub interior: AtomicUsize,
    pub leaves: AtomicUsize,
    pub leaf_triangles: AtomicUsize,
}

pub(crate) struct Builder<'a> {
    pub config: &'a OctreeConfig,
    /// Bounding box of every triangle, by global id
    pub triangle_bounds: &'a [Aabb],
    pub stats: &'a BuildStats,
}

impl Builder<'_> {
    /// Build the subtree for `triangles` inside `bounds`. The subtree root is
    /// the first node of the returned fragment.
    pub fn build(&self, bounds: Aabb, triangles: Vec<u32>, depth: u32) -> Vec<Node> {
        let count = triangles.len();
        if count <= self.config.leaf_size || depth > self.config.max_depth {
            self.stats.leaves.fetch_add(1, Ordering::Relaxed);
            self.stats.leaf_triangles.fetch_add(count, Ordering::Relaxed);
            return vec![Node::Leaf { triangles }];
        }

        let boxes: [Aabb; 8] = std::array::from_fn(|i| bounds.octant(i));
        let parallel = count > self.config.parallel_cutoff;

        let buckets = if parallel {
            self.partition_parallel(&boxes, &triangles)
        } else {
            self.partition_serial(&boxes, &triangles)
        };
        drop(triangles);

        let build_child = |(octant, bucket): (usize, Vec<u32>)| {
            (!bucket.is_empty()).then(|| self.build(boxes[octant], bucket, depth + 1))
        };

        // collect() on the parallel iterator is the join point for the children
        let fragments: Vec<Option<Vec<Node>>> = if parallel {
            buckets.into_par_iter().enumerate().map(build_child).collect()
        } else {
            buckets.into_iter().enumerate().map(build_child).collect()
        };

        self.stats.interior.fetch_add(1, Ordering::Relaxed);
        splice(boxes, fragments)
    }

    fn partition_serial(&self, boxes: &[Aabb; 8], triangles: &[u32]) -> Buckets {
        let mut buckets = Buckets::default();
        self.assign(boxes, triangles, &mut buckets);
        buckets
    }

    fn partition_parallel(&self, boxes: &[Aabb; 8], triangles: &[u32]) -> Buckets {
        triangles
            .par_chunks(self.config.block_size.max(1))
            .fold(Buckets::default, |mut acc, block| {
                self.assign(boxes, block, &mut acc);
                acc
            })
            .reduce(Buckets::default, |mut a, b| {
                for (dst, src) in a.iter_mut().zip(b) {
                    dst.extend(src);
                }
                a
            })
    }

    #[inline]
    fn assign(&self, boxes: &[Aabb; 8], triangles: &[u32], buckets: &mut Buckets) {
        for &tri in triangles {
            let tb = &self.triangle_bounds[tri as usize];
            for (octant, b) in boxes.iter().enumerate() {
                if b.overlaps(tb) {
                    buckets[octant].push(tri);
                }
            }
        }
    }
}

/// Join child fragments under a new interior node at index 0.
fn splice(boxes: [Aabb; 8], fragments: Vec<Option<Vec<Node>>>) -> Vec<Node> {
    let total: usize = fragments.iter().flatten().map(Vec::len).sum();
    let mut arena = Vec::with_capacity(total + 1);
    // Placeholder, overwritten once the child handles are known
    arena.push(Node::Leaf {
        triangles: Vec::new(),
    });

    let mut children = [None; 8];
    for (octant, fragment) in fragments.into_iter().enumerate() {
        if let Some(fragment) = fragment {
            let base = arena.len() as u32;
            children[octant] = Some(NodeId(base));
            arena.extend(fragment.into_iter().map(|n| n.rebase(base)));
        }
    }

    arena[0] = Node::Interior { children, boxes };
    arena
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlt_math::Vec3;

    fn point_boxes(points: &[Vec3]) -> Vec<Aabb> {
        points.iter().map(|&p| Aabb::from_points(p, p)).collect()
    }

    #[test]
    fn test_small_input_is_single_leaf() {
        let config = OctreeConfig::default();
        let stats = BuildStats::default();
        let bounds = point_boxes(&[Vec3::ZERO, Vec3::ONE]);
        let builder = Builder {
            config: &config,
            triangle_bounds: &bounds,
            stats: &stats,
        };

        let arena = builder.build(Aabb::new(Vec3::ZERO, Vec3::ONE), vec![0, 1], 0);
        assert_eq!(arena.len(), 1);
        assert!(arena[0].is_leaf());
        assert_eq!(stats.leaves.load(Ordering::Relaxed), 1);
        assert_eq!(stats.interior.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_parallel_and_serial_partition_agree() {
        let config = OctreeConfig::default();
        let stats = BuildStats::default();
        let points: Vec<Vec3> = (0..200)
            .map(|i| {
                let f = i as f32 / 200.0;
                Vec3::new(f, (f * 7.0).fract(), (f * 13.0).fract())
            })
            .collect();
        let bounds = point_boxes(&points);
        let builder = Builder {
            config: &config,
            triangle_bounds: &bounds,
            stats: &stats,
        };

        let boxes: [Aabb; 8] =
            std::array::from_fn(|i| Aabb::new(Vec3::ZERO, Vec3::ONE).octant(i));
        let ids: Vec<u32> = (0..200).collect();
        let mut a = builder.partition_serial(&boxes, &ids);
        let mut b = builder.partition_parallel(&boxes, &ids);
        for (x, y) in a.iter_mut().zip(b.iter_mut()) {
            x.sort_unstable();
            y.sort_unstable();
            assert_eq!(x, y);
        }
    }

    #[test]
    fn test_splice_rebases_children() {
        let leaf = |t: Vec<u32>| vec![Node::Leaf { triangles: t }];
        let boxes = [Aabb::new(Vec3::ZERO, Vec3::ONE); 8];
        let mut fragments: Vec<Option<Vec<Node>>> = vec![None; 8];
        fragments[1] = Some(leaf(vec![1]));
        fragments[6] = Some(splice(boxes, {
            let mut inner = vec![None; 8];
            inner[0] = Some(leaf(vec![6]));
            inner
        }));

        let arena = splice(boxes, fragments);
        assert_eq!(arena.len(), 4);
        let Node::Interior { children, .. } = &arena[0] else {
            panic!("root should be interior");
        };
        assert_eq!(children[1], Some(NodeId(1)));
        assert_eq!(children[6], Some(NodeId(2)));
        let Node::Interior { children: inner, .. } = &arena[2] else {
            panic!("octant 6 should be interior");
        };
        assert_eq!(inner[0], Some(NodeId(3)));
    }
}
