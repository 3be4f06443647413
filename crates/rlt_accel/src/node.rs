use rlt_math::Aabb;

/// Handle of a node in the octree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Octree node.
///
/// Children are addressed by octant: bit `k` of the slot selects the upper
/// half along axis `k`. Octants no triangle overlaps have no child.
#[derive(Debug, Clone)]
pub enum Node {
    Leaf {
        /// Global ids into the indexed `MeshSet`
        triangles: Vec<u32>,
    },
    Interior {
        children: [Option<NodeId>; 8],
        boxes: [Aabb; 8],
    },
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Shift child handles by `offset` when a fragment is spliced into a
    /// larger arena.
    pub(crate) fn rebase(mut self, offset: u32) -> Self {
        if let Node::Interior { children, .. } = &mut self {
            for child in children.iter_mut().flatten() {
                child.0 += offset;
            }
        }
        self
    }
}
