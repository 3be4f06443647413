use serde::{Deserialize, Serialize};

/// Octree build parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// A node with at most this many triangles becomes a leaf
    pub leaf_size: usize,
    /// Nodes deeper than this become leaves regardless of their size
    pub max_depth: u32,
    /// Subtrees with more triangles than this are built in parallel
    pub parallel_cutoff: usize,
    /// Triangles per task when partitioning a large node
    pub block_size: usize,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            leaf_size: 10,
            max_depth: 9,
            parallel_cutoff: 80,
            block_size: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: OctreeConfig = serde_json::from_str(r#"{ "leaf_size": 4 }"#).unwrap();
        assert_eq!(config.leaf_size, 4);
        assert_eq!(config.max_depth, 9);
        assert_eq!(config.block_size, 30);
    }
}
