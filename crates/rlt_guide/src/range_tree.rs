//! Two-level range tree for O(log n) weighted sampling and update.
//!
//! A sum tree over the rows selects a row, then that row's own sum tree
//! selects the column. Each tree is stored implicitly in a flat array
//! (node `i` has children `2i` and `2i + 1`, leaves start at `size`), padded
//! to a power of two with zero leaves.

use rlt_math::Vec2;

use crate::table::{bin_point, DirectionalTable, TableSample, ONE_MINUS_EPSILON};

#[derive(Debug, Clone)]
struct SumTree {
    size: usize,
    nodes: Vec<f32>,
}

impl SumTree {
    fn new(leaves: &[f32]) -> Self {
        let size = leaves.len().next_power_of_two();
        let mut nodes = vec![0.0; 2 * size];
        nodes[size..size + leaves.len()].copy_from_slice(leaves);
        for i in (1..size).rev() {
            nodes[i] = nodes[2 * i] + nodes[2 * i + 1];
        }
        Self { size, nodes }
    }

    #[inline]
    fn total(&self) -> f32 {
        self.nodes[1]
    }

    /// Set a leaf and recompute its ancestors from their children.
    fn set(&mut self, leaf: usize, value: f32) {
        let mut i = self.size + leaf;
        self.nodes[i] = value;
        while i > 1 {
            i /= 2;
            self.nodes[i] = self.nodes[2 * i] + self.nodes[2 * i + 1];
        }
    }

    /// Descend from the root choosing a child proportionally to its sum.
    /// Returns the leaf and `u` rescaled to `[0, 1)` within it.
    fn descend(&self, mut u: f32) -> (usize, f32) {
        let mut i = 1;
        while i < self.size {
            let left = self.nodes[2 * i];
            let right = self.nodes[2 * i + 1];
            let sum = left + right;
            if right <= 0.0 || (left > 0.0 && u * sum < left) {
                if left > 0.0 && sum > 0.0 {
                    u = u * sum / left;
                }
                i = 2 * i;
            } else {
                u = (u * sum - left) / right;
                i = 2 * i + 1;
            }
            u = u.clamp(0.0, ONE_MINUS_EPSILON);
        }
        (i - self.size, u)
    }
}

/// Hemisphere histogram backed by a two-level range tree.
#[derive(Debug, Clone)]
pub struct RangeTree {
    rows: usize,
    cols: usize,
    floor: f32,
    data: Vec<f32>,
    /// Leaves are the row totals
    row_tree: SumTree,
    col_trees: Vec<SumTree>,
}

impl DirectionalTable for RangeTree {
    fn from_weights(rows: usize, cols: usize, mut weights: Vec<f32>, floor: f32) -> Self {
        debug_assert_eq!(weights.len(), rows * cols);
        for w in &mut weights {
            *w = w.max(floor);
        }
        let col_trees: Vec<SumTree> = weights.chunks_exact(cols).map(SumTree::new).collect();
        let row_sums: Vec<f32> = col_trees.iter().map(SumTree::total).collect();
        Self {
            rows,
            cols,
            floor,
            data: weights,
            row_tree: SumTree::new(&row_sums),
            col_trees,
        }
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    fn set(&mut self, row: usize, col: usize, value: f32) {
        let value = value.max(self.floor);
        self.data[row * self.cols + col] = value;
        let tree = &mut self.col_trees[row];
        tree.set(col, value);
        let row_total = tree.total();
        self.row_tree.set(row, row_total);
    }

    fn total(&self) -> f32 {
        self.row_tree.total()
    }

    fn sample(&self, u: Vec2) -> TableSample {
        let (row, ux) = self.row_tree.descend(u.x);
        let (col, uy) = self.col_trees[row].descend(u.y);
        TableSample {
            point: bin_point(row, col, ux, uy, self.rows, self.cols),
            row,
            col,
            density: self.pdf(row, col),
        }
    }

    fn weights(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::chi_square;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_uniform_sample_is_identity() {
        let tree = RangeTree::new(8, 8, 1.0, 0.1);
        let s = tree.sample(Vec2::new(0.3, 0.7));
        assert!((s.point - Vec2::new(0.3, 0.7)).length() < 1e-5);
        assert_eq!((s.row, s.col), (2, 5));
        assert!((s.density - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_root_sum_after_updates() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut tree = RangeTree::new(8, 8, 1.0, 0.1);
        for _ in 0..5000 {
            let (r, c) = (rng.gen_range(0..8), rng.gen_range(0..8));
            tree.set(r, c, rng.gen_range(0.0..10.0));
        }

        let leaf_sum: f32 = tree.weights().iter().sum();
        assert!((tree.total() - leaf_sum).abs() <= 1e-4 * leaf_sum);
        for (row, col_tree) in tree.col_trees.iter().enumerate() {
            let row_sum: f32 = tree.weights()[row * 8..(row + 1) * 8].iter().sum();
            assert!((col_tree.total() - row_sum).abs() <= 1e-4 * row_sum);
        }
    }

    #[test]
    fn test_floor_is_applied() {
        let mut tree = RangeTree::new(4, 4, 1.0, 0.1);
        tree.set(1, 2, 0.0);
        assert_eq!(tree.get(1, 2), 0.1);
        tree.set(1, 2, -3.0);
        assert_eq!(tree.get(1, 2), 0.1);
        assert!(tree.weights().iter().all(|&w| w >= 0.1));
    }

    #[test]
    fn test_rebuild_matches_incremental() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut tree = RangeTree::new(8, 8, 1.0, 0.1);
        for _ in 0..300 {
            tree.set(rng.gen_range(0..8), rng.gen_range(0..8), rng.gen_range(0.0..5.0));
        }
        let rebuilt = RangeTree::from_weights(8, 8, tree.weights().to_vec(), 0.1);

        assert_eq!(tree.total().to_bits(), rebuilt.total().to_bits());
        for _ in 0..100 {
            let u = Vec2::new(rng.gen(), rng.gen());
            assert_eq!(tree.sample(u), rebuilt.sample(u));
        }
    }

    #[test]
    fn test_chi_square() {
        let mut rng = StdRng::seed_from_u64(17);
        let weights: Vec<f32> = (0..16).map(|_| rng.gen_range(0.2..4.0)).collect();
        let tree = RangeTree::from_weights(4, 4, weights, 0.1);

        // 15 degrees of freedom; 50 is far past the 0.001 critical value
        let chi2 = chi_square(&tree, 10_000, 23);
        assert!(chi2 < 50.0, "chi-square {}", chi2);
    }

    #[test]
    fn test_non_power_of_two_never_picks_padding() {
        let tree = RangeTree::from_weights(3, 5, (1..=15).map(|x| x as f32).collect(), 0.1);
        for i in 0..=100 {
            let u = i as f32 / 100.0;
            let s = tree.sample(Vec2::new(u, 1.0 - u));
            assert!(s.row < 3 && s.col < 5);
        }
        assert!(chi_square(&tree, 10_000, 4) < 50.0);
    }
}
