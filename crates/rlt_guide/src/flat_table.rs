//! Dense bin array sampled by linear scans.

use rlt_math::Vec2;

use crate::table::{scan_sample, DirectionalTable, TableSample};

/// Flat histogram. Sampling and the total are O(bins) scans; updates are O(1).
///
/// Besides sampling the whole grid, a flat table can be sampled through a
/// map that selects a sub-grid of its bins, which is how one sphere table
/// serves every surface normal.
#[derive(Debug, Clone)]
pub struct FlatTable {
    rows: usize,
    cols: usize,
    floor: f32,
    data: Vec<f32>,
}

impl FlatTable {
    /// Sample the `rows x cols` view whose bin `(r, c)` is stored at
    /// `map[r * cols + c]`.
    pub fn sample_mapped(&self, u: Vec2, rows: usize, cols: usize, map: &[u32]) -> TableSample {
        scan_sample(u, rows, cols, |r, c| self.data[map[r * cols + c] as usize])
    }

    /// Density of bin `(row, col)` of a mapped view on the unit square.
    pub fn pdf_mapped(&self, row: usize, col: usize, rows: usize, cols: usize, map: &[u32]) -> f32 {
        let total: f32 = map.iter().map(|&i| self.data[i as usize]).sum();
        if total > 0.0 {
            self.data[map[row * cols + col] as usize] / total * (rows * cols) as f32
        } else {
            0.0
        }
    }

    #[inline]
    pub fn get_flat(&self, index: usize) -> f32 {
        self.data[index]
    }

    #[inline]
    pub fn set_flat(&mut self, index: usize, value: f32) {
        self.data[index] = value.max(self.floor);
    }
}

impl DirectionalTable for FlatTable {
    fn from_weights(rows: usize, cols: usize, mut weights: Vec<f32>, floor: f32) -> Self {
        debug_assert_eq!(weights.len(), rows * cols);
        for w in &mut weights {
            *w = w.max(floor);
        }
        Self {
            rows,
            cols,
            floor,
            data: weights,
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
        self.set_flat(row * self.cols + col, value);
    }

    fn total(&self) -> f32 {
        self.data.iter().sum()
    }

    fn sample(&self, u: Vec2) -> TableSample {
        scan_sample(u, self.rows, self.cols, |r, c| self.get(r, c))
    }

    fn weights(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range_tree::RangeTree;
    use crate::table::tests::chi_square;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_chi_square() {
        let mut rng = StdRng::seed_from_u64(31);
        let weights: Vec<f32> = (0..32).map(|_| rng.gen_range(0.2..4.0)).collect();
        let table = FlatTable::from_weights(8, 4, weights, 0.1);

        // 31 degrees of freedom; 75 is far past the 0.001 critical value
        let chi2 = chi_square(&table, 10_000, 37);
        assert!(chi2 < 75.0, "chi-square {}", chi2);
    }

    #[test]
    fn test_agrees_with_range_tree() {
        let mut rng = StdRng::seed_from_u64(2);
        let weights: Vec<f32> = (0..64).map(|_| rng.gen_range(0.1..3.0)).collect();
        let flat = FlatTable::from_weights(8, 8, weights.clone(), 0.1);
        let tree = RangeTree::from_weights(8, 8, weights, 0.1);

        for row in 0..8 {
            for col in 0..8 {
                assert!((flat.pdf(row, col) - tree.pdf(row, col)).abs() < 1e-4);
            }
        }
        // Both invert the same CDF, so bins agree away from bin edges
        let mut agree = 0;
        for _ in 0..1000 {
            let u = Vec2::new(rng.gen(), rng.gen());
            let (a, b) = (flat.sample(u), tree.sample(u));
            if (a.row, a.col) == (b.row, b.col) {
                agree += 1;
            }
        }
        assert!(agree > 900, "only {} of 1000 draws agree", agree);
    }

    #[test]
    fn test_mapped_view() {
        // 4 x 2 table viewed through a 2 x 2 map of its last four bins
        let table = FlatTable::from_weights(4, 2, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 5.0], 0.1);
        let map = [4, 5, 6, 7];

        let total = 1.0 + 1.0 + 1.0 + 5.0;
        assert!((table.pdf_mapped(1, 1, 2, 2, &map) - 5.0 / total * 4.0).abs() < 1e-6);

        let s = table.sample_mapped(Vec2::new(0.9, 0.9), 2, 2, &map);
        assert_eq!((s.row, s.col), (1, 1));
        assert!((s.density - table.pdf_mapped(1, 1, 2, 2, &map)).abs() < 1e-6);
    }
}
