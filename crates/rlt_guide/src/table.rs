//! Per-cell directional histograms.

use rlt_math::Vec2;
use smallvec::SmallVec;

/// Largest `f32` below one.
pub(crate) const ONE_MINUS_EPSILON: f32 = 1.0 - f32::EPSILON / 2.0;

/// A bin drawn from a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSample {
    /// Uniformly distributed inside the chosen bin of `[0, 1)^2`
    pub point: Vec2,
    pub row: usize,
    pub col: usize,
    /// Density of `point` on the unit square (`w / total * bins`)
    pub density: f32,
}

/// A `rows x cols` grid of non-negative bin weights that can be sampled
/// proportionally to weight.
///
/// Every stored weight is clamped to the floor given at construction.
pub trait DirectionalTable: Send + Sync + Sized {
    /// Build from row-major weights (`rows * cols` of them).
    fn from_weights(rows: usize, cols: usize, weights: Vec<f32>, floor: f32) -> Self;

    fn new(rows: usize, cols: usize, init: f32, floor: f32) -> Self {
        Self::from_weights(rows, cols, vec![init.max(floor); rows * cols], floor)
    }

    fn rows(&self) -> usize;

    fn cols(&self) -> usize;

    fn get(&self, row: usize, col: usize) -> f32;

    fn set(&mut self, row: usize, col: usize, value: f32);

    /// Sum of all weights.
    fn total(&self) -> f32;

    fn sample(&self, u: Vec2) -> TableSample;

    /// Density of bin `(row, col)` on the unit square.
    fn pdf(&self, row: usize, col: usize) -> f32 {
        let total = self.total();
        if total > 0.0 {
            self.get(row, col) / total * (self.rows() * self.cols()) as f32
        } else {
            0.0
        }
    }

    /// Row-major view of all weights.
    fn weights(&self) -> &[f32];
}

/// Inverse-CDF sampling by linear prefix-sum scans, first over row sums
/// and then over the columns of the chosen row.
pub(crate) fn scan_sample(
    u: Vec2,
    rows: usize,
    cols: usize,
    weight: impl Fn(usize, usize) -> f32,
) -> TableSample {
    let mut prefix: SmallVec<[f32; 32]> = SmallVec::with_capacity(rows.max(cols) + 1);

    prefix.push(0.0);
    for r in 0..rows {
        let row_sum: f32 = (0..cols).map(|c| weight(r, c)).sum();
        prefix.push(prefix[r] + row_sum);
    }
    let total = prefix[rows];
    let (row, ux) = pick(&prefix, u.x, rows);

    prefix.clear();
    prefix.push(0.0);
    for c in 0..cols {
        prefix.push(prefix[c] + weight(row, c));
    }
    let (col, uy) = pick(&prefix, u.y, cols);

    let density = if total > 0.0 {
        weight(row, col) / total * (rows * cols) as f32
    } else {
        0.0
    };

    TableSample {
        point: bin_point(row, col, ux, uy, rows, cols),
        row,
        col,
        density,
    }
}

/// Point at relative position `(ux, uy)` inside bin `(row, col)`.
#[inline]
pub(crate) fn bin_point(row: usize, col: usize, ux: f32, uy: f32, rows: usize, cols: usize) -> Vec2 {
    Vec2::new(
        ((row as f32 + ux) / rows as f32).min(ONE_MINUS_EPSILON),
        ((col as f32 + uy) / cols as f32).min(ONE_MINUS_EPSILON),
    )
}

/// Index `i` with `prefix[i] <= u * total < prefix[i + 1]` and the position
/// of the target inside that interval.
fn pick(prefix: &[f32], u: f32, n: usize) -> (usize, f32) {
    let target = u * prefix[n];
    let i = prefix[1..=n].partition_point(|&c| c <= target).min(n - 1);
    let width = prefix[i + 1] - prefix[i];
    let rel = if width > 0.0 {
        ((target - prefix[i]) / width).clamp(0.0, ONE_MINUS_EPSILON)
    } else {
        0.5
    };
    (i, rel)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Chi-square statistic of `draws` samples against the table weights.
    pub(crate) fn chi_square<T: DirectionalTable>(table: &T, draws: usize, seed: u64) -> f32 {
        let mut rng = StdRng::seed_from_u64(seed);
        let bins = table.rows() * table.cols();
        let mut counts = vec![0usize; bins];
        for _ in 0..draws {
            let s = table.sample(Vec2::new(rng.gen(), rng.gen()));
            assert!(s.point.x >= 0.0 && s.point.x < 1.0);
            assert!(s.point.y >= 0.0 && s.point.y < 1.0);
            counts[s.row * table.cols() + s.col] += 1;
        }

        let total = table.total();
        counts
            .iter()
            .zip(table.weights())
            .map(|(&observed, &w)| {
                let expected = draws as f32 * w / total;
                let d = observed as f32 - expected;
                d * d / expected
            })
            .sum()
    }

    #[test]
    fn test_scan_sample_picks_heavy_bin() {
        // All mass in (1, 2)
        let s = scan_sample(Vec2::new(0.3, 0.7), 2, 4, |r, c| if (r, c) == (1, 2) { 1.0 } else { 0.0 });
        assert_eq!((s.row, s.col), (1, 2));
        assert!((s.density - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_scan_sample_uniform_is_identity() {
        let s = scan_sample(Vec2::new(0.3, 0.7), 4, 4, |_, _| 1.0);
        assert!((s.point - Vec2::new(0.3, 0.7)).length() < 1e-5);
        assert!((s.density - 1.0).abs() < 1e-6);
    }
}
