//! Hemisphere guider backed by range trees.

use std::f32::consts::PI;

use rlt_core::{BsdfQuery, Intersection, Sampler};
use rlt_math::{warp, Aabb, Frame, Vec2, Vec3};

use crate::config::GuiderConfig;
use crate::engine::GuiderState;
use crate::error::GuideResult;
use crate::grid::hemisphere_bin;
use crate::lifecycle::LifecycleState;
use crate::range_tree::RangeTree;
use crate::table::DirectionalTable;
use crate::{DirectionSample, Guider};

/// Guider with an `R x R` histogram over the local hemisphere of each cell.
///
/// Bins are equal solid-angle cells of `(cos theta, phi / 2pi)`, so a
/// direction is addressed the same way in every shading frame.
#[derive(Debug)]
pub struct QTableGuider {
    state: GuiderState<RangeTree>,
}

impl QTableGuider {
    pub fn new(config: GuiderConfig) -> GuideResult<Self> {
        let r = config.angle_resolution as usize;
        Ok(Self {
            state: GuiderState::new(config, r, r)?,
        })
    }

    pub fn config(&self) -> &GuiderConfig {
        &self.state.config
    }

    /// Current estimate stored in the cell of `p` for local direction `wo`.
    pub fn weight(&self, p: Vec3, wo: Vec3) -> f32 {
        let (row, col) = hemisphere_bin(wo, self.state.rows());
        self.state.cell(p).read().table.get(row, col)
    }

    /// Radiance estimate at `dest` towards `wi` (local), from its histogram.
    fn estimate(&self, dest: &Intersection, wi: Vec3, sampler: &mut dyn Sampler) -> f32 {
        let r = self.state.rows();
        let cell = self.state.cell(dest.p);
        let record = cell.read();
        let bsdf = dest.bsdf();

        let mut sum = 0.0;
        if !bsdf.is_delta() {
            // One jittered sample per bin
            let mut query = BsdfQuery::with_wo(wi, Vec3::ZERO);
            for i in 0..r {
                for j in 0..r {
                    let u = (sampler.next_2d() + Vec2::new(i as f32, j as f32)) / r as f32;
                    query.wo = warp::square_to_uniform_hemisphere(u);
                    let f = bsdf.eval(&query).max_element();
                    sum += record.table.get(i, j) * Frame::cos_theta(query.wo) * f;
                }
            }
        } else {
            // Pointwise evaluation of a delta lobe is always zero
            for _ in 0..r * r {
                let mut query = BsdfQuery::new(wi);
                if bsdf.sample(&mut query, sampler.next_2d()) == Vec3::ZERO {
                    continue;
                }
                let (row, col) = hemisphere_bin(query.wo, r);
                sum += record.table.get(row, col);
            }
        }
        sum * 2.0 * PI / (r * r) as f32
    }
}

impl Guider for QTableGuider {
    fn init(&mut self, scene_bounds: &Aabb) -> GuideResult<()> {
        self.state.init(scene_bounds)
    }

    fn sample(&self, u: Vec2, p: Vec3, _frame: &Frame) -> DirectionSample {
        self.state.lifecycle.expect_active("sample");
        let s = self.state.cell(p).read().table.sample(u);
        let direction = warp::square_to_uniform_hemisphere(s.point);
        DirectionSample {
            direction,
            pdf: s.density * warp::uniform_hemisphere_pdf(direction),
        }
    }

    fn update(&self, origin: &Intersection, dest: &Intersection, sampler: &mut dyn Sampler) {
        self.state.lifecycle.expect_active("update");
        let Some(d) = (dest.p - origin.p).try_normalize() else {
            return;
        };

        // Destination is read, and its lock dropped, before the origin is locked
        let mut estimate = self.estimate(dest, dest.to_local(-d), sampler);
        if dest.is_emitter() {
            estimate += dest.emitted(-d).element_sum();
        }

        let (row, col) = hemisphere_bin(origin.to_local(d), self.state.rows());
        let cell = self.state.cell(origin.p);
        let mut record = cell.write();
        self.state.blend(&mut record, row, col, estimate);
    }

    fn pdf(&self, wo: Vec3, p: Vec3, _frame: &Frame) -> f32 {
        self.state.lifecycle.expect_active("pdf");
        let base = warp::uniform_hemisphere_pdf(wo);
        if base == 0.0 {
            return 0.0;
        }
        let (row, col) = hemisphere_bin(wo, self.state.rows());
        self.state.cell(p).read().table.pdf(row, col) * base
    }

    fn done(&self) -> GuideResult<()> {
        self.state.done()
    }

    fn lifecycle(&self) -> LifecycleState {
        self.state.lifecycle.state()
    }

    fn cell_count(&self) -> usize {
        self.state.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlt_math::INV_TWO_PI;
    use crate::config::LearningRate;
    use crate::error::GuideError;
    use crate::test_scene::Scene;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rayon::prelude::*;
    use rlt_core::IndependentSampler;

    fn active(config: GuiderConfig, scene: &Scene) -> QTableGuider {
        let mut guider = QTableGuider::new(config).unwrap();
        guider.init(&scene.bounds()).unwrap();
        guider
    }

    #[test]
    fn test_fresh_cell_is_uniform() {
        let scene = Scene::new();
        let guider = active(GuiderConfig::default(), &scene);
        let s = guider.sample(Vec2::new(0.3, 0.6), Vec3::splat(0.5), &Frame::default());

        assert!((s.pdf - INV_TWO_PI).abs() < 1e-5);
        assert!(s.direction.z >= 0.0);
        assert!((s.direction.length() - 1.0).abs() < 1e-5);
        assert_eq!(guider.cell_count(), 1);
    }

    #[test]
    fn test_update_blends_towards_light() {
        let scene = Scene::new();
        let guider = active(GuiderConfig::default(), &scene);
        let mut sampler = IndependentSampler::new(1);

        let origin = scene.hit(&scene.floor, 0.5, 0.5);
        let dest = scene.hit(&scene.ceiling, 0.5, 0.5);
        guider.update(&origin, &dest, &mut sampler);

        // First visit with 1 / (1 + visits) replaces the weight with the
        // estimate: ~0.5 reflected (albedo * uniform weights) + 3 emitted
        let w = guider.weight(origin.p, Vec3::Z);
        assert!((3.3..3.7).contains(&w), "weight {}", w);

        let cell = guider.state.cell(origin.p);
        let (row, col) = hemisphere_bin(Vec3::Z, 8);
        assert_eq!(cell.read().visits[row * 8 + col], 1);

        // The bin towards the light is now the most likely one
        let pdf_up = guider.pdf(Vec3::Z, origin.p, &origin.sh_frame);
        let pdf_side = guider.pdf(Vec3::new(1.0, 0.0, 0.1).normalize(), origin.p, &origin.sh_frame);
        assert!(pdf_up > pdf_side);
    }

    #[test]
    fn test_fixed_rate_and_floor() {
        let scene = Scene::new();
        let config = GuiderConfig {
            learning_rate: LearningRate::Fixed(0.5),
            weight_floor: 0.2,
            ..Default::default()
        };
        let guider = active(config, &scene);
        let mut sampler = IndependentSampler::new(2);

        // Learn at the ceiling from segments ending on the unlit floor
        let from = scene.hit(&scene.ceiling, 0.5, 0.5);
        let to = scene.hit(&scene.floor, 0.5, 0.5);
        let mirror_to = scene.hit(&scene.mirror, 0.5, 0.5);
        for _ in 0..40 {
            guider.update(&from, &to, &mut sampler);
        }
        let w = guider.weight(from.p, Vec3::Z);
        // Fixed point of w = 0.5 w + 0.5 * (albedo-weighted sum over the
        // floor's bins), which are still uniform 1.0
        assert!((0.4..0.6).contains(&w), "weight {}", w);

        // A delta destination uses BSDF samples instead
        for _ in 0..40 {
            guider.update(&from, &mirror_to, &mut sampler);
        }
        let w = guider.weight(from.p, Vec3::Z);
        assert!(w >= 0.2);
    }

    #[test]
    fn test_inverse_pdf_integrates_hemisphere() {
        let scene = Scene::new();
        let guider = active(GuiderConfig::default(), &scene);
        let mut rng = StdRng::seed_from_u64(8);

        // Arbitrary fixed weights
        let p = Vec3::splat(0.5);
        {
            let cell = guider.state.cell(p);
            let mut rec = cell.write();
            for row in 0..8 {
                for col in 0..8 {
                    rec.table.set(row, col, rng.gen_range(0.5..3.0));
                }
            }
        }

        let n = 50_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            let s = guider.sample(Vec2::new(rng.gen(), rng.gen()), p, &Frame::default());
            assert!(s.pdf > 0.0);
            sum += 1.0 / s.pdf as f64;
        }
        let estimate = sum / n as f64;
        assert!((estimate - 2.0 * std::f64::consts::PI).abs() < 0.1, "E[1/pdf] = {}", estimate);
    }

    #[test]
    fn test_pdf_matches_sample() {
        let scene = Scene::new();
        let guider = active(GuiderConfig::default(), &scene);
        let mut sampler = IndependentSampler::new(3);
        let origin = scene.hit(&scene.floor, 0.3, 0.3);
        let dest = scene.hit(&scene.ceiling, 0.6, 0.4);
        for _ in 0..10 {
            guider.update(&origin, &dest, &mut sampler);
        }

        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..500 {
            let u = Vec2::new(rng.gen_range(0.001..0.999), rng.gen_range(0.001..0.999));
            let s = guider.sample(u, origin.p, &origin.sh_frame);
            let pdf = guider.pdf(s.direction, origin.p, &origin.sh_frame);
            assert!((pdf - s.pdf).abs() <= 1e-3 * s.pdf, "{} vs {}", pdf, s.pdf);
        }
        assert_eq!(guider.pdf(-Vec3::Z, origin.p, &origin.sh_frame), 0.0);
    }

    #[test]
    fn test_export_import_round_trip() {
        let _ = env_logger::builder().is_test(true).try_init();
        let path = std::env::temp_dir().join(format!("rlt_guide_qtable_{}.qtable", std::process::id()));
        let scene = Scene::new();
        let config = GuiderConfig {
            scene_resolution: 4,
            export_path: Some(path.clone()),
            ..Default::default()
        };
        let guider = active(config, &scene);
        let mut sampler = IndependentSampler::new(5);
        for i in 0..50 {
            let x = 0.1 + 0.8 * (i as f32 / 50.0);
            let origin = scene.hit(&scene.floor, x, 1.0 - x);
            let dest = scene.hit(&scene.ceiling, 1.0 - x, x);
            guider.update(&origin, &dest, &mut sampler);
        }

        let points = [Vec3::new(0.1, 0.9, 0.0), Vec3::new(0.5, 0.5, 0.0), Vec3::new(0.9, 0.1, 1.0)];
        let mut rng = StdRng::seed_from_u64(6);
        let queries: Vec<(Vec2, Vec3)> = (0..60)
            .map(|i| (Vec2::new(rng.gen(), rng.gen()), points[i % 3]))
            .collect();
        let before: Vec<(DirectionSample, f32)> = queries
            .iter()
            .map(|&(u, p)| {
                let s = guider.sample(u, p, &Frame::default());
                (s, guider.pdf(s.direction, p, &Frame::default()))
            })
            .collect();
        guider.done().unwrap();
        assert_eq!(guider.lifecycle(), LifecycleState::Finalized);

        let config = GuiderConfig {
            scene_resolution: 4,
            import_path: Some(path.clone()),
            ..Default::default()
        };
        let mut restored = QTableGuider::new(config).unwrap();
        // Bounds come from the table header, not from this argument
        restored
            .init(&Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0)))
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(restored.cell_count(), guider.cell_count());
        for (&(u, p), &(s, pdf)) in queries.iter().zip(&before) {
            let t = restored.sample(u, p, &Frame::default());
            assert_eq!(t, s);
            assert_eq!(restored.pdf(t.direction, p, &Frame::default()), pdf);
        }
    }

    #[test]
    fn test_import_missing_table_fails() {
        let config = GuiderConfig {
            import_path: Some("/nonexistent/guide.qtable".into()),
            ..Default::default()
        };
        let mut guider = QTableGuider::new(config).unwrap();
        let err = guider
            .init(&Aabb::new(Vec3::ZERO, Vec3::ONE))
            .unwrap_err();
        assert!(matches!(err, GuideError::Io { .. }));
    }

    #[test]
    #[should_panic(expected = "sample called while Uninitialized")]
    fn test_sample_before_init_panics() {
        let guider = QTableGuider::new(GuiderConfig::default()).unwrap();
        guider.sample(Vec2::ZERO, Vec3::ZERO, &Frame::default());
    }

    #[test]
    #[should_panic(expected = "init called while Active")]
    fn test_double_init_panics() {
        let scene = Scene::new();
        let mut guider = active(GuiderConfig::default(), &scene);
        let _ = guider.init(&scene.bounds());
    }

    #[test]
    #[should_panic(expected = "done called while Uninitialized")]
    fn test_done_before_init_panics() {
        let guider = QTableGuider::new(GuiderConfig::default()).unwrap();
        let _ = guider.done();
    }

    #[test]
    fn test_concurrent_updates() {
        let scene = Scene::new();
        let guider = active(
            GuiderConfig {
                scene_resolution: 2,
                ..Default::default()
            },
            &scene,
        );

        (0..2000u64).into_par_iter().for_each(|i| {
            let mut sampler = IndependentSampler::new(i);
            let x = 0.05 + 0.9 * sampler.next_1d();
            let y = 0.05 + 0.9 * sampler.next_1d();
            let origin = scene.hit(&scene.floor, x, y);
            let dest = scene.hit(&scene.ceiling, 1.0 - x, y);
            guider.update(&origin, &dest, &mut sampler);
            let s = guider.sample(sampler.next_2d(), origin.p, &origin.sh_frame);
            assert!(s.pdf.is_finite() && s.pdf > 0.0);
        });

        let total_visits: u32 = guider
            .state
            .store
            .sorted_cells()
            .iter()
            .map(|(_, c)| c.read().visits.iter().sum::<u32>())
            .sum();
        assert_eq!(total_visits, 2000);
        assert!(guider.cell_count() <= 8);
    }
}
