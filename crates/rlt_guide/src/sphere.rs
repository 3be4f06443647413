//! Sphere guider: one world-space histogram per cell shared by all normals.

use std::f32::consts::PI;

use rlt_core::{BsdfQuery, Intersection, Sampler};
use rlt_math::{warp, Aabb, Frame, Vec2, Vec3};

use crate::config::GuiderConfig;
use crate::engine::GuiderState;
use crate::error::GuideResult;
use crate::flat_table::FlatTable;
use crate::grid::{hemisphere_bin, sphere_bin};
use crate::lifecycle::LifecycleState;
use crate::table::DirectionalTable;
use crate::{DirectionSample, Guider};

/// Guider with a `2R x R` histogram over the whole sphere of directions.
///
/// Sampling and density queries look at the `R x R` hemisphere around the
/// surface normal. Which sphere bin each hemisphere bin reads is fixed at
/// construction: for every sphere bin taken as a normal, the centre of each
/// local hemisphere bin is rotated to world space and binned on the sphere.
/// The same map is used by `sample`, `pdf` and `update`, so the three always
/// agree on which weight a direction belongs to.
#[derive(Debug)]
pub struct SphereGuider {
    state: GuiderState<FlatTable>,
    /// `(2R * R) x (R * R)` flat sphere indices
    map: Vec<u32>,
    r: usize,
}

impl SphereGuider {
    pub fn new(config: GuiderConfig) -> GuideResult<Self> {
        let r = config.angle_resolution as usize;
        let state = GuiderState::new(config, 2 * r, r)?;
        Ok(Self {
            state,
            map: build_map(r),
            r,
        })
    }

    pub fn config(&self) -> &GuiderConfig {
        &self.state.config
    }

    /// Sphere bins read by the hemisphere around normal `n`, row-major over
    /// the local `(cos theta, phi)` grid.
    pub fn local_bins(&self, n: Vec3) -> &[u32] {
        let (row, col) = sphere_bin(n, self.r);
        let bins = self.r * self.r;
        let start = (row * self.r + col) * bins;
        &self.map[start..start + bins]
    }

    fn estimate(&self, dest: &Intersection, wi: Vec3, sampler: &mut dyn Sampler) -> f32 {
        let r = self.r;
        let cell = self.state.cell(dest.p);
        let record = cell.read();
        let bsdf = dest.bsdf();

        let mut sum = 0.0;
        if !bsdf.is_delta() {
            let bins = self.local_bins(dest.sh_frame.n);
            let mut query = BsdfQuery::with_wo(wi, Vec3::ZERO);
            for i in 0..r {
                for j in 0..r {
                    let u = (sampler.next_2d() + Vec2::new(i as f32, j as f32)) / r as f32;
                    query.wo = warp::square_to_uniform_hemisphere(u);
                    let f = bsdf.eval(&query).max_element();
                    let w = record.table.get_flat(bins[i * r + j] as usize);
                    sum += w * Frame::cos_theta(query.wo) * f;
                }
            }
        } else {
            for _ in 0..r * r {
                let mut query = BsdfQuery::new(wi);
                if bsdf.sample(&mut query, sampler.next_2d()) == Vec3::ZERO {
                    continue;
                }
                // Transmitted directions are valid here, the sphere covers them
                let (row, col) = sphere_bin(dest.to_world(query.wo), r);
                sum += record.table.get(row, col);
            }
        }
        sum * 2.0 * PI / (r * r) as f32
    }
}

fn build_map(r: usize) -> Vec<u32> {
    let (rows, cols) = (2 * r, r);
    let mut map = Vec::with_capacity(rows * cols * r * r);
    for nr in 0..rows {
        for nc in 0..cols {
            let n = warp::square_to_uniform_sphere(Vec2::new(
                (nr as f32 + 0.5) / rows as f32,
                (nc as f32 + 0.5) / cols as f32,
            ));
            let frame = Frame::from_normal(n);
            for k in 0..r {
                for l in 0..r {
                    let local = warp::square_to_uniform_hemisphere(Vec2::new(
                        (k as f32 + 0.5) / r as f32,
                        (l as f32 + 0.5) / r as f32,
                    ));
                    let (row, col) = sphere_bin(frame.to_world(local), r);
                    map.push((row * cols + col) as u32);
                }
            }
        }
    }
    map
}

impl Guider for SphereGuider {
    fn init(&mut self, scene_bounds: &Aabb) -> GuideResult<()> {
        self.state.init(scene_bounds)
    }

    fn sample(&self, u: Vec2, p: Vec3, frame: &Frame) -> DirectionSample {
        self.state.lifecycle.expect_active("sample");
        let bins = self.local_bins(frame.n);
        let s = self
            .state
            .cell(p)
            .read()
            .table
            .sample_mapped(u, self.r, self.r, bins);
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

        let mut estimate = self.estimate(dest, dest.to_local(-d), sampler);
        if dest.is_emitter() {
            estimate += dest.emitted(-d).element_sum();
        }

        let (k, l) = hemisphere_bin(origin.to_local(d), self.r);
        let g = self.local_bins(origin.sh_frame.n)[k * self.r + l] as usize;
        let cell = self.state.cell(origin.p);
        let mut record = cell.write();
        self.state
            .blend(&mut record, g / self.state.cols(), g % self.state.cols(), estimate);
    }

    fn pdf(&self, wo: Vec3, p: Vec3, frame: &Frame) -> f32 {
        self.state.lifecycle.expect_active("pdf");
        let base = warp::uniform_hemisphere_pdf(wo);
        if base == 0.0 {
            return 0.0;
        }
        let (row, col) = hemisphere_bin(wo, self.r);
        let bins = self.local_bins(frame.n);
        self.state
            .cell(p)
            .read()
            .table
            .pdf_mapped(row, col, self.r, self.r, bins)
            * base
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
