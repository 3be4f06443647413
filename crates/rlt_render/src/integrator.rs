//! Light transport estimators.
//!
//! All integrators trace paths iteratively with Russian roulette after the
//! third bounce. The guided variants draw non-delta bounces from a learned
//! [`Guider`] and feed every traced segment back into it, so the guider
//! improves while the image renders.

use rlt_core::{BsdfQuery, Intersection, Sampler};
use rlt_guide::Guider;
use rlt_math::{Color, Frame, Ray, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::scene::Scene;

/// Bounces traced before Russian roulette may stop a path.
const RR_START_DEPTH: u32 = 3;
const RR_SURVIVAL: f32 = 0.95;

/// A shadow ray ending further than this from the sampled emitter point is
/// considered blocked.
const OCCLUSION_TOLERANCE: f32 = 1e-3;

/// `num / den`, or zero when the density is not positive or the quotient is
/// not finite.
#[inline]
pub fn safe_div(num: f32, den: f32) -> f32 {
    if den > 0.0 {
        let q = num / den;
        if q.is_finite() {
            return q;
        }
    }
    0.0
}

/// Which estimator to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    /// BSDF sampling and emitter sampling combined by MIS
    #[default]
    Path,
    /// Guider sampling at every non-delta bounce
    Guided,
    /// Guider sampling and emitter sampling combined by MIS
    GuidedMis,
}

pub trait Integrator: Send + Sync {
    /// Called once before rendering starts.
    fn preprocess(&mut self, _scene: &Scene) -> RenderResult<()> {
        Ok(())
    }

    /// Radiance arriving at the camera along `ray`.
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color;

    /// Called once after the last sample.
    fn done(&self) -> RenderResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

/// Construct the integrator selected by `kind`. Guided integrators take
/// ownership of `guider` and fail without one.
pub fn create_integrator(
    kind: IntegratorKind,
    max_depth: u32,
    guider: Option<Box<dyn Guider>>,
) -> RenderResult<Box<dyn Integrator>> {
    Ok(match kind {
        IntegratorKind::Path => Box::new(PathIntegrator { max_depth }),
        IntegratorKind::Guided => Box::new(GuidedPathIntegrator {
            max_depth,
            guider: guider.ok_or(RenderError::MissingGuider("guided"))?,
        }),
        IntegratorKind::GuidedMis => Box::new(GuidedMisIntegrator {
            max_depth,
            guider: guider.ok_or(RenderError::MissingGuider("guided_mis"))?,
        }),
    })
}

/// Survival probability at `depth`, or `None` if the path is terminated.
#[inline]
fn roulette(depth: u32, sampler: &mut dyn Sampler) -> Option<f32> {
    if depth < RR_START_DEPTH {
        Some(1.0)
    } else if sampler.next_1d() < RR_SURVIVAL {
        Some(RR_SURVIVAL)
    } else {
        None
    }
}

/// An emitter point sampled from a shading point.
struct LightSample<'a> {
    /// Unit world direction towards the emitter
    d: Vec3,
    radiance: Color,
    /// Solid-angle density, emitter selection included
    pdf: f32,
    /// First surface along the shadow ray
    blocker: Option<Intersection<'a>>,
    visible: bool,
}

fn sample_light<'a>(
    scene: &'a Scene,
    its: &Intersection<'a>,
    sampler: &mut dyn Sampler,
) -> Option<LightSample<'a>> {
    let (mesh, pick_pdf) = scene.sample_emitter(sampler.next_1d())?;
    let s = mesh.emitter()?.sample(mesh, its.p, sampler.next_2d())?;

    let to_light = s.p - its.p;
    let dist2 = to_light.length_squared();
    let d = to_light.try_normalize()?;
    let cos_light = s.n.dot(-d);
    if its.sh_frame.n.dot(d) <= 0.0 || cos_light <= 0.0 {
        return None;
    }

    let blocker = scene.intersect(&its.spawn_ray(to_light));
    let visible = blocker
        .as_ref()
        .is_some_and(|b| b.p.distance(s.p) < OCCLUSION_TOLERANCE);
    Some(LightSample {
        d,
        radiance: s.radiance,
        pdf: safe_div(pick_pdf * s.pdf * dist2, cos_light),
        blocker,
        visible,
    })
}

/// Solid-angle density of reaching emitter hit `light` from `from` by
/// emitter sampling.
fn light_pdf(scene: &Scene, from: Vec3, light: &Intersection) -> f32 {
    let Some(emitter) = light.mesh.emitter() else {
        return 0.0;
    };
    let to_light = light.p - from;
    let Some(d) = to_light.try_normalize() else {
        return 0.0;
    };
    let area_pdf = scene.emitter_pick_pdf() * emitter.pdf(light.mesh, light.p);
    safe_div(area_pdf * to_light.length_squared(), light.sh_frame.n.dot(-d))
}

/// Unidirectional path tracer with next event estimation.
#[derive(Debug, Clone)]
pub struct PathIntegrator {
    pub max_depth: u32,
}

impl Integrator for PathIntegrator {
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        let Some(mut its) = scene.intersect(ray) else {
            return Color::ZERO;
        };
        let mut d = ray.direction.normalize();
        let mut result = Color::ZERO;
        let mut throughput = Color::ONE;
        let mut last_specular = false;

        for depth in 0.. {
            let wi = its.to_local(-d);
            // Emitters hit through a diffuse bounce were counted by MIS already
            if its.is_emitter() && (depth == 0 || last_specular) {
                result += throughput * its.emitted(-d);
            }
            if depth >= self.max_depth {
                break;
            }

            let bsdf = its.bsdf();
            last_specular = bsdf.is_delta();
            let shade = !last_specular && Frame::cos_theta(wi) > 0.0;

            if shade {
                if let Some(light) = sample_light(scene, &its, sampler).filter(|l| l.visible) {
                    let query = BsdfQuery::with_wo(wi, its.to_local(light.d));
                    let cos = Frame::cos_theta(query.wo);
                    result += throughput
                        * bsdf.eval(&query)
                        * light.radiance
                        * safe_div(cos, light.pdf + bsdf.pdf(&query));
                }
            }

            let Some(survival) = roulette(depth, sampler) else {
                break;
            };
            let mut query = BsdfQuery::new(wi);
            let weight = bsdf.sample(&mut query, sampler.next_2d());
            if weight.max_element() <= 0.0 {
                break;
            }

            d = its.to_world(query.wo);
            let Some(next) = scene.intersect(&its.spawn_ray(d)) else {
                break;
            };

            if shade && next.is_emitter() {
                let radiance = next.emitted(-d);
                if radiance.max_element() > 0.0 {
                    let bsdf_pdf = bsdf.pdf(&query);
                    let mis = safe_div(
                        Frame::cos_theta(query.wo),
                        light_pdf(scene, its.p, &next) + bsdf_pdf,
                    );
                    result += throughput / survival * bsdf.eval(&query) * radiance * mis;
                }
            }

            throughput *= weight / survival;
            its = next;
        }
        result
    }

    fn name(&self) -> &'static str {
        "path"
    }
}

/// Path tracer sampling every non-delta bounce from the guider.
///
/// Paths only gather light by hitting an emitter.
pub struct GuidedPathIntegrator {
    pub max_depth: u32,
    guider: Box<dyn Guider>,
}

impl GuidedPathIntegrator {
    pub fn new(max_depth: u32, guider: Box<dyn Guider>) -> Self {
        Self { max_depth, guider }
    }

    pub fn guider(&self) -> &dyn Guider {
        self.guider.as_ref()
    }
}

impl Integrator for GuidedPathIntegrator {
    fn preprocess(&mut self, scene: &Scene) -> RenderResult<()> {
        self.guider.init(&scene.bounding_box())?;
        Ok(())
    }

    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        let Some(mut its) = scene.intersect(ray) else {
            return Color::ZERO;
        };
        let mut d = ray.direction.normalize();
        let mut throughput = Color::ONE;
        let mut last: Option<Intersection> = None;

        for depth in 0.. {
            if let Some(last) = &last {
                self.guider.update(last, &its, sampler);
            }
            if its.is_emitter() {
                return throughput * its.emitted(-d);
            }
            if depth >= self.max_depth {
                break;
            }
            let Some(survival) = roulette(depth, sampler) else {
                break;
            };

            let wi = its.to_local(-d);
            let bsdf = its.bsdf();
            let wo = if bsdf.is_delta() {
                let mut query = BsdfQuery::new(wi);
                throughput *= bsdf.sample(&mut query, sampler.next_2d());
                query.wo
            } else {
                let s = self.guider.sample(sampler.next_2d(), its.p, &its.sh_frame);
                let query = BsdfQuery::with_wo(wi, s.direction);
                throughput *= bsdf.eval(&query) * safe_div(Frame::cos_theta(s.direction), s.pdf);
                s.direction
            };
            throughput /= survival;
            if throughput.max_element() <= 0.0 {
                break;
            }

            d = its.to_world(wo);
            let Some(next) = scene.intersect(&its.spawn_ray(d)) else {
                break;
            };
            last = Some(std::mem::replace(&mut its, next));
        }
        Color::ZERO
    }

    fn done(&self) -> RenderResult<()> {
        self.guider.done()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "guided"
    }
}

/// Guided path tracer with next event estimation, combining guider and
/// emitter densities with the balance heuristic.
///
/// Shadow rays are reported to the guider as well, whether or not they
/// reach the sampled emitter.
pub struct GuidedMisIntegrator {
    pub max_depth: u32,
    guider: Box<dyn Guider>,
}

impl GuidedMisIntegrator {
    pub fn new(max_depth: u32, guider: Box<dyn Guider>) -> Self {
        Self { max_depth, guider }
    }

    pub fn guider(&self) -> &dyn Guider {
        self.guider.as_ref()
    }
}

impl Integrator for GuidedMisIntegrator {
    fn preprocess(&mut self, scene: &Scene) -> RenderResult<()> {
        self.guider.init(&scene.bounding_box())?;
        Ok(())
    }

    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        let Some(mut its) = scene.intersect(ray) else {
            return Color::ZERO;
        };
        let mut d = ray.direction.normalize();
        let mut result = Color::ZERO;
        let mut throughput = Color::ONE;
        let mut last: Option<Intersection> = None;
        let mut last_specular = false;

        for depth in 0.. {
            let wi = its.to_local(-d);

            if its.is_emitter() {
                let radiance = its.emitted(-d);
                match &last {
                    Some(last) if !last_specular => {
                        let guide_pdf =
                            self.guider
                                .pdf(last.to_local(d), last.p, &last.sh_frame);
                        let emitter_pdf = light_pdf(scene, last.p, &its);
                        result += throughput * radiance * safe_div(guide_pdf, emitter_pdf + guide_pdf);
                    }
                    _ => result += throughput * radiance,
                }
            }
            if let Some(last) = &last {
                self.guider.update(last, &its, sampler);
            }
            if depth >= self.max_depth {
                break;
            }

            let bsdf = its.bsdf();
            last_specular = bsdf.is_delta();

            if !last_specular && Frame::cos_theta(wi) > 0.0 {
                if let Some(light) = sample_light(scene, &its, sampler) {
                    if let Some(blocker) = &light.blocker {
                        self.guider.update(&its, blocker, sampler);
                    }
                    if light.visible {
                        let query = BsdfQuery::with_wo(wi, its.to_local(light.d));
                        let guide_pdf = self.guider.pdf(query.wo, its.p, &its.sh_frame);
                        result += throughput
                            * bsdf.eval(&query)
                            * light.radiance
                            * safe_div(Frame::cos_theta(query.wo), light.pdf + guide_pdf);
                    }
                }
            }

            let Some(survival) = roulette(depth, sampler) else {
                break;
            };
            let wo = if last_specular {
                let mut query = BsdfQuery::new(wi);
                throughput *= bsdf.sample(&mut query, sampler.next_2d());
                query.wo
            } else {
                let s = self.guider.sample(sampler.next_2d(), its.p, &its.sh_frame);
                let query = BsdfQuery::with_wo(wi, s.direction);
                throughput *= bsdf.eval(&query) * safe_div(Frame::cos_theta(s.direction), s.pdf);
                s.direction
            };
            throughput /= survival;
            if throughput.max_element() <= 0.0 {
                break;
            }

            d = its.to_world(wo);
            let Some(next) = scene.intersect(&its.spawn_ray(d)) else {
                break;
            };
            last = Some(std::mem::replace(&mut its, next));
        }
        result
    }

    fn done(&self) -> RenderResult<()> {
        self.guider.done()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "guided_mis"
    }
}
