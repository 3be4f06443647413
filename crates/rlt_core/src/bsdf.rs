//! BSDFs describing how light scatters at a surface.
//!
//! All directions are in the local shading frame (normal on +Z). `wi` points
//! away from the surface towards where the path came from, `wo` towards where
//! it continues.

use std::fmt::Debug;

use rlt_math::{warp, Color, Frame, Vec2, Vec3, INV_PI};

/// Whether a query refers to a density over solid angle or a discrete lobe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    SolidAngle,
    Discrete,
}

/// Input/output record of BSDF evaluation and sampling.
#[derive(Debug, Clone, Copy)]
pub struct BsdfQuery {
    pub wi: Vec3,
    pub wo: Vec3,
    pub measure: Measure,
    /// Relative index of refraction along the sampled direction
    pub eta: f32,
}

impl BsdfQuery {
    /// A query for sampling: only `wi` is known.
    pub fn new(wi: Vec3) -> Self {
        Self {
            wi,
            wo: Vec3::ZERO,
            measure: Measure::SolidAngle,
            eta: 1.0,
        }
    }

    /// A query for evaluating a known pair of directions.
    pub fn with_wo(wi: Vec3, wo: Vec3) -> Self {
        Self {
            wi,
            wo,
            measure: Measure::SolidAngle,
            eta: 1.0,
        }
    }
}

/// Trait for surface scattering models.
pub trait Bsdf: Send + Sync + Debug {
    /// BSDF value for the pair in `query` (zero for delta lobes).
    fn eval(&self, query: &BsdfQuery) -> Color;

    /// Solid-angle density of sampling `query.wo` (zero for delta lobes).
    fn pdf(&self, query: &BsdfQuery) -> f32;

    /// Sample `query.wo` and return `eval * cos / pdf`.
    ///
    /// A zero return means the sample failed and carries no energy.
    fn sample(&self, query: &mut BsdfQuery, u: Vec2) -> Color;

    /// True if the BSDF is a Dirac distribution, so pointwise evaluation
    /// always returns zero and it can only be sampled.
    fn is_delta(&self) -> bool {
        false
    }
}

/// Lambertian (diffuse) BRDF.
#[derive(Debug, Clone)]
pub struct Diffuse {
    albedo: Color,
}

impl Diffuse {
    pub fn new(albedo: Color) -> Self {
        Self { albedo }
    }

    pub fn albedo(&self) -> Color {
        self.albedo
    }
}

impl Bsdf for Diffuse {
    fn eval(&self, query: &BsdfQuery) -> Color {
        if query.measure != Measure::SolidAngle
            || Frame::cos_theta(query.wi) <= 0.0
            || Frame::cos_theta(query.wo) <= 0.0
        {
            return Color::ZERO;
        }
        self.albedo * INV_PI
    }

    fn pdf(&self, query: &BsdfQuery) -> f32 {
        if query.measure != Measure::SolidAngle
            || Frame::cos_theta(query.wi) <= 0.0
            || Frame::cos_theta(query.wo) <= 0.0
        {
            return 0.0;
        }
        warp::cosine_hemisphere_pdf(query.wo)
    }

    fn sample(&self, query: &mut BsdfQuery, u: Vec2) -> Color {
        if Frame::cos_theta(query.wi) <= 0.0 {
            return Color::ZERO;
        }
        query.measure = Measure::SolidAngle;
        query.wo = warp::square_to_cosine_hemisphere(u);
        query.eta = 1.0;

        // eval * cos / pdf reduces to the albedo
        self.albedo
    }
}

/// Ideal mirror.
#[derive(Debug, Clone, Default)]
pub struct Mirror;

impl Bsdf for Mirror {
    fn eval(&self, _query: &BsdfQuery) -> Color {
        Color::ZERO
    }

    fn pdf(&self, _query: &BsdfQuery) -> f32 {
        0.0
    }

    fn sample(&self, query: &mut BsdfQuery, _u: Vec2) -> Color {
        if Frame::cos_theta(query.wi) <= 0.0 {
            return Color::ZERO;
        }
        query.wo = Vec3::new(-query.wi.x, -query.wi.y, query.wi.z);
        query.measure = Measure::Discrete;
        query.eta = 1.0;
        Color::ONE
    }

    fn is_delta(&self) -> bool {
        true
    }
}

/// Ideal smooth dielectric interface (glass).
#[derive(Debug, Clone)]
pub struct Dielectric {
    int_ior: f32,
    ext_ior: f32,
}

impl Dielectric {
    /// BK7 glass in air.
    pub fn glass() -> Self {
        Self::new(1.5046, 1.000277)
    }

    pub fn new(int_ior: f32, ext_ior: f32) -> Self {
        Self { int_ior, ext_ior }
    }
}

impl Bsdf for Dielectric {
    fn eval(&self, _query: &BsdfQuery) -> Color {
        Color::ZERO
    }

    fn pdf(&self, _query: &BsdfQuery) -> f32 {
        0.0
    }

    fn sample(&self, query: &mut BsdfQuery, u: Vec2) -> Color {
        let cos_i = Frame::cos_theta(query.wi);
        let fr = fresnel(cos_i, self.ext_ior, self.int_ior);
        query.measure = Measure::Discrete;

        if u.x < fr {
            query.wo = Vec3::new(-query.wi.x, -query.wi.y, query.wi.z);
            query.eta = 1.0;
            return Color::ONE;
        }

        // Refraction; entering when cos_i > 0
        let (eta_i, eta_t, n_sign) = if cos_i > 0.0 {
            (self.ext_ior, self.int_ior, 1.0)
        } else {
            (self.int_ior, self.ext_ior, -1.0)
        };
        let eta = eta_i / eta_t;
        let sin2_t = eta * eta * (1.0 - cos_i * cos_i).max(0.0);
        if sin2_t >= 1.0 {
            // fresnel() already returned 1 for total internal reflection
            return Color::ZERO;
        }
        let cos_t = (1.0 - sin2_t).sqrt();
        query.wo = (-query.wi * eta + Vec3::new(0.0, 0.0, n_sign * (eta * cos_i.abs() - cos_t)))
            .normalize();
        query.eta = eta_t / eta_i;
        Color::ONE
    }

    fn is_delta(&self) -> bool {
        true
    }
}

/// Glossy BRDF: a Beckmann microfacet lobe over a Lambertian base.
///
/// The specular weight is `1 - max(kd)`, so the sum never reflects more
/// than it receives.
#[derive(Debug, Clone)]
pub struct Microfacet {
    alpha: f32,
    int_ior: f32,
    ext_ior: f32,
    kd: Color,
    ks: f32,
}

impl Microfacet {
    /// Roughness `alpha` over a BK7 glass coating in air.
    pub fn new(alpha: f32, kd: Color) -> Self {
        Self::with_ior(alpha, kd, 1.5046, 1.000277)
    }

    pub fn with_ior(alpha: f32, kd: Color, int_ior: f32, ext_ior: f32) -> Self {
        let kd = kd.clamp(Color::ZERO, Color::ONE);
        Self {
            alpha: alpha.max(1e-3),
            int_ior,
            ext_ior,
            kd,
            ks: 1.0 - kd.max_element(),
        }
    }

    /// Smith shadowing for one direction, rational fit of the Beckmann term.
    fn g1(&self, v: Vec3, wh: Vec3) -> f32 {
        if v.dot(wh) / Frame::cos_theta(v) <= -f32::EPSILON {
            return 0.0;
        }
        let cos = Frame::cos_theta(v);
        let b = cos / (self.alpha * (1.0 - cos * cos).max(0.0).sqrt());
        if b < 1.6 {
            (3.535 * b + 2.181 * b * b) / (1.0 + 2.276 * b + 2.577 * b * b)
        } else {
            1.0
        }
    }

    fn is_reflection(query: &BsdfQuery) -> bool {
        query.measure == Measure::SolidAngle
            && Frame::cos_theta(query.wi) > 0.0
            && Frame::cos_theta(query.wo) > 0.0
    }
}

impl Bsdf for Microfacet {
    fn eval(&self, query: &BsdfQuery) -> Color {
        if !Self::is_reflection(query) {
            return Color::ZERO;
        }
        let wh = (query.wi + query.wo).normalize();
        let cos_h = Frame::cos_theta(wh);
        let d = warp::beckmann_pdf(wh, self.alpha) / cos_h;
        let f = fresnel(wh.dot(query.wi), self.ext_ior, self.int_ior);
        let g = self.g1(query.wi, wh) * self.g1(query.wo, wh);
        let specular = self.ks * d * f * g
            / (4.0 * Frame::cos_theta(query.wi) * Frame::cos_theta(query.wo));
        self.kd * INV_PI + Color::splat(specular)
    }

    fn pdf(&self, query: &BsdfQuery) -> f32 {
        if !Self::is_reflection(query) {
            return 0.0;
        }
        let wh = (query.wi + query.wo).normalize();
        self.ks * warp::beckmann_pdf(wh, self.alpha) / (4.0 * wh.dot(query.wo))
            + (1.0 - self.ks) * warp::cosine_hemisphere_pdf(query.wo)
    }

    fn sample(&self, query: &mut BsdfQuery, u: Vec2) -> Color {
        if Frame::cos_theta(query.wi) <= 0.0 {
            return Color::ZERO;
        }
        query.wo = if u.x < self.ks {
            let m = warp::square_to_beckmann(Vec2::new(u.x / self.ks, u.y), self.alpha);
            (2.0 * m.dot(query.wi) * m - query.wi).normalize()
        } else {
            let ux = (u.x - self.ks) / (1.0 - self.ks);
            warp::square_to_cosine_hemisphere(Vec2::new(ux, u.y))
        };
        query.measure = Measure::SolidAngle;
        query.eta = 1.0;

        // Microfacets may reflect below the horizon
        let pdf = self.pdf(query);
        if pdf <= 0.0 {
            return Color::ZERO;
        }
        self.eval(query) * Frame::cos_theta(query.wo) / pdf
    }
}

/// Unpolarized Fresnel reflectance of a dielectric interface.
pub fn fresnel(cos_theta_i: f32, ext_ior: f32, int_ior: f32) -> f32 {
    let (mut eta_i, mut eta_t) = (ext_ior, int_ior);
    let mut cos_i = cos_theta_i;

    if ext_ior == int_ior {
        return 0.0;
    }

    if cos_i < 0.0 {
        std::mem::swap(&mut eta_i, &mut eta_t);
        cos_i = -cos_i;
    }

    let eta = eta_i / eta_t;
    let sin_t2 = eta * eta * (1.0 - cos_i * cos_i).max(0.0);
    if sin_t2 > 1.0 {
        return 1.0;
    }

    let cos_t = (1.0 - sin_t2).sqrt();
    let rs = (eta_i * cos_i - eta_t * cos_t) / (eta_i * cos_i + eta_t * cos_t);
    let rp = (eta_t * cos_i - eta_i * cos_t) / (eta_t * cos_i + eta_i * cos_t);

    (rs * rs + rp * rp) / 2.0
}
