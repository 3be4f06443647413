//! Maps from the unit square to directions and their densities.
//!
//! The uniform hemisphere/sphere maps are area preserving up to a constant,
//! which is what lets the guider treat a regular grid over `[0,1)^2` as a set
//! of equal solid-angle bins.

use crate::{Vec2, Vec3, INV_PI, INV_TWO_PI};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// `(z, phi / 2pi)` -> direction on the +Z hemisphere.
pub fn square_to_uniform_hemisphere(u: Vec2) -> Vec3 {
    let z = u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn uniform_hemisphere_pdf(v: Vec3) -> f32 {
    if v.z >= 0.0 {
        INV_TWO_PI
    } else {
        0.0
    }
}

/// Inverse of [`square_to_uniform_hemisphere`] (z is clamped into `[0, 1]`).
pub fn uniform_hemisphere_to_square(v: Vec3) -> Vec2 {
    Vec2::new(v.z.clamp(0.0, 1.0), spherical_phi(v) * INV_TWO_PI)
}

/// `(0.5 * (z + 1), phi / 2pi)` -> direction on the unit sphere.
pub fn square_to_uniform_sphere(u: Vec2) -> Vec3 {
    let z = 2.0 * u.x - 1.0;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Inverse of [`square_to_uniform_sphere`].
pub fn uniform_sphere_to_square(v: Vec3) -> Vec2 {
    Vec2::new(
        (0.5 * (v.z + 1.0)).clamp(0.0, 1.0),
        spherical_phi(v) * INV_TWO_PI,
    )
}

/// Shirley-Chiu concentric mapping to the unit disk.
pub fn square_to_concentric_disk(u: Vec2) -> Vec2 {
    let offset = 2.0 * u - Vec2::ONE;
    if offset == Vec2::ZERO {
        return Vec2::ZERO;
    }

    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, FRAC_PI_4 * (offset.y / offset.x))
    } else {
        (offset.y, FRAC_PI_2 - FRAC_PI_4 * (offset.x / offset.y))
    };

    r * Vec2::new(theta.cos(), theta.sin())
}

pub fn square_to_cosine_hemisphere(u: Vec2) -> Vec3 {
    let d = square_to_concentric_disk(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

pub fn cosine_hemisphere_pdf(v: Vec3) -> f32 {
    if v.z > 0.0 {
        v.z * INV_PI
    } else {
        0.0
    }
}

/// Beckmann-distributed microfacet normal with roughness `alpha`.
pub fn square_to_beckmann(u: Vec2, alpha: f32) -> Vec3 {
    let tan2 = -alpha * alpha * (1.0 - u.x).max(f32::MIN_POSITIVE).ln();
    let cos_theta = 1.0 / (1.0 + tan2).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Density of [`square_to_beckmann`], i.e. `D(m) * cos(theta_m)`.
pub fn beckmann_pdf(m: Vec3, alpha: f32) -> f32 {
    if m.z <= 0.0 {
        return 0.0;
    }
    let cos2 = m.z * m.z;
    let tan2 = (1.0 - cos2).max(0.0) / cos2;
    let a2 = alpha * alpha;
    (-tan2 / a2).exp() * INV_PI / (a2 * cos2 * m.z)
}

/// Uniformly distributed barycentric coordinates `(b1, b2)` of a triangle.
pub fn square_to_uniform_triangle(u: Vec2) -> Vec2 {
    let su = u.x.sqrt();
    Vec2::new(1.0 - su, u.y * su)
}

/// Azimuth of `v` around +Z in `[0, 2pi)`.
pub fn spherical_phi(v: Vec3) -> f32 {
    let phi = v.y.atan2(v.x);
    if phi < 0.0 {
        phi + 2.0 * PI
    } else {
        phi
    }
}
