//! Pinhole camera for primary ray generation.

use rlt_math::{Ray, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Camera placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub look_from: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub vfov: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::Y,
            vfov: 90.0,
        }
    }
}

/// Camera with its viewport precomputed for one image resolution.
#[derive(Debug, Clone)]
pub struct Camera {
    center: Vec3,
    pixel00_loc: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
    width: u32,
    height: u32,
}

impl Camera {
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let center = config.look_from;

        // Viewport on the plane at unit distance
        let h = (config.vfov.to_radians() / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * (width as f32 / height.max(1) as f32);

        let w = (config.look_from - config.look_at).normalize();
        let u = config.up.cross(w).normalize();
        let v = w.cross(u);

        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;
        let pixel_delta_u = viewport_u / width.max(1) as f32;
        let pixel_delta_v = viewport_v / height.max(1) as f32;

        let viewport_upper_left = center - w - viewport_u / 2.0 - viewport_v / 2.0;

        Self {
            center,
            pixel00_loc: viewport_upper_left + 0.5 * (pixel_delta_u + pixel_delta_v),
            pixel_delta_u,
            pixel_delta_v,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Ray through pixel `(x, y)`, offset inside the pixel by `jitter` in `[0, 1)^2`.
    pub fn generate_ray(&self, x: u32, y: u32, jitter: Vec2) -> Ray {
        let offset = jitter - Vec2::splat(0.5);
        let pixel_sample = self.pixel00_loc
            + (x as f32 + offset.x) * self.pixel_delta_u
            + (y as f32 + offset.y) * self.pixel_delta_v;
        Ray::new(self.center, (pixel_sample - self.center).normalize())
    }
}
