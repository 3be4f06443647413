//! RLT Render - CPU path tracing with learned directional guiding.
//!
//! A [`Scene`] indexes its triangles in an octree and keeps a list of
//! emitters. An [`Integrator`] estimates the radiance along camera rays,
//! optionally sampling bounces from a [`Guider`](rlt_guide::Guider) that it
//! trains as it goes. [`render`] splits the image into spiral-ordered
//! buckets and renders them in parallel with rayon.
//!
//! # Example
//!
//! ```ignore
//! use rlt_render::*;
//!
//! let scene = Scene::new(MeshSet::from_meshes(cornell_box())?, OctreeConfig::default())?;
//! let config = RenderConfig::default();
//! let camera = Camera::new(&cornell_camera(), config.width, config.height);
//! let mut integrator = create_integrator(IntegratorKind::Path, config.max_depth, None)?;
//! run(&scene, &camera, integrator.as_mut(), &config)?.save_png("out.png".as_ref())?;
//! ```

mod bucket;
mod camera;
mod cornell;
mod error;
mod integrator;
mod renderer;
mod scene;

pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use camera::{Camera, CameraConfig};
pub use cornell::{cornell_box, cornell_camera};
pub use error::{RenderError, RenderResult};
pub use integrator::{
    create_integrator, safe_div, GuidedMisIntegrator, GuidedPathIntegrator, Integrator,
    IntegratorKind, PathIntegrator,
};
pub use renderer::{color_to_rgba, linear_to_gamma, render, run, ImageBuffer, RenderConfig};
pub use scene::Scene;
