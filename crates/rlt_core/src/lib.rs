//! RLT Core - Scene description shared by the index, the guider and the renderer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh`, `MeshSet` and OBJ loading
//! - **Shading**: the `Bsdf` and `Emitter` traits with diffuse, mirror,
//!   dielectric and area light implementations
//! - **Hits**: `Intersection`, a resolved surface record
//! - **Sampling**: the `Sampler` trait
//!
//! # Example
//!
//! ```ignore
//! use rlt_core::{load_obj, MeshSet};
//!
//! let meshes = load_obj("scene.obj")?;
//! let set = MeshSet::from_meshes(meshes)?;
//! println!("{} triangles", set.triangle_count());
//! ```

pub mod bsdf;
pub mod emitter;
pub mod error;
pub mod intersection;
pub mod mesh;
pub mod mesh_set;
pub mod obj;
pub mod sampler;

// Re-export commonly used types
pub use bsdf::{Bsdf, BsdfQuery, Dielectric, Diffuse, Measure, Microfacet, Mirror};
pub use emitter::{AreaLight, Emitter, EmitterSample};
pub use error::{LoadError, LoadResult};
pub use intersection::Intersection;
pub use mesh::{Mesh, SurfaceSample};
pub use mesh_set::MeshSet;
pub use obj::load_obj;
pub use sampler::{IndependentSampler, Sampler};
