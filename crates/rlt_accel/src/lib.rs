//! RLT Accel - Octree geometry index.
//!
//! Answers nearest-hit and occlusion queries against a single aggregated
//! triangle set. Construction is parallel (rayon fork-join over octants);
//! the finished tree is read-only and shared freely across threads.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rlt_accel::{Octree, OctreeConfig};
//!
//! let mut octree = Octree::new(OctreeConfig::default());
//! octree.add_geometry(Arc::new(mesh_set))?;
//! octree.build()?;
//! if let Some(its) = octree.intersect(&ray, false) {
//!     println!("hit {} at t = {}", its.mesh.name, its.t);
//! }
//! ```

mod config;
mod construct;
mod error;
mod node;
mod octree;

pub use config::OctreeConfig;
pub use error::AccelError;
pub use node::{Node, NodeId};
pub use octree::Octree;
