//! Aggregation of several meshes into one triangle set.
//!
//! The geometry index is built over a single triangle set. `MeshSet`
//! concatenates the triangles of every mesh in the scene and maps a global
//! triangle id back to its mesh and local index.

use std::sync::Arc;

use rlt_math::{Aabb, Ray};

use crate::error::LoadError;
use crate::mesh::Mesh;

#[derive(Debug, Default, Clone)]
pub struct MeshSet {
    meshes: Vec<Arc<Mesh>>,
    /// First global triangle id of each mesh
    offsets: Vec<u32>,
    triangle_count: u32,
    bounds: Aabb,
}

impl MeshSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from meshes, validating each one.
    pub fn from_meshes(meshes: impl IntoIterator<Item = Mesh>) -> Result<Self, LoadError> {
        let mut set = Self::new();
        for mesh in meshes {
            set.add_mesh(mesh)?;
        }
        Ok(set)
    }

    /// Append a mesh. Fails if its index buffer is not a whole number of
    /// triangles or references a vertex that does not exist.
    pub fn add_mesh(&mut self, mesh: Mesh) -> Result<(), LoadError> {
        if mesh.indices.len() % 3 != 0 {
            return Err(LoadError::InvalidIndices(format!(
                "mesh '{}' has {} indices, not a multiple of 3",
                mesh.name,
                mesh.indices.len()
            )));
        }
        if let Some(&bad) = mesh
            .indices
            .iter()
            .find(|&&i| i as usize >= mesh.positions.len())
        {
            return Err(LoadError::InvalidIndices(format!(
                "mesh '{}' references vertex {} but has {} vertices",
                mesh.name,
                bad,
                mesh.positions.len()
            )));
        }
        if let Some(normals) = &mesh.normals {
            if normals.len() != mesh.positions.len() {
                return Err(LoadError::InvalidIndices(format!(
                    "mesh '{}' has {} normals for {} vertices",
                    mesh.name,
                    normals.len(),
                    mesh.positions.len()
                )));
            }
        }
        if let Some(uvs) = &mesh.uvs {
            if uvs.len() != mesh.positions.len() {
                return Err(LoadError::InvalidIndices(format!(
                    "mesh '{}' has {} texture coordinates for {} vertices",
                    mesh.name,
                    uvs.len(),
                    mesh.positions.len()
                )));
            }
        }

        log::debug!(
            "MeshSet: adding '{}' ({} triangles) at offset {}",
            mesh.name,
            mesh.triangle_count(),
            self.triangle_count
        );

        self.offsets.push(self.triangle_count);
        self.triangle_count += mesh.triangle_count() as u32;
        self.bounds = Aabb::surrounding(&self.bounds, &mesh.bounds);
        self.meshes.push(Arc::new(mesh));
        Ok(())
    }

    pub fn meshes(&self) -> &[Arc<Mesh>] {
        &self.meshes
    }

    pub fn triangle_count(&self) -> u32 {
        self.triangle_count
    }

    pub fn is_empty(&self) -> bool {
        self.triangle_count == 0
    }

    /// Bounding box of all vertices of all meshes.
    pub fn bounding_box(&self) -> Aabb {
        self.bounds
    }

    /// Mesh and local triangle index of global triangle `prim`.
    #[inline]
    pub fn resolve(&self, prim: u32) -> (&Mesh, u32) {
        // offsets is sorted; the owning mesh is the last one starting at or before prim
        let m = self.offsets.partition_point(|&o| o <= prim) - 1;
        (&self.meshes[m], prim - self.offsets[m])
    }

    pub fn triangle_bounds(&self, prim: u32) -> Aabb {
        let (mesh, f) = self.resolve(prim);
        mesh.triangle_bounds(f)
    }

    /// Barycentric `(u, v)` and ray parameter of a hit on triangle `prim`.
    #[inline]
    pub fn intersect_triangle(&self, prim: u32, ray: &Ray) -> Option<(f32, f32, f32)> {
        let (mesh, f) = self.resolve(prim);
        mesh.intersect_triangle(f, ray)
    }

    /// Meshes that carry an emitter.
    pub fn emitters(&self) -> impl Iterator<Item = &Arc<Mesh>> {
        self.meshes.iter().filter(|m| m.is_emitter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlt_math::Vec3;

    fn tri(z: f32) -> Mesh {
        Mesh::new(
            vec![Vec3::new(0.0, 0.0, z), Vec3::new(1.0, 0.0, z), Vec3::new(0.0, 1.0, z)],
            vec![0, 1, 2],
            None,
        )
    }

    #[test]
    fn test_locate_across_meshes() {
        let quad = Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            vec![0, 1, 2, 0, 2, 3],
            None,
        )
        .with_name("quad");
        let set = MeshSet::from_meshes([quad, tri(1.0).with_name("tri")]).unwrap();

        assert_eq!(set.triangle_count(), 3);
        let (m, f) = set.resolve(1);
        assert_eq!((m.name.as_str(), f), ("quad", 1));
        let (m, f) = set.resolve(2);
        assert_eq!((m.name.as_str(), f), ("tri", 0));
        assert_eq!(set.bounding_box().max, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let bad = Mesh::new(vec![Vec3::ZERO, Vec3::X], vec![0, 1, 2], None);
        let err = MeshSet::from_meshes([bad]).unwrap_err();
        assert!(matches!(err, LoadError::InvalidIndices(_)));
    }

    #[test]
    fn test_rejects_partial_triangle() {
        let bad = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1], None);
        assert!(MeshSet::from_meshes([bad]).is_err());
    }

    #[test]
    fn test_rejects_short_attribute_arrays() {
        let short_uvs = tri(0.0).with_uvs(vec![rlt_math::Vec2::ZERO; 2]);
        let err = MeshSet::from_meshes([short_uvs]).unwrap_err();
        assert!(matches!(err, LoadError::InvalidIndices(ref msg) if msg.contains("texture")));

        let short_normals = Mesh::new(tri(0.0).positions, vec![0, 1, 2], Some(vec![Vec3::Z]));
        assert!(matches!(
            MeshSet::from_meshes([short_normals]),
            Err(LoadError::InvalidIndices(_))
        ));

        let full = tri(0.0).with_uvs(vec![rlt_math::Vec2::ZERO; 3]);
        assert!(MeshSet::from_meshes([full]).is_ok());
    }

    #[test]
    fn test_intersect_triangle_global_id() {
        let set = MeshSet::from_meshes([tri(0.0), tri(2.0)]).unwrap();
        let ray = Ray::new(Vec3::new(0.2, 0.2, 5.0), -Vec3::Z);

        let (_, _, t0) = set.intersect_triangle(0, &ray).unwrap();
        let (_, _, t1) = set.intersect_triangle(1, &ray).unwrap();
        assert!((t0 - 5.0).abs() < 1e-5);
        assert!((t1 - 3.0).abs() < 1e-5);
    }
}
