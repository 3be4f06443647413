//! Wavefront OBJ loading.

use std::path::Path;

use rlt_math::{Vec2, Vec3};

use crate::error::{LoadError, LoadResult};
use crate::mesh::Mesh;

/// Load every model of an OBJ file as a separate mesh.
///
/// Faces are triangulated and vertex attributes re-indexed to a single index
/// buffer. Materials in the MTL file are ignored; meshes get the default BSDF.
pub fn load_obj<P: AsRef<Path>>(path: P) -> LoadResult<Vec<Mesh>> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )?;

    let meshes: Vec<Mesh> = models
        .into_iter()
        .filter(|m| !m.mesh.indices.is_empty())
        .map(|model| {
            let m = model.mesh;
            let positions: Vec<Vec3> = m.positions.chunks_exact(3).map(Vec3::from_slice).collect();
            let normals = (m.normals.len() == m.positions.len())
                .then(|| m.normals.chunks_exact(3).map(Vec3::from_slice).collect());
            let uvs: Option<Vec<Vec2>> = (m.texcoords.len() / 2 == positions.len()
                && !m.texcoords.is_empty())
            .then(|| m.texcoords.chunks_exact(2).map(Vec2::from_slice).collect());

            log::debug!(
                "OBJ model '{}': {} vertices, {} triangles, normals: {}",
                model.name,
                positions.len(),
                m.indices.len() / 3,
                normals.is_some()
            );

            let mut mesh = Mesh::new(positions, m.indices, normals).with_name(model.name);
            if let Some(uvs) = uvs {
                mesh = mesh.with_uvs(uvs);
            }
            mesh
        })
        .collect();

    if meshes.is_empty() {
        return Err(LoadError::NoGeometry(path.display().to_string()));
    }

    log::info!("Loaded {} meshes from {}", meshes.len(), path.display());
    Ok(meshes)
}
