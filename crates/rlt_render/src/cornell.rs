//! Built-in Cornell box, used when no scene file is given.

use std::sync::Arc;

use rlt_core::{AreaLight, Diffuse, Mesh, Microfacet, Mirror};
use rlt_math::{Color, Vec3};

use crate::camera::CameraConfig;

/// Two triangles over the corners `a b c d` (in order around the quad),
/// wound so the geometric normal points along `facing`.
fn quad(name: &str, corners: [Vec3; 4], facing: Vec3) -> Mesh {
    let [a, b, c, _] = corners;
    let indices = if (b - a).cross(c - a).dot(facing) >= 0.0 {
        vec![0, 1, 2, 0, 2, 3]
    } else {
        vec![0, 2, 1, 0, 3, 2]
    };
    Mesh::new(corners.to_vec(), indices, None).with_name(name)
}

/// Axis-aligned box with outward facing sides, without its bottom face.
fn block(name: &str, min: Vec3, max: Vec3) -> Vec<Mesh> {
    let p = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
    let (x0, y0, z0) = (min.x, min.y, min.z);
    let (x1, y1, z1) = (max.x, max.y, max.z);
    vec![
        quad(name, [p(x0, y1, z0), p(x1, y1, z0), p(x1, y1, z1), p(x0, y1, z1)], Vec3::Y),
        quad(name, [p(x0, y0, z0), p(x0, y1, z0), p(x0, y1, z1), p(x0, y0, z1)], -Vec3::X),
        quad(name, [p(x1, y0, z0), p(x1, y1, z0), p(x1, y1, z1), p(x1, y0, z1)], Vec3::X),
        quad(name, [p(x0, y0, z0), p(x1, y0, z0), p(x1, y1, z0), p(x0, y1, z0)], -Vec3::Z),
        quad(name, [p(x0, y0, z1), p(x1, y0, z1), p(x1, y1, z1), p(x0, y1, z1)], Vec3::Z),
    ]
}

/// Unit box open towards +Z, y up, with a square ceiling light, a glossy
/// block and a mirror block.
pub fn cornell_box() -> Vec<Mesh> {
    let white = Arc::new(Diffuse::new(Color::splat(0.73)));
    let red = Arc::new(Diffuse::new(Color::new(0.65, 0.05, 0.05)));
    let green = Arc::new(Diffuse::new(Color::new(0.12, 0.45, 0.15)));
    let p = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);

    let mut meshes = vec![
        quad("floor", [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 0.0, 1.0), p(0.0, 0.0, 1.0)], Vec3::Y)
            .with_bsdf(white.clone()),
        quad("ceiling", [p(0.0, 1.0, 0.0), p(1.0, 1.0, 0.0), p(1.0, 1.0, 1.0), p(0.0, 1.0, 1.0)], -Vec3::Y)
            .with_bsdf(white.clone()),
        quad("back", [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0)], Vec3::Z)
            .with_bsdf(white.clone()),
        quad("left", [p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 1.0, 1.0), p(0.0, 0.0, 1.0)], Vec3::X)
            .with_bsdf(red),
        quad("right", [p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(1.0, 1.0, 1.0), p(1.0, 0.0, 1.0)], -Vec3::X)
            .with_bsdf(green),
        quad("light", [p(0.35, 0.999, 0.35), p(0.65, 0.999, 0.35), p(0.65, 0.999, 0.65), p(0.35, 0.999, 0.65)], -Vec3::Y)
            .with_bsdf(white.clone())
            .with_emitter(Arc::new(AreaLight::new(Color::splat(12.0)))),
    ];

    let glossy = Arc::new(Microfacet::new(0.2, Color::splat(0.4)));
    meshes.extend(
        block("short_block", p(0.55, 0.0, 0.45), p(0.8, 0.3, 0.7))
            .into_iter()
            .map(|m| m.with_bsdf(glossy.clone())),
    );
    let mirror = Arc::new(Mirror);
    meshes.extend(
        block("tall_block", p(0.2, 0.0, 0.15), p(0.45, 0.6, 0.4))
            .into_iter()
            .map(|m| m.with_bsdf(mirror.clone())),
    );
    meshes
}

/// Camera looking into the open side of [`cornell_box`].
pub fn cornell_camera() -> CameraConfig {
    CameraConfig {
        look_from: Vec3::new(0.5, 0.5, 2.4),
        look_at: Vec3::new(0.5, 0.5, 0.0),
        up: Vec3::Y,
        vfov: 38.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quads_face_inwards() {
        let meshes = cornell_box();
        let inside = Vec3::splat(0.5);
        for mesh in meshes.iter().take(6) {
            for f in 0..mesh.triangle_count() as u32 {
                let [p0, p1, p2] = mesh.triangle(f);
                let n = (p1 - p0).cross(p2 - p0);
                assert!(n.dot(inside - p0) > 0.0, "{} faces outwards", mesh.name);
            }
        }
    }

    #[test]
    fn test_block_faces_outwards() {
        let centre = Vec3::new(0.5, 0.5, 0.5);
        for mesh in block("b", Vec3::ZERO, Vec3::ONE) {
            for f in 0..mesh.triangle_count() as u32 {
                let [p0, p1, p2] = mesh.triangle(f);
                let n = (p1 - p0).cross(p2 - p0);
                assert!(n.dot(p0 - centre) > 0.0);
            }
        }
    }

    #[test]
    fn test_single_emitter() {
        let meshes = cornell_box();
        assert_eq!(meshes.iter().filter(|m| m.is_emitter()).count(), 1);
    }
}
