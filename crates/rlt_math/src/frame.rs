use crate::Vec3;

/// Orthonormal shading frame `(s, t, n)`.
///
/// Local coordinates put the normal on +Z, so `cos_theta` of a local
/// direction is simply its z component.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub s: Vec3,
    pub t: Vec3,
    pub n: Vec3,
}

impl Frame {
    /// Build a frame around a unit normal.
    pub fn from_normal(n: Vec3) -> Self {
        let (s, t) = coordinate_system(n);
        Self { s, t, n }
    }

    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.s), v.dot(self.t), v.dot(self.n))
    }

    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.s * v.x + self.t * v.y + self.n * v.z
    }

    #[inline]
    pub fn cos_theta(v: Vec3) -> f32 {
        v.z
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            s: Vec3::X,
            t: Vec3::Y,
            n: Vec3::Z,
        }
    }
}

/// Two tangents completing `n` to a right-handed orthonormal basis
/// (branchless construction of Duff et al. 2017).
fn coordinate_system(n: Vec3) -> (Vec3, Vec3) {
    let sign = 1.0f32.copysign(n.z);
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    let s = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let t = Vec3::new(b, sign + n.y * n.y * a, -n.y);
    (s, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(f: &Frame) {
        assert!((f.s.length() - 1.0).abs() < 1e-5);
        assert!((f.t.length() - 1.0).abs() < 1e-5);
        assert!(f.s.dot(f.t).abs() < 1e-5);
        assert!(f.s.dot(f.n).abs() < 1e-5);
        assert!(f.t.dot(f.n).abs() < 1e-5);
        // right handed
        assert!((f.s.cross(f.t) - f.n).length() < 1e-5);
    }

    #[test]
    fn test_frame_orthonormal() {
        for n in [
            Vec3::Z,
            -Vec3::Z,
            Vec3::X,
            Vec3::new(1.0, 2.0, -3.0).normalize(),
            Vec3::new(-0.3, 0.1, 0.9).normalize(),
        ] {
            assert_orthonormal(&Frame::from_normal(n));
        }
    }

    #[test]
    fn test_local_world_roundtrip() {
        let frame = Frame::from_normal(Vec3::new(0.2, -0.7, 0.4).normalize());
        let v = Vec3::new(0.3, 0.5, -0.1);
        let back = frame.to_world(frame.to_local(v));
        assert!((back - v).length() < 1e-5);
        assert!((Frame::cos_theta(frame.to_local(frame.n)) - 1.0).abs() < 1e-5);
    }
}
