//! Small geometric types shared by the whole renderer: rays, the
//! orthonormal shading frame and a handful of scalar helpers. Vector
//! math itself comes from `glam`.

use glam::Vec3;

/// Offset applied along the outgoing direction when spawning secondary
/// rays, to avoid re-intersecting the surface they originate from.
pub const RAY_EPSILON: f32 = 1.0e-3;

/// Shadow rays are shortened by this factor so they don't register a hit
/// on the light surface itself.
pub const SHADOW_RAY_MARGIN: f32 = 0.999;

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
    /// Component-wise reciprocal of the direction, cached for slab tests.
    pub inv_dir: Vec3,
    /// `origin * inv_dir`, the other half of the slab-test precomputation.
    pub scaled_origin: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        let inv_dir = dir.recip();
        Self {
            origin,
            dir,
            inv_dir,
            scaled_origin: origin * inv_dir,
        }
    }

    /// Spawn a secondary ray from `origin`, nudged along `dir` to escape
    /// the surface it starts on.
    pub fn spawn(origin: Vec3, dir: Vec3) -> Self {
        Ray::new(origin + dir * RAY_EPSILON, dir)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// An orthonormal (tangent, bitangent, normal) triple anchored at a
/// world-space position. All BSDF math happens in this local frame with
/// X = tangent and Z = normal.
#[derive(Debug, Clone, Copy)]
pub struct ShadingFrame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
    pub position: Vec3,
}

impl ShadingFrame {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        let (tangent, bitangent) = build_orthonormal_basis(normal);
        Self {
            tangent,
            bitangent,
            normal,
            position,
        }
    }

    pub fn with_tangent(position: Vec3, normal: Vec3, tangent: Vec3) -> Self {
        let bitangent = normal.cross(tangent).normalize();
        let tangent = bitangent.cross(normal);
        Self {
            tangent,
            bitangent,
            normal,
            position,
        }
    }

    pub fn world_to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.tangent.dot(v),
            self.bitangent.dot(v),
            self.normal.dot(v),
        )
    }

    pub fn local_to_world(&self, v: Vec3) -> Vec3 {
        self.tangent * v.x + self.bitangent * v.y + self.normal * v.z
    }

    /// Cosine between a world-space direction and the frame normal.
    pub fn cos_theta(&self, dir: Vec3) -> f32 {
        self.normal.dot(dir)
    }
}

/// Build a right-handed orthonormal basis around a unit vector.
/// Frisvad-style branchless construction.
pub fn build_orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);
    (tangent, bitangent)
}

/// Mirror reflection of `v` about a normal (both unit length).
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    n * (2.0 * v.dot(n)) - v
}

pub fn sqr(x: f32) -> f32 {
    x * x
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn clamp(x: f32, min: f32, max: f32) -> f32 {
    x.max(min).min(max)
}

/// 64-bit finalizer-style integer hash (xorshift-multiply mix).
pub fn hash_u64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}

/// Convert an HSV triple (all in [0,1]) to RGB. Used by the triangle-ID
/// debug view.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    let h = (h.fract() + 1.0).fract() * 6.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match i as u32 {
        0 => Vec3::new(v, t, p),
        1 => Vec3::new(q, v, p),
        2 => Vec3::new(p, v, t),
        3 => Vec3::new(p, q, v),
        4 => Vec3::new(t, p, v),
        _ => Vec3::new(v, p, q),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthonormal_basis_is_orthonormal() {
        let dirs = [
            Vec3::Z,
            -Vec3::Z,
            Vec3::new(0.3, -0.7, 0.2).normalize(),
            Vec3::new(-0.9, 0.1, -0.1).normalize(),
        ];
        for n in dirs {
            let (t, b) = build_orthonormal_basis(n);
            assert!(t.dot(b).abs() < 1.0e-5);
            assert!(t.dot(n).abs() < 1.0e-5);
            assert!(b.dot(n).abs() < 1.0e-5);
            assert!((t.length() - 1.0).abs() < 1.0e-5);
            assert!((b.length() - 1.0).abs() < 1.0e-5);
        }
    }

    #[test]
    fn frame_round_trips_directions() {
        let frame = ShadingFrame::new(Vec3::ZERO, Vec3::new(0.1, 0.8, 0.3).normalize());
        let v = Vec3::new(0.4, -0.2, 0.6).normalize();
        let local = frame.world_to_local(v);
        let back = frame.local_to_world(local);
        assert!((v - back).length() < 1.0e-5);
    }

    #[test]
    fn reflect_preserves_angle() {
        let n = Vec3::Z;
        let v = Vec3::new(0.5, 0.0, 0.5f32.sqrt()).normalize();
        let r = reflect(v, n);
        assert!((r.z - v.z).abs() < 1.0e-6);
        assert!((r.x + v.x).abs() < 1.0e-6);
    }
}
