use glam::{Vec2, Vec3};

use crate::math::{build_orthonormal_basis, Ray, ShadingFrame};

use super::{Shape, ShapeHit};

/// Infinite plane through a point. Texture coordinates are the
/// projections onto the in-plane basis scaled by `texture_scale`.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub origin: Vec3,
    pub normal: Vec3,
    pub texture_scale: f32,

    tangent: Vec3,
    bitangent: Vec3,
}

impl Plane {
    pub fn new(origin: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        let (tangent, bitangent) = build_orthonormal_basis(normal);
        Self {
            origin,
            normal,
            texture_scale: 1.0,
            tangent,
            bitangent,
        }
    }
}

impl Shape for Plane {
    fn intersect(&self, ray: &Ray) -> Option<ShapeHit> {
        let denom = ray.dir.dot(self.normal);
        if denom.abs() < 1.0e-9 {
            return None;
        }
        let t = (self.origin - ray.origin).dot(self.normal) / denom;
        if t <= 1.0e-5 {
            return None;
        }
        let p = ray.at(t) - self.origin;
        Some(ShapeHit {
            distance: t,
            u: p.dot(self.tangent),
            v: p.dot(self.bitangent),
            sub_object_id: 0,
        })
    }

    fn shading_frame(&self, ray: &Ray, hit: &ShapeHit) -> (ShadingFrame, Vec2) {
        let position = ray.at(hit.distance);
        let frame = ShadingFrame::with_tangent(position, self.normal, self.tangent);
        let uv = Vec2::new(hit.u, hit.v) * self.texture_scale;
        (frame, uv)
    }

    fn bounds(&self) -> Option<(Vec3, Vec3)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersects_from_both_sides() {
        let p = Plane::new(Vec3::ZERO, Vec3::Y);
        let above = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        assert!((p.intersect(&above).unwrap().distance - 2.0).abs() < 1.0e-5);
        let below = Ray::new(Vec3::new(0.0, -3.0, 0.0), Vec3::Y);
        assert!((p.intersect(&below).unwrap().distance - 3.0).abs() < 1.0e-5);
        let parallel = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::X);
        assert!(p.intersect(&parallel).is_none());
    }
}
