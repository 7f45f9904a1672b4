use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::math::{Ray, ShadingFrame};

use super::{Shape, ShapeHit};

#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

impl Shape for Sphere {
    fn intersect(&self, ray: &Ray) -> Option<ShapeHit> {
        let d = self.center - ray.origin;
        let v = ray.dir.dot(d) as f64;
        let det = (self.radius * self.radius) as f64 - d.length_squared() as f64 + v * v;
        if det <= 0.0 {
            return None;
        }
        let sqrt_det = det.sqrt();
        let near = (v - sqrt_det) as f32;
        let far = (v + sqrt_det) as f32;
        let distance = if near > 1.0e-5 {
            near
        } else if far > 1.0e-5 {
            far
        } else {
            return None;
        };
        Some(ShapeHit {
            distance,
            u: 0.0,
            v: 0.0,
            sub_object_id: 0,
        })
    }

    fn shading_frame(&self, ray: &Ray, hit: &ShapeHit) -> (ShadingFrame, Vec2) {
        let position = ray.at(hit.distance);
        let normal = (position - self.center).normalize();
        let frame = ShadingFrame::new(position, normal);
        // spherical texture coordinates
        let uv = Vec2::new(
            normal.z.atan2(normal.x) * 0.5 / PI + 0.5,
            normal.y.clamp(-1.0, 1.0).acos() / PI,
        );
        (frame, uv)
    }

    fn bounds(&self) -> Option<(Vec3, Vec3)> {
        Some((
            self.center - Vec3::splat(self.radius),
            self.center + Vec3::splat(self.radius),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_from_outside_and_inside() {
        let s = Sphere::new(Vec3::ZERO, 1.0);
        let outside = Ray::new(Vec3::new(0.0, 0.0, -3.0), Vec3::Z);
        let hit = s.intersect(&outside).unwrap();
        assert!((hit.distance - 2.0).abs() < 1.0e-4);

        let inside = Ray::new(Vec3::ZERO, Vec3::Z);
        let hit = s.intersect(&inside).unwrap();
        assert!((hit.distance - 1.0).abs() < 1.0e-4);

        let miss = Ray::new(Vec3::new(0.0, 2.0, -3.0), Vec3::Z);
        assert!(s.intersect(&miss).is_none());
    }

    #[test]
    fn shading_normal_points_outward() {
        let s = Sphere::new(Vec3::ZERO, 2.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let hit = s.intersect(&ray).unwrap();
        let (frame, _) = s.shading_frame(&ray, &hit);
        assert!((frame.normal - Vec3::new(0.0, 0.0, -1.0)).length() < 1.0e-4);
    }
}
