use glam::{Vec2, Vec3};

use crate::light::area::intersect_triangle;
use crate::math::{Ray, ShadingFrame};

use super::{Shape, ShapeHit};

/// Finite two-sided rectangle spanned by two edge vectors.
#[derive(Debug, Clone, Copy)]
pub struct Rect {
    pub p0: Vec3,
    pub edge0: Vec3,
    pub edge1: Vec3,

    normal: Vec3,
    tangent: Vec3,
}

impl Rect {
    pub fn new(p0: Vec3, edge0: Vec3, edge1: Vec3) -> Self {
        Self {
            p0,
            edge0,
            edge1,
            normal: edge1.cross(edge0).normalize(),
            tangent: edge0.normalize(),
        }
    }
}

impl Shape for Rect {
    fn intersect(&self, ray: &Ray) -> Option<ShapeHit> {
        if let Some((t, u, v)) = intersect_triangle(ray, self.p0, self.edge0, self.edge1) {
            return Some(ShapeHit {
                distance: t,
                u,
                v,
                sub_object_id: 0,
            });
        }
        let opposite = self.p0 + self.edge0 + self.edge1;
        if let Some((t, u, v)) = intersect_triangle(ray, opposite, -self.edge0, -self.edge1) {
            return Some(ShapeHit {
                distance: t,
                u: 1.0 - u,
                v: 1.0 - v,
                sub_object_id: 0,
            });
        }
        None
    }

    fn shading_frame(&self, ray: &Ray, hit: &ShapeHit) -> (ShadingFrame, Vec2) {
        let position = ray.at(hit.distance);
        let frame = ShadingFrame::with_tangent(position, self.normal, self.tangent);
        (frame, Vec2::new(hit.u, hit.v))
    }

    fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let corners = [
            self.p0,
            self.p0 + self.edge0,
            self.p0 + self.edge1,
            self.p0 + self.edge0 + self.edge1,
        ];
        let mut min = corners[0];
        let mut max = corners[0];
        for c in &corners[1..] {
            min = min.min(*c);
            max = max.max(*c);
        }
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_anywhere_on_the_rectangle() {
        let r = Rect::new(
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        );
        for (x, z) in [(-0.9, -0.9), (0.9, 0.9), (0.0, 0.0), (-0.5, 0.8)] {
            let ray = Ray::new(Vec3::new(x, 3.0, z), Vec3::new(0.0, -1.0, 0.0));
            let hit = r.intersect(&ray).expect("rectangle point missed");
            assert!((hit.distance - 3.0).abs() < 1.0e-4);
        }
        let miss = Ray::new(Vec3::new(1.5, 3.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        assert!(r.intersect(&miss).is_none());
    }
}
