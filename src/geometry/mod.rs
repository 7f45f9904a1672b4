//! Intersectable shapes behind the scene's ray-cast interface. The
//! acceleration structure is the host's concern; shapes only answer
//! nearest-hit queries and produce shading frames.

use enum_dispatch::enum_dispatch;
use glam::{Vec2, Vec3};

use crate::math::{Ray, ShadingFrame};

pub use self::mesh::Mesh;
pub use self::plane::Plane;
pub use self::rect::Rect;
pub use self::sphere::Sphere;

pub mod mesh;
pub mod plane;
pub mod rect;
pub mod sphere;

/// Result of a shape intersection: hit distance, surface parameters and
/// the sub-object (triangle) index for meshes.
#[derive(Debug, Clone, Copy)]
pub struct ShapeHit {
    pub distance: f32,
    pub u: f32,
    pub v: f32,
    pub sub_object_id: u32,
}

#[enum_dispatch(Shapes)]
pub trait Shape {
    /// Nearest intersection with a positive distance.
    fn intersect(&self, ray: &Ray) -> Option<ShapeHit>;

    /// Shading frame and texture coordinates at a previously found hit.
    fn shading_frame(&self, ray: &Ray, hit: &ShapeHit) -> (ShadingFrame, Vec2);

    /// Axis-aligned bounds, or `None` for unbounded shapes.
    fn bounds(&self) -> Option<(Vec3, Vec3)>;
}

#[enum_dispatch]
#[derive(Clone)]
pub enum Shapes {
    Sphere,
    Plane,
    Rect,
    Mesh,
}

/// Slab test against an axis-aligned box, using the ray's cached
/// reciprocal direction and scaled origin.
pub(crate) fn intersect_aabb(ray: &Ray, min: Vec3, max: Vec3, max_dist: f32) -> bool {
    let t0 = min * ray.inv_dir - ray.scaled_origin;
    let t1 = max * ray.inv_dir - ray.scaled_origin;
    let t_min = t0.min(t1);
    let t_max = t0.max(t1);
    let near = t_min.max_element().max(0.0);
    let far = t_max.min_element().min(max_dist);
    near <= far
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_slab_test_uses_cached_reciprocals() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert!(intersect_aabb(
            &ray,
            Vec3::splat(-1.0),
            Vec3::splat(1.0),
            f32::MAX
        ));
        assert!(!intersect_aabb(
            &ray,
            Vec3::new(2.0, 2.0, 2.0),
            Vec3::new(3.0, 3.0, 3.0),
            f32::MAX
        ));
        // behind the origin
        assert!(!intersect_aabb(
            &ray,
            Vec3::new(-1.0, -1.0, -8.0),
            Vec3::new(1.0, 1.0, -7.0),
            f32::MAX
        ));
    }
}
