//! Pinhole perspective camera. Besides primary-ray generation it exposes
//! the two queries the bidirectional integrators need: the solid-angle
//! density of its ray directions and the projection of a world point
//! back onto the film.
//!
//! The pdf uses the image-plane-distance-in-pixels convention, so that
//! converting to an area density at a surface directly yields a
//! per-pixel measure for film splats.

use glam::{Vec2, Vec3};

use crate::math::Ray;

#[derive(Clone)]
pub struct Camera {
    pub position: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    tan_half_fov_x: f32,
    tan_half_fov_y: f32,
    /// Distance to the image plane when film height is measured in
    /// pixels.
    image_plane_dist: f32,
    width: u32,
    height: u32,
}

impl Camera {
    /// `fov_y` is the vertical field of view in radians.
    pub fn new(position: Vec3, look_at: Vec3, up_hint: Vec3, fov_y: f32, width: u32, height: u32) -> Self {
        let forward = (look_at - position).normalize();
        let right = forward.cross(up_hint).normalize();
        let up = right.cross(forward);

        let aspect = width as f32 / height as f32;
        let tan_half_fov_y = (fov_y * 0.5).tan();
        let tan_half_fov_x = tan_half_fov_y * aspect;

        Self {
            position,
            forward,
            right,
            up,
            tan_half_fov_x,
            tan_half_fov_y,
            image_plane_dist: height as f32 / (2.0 * tan_half_fov_y),
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Primary ray through normalized film coordinates in [0,1)^2, with
    /// (0,0) the top-left corner.
    pub fn generate_ray(&self, film_uv: Vec2) -> Ray {
        let x = (film_uv.x * 2.0 - 1.0) * self.tan_half_fov_x;
        let y = (1.0 - film_uv.y * 2.0) * self.tan_half_fov_y;
        let dir = (self.forward + self.right * x + self.up * y).normalize();
        Ray::new(self.position, dir)
    }

    /// Solid-angle density with which `generate_ray` produces the given
    /// world-space direction (film measured in pixels).
    pub fn pdf_w(&self, dir: Vec3) -> f32 {
        let cos_theta = dir.dot(self.forward);
        if cos_theta <= 1.0e-5 {
            return 0.0;
        }
        self.image_plane_dist * self.image_plane_dist / (cos_theta * cos_theta * cos_theta)
    }

    /// Project a world point onto the film. Returns normalized film
    /// coordinates when the point lies inside the frustum.
    pub fn world_to_film(&self, point: Vec3) -> Option<Vec2> {
        let to_point = point - self.position;
        let depth = to_point.dot(self.forward);
        if depth <= 1.0e-5 {
            return None;
        }

        let x = to_point.dot(self.right) / depth;
        let y = to_point.dot(self.up) / depth;
        let u = 0.5 + 0.5 * x / self.tan_half_fov_x;
        let v = 0.5 - 0.5 * y / self.tan_half_fov_y;
        if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
            return None;
        }
        Some(Vec2::new(u, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::ZERO,
            Vec3::Y,
            std::f32::consts::FRAC_PI_2,
            128,
            128,
        )
    }

    #[test]
    fn center_ray_points_forward() {
        let c = camera();
        let ray = c.generate_ray(Vec2::new(0.5, 0.5));
        assert!((ray.dir - Vec3::Z).length() < 1.0e-5);
    }

    #[test]
    fn world_to_film_round_trips_generate_ray() {
        let c = camera();
        for uv in [
            Vec2::new(0.25, 0.75),
            Vec2::new(0.5, 0.5),
            Vec2::new(0.9, 0.1),
        ] {
            let ray = c.generate_ray(uv);
            let point = ray.at(3.0);
            let back = c.world_to_film(point).expect("point left the frustum");
            assert!((back - uv).length() < 1.0e-4, "{} vs {}", back, uv);
        }
    }

    #[test]
    fn points_behind_the_camera_do_not_project() {
        let c = camera();
        assert!(c.world_to_film(Vec3::new(0.0, 0.0, -10.0)).is_none());
    }

    #[test]
    fn pdf_w_is_maximal_on_axis() {
        let c = camera();
        let on_axis = c.pdf_w(Vec3::Z);
        let off_axis = c.pdf_w(c.generate_ray(Vec2::new(0.1, 0.1)).dir);
        assert!(on_axis > 0.0 && off_axis > on_axis);
        assert_eq!(c.pdf_w(-Vec3::Z), 0.0);
    }
}
