//! Rectangle or triangle area light spanned by two edge vectors.

use std::f32::consts::FRAC_1_PI;

use glam::Vec3;

use crate::color::{RayColor, Spectrum};
use crate::math::Ray;
use crate::sampling::{cos_sample_hemisphere, uniform_sample_triangle};

use super::{
    EmitParam, EmitResult, IlluminateParam, IlluminateResult, Light, RadianceParam, RadianceResult,
};

#[derive(Clone)]
pub struct AreaLight {
    pub p0: Vec3,
    pub edge0: Vec3,
    pub edge1: Vec3,
    pub color: Spectrum,
    pub is_triangle: bool,

    normal: Vec3,
    edge0_dir: Vec3,
    edge1_dir: Vec3,
    inv_area: f32,
}

impl AreaLight {
    pub fn new(p0: Vec3, edge0: Vec3, edge1: Vec3, color: Spectrum, is_triangle: bool) -> Self {
        let cross = edge1.cross(edge0);
        let mut area = cross.length();
        if is_triangle {
            area *= 0.5;
        }
        Self {
            p0,
            edge0,
            edge1,
            color,
            is_triangle,
            normal: cross.normalize(),
            edge0_dir: edge0.normalize(),
            edge1_dir: edge1.normalize(),
            inv_area: 1.0 / area,
        }
    }

    pub fn area(&self) -> f32 {
        1.0 / self.inv_area
    }

    fn surface_point(&self, uv: (f32, f32)) -> Vec3 {
        self.p0 + self.edge0 * uv.0 + self.edge1 * uv.1
    }

    fn sample_surface(&self, u: (f32, f32)) -> (f32, f32) {
        if self.is_triangle {
            uniform_sample_triangle(u)
        } else {
            u
        }
    }
}

impl Light for AreaLight {
    fn is_finite(&self) -> bool {
        true
    }

    fn is_delta(&self) -> bool {
        false
    }

    fn illuminate(&self, param: &IlluminateParam) -> IlluminateResult {
        let uv = self.sample_surface((param.sample[0], param.sample[1]));
        let light_point = self.surface_point(uv);

        let mut dir = light_point - param.frame.position;
        let sqr_distance = dir.length_squared();
        let distance = sqr_distance.sqrt();
        dir /= distance;

        let cos_at_light = self.normal.dot(-dir);
        if cos_at_light < 1.0e-5 {
            return IlluminateResult::zero();
        }

        IlluminateResult {
            radiance: RayColor::resolve(param.wavelength, self.color),
            direction_to_light: dir,
            distance,
            direct_pdf_w: self.inv_area * sqr_distance / cos_at_light,
            emission_pdf_w: cos_at_light * self.inv_area * FRAC_1_PI,
            cos_at_light,
        }
    }

    fn emit(&self, param: &EmitParam) -> EmitResult {
        let uv = self.sample_surface((param.position_sample[0], param.position_sample[1]));
        let position = self.surface_point(uv);

        let mut local = cos_sample_hemisphere(param.direction_sample);
        local.z = local.z.max(1.0e-3);
        // the edge basis is not orthonormal for triangle lights
        let direction = (self.edge0_dir * local.x
            + self.edge1_dir * local.y
            + self.normal * local.z)
            .normalize();

        EmitResult {
            radiance: RayColor::resolve(param.wavelength, self.color) * local.z,
            position,
            direction,
            direct_pdf_a: self.inv_area,
            emission_pdf_w: local.z * self.inv_area * FRAC_1_PI,
            cos_at_light: local.z,
        }
    }

    fn radiance(&self, param: &RadianceParam) -> RadianceResult {
        let cos_at_light = self.normal.dot(-param.ray.dir);
        if cos_at_light < 1.0e-5 {
            return RadianceResult::zero();
        }

        RadianceResult {
            radiance: RayColor::resolve(param.wavelength, self.color),
            direct_pdf_a: self.inv_area,
            emission_pdf_w: cos_at_light * self.inv_area * FRAC_1_PI,
        }
    }

    fn test_ray_hit(&self, ray: &Ray) -> Option<f32> {
        if let Some((t, _, _)) = intersect_triangle(ray, self.p0, self.edge0, self.edge1) {
            return Some(t);
        }
        if !self.is_triangle {
            let opposite = self.p0 + self.edge0 + self.edge1;
            if let Some((t, _, _)) = intersect_triangle(ray, opposite, -self.edge0, -self.edge1) {
                return Some(t);
            }
        }
        None
    }

    fn normal(&self, _hit_point: Vec3) -> Vec3 {
        self.normal
    }
}

/// Möller-Trumbore ray/triangle test against a corner and two edges.
/// Two-sided; returns (distance, u, v).
pub(crate) fn intersect_triangle(
    ray: &Ray,
    p0: Vec3,
    edge0: Vec3,
    edge1: Vec3,
) -> Option<(f32, f32, f32)> {
    let pvec = ray.dir.cross(edge1);
    let det = edge0.dot(pvec);
    if det.abs() < 1.0e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.origin - p0;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(edge0);
    let v = ray.dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge1.dot(qvec) * inv_det;
    if t <= 0.0 {
        return None;
    }
    Some((t, u, v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Wavelength;
    use crate::math::ShadingFrame;

    fn light() -> AreaLight {
        // edge order picked so the normal faces downward, toward the
        // origin
        AreaLight::new(
            Vec3::new(-1.0, 2.0, -1.0),
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(2.0, 0.0, 0.0),
            Spectrum::splat(5.0),
            false,
        )
    }

    #[test]
    fn illuminate_pdf_matches_area_measure() {
        let l = light();
        let w = Wavelength::new();
        let frame = ShadingFrame::new(Vec3::ZERO, Vec3::Y);
        let r = l.illuminate(&IlluminateParam {
            frame: &frame,
            wavelength: &w,
            sample: [0.5, 0.5, 0.0],
            scene_radius: 10.0,
        });
        assert!(r.direct_pdf_w > 0.0);
        // converting back through d^2 / cos recovers 1/area
        let pdf_a = r.direct_pdf_w * r.cos_at_light / (r.distance * r.distance);
        assert!((pdf_a - 1.0 / l.area()).abs() < 1.0e-5);
    }

    #[test]
    fn hit_test_sees_both_halves_of_the_rectangle() {
        let l = light();
        let near = Ray::new(Vec3::new(-0.5, 0.0, -0.5), Vec3::Y);
        let far = Ray::new(Vec3::new(0.5, 0.0, 0.5), Vec3::Y);
        assert!(l.test_ray_hit(&near).is_some());
        assert!(l.test_ray_hit(&far).is_some());
        let miss = Ray::new(Vec3::new(3.0, 0.0, 0.0), Vec3::Y);
        assert!(l.test_ray_hit(&miss).is_none());
    }

    #[test]
    fn emitted_rays_leave_the_front_face() {
        let l = light();
        let w = Wavelength::new();
        let e = l.emit(&EmitParam {
            wavelength: &w,
            position_sample: [0.3, 0.7, 0.0],
            direction_sample: (0.4, 0.6),
            scene_radius: 10.0,
        });
        assert!(e.direction.dot(l.normal(Vec3::ZERO)) > 0.0);
        assert!(e.emission_pdf_w > 0.0);
        assert!((e.direct_pdf_a - 0.25).abs() < 1.0e-6);
    }
}
