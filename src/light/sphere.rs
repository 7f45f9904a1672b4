//! Spherical area light. Illumination samples the cone the sphere
//! subtends from the shading point; emission samples the surface
//! uniformly with a cosine-distributed direction.

use std::f32::consts::{FRAC_1_PI, PI};

use glam::Vec3;

use crate::color::{RayColor, Spectrum};
use crate::math::{build_orthonormal_basis, lerp, Ray};
use crate::sampling::{cos_sample_hemisphere, sphere_cap_pdf, uniform_sample_sphere};

use super::{
    EmitParam, EmitResult, IlluminateParam, IlluminateResult, Light, RadianceParam, RadianceResult,
};

#[derive(Clone)]
pub struct SphereLight {
    pub position: Vec3,
    pub radius: f32,
    pub color: Spectrum,

    radius_sqr: f32,
    inv_surface_area: f32,
}

impl SphereLight {
    pub fn new(position: Vec3, radius: f32, color: Spectrum) -> Self {
        let radius = radius.abs();
        Self {
            position,
            radius,
            color,
            radius_sqr: radius * radius,
            inv_surface_area: 1.0 / (4.0 * PI * radius * radius),
        }
    }
}

impl Light for SphereLight {
    fn is_finite(&self) -> bool {
        true
    }

    fn is_delta(&self) -> bool {
        false
    }

    fn illuminate(&self, param: &IlluminateParam) -> IlluminateResult {
        let center_dir = self.position - param.frame.position;
        let center_dist_sqr = center_dir.length_squared();
        if center_dist_sqr < self.radius_sqr {
            // shading point inside the light
            return IlluminateResult::zero();
        }
        let center_dist = center_dist_sqr.sqrt();

        let sin_theta_max_sqr = (self.radius_sqr / center_dist_sqr).min(1.0);
        let cos_theta_max = (1.0 - sin_theta_max_sqr).max(0.0).sqrt();

        // uniform direction within the subtended cone
        let phi = 2.0 * PI * param.sample[1];
        let cos_theta = lerp(cos_theta_max, 1.0, param.sample[0]);
        let sin_theta_sqr = (1.0 - cos_theta * cos_theta).max(0.0);
        let sin_theta = sin_theta_sqr.sqrt();

        let w = center_dir / center_dist;
        let (u, v) = build_orthonormal_basis(w);
        let dir =
            (u * (sin_theta * phi.cos()) + v * (sin_theta * phi.sin()) + w * cos_theta).normalize();

        let distance = center_dist * cos_theta
            - (self.radius_sqr - center_dist_sqr * sin_theta_sqr).max(0.0).sqrt();

        let direct_pdf_w = if cos_theta_max > 0.999_999 {
            f32::MAX
        } else {
            sphere_cap_pdf(cos_theta_max)
        };

        IlluminateResult {
            radiance: RayColor::resolve(param.wavelength, self.color),
            direction_to_light: dir,
            distance,
            direct_pdf_w,
            emission_pdf_w: self.inv_surface_area * cos_theta * FRAC_1_PI,
            cos_at_light: cos_theta,
        }
    }

    fn emit(&self, param: &EmitParam) -> EmitResult {
        let normal = uniform_sample_sphere((param.position_sample[0], param.position_sample[1]));
        let position = self.position + normal * self.radius;

        let local = cos_sample_hemisphere(param.direction_sample);
        let (u, v) = build_orthonormal_basis(normal);
        let direction = u * local.x + v * local.y + normal * local.z;
        let cos_at_light = local.z.max(1.0e-4);

        EmitResult {
            radiance: RayColor::resolve(param.wavelength, self.color) * cos_at_light,
            position,
            direction,
            direct_pdf_a: self.inv_surface_area,
            emission_pdf_w: self.inv_surface_area * cos_at_light * FRAC_1_PI,
            cos_at_light,
        }
    }

    fn radiance(&self, param: &RadianceParam) -> RadianceResult {
        let normal = self.normal(param.hit_point);
        let cos_at_light = (-param.ray.dir).dot(normal).max(0.0);
        if cos_at_light < 1.0e-5 {
            return RadianceResult::zero();
        }

        let center_dir = self.position - param.ray.origin;
        let center_dist_sqr = center_dir.length_squared();
        let sin_theta_max_sqr = (self.radius_sqr / center_dist_sqr).min(1.0);
        let cos_theta_max = (1.0 - sin_theta_max_sqr).max(0.0).sqrt();
        let pdf_w = sphere_cap_pdf(cos_theta_max.min(0.999_999));

        let hit_dist_sqr = (param.hit_point - param.ray.origin).length_squared();

        RadianceResult {
            radiance: RayColor::resolve(param.wavelength, self.color),
            direct_pdf_a: pdf_w * cos_at_light / hit_dist_sqr,
            emission_pdf_w: self.inv_surface_area * cos_at_light * FRAC_1_PI,
        }
    }

    fn test_ray_hit(&self, ray: &Ray) -> Option<f32> {
        let d = self.position - ray.origin;
        let v = ray.dir.dot(d) as f64;
        let det = self.radius_sqr as f64 - d.length_squared() as f64 + v * v;
        if det <= 0.0 {
            return None;
        }
        let sqrt_det = det.sqrt();
        let near = (v - sqrt_det) as f32;
        if near > 0.0 {
            return Some(near);
        }
        let far = (v + sqrt_det) as f32;
        if far > 0.0 {
            return Some(far);
        }
        None
    }

    fn normal(&self, hit_point: Vec3) -> Vec3 {
        (hit_point - self.position).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Wavelength;
    use crate::math::ShadingFrame;
    use rand::{Rng, SeedableRng, XorShiftRng};

    #[test]
    fn cone_samples_hit_the_sphere() {
        let l = SphereLight::new(Vec3::new(0.0, 4.0, 0.0), 0.5, Spectrum::splat(10.0));
        let w = Wavelength::new();
        let frame = ShadingFrame::new(Vec3::ZERO, Vec3::Y);
        let mut rng = XorShiftRng::from_seed([13, 14, 15, 16]);
        for _ in 0..500 {
            let r = l.illuminate(&IlluminateParam {
                frame: &frame,
                wavelength: &w,
                sample: [rng.next_f32(), rng.next_f32(), rng.next_f32()],
                scene_radius: 10.0,
            });
            if r.radiance.almost_zero() {
                continue;
            }
            let ray = Ray::new(Vec3::ZERO, r.direction_to_light);
            let hit = l.test_ray_hit(&ray).expect("cone sample missed the sphere");
            assert!((hit - r.distance).abs() < 1.0e-2);
        }
    }

    #[test]
    fn illuminate_pdf_integrates_over_the_cone() {
        let l = SphereLight::new(Vec3::new(0.0, 10.0, 0.0), 1.0, Spectrum::splat(1.0));
        let w = Wavelength::new();
        let frame = ShadingFrame::new(Vec3::ZERO, Vec3::Y);
        let r = l.illuminate(&IlluminateParam {
            frame: &frame,
            wavelength: &w,
            sample: [0.5, 0.5, 0.0],
            scene_radius: 10.0,
        });
        let cos_max = (1.0f32 - 0.01).sqrt();
        assert!((r.direct_pdf_w - sphere_cap_pdf(cos_max)).abs() / r.direct_pdf_w < 1.0e-3);
    }

    #[test]
    fn inside_the_sphere_yields_no_illumination() {
        let l = SphereLight::new(Vec3::ZERO, 2.0, Spectrum::splat(1.0));
        let w = Wavelength::new();
        let frame = ShadingFrame::new(Vec3::new(0.5, 0.0, 0.0), Vec3::Y);
        let r = l.illuminate(&IlluminateParam {
            frame: &frame,
            wavelength: &w,
            sample: [0.2, 0.8, 0.0],
            scene_radius: 10.0,
        });
        assert!(r.radiance.almost_zero());
    }
}
