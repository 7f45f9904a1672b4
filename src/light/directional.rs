//! Directional (sun-like) light with an angular extent. Becomes a Dirac
//! delta when the aperture is negligible; otherwise rays within the cap
//! can hit it like a distant disk.

use glam::Vec3;

use crate::color::{RayColor, Spectrum};
use crate::math::{build_orthonormal_basis, lerp, Ray};
use crate::sampling::{sphere_cap_pdf, uniform_circle_pdf, uniform_sample_disk};

use super::{
    EmitParam, EmitResult, IlluminateParam, IlluminateResult, Light, RadianceParam,
    RadianceResult, BACKGROUND_LIGHT_DISTANCE, DELTA_APERTURE_COS,
};

#[derive(Clone)]
pub struct DirectionalLight {
    /// Direction the light travels (from the light toward the scene).
    pub direction: Vec3,
    pub color: Spectrum,

    cos_angle: f32,
    is_delta: bool,
}

impl DirectionalLight {
    pub fn new(direction: Vec3, color: Spectrum, angle: f32) -> Self {
        let cos_angle = angle.cos();
        Self {
            direction: direction.normalize(),
            color,
            cos_angle,
            is_delta: cos_angle > DELTA_APERTURE_COS,
        }
    }

    /// Sample a direction toward the light, returning its pdf.
    fn sample_direction(&self, u: (f32, f32)) -> (Vec3, f32) {
        if self.is_delta {
            return (-self.direction, 1.0);
        }

        let pdf = sphere_cap_pdf(self.cos_angle);
        let phi = 2.0 * std::f32::consts::PI * u.1;
        let cos_theta = lerp(self.cos_angle, 1.0, u.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

        let w = -self.direction;
        let (t, b) = build_orthonormal_basis(w);
        let dir = (t * (sin_theta * phi.cos()) + b * (sin_theta * phi.sin()) + w * cos_theta)
            .normalize();
        (dir, pdf)
    }
}

impl Light for DirectionalLight {
    fn is_finite(&self) -> bool {
        false
    }

    fn is_delta(&self) -> bool {
        self.is_delta
    }

    fn illuminate(&self, param: &IlluminateParam) -> IlluminateResult {
        let (dir, pdf) = self.sample_direction((param.sample[0], param.sample[1]));

        IlluminateResult {
            radiance: RayColor::resolve(param.wavelength, self.color),
            direction_to_light: dir,
            distance: BACKGROUND_LIGHT_DISTANCE,
            direct_pdf_w: pdf,
            emission_pdf_w: pdf * uniform_circle_pdf(param.scene_radius),
            cos_at_light: 1.0,
        }
    }

    fn emit(&self, param: &EmitParam) -> EmitResult {
        let (to_light, direct_pdf_a) =
            self.sample_direction((param.position_sample[0], param.position_sample[1]));
        let direction = -to_light;

        // place the origin on a scene-bounding disk perpendicular to the
        // travel direction so rays sweep the whole scene
        let uv = uniform_sample_disk(param.direction_sample);
        let (t, b) = build_orthonormal_basis(self.direction);
        let position = (t * uv.x + b * uv.y - self.direction) * param.scene_radius;

        EmitResult {
            radiance: RayColor::resolve(param.wavelength, self.color),
            position,
            direction,
            direct_pdf_a,
            emission_pdf_w: direct_pdf_a * uniform_circle_pdf(param.scene_radius),
            cos_at_light: 1.0,
        }
    }

    fn radiance(&self, param: &RadianceParam) -> RadianceResult {
        if self.is_delta {
            return RadianceResult::zero();
        }
        if param.ray.dir.dot(self.direction) > -self.cos_angle {
            return RadianceResult::zero();
        }

        let pdf = sphere_cap_pdf(self.cos_angle);
        RadianceResult {
            radiance: RayColor::resolve(param.wavelength, self.color),
            direct_pdf_a: pdf,
            emission_pdf_w: pdf * uniform_circle_pdf(param.scene_radius),
        }
    }

    fn test_ray_hit(&self, ray: &Ray) -> Option<f32> {
        if !self.is_delta && ray.dir.dot(self.direction) < -self.cos_angle {
            return Some(BACKGROUND_LIGHT_DISTANCE);
        }
        None
    }

    fn normal(&self, _hit_point: Vec3) -> Vec3 {
        self.direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Wavelength;
    use crate::math::ShadingFrame;

    #[test]
    fn tiny_aperture_is_delta() {
        let l = DirectionalLight::new(Vec3::new(0.0, -1.0, 0.0), Spectrum::splat(1.0), 0.0);
        assert!(l.is_delta());
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        assert!(l.test_ray_hit(&ray).is_none());
    }

    #[test]
    fn finite_aperture_can_be_hit_within_the_cap() {
        let l = DirectionalLight::new(Vec3::new(0.0, -1.0, 0.0), Spectrum::splat(1.0), 0.1);
        assert!(!l.is_delta());
        let toward = Ray::new(Vec3::ZERO, Vec3::Y);
        assert!(l.test_ray_hit(&toward).is_some());
        let away = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(l.test_ray_hit(&away).is_none());
    }

    #[test]
    fn illuminate_samples_within_the_cap() {
        let l = DirectionalLight::new(Vec3::new(0.0, -1.0, 0.0), Spectrum::splat(1.0), 0.2);
        let w = Wavelength::new();
        let frame = ShadingFrame::new(Vec3::ZERO, Vec3::Y);
        let r = l.illuminate(&IlluminateParam {
            frame: &frame,
            wavelength: &w,
            sample: [0.3, 0.8, 0.0],
            scene_radius: 30.0,
        });
        assert!(r.direction_to_light.dot(Vec3::Y) > 0.2f32.cos() - 1.0e-4);
        assert!((r.direct_pdf_w - sphere_cap_pdf(0.2f32.cos())).abs() < 1.0e-3);
    }
}
