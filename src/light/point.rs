//! Isotropic point light. A Dirac emitter: it cannot be hit by rays and
//! its direct sampling density is the squared distance.

use std::f32::consts::FRAC_1_PI;

use glam::Vec3;

use crate::color::{RayColor, Spectrum};
use crate::math::Ray;
use crate::sampling::uniform_sample_sphere;

use super::{
    EmitParam, EmitResult, IlluminateParam, IlluminateResult, Light, RadianceParam, RadianceResult,
};

#[derive(Clone)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Spectrum,
}

impl PointLight {
    pub fn new(position: Vec3, color: Spectrum) -> Self {
        Self { position, color }
    }
}

impl Light for PointLight {
    fn is_finite(&self) -> bool {
        true
    }

    fn is_delta(&self) -> bool {
        true
    }

    fn illuminate(&self, param: &IlluminateParam) -> IlluminateResult {
        let mut dir = self.position - param.frame.position;
        let sqr_distance = dir.length_squared();
        let distance = sqr_distance.sqrt();
        dir /= distance;

        IlluminateResult {
            radiance: RayColor::resolve(param.wavelength, self.color),
            direction_to_light: dir,
            distance,
            direct_pdf_w: sqr_distance,
            emission_pdf_w: 0.25 * FRAC_1_PI,
            cos_at_light: 1.0,
        }
    }

    fn emit(&self, param: &EmitParam) -> EmitResult {
        EmitResult {
            radiance: RayColor::resolve(param.wavelength, self.color),
            position: self.position,
            direction: uniform_sample_sphere((
                param.position_sample[0],
                param.position_sample[1],
            )),
            direct_pdf_a: 1.0,
            emission_pdf_w: 0.25 * FRAC_1_PI,
            cos_at_light: 1.0,
        }
    }

    fn radiance(&self, _param: &RadianceParam) -> RadianceResult {
        RadianceResult::zero()
    }

    fn test_ray_hit(&self, _ray: &Ray) -> Option<f32> {
        None
    }

    fn normal(&self, _hit_point: Vec3) -> Vec3 {
        Vec3::Z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Wavelength;
    use crate::math::ShadingFrame;

    #[test]
    fn direct_pdf_is_squared_distance() {
        let l = PointLight::new(Vec3::new(0.0, 5.0, 0.0), Spectrum::splat(100.0));
        let w = Wavelength::new();
        let frame = ShadingFrame::new(Vec3::ZERO, Vec3::Y);
        let r = l.illuminate(&IlluminateParam {
            frame: &frame,
            wavelength: &w,
            sample: [0.0, 0.0, 0.0],
            scene_radius: 10.0,
        });
        assert!((r.direct_pdf_w - 25.0).abs() < 1.0e-4);
        assert!((r.distance - 5.0).abs() < 1.0e-5);
        assert_eq!(r.cos_at_light, 1.0);
    }

    #[test]
    fn cannot_be_hit_and_has_no_radiance() {
        let l = PointLight::new(Vec3::ZERO, Spectrum::splat(1.0));
        let ray = Ray::new(Vec3::new(0.0, -1.0, 0.0), Vec3::Y);
        assert!(l.test_ray_hit(&ray).is_none());
        let w = Wavelength::new();
        let r = l.radiance(&RadianceParam {
            ray: &ray,
            hit_point: Vec3::ZERO,
            wavelength: &w,
            scene_radius: 10.0,
        });
        assert!(r.radiance.almost_zero());
    }
}
