//! Spot light: a point emitter restricted to a cone.

use glam::Vec3;

use crate::color::{RayColor, Spectrum};
use crate::math::{build_orthonormal_basis, lerp, Ray};
use crate::sampling::sphere_cap_pdf;

use super::{
    EmitParam, EmitResult, IlluminateParam, IlluminateResult, Light, RadianceParam,
    RadianceResult, DELTA_APERTURE_COS,
};

#[derive(Clone)]
pub struct SpotLight {
    pub position: Vec3,
    /// Cone axis, pointing away from the light.
    pub direction: Vec3,
    pub color: Spectrum,

    cos_angle: f32,
    is_delta: bool,
}

impl SpotLight {
    pub fn new(position: Vec3, direction: Vec3, color: Spectrum, angle: f32) -> Self {
        let cos_angle = angle.cos();
        Self {
            position,
            direction: direction.normalize(),
            color,
            cos_angle,
            is_delta: cos_angle > DELTA_APERTURE_COS,
        }
    }
}

impl Light for SpotLight {
    fn is_finite(&self) -> bool {
        true
    }

    fn is_delta(&self) -> bool {
        self.is_delta
    }

    fn illuminate(&self, param: &IlluminateParam) -> IlluminateResult {
        let mut dir = self.position - param.frame.position;
        let sqr_distance = dir.length_squared();
        let distance = sqr_distance.sqrt();
        dir /= distance;

        // outside the cone the light contributes nothing
        if dir.dot(-self.direction) < self.cos_angle {
            return IlluminateResult::zero();
        }

        IlluminateResult {
            radiance: RayColor::resolve(param.wavelength, self.color),
            direction_to_light: dir,
            distance,
            direct_pdf_w: sqr_distance,
            emission_pdf_w: if self.is_delta {
                1.0
            } else {
                sphere_cap_pdf(self.cos_angle)
            },
            cos_at_light: 1.0,
        }
    }

    fn emit(&self, param: &EmitParam) -> EmitResult {
        let (direction, emission_pdf_w) = if self.is_delta {
            (self.direction, 1.0)
        } else {
            let phi = 2.0 * std::f32::consts::PI * param.position_sample[1];
            let cos_theta = lerp(self.cos_angle, 1.0, param.position_sample[0]);
            let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
            let (t, b) = build_orthonormal_basis(self.direction);
            let dir = (t * (sin_theta * phi.cos())
                + b * (sin_theta * phi.sin())
                + self.direction * cos_theta)
                .normalize();
            (dir, sphere_cap_pdf(self.cos_angle))
        };

        EmitResult {
            radiance: RayColor::resolve(param.wavelength, self.color),
            position: self.position,
            direction,
            direct_pdf_a: 1.0,
            emission_pdf_w,
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
        self.direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Wavelength;
    use crate::math::ShadingFrame;

    #[test]
    fn points_outside_the_cone_receive_nothing() {
        let l = SpotLight::new(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            Spectrum::splat(10.0),
            0.5,
        );
        let w = Wavelength::new();
        let below = ShadingFrame::new(Vec3::ZERO, Vec3::Y);
        let aside = ShadingFrame::new(Vec3::new(20.0, 5.0, 0.0), Vec3::Y);

        let lit = l.illuminate(&IlluminateParam {
            frame: &below,
            wavelength: &w,
            sample: [0.0, 0.0, 0.0],
            scene_radius: 10.0,
        });
        assert!(!lit.radiance.almost_zero());

        let dark = l.illuminate(&IlluminateParam {
            frame: &aside,
            wavelength: &w,
            sample: [0.0, 0.0, 0.0],
            scene_radius: 10.0,
        });
        assert!(dark.radiance.almost_zero());
    }

    #[test]
    fn emitted_rays_stay_inside_the_cone() {
        let l = SpotLight::new(
            Vec3::ZERO,
            Vec3::new(0.0, -1.0, 0.0),
            Spectrum::splat(1.0),
            0.4,
        );
        let w = Wavelength::new();
        for s in [[0.0, 0.0, 0.0], [0.5, 0.3, 0.0], [0.99, 0.9, 0.0]] {
            let e = l.emit(&EmitParam {
                wavelength: &w,
                position_sample: s,
                direction_sample: (0.5, 0.5),
                scene_radius: 10.0,
            });
            assert!(e.direction.dot(l.direction) >= 0.4f32.cos() - 1.0e-4);
        }
    }
}
