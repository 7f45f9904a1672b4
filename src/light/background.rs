//! Background (environment) light: a constant color or an equirect
//! environment map surrounding the scene. Every ray that escapes the
//! scene "hits" it.

use std::f32::consts::PI;
use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::color::{RayColor, Spectrum, Wavelength};
use crate::math::{build_orthonormal_basis, Ray};
use crate::sampling::{
    uniform_circle_pdf, uniform_hemisphere_pdf, uniform_sample_disk, uniform_sample_hemisphere,
    uniform_sample_sphere, uniform_sphere_pdf,
};
use crate::texture::{Texture, Textures};

use super::{
    EmitParam, EmitResult, IlluminateParam, IlluminateResult, Light, RadianceParam,
    RadianceResult, BACKGROUND_LIGHT_DISTANCE,
};

#[derive(Clone)]
pub struct BackgroundLight {
    pub color: Spectrum,
    pub texture: Option<Arc<Textures>>,
}

impl BackgroundLight {
    pub fn new(color: Spectrum) -> Self {
        Self {
            color,
            texture: None,
        }
    }

    pub fn with_texture(color: Spectrum, texture: Arc<Textures>) -> Self {
        Self {
            color,
            texture: Some(texture),
        }
    }

    /// Environment color in a world-space direction.
    pub fn background_color(&self, dir: Vec3, wavelength: &Wavelength) -> RayColor {
        let mut color = self.color;
        if let Some(texture) = &self.texture {
            // equirect lookup: longitude over x, latitude over y
            let theta = dir.y.clamp(-1.0, 1.0).acos();
            let phi = dir.z.atan2(dir.x);
            let uv = Vec2::new(phi * 0.5 / PI + 0.5, theta / PI);
            color = color * texture.evaluate(uv);
        }
        RayColor::resolve(wavelength, color)
    }
}

impl Light for BackgroundLight {
    fn is_finite(&self) -> bool {
        false
    }

    fn is_delta(&self) -> bool {
        false
    }

    fn illuminate(&self, param: &IlluminateParam) -> IlluminateResult {
        // uniform hemisphere above the shading point
        let local = uniform_sample_hemisphere((param.sample[0], param.sample[1]));
        let dir = param.frame.local_to_world(local);

        IlluminateResult {
            radiance: self.background_color(dir, param.wavelength),
            direction_to_light: dir,
            distance: BACKGROUND_LIGHT_DISTANCE,
            direct_pdf_w: uniform_hemisphere_pdf(),
            emission_pdf_w: uniform_sphere_pdf() * uniform_circle_pdf(param.scene_radius),
            cos_at_light: 1.0,
        }
    }

    fn emit(&self, param: &EmitParam) -> EmitResult {
        let direction =
            uniform_sample_sphere((param.position_sample[0], param.position_sample[1]));

        // origin on a scene-bounding disk behind the chosen direction
        let uv = uniform_sample_disk(param.direction_sample);
        let (t, b) = build_orthonormal_basis(direction);
        let position = (t * uv.x + b * uv.y - direction) * param.scene_radius;

        EmitResult {
            radiance: self.background_color(-direction, param.wavelength),
            position,
            direction,
            direct_pdf_a: uniform_hemisphere_pdf(),
            emission_pdf_w: uniform_sphere_pdf() * uniform_circle_pdf(param.scene_radius),
            cos_at_light: 1.0,
        }
    }

    fn radiance(&self, param: &RadianceParam) -> RadianceResult {
        RadianceResult {
            radiance: self.background_color(param.ray.dir, param.wavelength),
            direct_pdf_a: uniform_hemisphere_pdf(),
            emission_pdf_w: uniform_sphere_pdf() * uniform_circle_pdf(param.scene_radius),
        }
    }

    fn test_ray_hit(&self, _ray: &Ray) -> Option<f32> {
        // handled by the miss path of the traversal
        None
    }

    fn normal(&self, hit_point: Vec3) -> Vec3 {
        -hit_point.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ShadingFrame;

    #[test]
    fn constant_background_is_uniform() {
        let l = BackgroundLight::new(Spectrum::splat(0.5));
        let w = Wavelength::new();
        let a = l.background_color(Vec3::Y, &w);
        let b = l.background_color(Vec3::new(1.0, 0.0, 0.0), &w);
        assert_eq!(a, b);
    }

    #[test]
    fn illuminate_samples_the_upper_hemisphere() {
        let l = BackgroundLight::new(Spectrum::splat(1.0));
        let w = Wavelength::new();
        let frame = ShadingFrame::new(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0));
        let r = l.illuminate(&IlluminateParam {
            frame: &frame,
            wavelength: &w,
            sample: [0.3, 0.7, 0.0],
            scene_radius: 10.0,
        });
        assert!(r.direction_to_light.y >= 0.0);
        assert!((r.direct_pdf_w - uniform_hemisphere_pdf()).abs() < 1.0e-6);
        assert_eq!(r.distance, BACKGROUND_LIGHT_DISTANCE);
    }
}
