//! Debug renderer: single-bounce AOV views of the scene (geometry,
//! shading frames, material parameters). No light transport.

use glam::Vec3;

use crate::color::{RayColor, Spectrum};
use crate::math::{hash_u64, hsv_to_rgb, Ray};
use crate::scene::Scene;

use super::{RenderParam, Renderer, RenderingContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugRenderingMode {
    TriangleId,
    Depth,
    Position,
    Normals,
    Tangents,
    Bitangents,
    TexCoords,
    BaseColor,
    Emission,
    Roughness,
    Metalness,
}

pub struct DebugRenderer {
    pub mode: DebugRenderingMode,
}

impl Default for DebugRenderer {
    fn default() -> Self {
        Self {
            mode: DebugRenderingMode::BaseColor,
        }
    }
}

impl DebugRenderer {
    pub fn with_mode(mode: DebugRenderingMode) -> Self {
        Self { mode }
    }
}

/// Map a [-1,1] vector into displayable [0,1] range.
fn scale_bipolar(v: Vec3) -> Vec3 {
    (v * 0.5 + Vec3::splat(0.5)).max(Vec3::ZERO)
}

impl Renderer for DebugRenderer {
    fn name(&self) -> &'static str {
        "Debug"
    }

    fn render_pixel(
        &self,
        scene: &Scene,
        ray: &Ray,
        _param: &RenderParam,
        ctx: &mut RenderingContext,
    ) -> RayColor {
        ctx.counters.num_rays += 1;
        let hit = scene.traverse(ray);
        if hit.is_miss() {
            return RayColor::zero();
        }

        let rgb = match self.mode {
            DebugRenderingMode::Depth => {
                let log_depth = ((hit.distance.log2() + 5.0) / 10.0).max(0.0);
                Vec3::splat(log_depth)
            }
            DebugRenderingMode::TriangleId => {
                let hash = hash_u64(u64::from(hit.object_id) | (u64::from(hit.sub_object_id) << 32));
                let hue = (hash as u32) as f32 / u32::MAX as f32;
                let saturation = 0.5 + 0.5 * ((hash >> 32) as u32) as f32 / u32::MAX as f32;
                hsv_to_rgb(hue, saturation, 1.0)
            }
            _ => {
                // the remaining views need shading data, which light
                // surfaces do not have
                if hit.is_light() {
                    return RayColor::zero();
                }
                let shading = scene.extract_shading_data(ray, &hit, &ctx.wavelength);
                let material = scene.material(shading.material_id);
                match self.mode {
                    DebugRenderingMode::Position => shading.frame.position.max(Vec3::ZERO),
                    DebugRenderingMode::Normals => scale_bipolar(shading.frame.normal),
                    DebugRenderingMode::Tangents => scale_bipolar(shading.frame.tangent),
                    DebugRenderingMode::Bitangents => scale_bipolar(shading.frame.bitangent),
                    DebugRenderingMode::TexCoords => Vec3::new(
                        shading.tex_coord.x.fract().abs(),
                        shading.tex_coord.y.fract().abs(),
                        0.0,
                    ),
                    DebugRenderingMode::BaseColor => material.base_color.evaluate(shading.tex_coord),
                    DebugRenderingMode::Emission => material.emission.evaluate(shading.tex_coord),
                    DebugRenderingMode::Roughness => {
                        Vec3::splat(material.roughness.evaluate(shading.tex_coord))
                    }
                    DebugRenderingMode::Metalness => {
                        Vec3::splat(material.metalness.evaluate(shading.tex_coord))
                    }
                    DebugRenderingMode::Depth | DebugRenderingMode::TriangleId => unreachable!(),
                }
            }
        };

        RayColor::resolve(&ctx.wavelength, Spectrum::new(rgb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::film::Film;
    use crate::geometry::Sphere;
    use crate::material::Material;
    use crate::renderer::RenderingParams;
    use glam::Vec2;

    fn render_center_pixel(mode: DebugRenderingMode) -> RayColor {
        let mut scene = Scene::new();
        let mut material = Material::new("red");
        material.base_color.base = Vec3::new(1.0, 0.0, 0.0);
        let id = scene.add_material(material);
        scene.add_shape(Sphere::new(Vec3::ZERO, 1.0).into(), id);
        scene.finalize();

        let camera = Camera::new(
            Vec3::new(0.0, 0.0, -4.0),
            Vec3::ZERO,
            Vec3::Y,
            1.0,
            16,
            16,
        );
        let film = Film::new(16, 16);
        let renderer = DebugRenderer::with_mode(mode);
        let mut ctx = RenderingContext::new(RenderingParams::default(), None, 0);
        let ray = camera.generate_ray(Vec2::new(0.5, 0.5));
        renderer.render_pixel(
            &scene,
            &ray,
            &RenderParam {
                camera: &camera,
                film: &film,
                iteration: 0,
                secondary: false,
            },
            &mut ctx,
        )
    }

    #[test]
    fn base_color_view_shows_the_material() {
        let c = render_center_pixel(DebugRenderingMode::BaseColor);
        assert!(c.max_value() > 0.0);
    }

    #[test]
    fn depth_view_encodes_the_hit_distance() {
        let c = render_center_pixel(DebugRenderingMode::Depth);
        // distance 3 -> (log2(3)+5)/10
        let expected = (3.0f32.log2() + 5.0) / 10.0;
        #[cfg(not(feature = "spectral"))]
        assert!((c.max_value() - expected).abs() < 1.0e-4);
        #[cfg(feature = "spectral")]
        assert!(c.max_value() > 0.5 * expected);
    }
}
