//! Naive forward path tracer: no explicit light sampling, emitters are
//! only found by scattering into them. Useful as a baseline for the
//! smarter strategies; it cannot render delta lights at all.

use crate::color::RayColor;
use crate::light::{Light, RadianceParam};
use crate::math::Ray;
use crate::scene::Scene;

use super::walk::roulette_threshold;
use super::{RenderParam, Renderer, RenderingContext};

#[derive(Default)]
pub struct PathTracer;

impl Renderer for PathTracer {
    fn name(&self) -> &'static str {
        "Path Tracer"
    }

    fn render_pixel(
        &self,
        scene: &Scene,
        primary_ray: &Ray,
        _param: &RenderParam,
        ctx: &mut RenderingContext,
    ) -> RayColor {
        let mut ray = *primary_ray;
        let mut result = RayColor::zero();
        let mut throughput = RayColor::one();
        let mut depth = 0u32;

        loop {
            let hit = scene.traverse(&ray);

            // ray left the scene: pick up the global lights
            if hit.is_miss() {
                for light in scene.global_lights() {
                    let radiance = light
                        .radiance(&RadianceParam {
                            ray: &ray,
                            hit_point: ray.at(scene.bounding_radius()),
                            wavelength: &ctx.wavelength,
                            scene_radius: scene.bounding_radius(),
                        })
                        .radiance;
                    result.mul_add_assign(throughput, radiance);
                }
                break;
            }

            // hit a light surface directly
            if hit.is_light() {
                let light = scene.light_by_object_id(hit.object_id);
                let radiance = light
                    .radiance(&RadianceParam {
                        ray: &ray,
                        hit_point: ray.at(hit.distance),
                        wavelength: &ctx.wavelength,
                        scene_radius: scene.bounding_radius(),
                    })
                    .radiance;
                result.mul_add_assign(throughput, radiance);
                break;
            }

            let shading = scene.extract_shading_data(&ray, &hit, &ctx.wavelength);
            let material = scene.material(shading.material_id);

            // surface emission, no importance sampling
            let emission = material.evaluate_emission(&ctx.wavelength, shading.tex_coord);
            result.mul_add_assign(throughput, emission);
            debug_assert!(result.is_valid());

            if depth >= ctx.params.max_ray_depth {
                break;
            }

            if depth >= ctx.params.min_russian_roulette_depth {
                let threshold = roulette_threshold(throughput.max_value(), &ctx.wavelength);
                if ctx.sampler.get_float() > threshold {
                    break;
                }
                throughput *= 1.0 / threshold;
            }

            let sample = material.sample(&mut ctx.wavelength, &shading, ctx.sampler.get_float3());
            if sample.event.is_empty() {
                break;
            }
            debug_assert!(sample.weight.is_valid());

            throughput *= sample.weight;
            if throughput.almost_zero() {
                break;
            }

            ray = Ray::spawn(shading.frame.position, sample.incoming_dir_world);
            depth += 1;
        }

        ctx.counters.num_rays += u64::from(depth) + 1;
        result
    }
}
