//! Light tracer: paths start on the lights and are connected to the
//! camera at every non-specular vertex, splatting onto the film. The
//! camera never traces anything itself, so specular surfaces seen
//! directly stay black.

use rand::Rng;

use crate::bsdf::Bsdf;
use crate::color::RayColor;
use crate::light::{EmitParam, Light};
use crate::math::{Ray, SHADOW_RAY_MARGIN};
use crate::scene::Scene;

use super::{RenderParam, Renderer, RenderingContext};

#[derive(Default)]
pub struct LightTracer {
    light_paths_count: f32,
}

impl Renderer for LightTracer {
    fn name(&self) -> &'static str {
        "Light Tracer"
    }

    fn pre_render(&mut self, _iteration: u32, film_width: u32, film_height: u32) {
        self.light_paths_count = (film_width * film_height) as f32;
    }

    fn render_pixel(
        &self,
        scene: &Scene,
        _primary_ray: &Ray,
        param: &RenderParam,
        ctx: &mut RenderingContext,
    ) -> RayColor {
        let lights = scene.lights();
        if lights.is_empty() {
            // nothing can be traced from
            return RayColor::zero();
        }

        let light_pick_probability = 1.0 / lights.len() as f32;
        let index = (ctx.rng.gen::<u32>() as usize) % lights.len();
        let light = &lights[index];

        let emit = light.emit(&EmitParam {
            wavelength: &ctx.wavelength,
            position_sample: ctx.sampler.get_float3(),
            direction_sample: ctx.sampler.get_float2(),
            scene_radius: scene.bounding_radius(),
        });

        if emit.radiance.almost_zero() {
            return RayColor::zero();
        }

        let emission_pdf_w = emit.emission_pdf_w * light_pick_probability;
        if emission_pdf_w <= f32::EPSILON {
            return RayColor::zero();
        }

        let mut throughput = emit.radiance * (1.0 / emission_pdf_w);
        let mut ray = Ray::spawn(emit.position, emit.direction);
        let mut depth = 0u32;

        loop {
            let hit = scene.traverse(&ray);
            if hit.is_miss() || hit.is_light() {
                // light surfaces do not reflect light
                break;
            }

            let shading = scene.extract_shading_data(&ray, &hit, &ctx.wavelength);
            let material = scene.material(shading.material_id);

            if depth >= ctx.params.max_ray_depth {
                break;
            }

            // connect the vertex to the camera
            if !material.bsdf().is_delta() {
                let mut dir_to_camera = param.camera.position - shading.frame.position;
                let camera_dist_sqr = dir_to_camera.length_squared();
                let camera_dist = camera_dist_sqr.sqrt();
                dir_to_camera /= camera_dist;

                let eval = material.evaluate(&shading, dir_to_camera);
                debug_assert!(eval.factor.is_valid());

                if !eval.factor.almost_zero() {
                    if let Some(film_uv) = param.camera.world_to_film(shading.frame.position) {
                        let shadow_ray = Ray::spawn(shading.frame.position, dir_to_camera);
                        ctx.counters.num_shadow_rays += 1;
                        if !scene.traverse_shadow(&shadow_ray, camera_dist * SHADOW_RAY_MARGIN) {
                            let camera_pdf_a =
                                param.camera.pdf_w(-dir_to_camera) / camera_dist_sqr;
                            let contribution = (eval.factor * throughput)
                                * (camera_pdf_a / self.light_paths_count);
                            let value = contribution.to_tristimulus(&ctx.wavelength);
                            param.film.splat(film_uv, value, param.secondary);
                        }
                    }
                }
            }

            // continue the walk
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

        // all contribution went through film splats
        RayColor::zero()
    }
}
