//! Path tracer with next event estimation and multiple importance
//! sampling, the workhorse integrator. Light contributions found by
//! BSDF sampling and by explicit light sampling are combined with the
//! balance heuristic.

use rand::Rng;

use crate::color::RayColor;
use crate::light::{IlluminateParam, Light, Lights, RadianceParam};
use crate::material::ShadingData;
use crate::math::{Ray, SHADOW_RAY_MARGIN};
use crate::scene::Scene;

use super::walk::roulette_threshold;
use super::{
    combine_mis, pdf_a_to_w, LightSamplingStrategy, RenderParam, Renderer, RenderingContext,
};

/// Per-path MIS bookkeeping: the pdf of the last BSDF sample and whether
/// it was specular.
struct MisState {
    depth: u32,
    last_pdf_w: f32,
    last_specular: bool,
}

#[derive(Default)]
pub struct PathTracerMis;

impl PathTracerMis {
    fn light_picking_probability(scene: &Scene, ctx: &RenderingContext) -> f32 {
        match ctx.params.light_sampling_strategy {
            LightSamplingStrategy::Single => 1.0 / scene.lights().len().max(1) as f32,
            LightSamplingStrategy::All => 1.0,
        }
    }

    /// Next event estimation toward one light.
    fn sample_light(
        &self,
        scene: &Scene,
        light: &Lights,
        shading: &ShadingData,
        state: &MisState,
        ctx: &mut RenderingContext,
        light_pick_probability: f32,
    ) -> RayColor {
        let illuminated = light.illuminate(&IlluminateParam {
            frame: &shading.frame,
            wavelength: &ctx.wavelength,
            sample: ctx.sampler.get_float3(),
            scene_radius: scene.bounding_radius(),
        });
        debug_assert!(illuminated.radiance.is_valid());

        if illuminated.radiance.almost_zero() || illuminated.direct_pdf_w <= 0.0 {
            return RayColor::zero();
        }

        let material = scene.material(shading.material_id);
        let eval = material.evaluate(shading, illuminated.direction_to_light);
        debug_assert!(eval.factor.is_valid());
        if eval.factor.almost_zero() {
            return RayColor::zero();
        }

        // shadow ray, shortened so the light surface itself is skipped
        let shadow_ray = Ray::spawn(shading.frame.position, illuminated.direction_to_light);
        ctx.counters.num_shadow_rays += 1;
        if scene.traverse_shadow(&shadow_ray, illuminated.distance * SHADOW_RAY_MARGIN) {
            return RayColor::zero();
        }
        ctx.counters.num_shadow_rays_hit += 1;

        // MIS against BSDF sampling; delta lights cannot be hit by it.
        // The last path segment takes the light sample unweighted so the
        // energy is not lost.
        let is_last_segment = state.depth >= ctx.params.max_ray_depth;
        let weight = if !light.is_delta() && !is_last_segment {
            combine_mis(
                illuminated.direct_pdf_w * light_pick_probability,
                eval.pdf_w,
            )
        } else {
            1.0
        };

        let result = (illuminated.radiance * eval.factor)
            * (weight / (light_pick_probability * illuminated.direct_pdf_w));
        debug_assert!(result.is_valid());
        result
    }

    fn sample_lights(
        &self,
        scene: &Scene,
        shading: &ShadingData,
        state: &MisState,
        ctx: &mut RenderingContext,
        light_pick_probability: f32,
    ) -> RayColor {
        let lights = scene.lights();
        if lights.is_empty() {
            return RayColor::zero();
        }

        match ctx.params.light_sampling_strategy {
            LightSamplingStrategy::Single => {
                let index = (ctx.rng.gen::<u32>() as usize) % lights.len();
                self.sample_light(
                    scene,
                    &lights[index],
                    shading,
                    state,
                    ctx,
                    light_pick_probability,
                )
            }
            LightSamplingStrategy::All => {
                let mut accumulated = RayColor::zero();
                for light in lights {
                    accumulated +=
                        self.sample_light(scene, light, shading, state, ctx, light_pick_probability);
                }
                accumulated
            }
        }
    }

    /// Contribution of a light surface the path ran into, weighted
    /// against the NEE strategy that could have sampled it.
    fn evaluate_light(
        &self,
        light: &Lights,
        ray: &Ray,
        distance: f32,
        cos_at_light: f32,
        state: &MisState,
        ctx: &RenderingContext,
        scene_radius: f32,
        light_pick_probability: f32,
    ) -> RayColor {
        let result = light.radiance(&RadianceParam {
            ray,
            hit_point: ray.at(distance),
            wavelength: &ctx.wavelength,
            scene_radius,
        });
        debug_assert!(result.radiance.is_valid());
        if result.radiance.almost_zero() {
            return RayColor::zero();
        }

        let mut mis_weight = 1.0;
        if state.depth > 0 && !state.last_specular {
            let direct_pdf_w = pdf_a_to_w(result.direct_pdf_a, distance, cos_at_light);
            mis_weight = combine_mis(state.last_pdf_w, direct_pdf_w * light_pick_probability);
        }

        result.radiance * mis_weight
    }

    /// Background and wide directional lights for a ray that left the
    /// scene.
    fn evaluate_global_lights(
        &self,
        scene: &Scene,
        ray: &Ray,
        state: &MisState,
        ctx: &RenderingContext,
        light_pick_probability: f32,
    ) -> RayColor {
        let mut result = RayColor::zero();
        for light in scene.global_lights() {
            let radiance = light.radiance(&RadianceParam {
                ray,
                hit_point: ray.at(scene.bounding_radius()),
                wavelength: &ctx.wavelength,
                scene_radius: scene.bounding_radius(),
            });
            debug_assert!(radiance.radiance.is_valid());
            if radiance.radiance.almost_zero() {
                continue;
            }

            let mut mis_weight = 1.0;
            if state.depth > 0 && !state.last_specular {
                // for infinite lights the reported density is already
                // per solid angle
                mis_weight = combine_mis(
                    state.last_pdf_w,
                    radiance.direct_pdf_a * light_pick_probability,
                );
            }
            result.scaled_add_assign(radiance.radiance, mis_weight);
        }
        result
    }
}

impl Renderer for PathTracerMis {
    fn name(&self) -> &'static str {
        "Path Tracer MIS"
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
        let mut state = MisState {
            depth: 0,
            last_pdf_w: 0.0,
            last_specular: true,
        };
        let light_pick_probability = Self::light_picking_probability(scene, ctx);

        loop {
            let hit = scene.traverse(&ray);

            if hit.is_miss() {
                let contribution =
                    self.evaluate_global_lights(scene, &ray, &state, ctx, light_pick_probability);
                result.mul_add_assign(throughput, contribution);
                break;
            }

            if hit.is_light() {
                let light = scene.light_by_object_id(hit.object_id);
                let cos_at_light = light.normal(ray.at(hit.distance)).dot(-ray.dir);
                let contribution = self.evaluate_light(
                    light,
                    &ray,
                    hit.distance,
                    cos_at_light,
                    &state,
                    ctx,
                    scene.bounding_radius(),
                    light_pick_probability,
                );
                result.mul_add_assign(throughput, contribution);
                break;
            }

            let shading = scene.extract_shading_data(&ray, &hit, &ctx.wavelength);
            let material = scene.material(shading.material_id);

            let emission = material.evaluate_emission(&ctx.wavelength, shading.tex_coord);
            result.mul_add_assign(throughput, emission);
            debug_assert!(result.is_valid());

            // next event estimation
            let direct = self.sample_lights(scene, &shading, &state, ctx, light_pick_probability);
            result.mul_add_assign(throughput, direct);

            if state.depth >= ctx.params.max_ray_depth {
                break;
            }

            if state.depth >= ctx.params.min_russian_roulette_depth {
                let threshold = roulette_threshold(throughput.max_value(), &ctx.wavelength);
                if ctx.sampler.get_float() > threshold {
                    break;
                }
                throughput *= 1.0 / threshold;
                debug_assert!(throughput.is_valid());
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

            state.last_specular = sample.event.intersects(crate::bsdf::BsdfEvent::SPECULAR);
            state.last_pdf_w = sample.pdf;

            ray = Ray::spawn(shading.frame.position, sample.incoming_dir_world);
            state.depth += 1;
        }

        ctx.counters.num_rays += u64::from(state.depth) + 1;
        result
    }
}
