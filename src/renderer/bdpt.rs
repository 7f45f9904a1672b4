//! Bidirectional path tracer. Each pixel sample traces one light
//! subpath and one camera subpath and sums three families of
//! estimators: camera paths hitting lights, next event estimation and
//! explicit connections between the stored light vertices and every
//! camera vertex, all weighted by the shared dVC/dVM/dVCM partial MIS
//! quantities. Light vertices also splat straight to the camera, which
//! is what makes the light-tracing family of strategies present.

use rand::Rng;

use crate::bsdf::Bsdf;
use crate::color::RayColor;
use crate::light::{EmitParam, IlluminateParam, Light, Lights, RadianceParam};
use crate::material::ShadingData;
use crate::math::{Ray, SHADOW_RAY_MARGIN};
use crate::scene::Scene;

use super::walk::{advance_path, LightVertex, PathState};
use super::{
    mis, pdf_w_to_a, RenderParam, Renderer, RendererContexts, RenderingContext,
};

/// Longer light subpaths keep walking but stop recording vertices.
pub const MAX_LIGHT_VERTICES: usize = 256;

pub struct Bdpt {
    max_path_length: u32,
    light_paths_count: f32,
    /// eta_VC: vertex-connection MIS constant fed into dVM updates.
    mis_vc_weight_factor: f32,
    /// eta_VM: vertex-merging MIS constant; zero, BDPT does not merge.
    mis_vm_weight_factor: f32,
}

impl Default for Bdpt {
    fn default() -> Self {
        Self {
            max_path_length: 12,
            light_paths_count: 1.0,
            mis_vc_weight_factor: 1.0,
            mis_vm_weight_factor: 0.0,
        }
    }
}

impl Bdpt {
    /// Start a light subpath: pick a light, sample an emission ray and
    /// seed the partial MIS quantities.
    fn generate_light_sample(&self, scene: &Scene, ctx: &mut RenderingContext) -> Option<PathState> {
        let lights = scene.lights();
        if lights.is_empty() {
            return None;
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
            return None;
        }

        let direct_pdf_a = emit.direct_pdf_a * light_pick_probability;
        let emission_pdf_w = emit.emission_pdf_w * light_pick_probability;
        if emission_pdf_w < f32::EPSILON {
            return None;
        }
        let emission_inv_pdf_w = 1.0 / emission_pdf_w;

        let mut path = PathState::new(Ray::spawn(emit.position, emit.direction));
        path.throughput = emit.radiance * emission_inv_pdf_w;
        path.is_finite_light = light.is_finite();

        path.d_vcm = mis(direct_pdf_a * emission_inv_pdf_w);
        path.d_vc = if light.is_delta() {
            0.0
        } else {
            let cos_at_light = if path.is_finite_light {
                emit.cos_at_light
            } else {
                1.0
            };
            mis(cos_at_light * emission_inv_pdf_w)
        };
        path.d_vm = path.d_vc * self.mis_vc_weight_factor;

        Some(path)
    }

    /// Trace the light subpath, recording connectable vertices and
    /// splatting direct camera connections.
    fn trace_light_path(&self, scene: &Scene, param: &RenderParam, ctx: &mut RenderingContext) {
        ctx.renderer_context.bdpt_vertices().clear();

        let mut path = match self.generate_light_sample(scene, ctx) {
            Some(p) => p,
            None => return,
        };

        loop {
            let hit = scene.traverse(&path.ray);
            if hit.is_miss() {
                return;
            }
            if hit.is_light() {
                // light surfaces do not reflect light
                return;
            }

            let shading = scene.extract_shading_data(&path.ray, &hit, &ctx.wavelength);
            let material = scene.material(shading.material_id);

            // partial MIS updates for the new hit; infinite lights skip
            // the distance term on their first segment
            {
                if path.length > 1 || path.is_finite_light {
                    path.d_vcm *= mis(hit.distance * hit.distance);
                }
                let inv_cos = 1.0 / mis(shading.cos_theta(path.ray.dir).abs());
                path.d_vcm *= inv_cos;
                path.d_vc *= inv_cos;
                path.d_vm *= inv_cos;
            }

            if !material.bsdf().is_delta() {
                let vertex = LightVertex {
                    shading,
                    throughput: path.throughput,
                    d_vc: path.d_vc,
                    d_vm: path.d_vm,
                    d_vcm: path.d_vcm,
                    path_length: path.length,
                };

                self.connect_to_camera(scene, param, &vertex, ctx);

                let vertices = ctx.renderer_context.bdpt_vertices();
                if vertices.len() < MAX_LIGHT_VERTICES {
                    vertices.push(vertex);
                }
            }

            if path.length + 2 > self.max_path_length {
                return;
            }

            let sample = ctx.sampler.get_float3();
            if !advance_path(
                &mut path,
                &shading,
                material,
                &mut ctx.wavelength,
                sample,
                self.mis_vc_weight_factor,
                self.mis_vm_weight_factor,
            ) {
                return;
            }
        }
    }

    /// Splat a light vertex straight onto the film through the camera.
    fn connect_to_camera(
        &self,
        scene: &Scene,
        param: &RenderParam,
        vertex: &LightVertex,
        ctx: &mut RenderingContext,
    ) {
        let sample_pos = vertex.shading.frame.position;
        let mut dir_to_camera = param.camera.position - sample_pos;
        let camera_dist_sqr = dir_to_camera.length_squared();
        let camera_dist = camera_dist_sqr.sqrt();
        dir_to_camera /= camera_dist;

        let material = scene.material(vertex.shading.material_id);
        let eval = material.evaluate(&vertex.shading, dir_to_camera);
        debug_assert!(eval.factor.is_valid());
        if eval.factor.almost_zero() {
            return;
        }

        let film_uv = match param.camera.world_to_film(sample_pos) {
            Some(uv) => uv,
            None => return,
        };

        let shadow_ray = Ray::spawn(sample_pos, dir_to_camera);
        ctx.counters.num_shadow_rays += 1;
        if scene.traverse_shadow(&shadow_ray, camera_dist * SHADOW_RAY_MARGIN) {
            return;
        }

        let cos_to_camera = vertex.shading.cos_theta(dir_to_camera);
        if cos_to_camera <= f32::EPSILON {
            return;
        }

        let camera_pdf_w = param.camera.pdf_w(-dir_to_camera);
        let camera_pdf_a = camera_pdf_w * cos_to_camera / camera_dist_sqr;

        let w_light = mis(camera_pdf_a / self.light_paths_count)
            * (self.mis_vm_weight_factor + vertex.d_vcm + vertex.d_vc * mis(eval.reverse_pdf_w));
        let mis_weight = 1.0 / (w_light + 1.0);
        debug_assert!(mis_weight >= 0.0);

        let contribution = (eval.factor * vertex.throughput)
            * (mis_weight * camera_pdf_a / (self.light_paths_count * cos_to_camera));
        let value = contribution.to_tristimulus(&ctx.wavelength);
        param.film.splat(film_uv, value, param.secondary);
    }

    /// Camera path hit a light surface (or escaped to a global light).
    fn evaluate_light(
        &self,
        light: &Lights,
        ray: &Ray,
        distance: f32,
        path: &PathState,
        ctx: &RenderingContext,
        scene_radius: f32,
        light_pick_probability: f32,
    ) -> RayColor {
        let hit_point = if distance.is_finite() {
            ray.at(distance)
        } else {
            ray.at(scene_radius)
        };
        let result = light.radiance(&RadianceParam {
            ray,
            hit_point,
            wavelength: &ctx.wavelength,
            scene_radius,
        });
        debug_assert!(result.radiance.is_valid());
        if result.radiance.almost_zero() {
            return RayColor::zero();
        }

        // directly visible lights need no weighting
        if path.length <= 1 {
            return result.radiance;
        }

        let direct_pdf_a = result.direct_pdf_a * light_pick_probability;
        let emission_pdf_w = result.emission_pdf_w * light_pick_probability;

        let w_camera = mis(direct_pdf_a) * path.d_vcm + mis(emission_pdf_w) * path.d_vc;
        let mis_weight = 1.0 / (1.0 + w_camera);
        debug_assert!(mis_weight >= 0.0);

        result.radiance * mis_weight
    }

    /// Next event estimation from a camera vertex, weighted against the
    /// whole family of bidirectional strategies.
    fn sample_light(
        &self,
        scene: &Scene,
        shading: &ShadingData,
        path: &PathState,
        ctx: &mut RenderingContext,
    ) -> RayColor {
        let lights = scene.lights();
        if lights.is_empty() {
            return RayColor::zero();
        }

        let light_pick_probability = 1.0 / lights.len() as f32;
        let index = (ctx.rng.gen::<u32>() as usize) % lights.len();
        let light = &lights[index];

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

        let shadow_ray = Ray::spawn(shading.frame.position, illuminated.direction_to_light);
        ctx.counters.num_shadow_rays += 1;
        if scene.traverse_shadow(&shadow_ray, illuminated.distance * SHADOW_RAY_MARGIN) {
            return RayColor::zero();
        }

        let cos_to_light = shading.cos_theta(illuminated.direction_to_light);
        if cos_to_light <= f32::EPSILON {
            return RayColor::zero();
        }

        let bsdf_pdf_w = if light.is_delta() { 0.0 } else { eval.pdf_w };

        let w_light = mis(bsdf_pdf_w / (light_pick_probability * illuminated.direct_pdf_w));
        let w_camera = mis(
            illuminated.emission_pdf_w * cos_to_light
                / (illuminated.direct_pdf_w * illuminated.cos_at_light.max(1.0e-5)),
        ) * (self.mis_vm_weight_factor + path.d_vcm + path.d_vc * mis(eval.reverse_pdf_w));
        let mis_weight = 1.0 / (w_light + 1.0 + w_camera);
        debug_assert!(mis_weight >= 0.0);

        (illuminated.radiance * eval.factor)
            * (mis_weight / (light_pick_probability * illuminated.direct_pdf_w))
    }

    /// Connect a camera vertex to one stored light vertex.
    fn connect_vertices(
        &self,
        scene: &Scene,
        path: &PathState,
        shading: &ShadingData,
        vertex: &LightVertex,
        ctx: &mut RenderingContext,
    ) -> RayColor {
        // direction from the camera vertex to the light vertex
        let mut light_dir = vertex.shading.frame.position - shading.frame.position;
        let distance_sqr = light_dir.length_squared();
        let distance = distance_sqr.sqrt();
        light_dir /= distance;

        let cos_camera_vertex = shading.cos_theta(light_dir);
        let cos_light_vertex = vertex.shading.cos_theta(-light_dir);
        if cos_camera_vertex <= 0.0 || cos_light_vertex <= 0.0 {
            return RayColor::zero();
        }

        let geometry_term = 1.0 / distance_sqr;

        let camera_material = scene.material(shading.material_id);
        let camera_eval = camera_material.evaluate(shading, light_dir);
        debug_assert!(camera_eval.factor.is_valid());
        if camera_eval.factor.almost_zero() {
            return RayColor::zero();
        }

        let light_material = scene.material(vertex.shading.material_id);
        let light_eval = light_material.evaluate(&vertex.shading, -light_dir);
        debug_assert!(light_eval.factor.is_valid());
        if light_eval.factor.almost_zero() {
            return RayColor::zero();
        }

        let shadow_ray = Ray::spawn(shading.frame.position, light_dir);
        ctx.counters.num_shadow_rays += 1;
        if scene.traverse_shadow(&shadow_ray, distance * SHADOW_RAY_MARGIN) {
            return RayColor::zero();
        }

        let camera_bsdf_pdf_a = pdf_w_to_a(camera_eval.pdf_w, distance, cos_light_vertex);
        let light_bsdf_pdf_a = pdf_w_to_a(light_eval.pdf_w, distance, cos_camera_vertex);

        let w_light = mis(camera_bsdf_pdf_a)
            * (self.mis_vm_weight_factor + vertex.d_vcm + vertex.d_vc * mis(light_eval.reverse_pdf_w));
        let w_camera = mis(light_bsdf_pdf_a)
            * (self.mis_vm_weight_factor + path.d_vcm + path.d_vc * mis(camera_eval.reverse_pdf_w));
        let mis_weight = 1.0 / (w_light + 1.0 + w_camera);
        debug_assert!(mis_weight >= 0.0);

        let contribution = (camera_eval.factor * light_eval.factor) * (geometry_term * mis_weight);
        debug_assert!(contribution.is_valid());
        contribution
    }
}

impl Renderer for Bdpt {
    fn name(&self) -> &'static str {
        "Bidirectional Path Tracer"
    }

    fn create_context(&self) -> RendererContexts {
        RendererContexts::Bdpt(Vec::with_capacity(MAX_LIGHT_VERTICES))
    }

    fn pre_render(&mut self, _iteration: u32, film_width: u32, film_height: u32) {
        self.light_paths_count = (film_width * film_height) as f32;
        self.mis_vc_weight_factor = 1.0 / self.light_paths_count;
        self.mis_vm_weight_factor = 0.0;
    }

    fn render_pixel(
        &self,
        scene: &Scene,
        primary_ray: &Ray,
        param: &RenderParam,
        ctx: &mut RenderingContext,
    ) -> RayColor {
        // phase 1: light subpath for this pixel sample
        self.trace_light_path(scene, param, ctx);
        let light_vertices = std::mem::take(ctx.renderer_context.bdpt_vertices());

        // phase 2: camera subpath
        let mut result = RayColor::zero();
        let light_pick_probability = 1.0 / scene.lights().len().max(1) as f32;

        let mut path = PathState::new(*primary_ray);
        path.d_vcm = mis(self.light_paths_count / param.camera.pdf_w(primary_ray.dir));

        loop {
            let hit = scene.traverse(&path.ray);

            if hit.is_miss() {
                for light in scene.global_lights() {
                    let contribution = self.evaluate_light(
                        light,
                        &path.ray,
                        f32::MAX,
                        &path,
                        ctx,
                        scene.bounding_radius(),
                        light_pick_probability,
                    );
                    result.mul_add_assign(path.throughput, contribution);
                }
                break;
            }

            if hit.is_light() {
                let light = scene.light_by_object_id(hit.object_id);
                // partial MIS update against the light's surface frame
                {
                    let normal = light.normal(path.ray.at(hit.distance));
                    let inv_cos = 1.0 / mis(normal.dot(path.ray.dir).abs());
                    path.d_vcm *= mis(hit.distance * hit.distance) * inv_cos;
                    path.d_vc *= inv_cos;
                    path.d_vm *= inv_cos;
                }
                let contribution = self.evaluate_light(
                    light,
                    &path.ray,
                    hit.distance,
                    &path,
                    ctx,
                    scene.bounding_radius(),
                    light_pick_probability,
                );
                result.mul_add_assign(path.throughput, contribution);
                break;
            }

            let shading = scene.extract_shading_data(&path.ray, &hit, &ctx.wavelength);
            let material = scene.material(shading.material_id);

            // partial MIS updates for the new hit
            {
                let inv_cos = 1.0 / mis(shading.cos_theta(path.ray.dir).abs());
                path.d_vcm *= mis(hit.distance * hit.distance) * inv_cos;
                path.d_vc *= inv_cos;
                path.d_vm *= inv_cos;
            }

            // surface emission, no importance sampling
            let emission = material.evaluate_emission(&ctx.wavelength, shading.tex_coord);
            result.mul_add_assign(path.throughput, emission);

            if path.length >= self.max_path_length {
                break;
            }

            if !material.bsdf().is_delta() {
                // next event estimation
                let direct = self.sample_light(scene, &shading, &path, ctx);
                result.mul_add_assign(path.throughput, direct);

                // connections to the stored light vertices
                let mut connection = RayColor::zero();
                for vertex in &light_vertices {
                    // longer vertices only produce even longer paths
                    if vertex.path_length + path.length + 1 > self.max_path_length {
                        break;
                    }
                    connection.mul_add_assign(
                        vertex.throughput,
                        self.connect_vertices(scene, &path, &shading, vertex, ctx),
                    );
                }
                result.mul_add_assign(path.throughput, connection);
            }

            let sample = ctx.sampler.get_float3();
            if !advance_path(
                &mut path,
                &shading,
                material,
                &mut ctx.wavelength,
                sample,
                self.mis_vc_weight_factor,
                self.mis_vm_weight_factor,
            ) {
                break;
            }
        }

        ctx.counters.num_rays += u64::from(path.length) + 1;
        *ctx.renderer_context.bdpt_vertices() = light_vertices;
        result
    }
}
