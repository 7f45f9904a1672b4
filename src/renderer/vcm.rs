//! Vertex connection and merging: BDPT extended with photon merging.
//! Each pass traces one light subpath per pixel, recording connectable
//! vertices (used immediately, within the pixel) and photons (merged
//! between passes into a global map queried by the next pass's camera
//! vertices). The merging radius shrinks by `radius_multiplier` each
//! pass; the radius used for merging lags the connection radius by one
//! pass because photons are always a pass old.

use std::f32::consts::PI;

use half::f16;
use rand::Rng;

use crate::bsdf::Bsdf;
use crate::color::{RayColor, Spectrum};
use crate::light::{EmitParam, IlluminateParam, Light, Lights, RadianceParam};
use crate::material::ShadingData;
use crate::math::{Ray, SHADOW_RAY_MARGIN};
use crate::scene::Scene;

use super::hash_grid::HashGrid;
use super::walk::{advance_path, LightVertex, PathState};
use super::{
    mis, pdf_w_to_a, RenderParam, Renderer, RendererContexts, RenderingContext,
};

use glam::Vec3;

/// Longer light subpaths keep walking but stop recording vertices.
pub const MAX_LIGHT_VERTICES: usize = 256;

/// A stored photon: position, packed incoming direction and packed
/// tristimulus throughput, plus the two partial MIS quantities merging
/// needs. Kept at 32 bytes so the global map stays cache-friendly.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Photon {
    pub position: [f32; 3],
    pub direction: [f16; 3],
    pub throughput: [f16; 3],
    pub d_vm: f32,
    pub d_vcm: f32,
}

impl Photon {
    fn pack(position: Vec3, direction: Vec3, throughput: Vec3, d_vm: f32, d_vcm: f32) -> Self {
        Self {
            position: position.to_array(),
            direction: [
                f16::from_f32(direction.x),
                f16::from_f32(direction.y),
                f16::from_f32(direction.z),
            ],
            throughput: [
                f16::from_f32(throughput.x),
                f16::from_f32(throughput.y),
                f16::from_f32(throughput.z),
            ],
            d_vm,
            d_vcm,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    fn direction(&self) -> Vec3 {
        Vec3::new(
            self.direction[0].to_f32(),
            self.direction[1].to_f32(),
            self.direction[2].to_f32(),
        )
        .normalize()
    }

    fn throughput(&self) -> Vec3 {
        Vec3::new(
            self.throughput[0].to_f32(),
            self.throughput[1].to_f32(),
            self.throughput[2].to_f32(),
        )
    }
}

/// Per-thread VCM scratch: the photons recorded this pass and the light
/// vertices of the pixel currently being rendered.
#[derive(Default)]
pub struct VcmContext {
    pub photons: Vec<Photon>,
    pub vertices: Vec<LightVertex>,
}

pub struct Vcm {
    pub max_path_length: u32,
    pub initial_radius: f32,
    /// Radius reduction factor alpha in (0, 1].
    pub radius_multiplier: f32,
    pub min_radius: f32,
    pub use_vertex_connection: bool,
    pub use_vertex_merging: bool,

    light_paths_count: f32,
    radius_vc: f32,
    radius_vm: f32,
    vm_normalization: f32,
    /// eta_VM / eta_VC pairs for the current pass; the VM pair lags one
    /// pass behind, matching the age of the photon map.
    mis_vm_factor_vc: f32,
    mis_vc_factor_vc: f32,
    mis_vm_factor_vm: f32,
    mis_vc_factor_vm: f32,

    photons: Vec<Photon>,
    photon_positions: Vec<Vec3>,
    grid: HashGrid,
}

impl Default for Vcm {
    fn default() -> Self {
        Self {
            max_path_length: 12,
            initial_radius: 0.01,
            radius_multiplier: 1.0,
            min_radius: 0.001,
            use_vertex_connection: true,
            use_vertex_merging: true,
            light_paths_count: 1.0,
            radius_vc: 0.01,
            radius_vm: 0.01,
            vm_normalization: 1.0,
            mis_vm_factor_vc: 0.0,
            mis_vc_factor_vc: 0.0,
            mis_vm_factor_vm: 0.0,
            mis_vc_factor_vm: 0.0,
            photons: Vec::new(),
            photon_positions: Vec::new(),
            grid: HashGrid::new(),
        }
    }
}

impl Vcm {
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
        path.d_vm = path.d_vc * self.mis_vc_factor_vc;

        Some(path)
    }

    /// Trace this pixel's light subpath: record connectable vertices,
    /// emit photons for the next pass, splat camera connections.
    fn trace_light_path(&self, scene: &Scene, param: &RenderParam, ctx: &mut RenderingContext) {
        ctx.renderer_context.vcm().vertices.clear();

        let mut path = match self.generate_light_sample(scene, ctx) {
            Some(p) => p,
            None => return,
        };

        loop {
            let hit = scene.traverse(&path.ray);
            if hit.is_miss() || hit.is_light() {
                // light surfaces do not reflect light
                return;
            }

            let shading = scene.extract_shading_data(&path.ray, &hit, &ctx.wavelength);
            let material = scene.material(shading.material_id);

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

                if self.use_vertex_connection {
                    self.connect_to_camera(scene, param, &vertex, ctx);
                    let vertices = &mut ctx.renderer_context.vcm().vertices;
                    if vertices.len() < MAX_LIGHT_VERTICES {
                        vertices.push(vertex);
                    }
                }

                if self.use_vertex_merging {
                    let photon = Photon::pack(
                        shading.frame.position,
                        shading.outgoing_dir_world,
                        path.throughput.to_tristimulus(&ctx.wavelength),
                        path.d_vm,
                        path.d_vcm,
                    );
                    ctx.renderer_context.vcm().photons.push(photon);
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
                self.mis_vc_factor_vc,
                self.mis_vm_factor_vc,
            ) {
                return;
            }
        }
    }

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
            * (self.mis_vm_factor_vc + vertex.d_vcm + vertex.d_vc * mis(eval.reverse_pdf_w));
        let mis_weight = 1.0 / (w_light + 1.0);
        debug_assert!(mis_weight >= 0.0);

        let contribution = (eval.factor * vertex.throughput)
            * (mis_weight * camera_pdf_a / (self.light_paths_count * cos_to_camera));
        let value = contribution.to_tristimulus(&ctx.wavelength);
        param.film.splat(film_uv, value, param.secondary);
    }

    fn evaluate_light(
        &self,
        light: &Lights,
        ray: &Ray,
        distance: f32,
        path: &PathState,
        ctx: &RenderingContext,
        scene_radius: f32,
        light_pick_probability: f32,
        iteration: u32,
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

        if path.length <= 1 {
            return result.radiance;
        }

        let merging_active = self.use_vertex_merging && iteration > 0;
        if merging_active && !self.use_vertex_connection {
            // pure photon mapping: only specular chains may pick up
            // light hits, everything else is covered by merging
            if !path.last_specular {
                return RayColor::zero();
            }
            return result.radiance;
        }

        let direct_pdf_a = result.direct_pdf_a * light_pick_probability;
        let emission_pdf_w = result.emission_pdf_w * light_pick_probability;

        let w_camera = mis(direct_pdf_a) * path.d_vcm + mis(emission_pdf_w) * path.d_vc;
        let mis_weight = 1.0 / (1.0 + w_camera);
        debug_assert!(mis_weight >= 0.0);

        result.radiance * mis_weight
    }

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
        ) * (self.mis_vm_factor_vc + path.d_vcm + path.d_vc * mis(eval.reverse_pdf_w));
        let mis_weight = 1.0 / (w_light + 1.0 + w_camera);
        debug_assert!(mis_weight >= 0.0);

        (illuminated.radiance * eval.factor)
            * (mis_weight / (light_pick_probability * illuminated.direct_pdf_w))
    }

    fn connect_vertices(
        &self,
        scene: &Scene,
        path: &PathState,
        shading: &ShadingData,
        vertex: &LightVertex,
        ctx: &mut RenderingContext,
    ) -> RayColor {
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
            * (self.mis_vm_factor_vc + vertex.d_vcm + vertex.d_vc * mis(light_eval.reverse_pdf_w));
        let w_camera = mis(light_bsdf_pdf_a)
            * (self.mis_vm_factor_vc + path.d_vcm + path.d_vc * mis(camera_eval.reverse_pdf_w));
        let mis_weight = 1.0 / (w_light + 1.0 + w_camera);
        debug_assert!(mis_weight >= 0.0);

        let contribution = (camera_eval.factor * light_eval.factor) * (geometry_term * mis_weight);
        debug_assert!(contribution.is_valid());
        contribution
    }

    /// Merge the camera vertex with the photons of the previous pass.
    fn merge_vertices(
        &self,
        scene: &Scene,
        path: &PathState,
        shading: &ShadingData,
        ctx: &RenderingContext,
    ) -> RayColor {
        let material = scene.material(shading.material_id);
        let mut contribution = RayColor::zero();

        self.grid.for_each_in_radius(
            &self.photon_positions,
            shading.frame.position,
            |photon_index| {
                let photon = &self.photons[photon_index as usize];

                let light_dir = photon.direction();
                let cos_to_light = shading.cos_theta(light_dir);
                if cos_to_light < f32::EPSILON {
                    return;
                }

                let eval = material.evaluate(shading, light_dir);
                debug_assert!(eval.factor.is_valid());
                if eval.factor.almost_zero() {
                    return;
                }

                let throughput = RayColor::resolve(
                    &ctx.wavelength,
                    Spectrum::new(crate::color::tristimulus_to_rgb(photon.throughput())),
                );

                let w_light =
                    photon.d_vcm * self.mis_vc_factor_vm + photon.d_vm * mis(eval.pdf_w);
                let w_camera =
                    path.d_vcm * self.mis_vc_factor_vm + path.d_vm * mis(eval.reverse_pdf_w);
                let weight = 1.0 / ((w_light + 1.0 + w_camera) * cos_to_light);
                debug_assert!(weight.is_finite() && weight > 0.0);

                contribution.scaled_add_assign(eval.factor * throughput, weight);
            },
        );

        contribution
    }
}

impl Renderer for Vcm {
    fn name(&self) -> &'static str {
        "VCM"
    }

    fn create_context(&self) -> RendererContexts {
        RendererContexts::Vcm(VcmContext::default())
    }

    fn pre_render(&mut self, iteration: u32, film_width: u32, film_height: u32) {
        debug_assert!(self.initial_radius >= self.min_radius);
        debug_assert!(self.radius_multiplier > 0.0 && self.radius_multiplier <= 1.0);
        debug_assert!(self.max_path_length > 0);

        self.light_paths_count = (film_width * film_height) as f32;

        if iteration == 0 {
            self.radius_vc = self.initial_radius;
            self.radius_vm = self.initial_radius;
        } else {
            // merging always works with the previous pass's photons, so
            // its radius lags one pass behind
            self.radius_vm = self.radius_vc;
            self.radius_vc = (self.radius_vc * self.radius_multiplier).max(self.min_radius);
        }

        // normalizes the energy gathered over the merging disk
        self.vm_normalization =
            1.0 / (self.radius_vm * self.radius_vm * PI * self.light_paths_count);

        {
            let eta_vcm = PI * self.radius_vc * self.radius_vc * self.light_paths_count;
            self.mis_vm_factor_vc = if self.use_vertex_merging && iteration > 0 {
                mis(eta_vcm)
            } else {
                0.0
            };
            self.mis_vc_factor_vc = if self.use_vertex_connection {
                mis(1.0 / eta_vcm)
            } else {
                0.0
            };
        }
        {
            let eta_vcm = PI * self.radius_vm * self.radius_vm * self.light_paths_count;
            self.mis_vm_factor_vm = if self.use_vertex_merging {
                mis(eta_vcm)
            } else {
                0.0
            };
            self.mis_vc_factor_vm = if self.use_vertex_connection {
                mis(1.0 / eta_vcm)
            } else {
                0.0
            };
        }

        self.photons.clear();
    }

    fn pre_render_global(&mut self, contexts: &mut [RenderingContext]) {
        // merge the per-thread photon lists recorded last pass
        for ctx in contexts.iter_mut() {
            if let RendererContexts::Vcm(vcm_ctx) = &mut ctx.renderer_context {
                self.photons.append(&mut vcm_ctx.photons);
            }
        }

        if self.use_vertex_merging && !self.photons.is_empty() {
            self.photon_positions.clear();
            self.photon_positions
                .extend(self.photons.iter().map(|p| p.position()));
            self.grid.build(&self.photon_positions, self.radius_vm);
            debug!("photon map: {} photons", self.photons.len());
        }
    }

    fn render_pixel(
        &self,
        scene: &Scene,
        primary_ray: &Ray,
        param: &RenderParam,
        ctx: &mut RenderingContext,
    ) -> RayColor {
        // step 1: light subpath (photons recorded for the next pass)
        self.trace_light_path(scene, param, ctx);
        let light_vertices = std::mem::take(&mut ctx.renderer_context.vcm().vertices);

        // step 2: camera subpath
        let mut result = RayColor::zero();
        let light_pick_probability = 1.0 / scene.lights().len().max(1) as f32;
        let merging_active = self.use_vertex_merging && param.iteration > 0;

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
                        param.iteration,
                    );
                    result.mul_add_assign(path.throughput, contribution);
                }
                break;
            }

            if hit.is_light() {
                let light = scene.light_by_object_id(hit.object_id);
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
                    param.iteration,
                );
                result.mul_add_assign(path.throughput, contribution);
                break;
            }

            let shading = scene.extract_shading_data(&path.ray, &hit, &ctx.wavelength);
            let material = scene.material(shading.material_id);

            {
                let inv_cos = 1.0 / mis(shading.cos_theta(path.ray.dir).abs());
                path.d_vcm *= mis(hit.distance * hit.distance) * inv_cos;
                path.d_vc *= inv_cos;
                path.d_vm *= inv_cos;
            }

            let emission = material.evaluate_emission(&ctx.wavelength, shading.tex_coord);
            result.mul_add_assign(path.throughput, emission);

            if path.length >= self.max_path_length {
                break;
            }

            let is_delta = material.bsdf().is_delta();

            // vertex connection: next event estimation
            if !is_delta && self.use_vertex_connection {
                let direct = self.sample_light(scene, &shading, &path, ctx);
                result.mul_add_assign(path.throughput, direct);

                // and connections to this pixel's light vertices
                let mut connection = RayColor::zero();
                for vertex in &light_vertices {
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

            // vertex merging against the photon map
            if !is_delta && merging_active {
                let merged = self.merge_vertices(scene, &path, &shading, ctx);
                debug_assert!(merged.is_valid());
                result.scaled_add_assign(path.throughput * merged, self.vm_normalization);
            }

            let sample = ctx.sampler.get_float3();
            if !advance_path(
                &mut path,
                &shading,
                material,
                &mut ctx.wavelength,
                sample,
                self.mis_vc_factor_vc,
                self.mis_vm_factor_vc,
            ) {
                break;
            }
        }

        ctx.counters.num_rays += u64::from(path.length) + 1;
        ctx.renderer_context.vcm().vertices = light_vertices;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photon_is_exactly_32_bytes() {
        assert_eq!(std::mem::size_of::<Photon>(), 32);
    }

    #[test]
    fn light_vertex_stays_cache_friendly() {
        assert!(std::mem::size_of::<LightVertex>() <= 192);
    }

    #[test]
    fn photon_packing_round_trips() {
        let photon = Photon::pack(
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.5, 0.25, 0.125),
            0.5,
            2.0,
        );
        assert_eq!(photon.position(), Vec3::new(1.0, -2.0, 3.0));
        assert!((photon.direction() - Vec3::Y).length() < 1.0e-3);
        assert!((photon.throughput() - Vec3::new(0.5, 0.25, 0.125)).length() < 1.0e-3);
    }

    #[test]
    fn radius_schedule_shrinks_and_lags() {
        let mut vcm = Vcm {
            radius_multiplier: 0.9,
            initial_radius: 0.1,
            min_radius: 0.001,
            ..Vcm::default()
        };
        vcm.pre_render(0, 8, 8);
        let r0_vc = vcm.radius_vc;
        let r0_vm = vcm.radius_vm;
        assert_eq!(r0_vc, 0.1);
        assert_eq!(r0_vm, 0.1);

        vcm.pre_render(1, 8, 8);
        assert_eq!(vcm.radius_vm, r0_vm);
        assert!((vcm.radius_vc - 0.09).abs() < 1.0e-6);

        vcm.pre_render(2, 8, 8);
        assert!((vcm.radius_vm - 0.09).abs() < 1.0e-6);
        assert!((vcm.radius_vc - 0.081).abs() < 1.0e-6);
    }

    #[test]
    fn merging_factor_disabled_on_first_pass() {
        let mut vcm = Vcm::default();
        vcm.pre_render(0, 4, 4);
        assert_eq!(vcm.mis_vm_factor_vc, 0.0);
        assert!(vcm.mis_vc_factor_vc > 0.0);
        vcm.pre_render(1, 4, 4);
        assert!(vcm.mis_vm_factor_vc > 0.0);
    }
}
