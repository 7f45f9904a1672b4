//! The scene container and its ray-cast interface: nearest-hit
//! traversal, any-hit shadow queries and shading-data extraction. Hits
//! on light surfaces are tagged with a reserved sub-object identifier
//! and resolved through the light protocol rather than the material
//! system.
//!
//! Traversal is a linear scan; a spatial acceleration structure can be
//! slotted in behind the same interface.

use crate::bsdf::SampledMaterialParameters;
use crate::color::{RayColor, Wavelength};
use crate::geometry::{Shape, Shapes};
use crate::light::{Light, Lights, DEFAULT_SCENE_RADIUS};
use crate::material::{Material, ShadingData};
use crate::math::Ray;

pub mod loader;

/// Sub-object identifier marking "this hit is on a light surface".
pub const LIGHT_SUB_OBJECT: u32 = u32::MAX;

/// Object identifier reported for rays that left the scene.
pub const INVALID_OBJECT: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
pub struct HitPoint {
    /// Hit distance; `f32::MAX` when the ray missed everything.
    pub distance: f32,
    pub object_id: u32,
    /// Triangle index for meshes, or [`LIGHT_SUB_OBJECT`] for lights.
    pub sub_object_id: u32,
    /// Barycentric / parametric surface coordinates.
    pub u: f32,
    pub v: f32,
}

impl HitPoint {
    pub fn miss() -> Self {
        Self {
            distance: f32::MAX,
            object_id: INVALID_OBJECT,
            sub_object_id: 0,
            u: 0.0,
            v: 0.0,
        }
    }

    pub fn is_miss(&self) -> bool {
        self.object_id == INVALID_OBJECT
    }

    pub fn is_light(&self) -> bool {
        self.sub_object_id == LIGHT_SUB_OBJECT
    }
}

enum SceneObject {
    Shape { shape: Shapes, material_id: u32 },
    Light { light_id: u32 },
}

#[derive(Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
    lights: Vec<Lights>,
    global_lights: Vec<u32>,
    materials: Vec<Material>,
    bounding_radius: f32,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            lights: Vec::new(),
            global_lights: Vec::new(),
            materials: Vec::new(),
            bounding_radius: DEFAULT_SCENE_RADIUS,
        }
    }

    pub fn add_material(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }

    pub fn add_shape(&mut self, shape: Shapes, material_id: u32) {
        debug_assert!((material_id as usize) < self.materials.len());
        self.objects.push(SceneObject::Shape { shape, material_id });
    }

    pub fn add_light(&mut self, light: Lights) {
        let light_id = self.lights.len() as u32;
        if !light.is_finite() {
            self.global_lights.push(light_id);
        }
        self.lights.push(light);
        self.objects.push(SceneObject::Light { light_id });
    }

    /// Recompute derived data after the object set changed. Call once
    /// before rendering.
    pub fn finalize(&mut self) {
        let mut max_extent: f32 = 0.0;
        for object in &self.objects {
            if let SceneObject::Shape { shape, .. } = object {
                if let Some((min, max)) = shape.bounds() {
                    max_extent = max_extent.max(min.length()).max(max.length());
                }
            }
        }
        self.bounding_radius = if max_extent > 0.0 {
            max_extent * 1.5
        } else {
            DEFAULT_SCENE_RADIUS
        };

        info!(
            "scene: {} objects, {} lights ({} global), {} materials, radius {:.1}",
            self.objects.len(),
            self.lights.len(),
            self.global_lights.len(),
            self.materials.len(),
            self.bounding_radius
        );

        for (i, light) in self.lights.iter().enumerate() {
            if let Lights::AreaLight(area) = light {
                if area.area() <= 0.0 || !area.area().is_finite() {
                    error!("area light {} has a degenerate surface", i);
                }
            }
        }
    }

    /// Nearest intersection along the ray.
    pub fn traverse(&self, ray: &Ray) -> HitPoint {
        let mut hit = HitPoint::miss();
        for (object_id, object) in self.objects.iter().enumerate() {
            match object {
                SceneObject::Shape { shape, .. } => {
                    if let Some(shape_hit) = shape.intersect(ray) {
                        if shape_hit.distance < hit.distance {
                            hit = HitPoint {
                                distance: shape_hit.distance,
                                object_id: object_id as u32,
                                sub_object_id: shape_hit.sub_object_id,
                                u: shape_hit.u,
                                v: shape_hit.v,
                            };
                        }
                    }
                }
                SceneObject::Light { light_id } => {
                    if let Some(distance) = self.lights[*light_id as usize].test_ray_hit(ray) {
                        if distance < hit.distance {
                            hit = HitPoint {
                                distance,
                                object_id: object_id as u32,
                                sub_object_id: LIGHT_SUB_OBJECT,
                                u: 0.0,
                                v: 0.0,
                            };
                        }
                    }
                }
            }
        }
        hit
    }

    /// Any-hit occlusion query up to `max_distance`. Light surfaces do
    /// not occlude.
    pub fn traverse_shadow(&self, ray: &Ray, max_distance: f32) -> bool {
        for object in &self.objects {
            if let SceneObject::Shape { shape, .. } = object {
                if let Some(shape_hit) = shape.intersect(ray) {
                    if shape_hit.distance < max_distance {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Build the shading data for a (non-light) hit, with material
    /// parameters evaluated at the bundle wavelengths.
    pub fn extract_shading_data(
        &self,
        ray: &Ray,
        hit: &HitPoint,
        wavelength: &Wavelength,
    ) -> ShadingData {
        debug_assert!(!hit.is_miss() && !hit.is_light());
        let (shape, material_id) = match &self.objects[hit.object_id as usize] {
            SceneObject::Shape { shape, material_id } => (shape, *material_id),
            SceneObject::Light { .. } => unreachable!("light hits use the light protocol"),
        };

        let shape_hit = crate::geometry::ShapeHit {
            distance: hit.distance,
            u: hit.u,
            v: hit.v,
            sub_object_id: hit.sub_object_id,
        };
        let (frame, tex_coord) = shape.shading_frame(ray, &shape_hit);

        let mut shading = ShadingData {
            frame,
            tex_coord,
            material_id,
            outgoing_dir_world: -ray.dir,
            params: SampledMaterialParameters {
                base_color: RayColor::zero(),
                roughness: 0.0,
                metalness: 0.0,
                ior: 1.0,
                k: 0.0,
            },
        };
        self.materials[material_id as usize].evaluate_shading_data(wavelength, &mut shading);
        shading
    }

    pub fn material(&self, id: u32) -> &Material {
        &self.materials[id as usize]
    }

    pub fn lights(&self) -> &[Lights] {
        &self.lights
    }

    pub fn light(&self, id: u32) -> &Lights {
        &self.lights[id as usize]
    }

    pub fn global_lights(&self) -> impl Iterator<Item = &Lights> {
        self.global_lights.iter().map(|id| &self.lights[*id as usize])
    }

    /// The light whose surface produced a hit tagged with
    /// [`LIGHT_SUB_OBJECT`].
    pub fn light_by_object_id(&self, object_id: u32) -> &Lights {
        match &self.objects[object_id as usize] {
            SceneObject::Light { light_id } => &self.lights[*light_id as usize],
            SceneObject::Shape { .. } => unreachable!("object {} is not a light", object_id),
        }
    }

    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Spectrum;
    use crate::geometry::{Plane, Sphere};
    use crate::light::{AreaLight, PointLight};
    use glam::Vec3;

    fn test_scene() -> Scene {
        let mut scene = Scene::new();
        let white = scene.add_material(Material::new("white"));
        scene.add_shape(Sphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0).into(), white);
        scene.add_shape(Plane::new(Vec3::ZERO, Vec3::Y).into(), white);
        scene.add_light(
            AreaLight::new(
                Vec3::new(-1.0, 5.0, -1.0),
                Vec3::new(0.0, 0.0, 2.0),
                Vec3::new(2.0, 0.0, 0.0),
                Spectrum::splat(10.0),
                false,
            )
            .into(),
        );
        scene.add_light(PointLight::new(Vec3::new(4.0, 4.0, 0.0), Spectrum::splat(5.0)).into());
        scene.finalize();
        scene
    }

    #[test]
    fn traversal_finds_the_nearest_surface() {
        let scene = test_scene();
        let ray = Ray::new(Vec3::new(0.0, 1.0, -5.0), Vec3::Z);
        let hit = scene.traverse(&ray);
        assert!(!hit.is_miss());
        assert!((hit.distance - 4.0).abs() < 1.0e-4);
    }

    #[test]
    fn light_hits_carry_the_sentinel() {
        let scene = test_scene();
        let ray = Ray::new(Vec3::new(0.0, 3.0, 0.0), Vec3::Y);
        let hit = scene.traverse(&ray);
        assert!(hit.is_light());
        let light = scene.light_by_object_id(hit.object_id);
        assert!(!light.is_delta());
    }

    #[test]
    fn delta_lights_are_never_hit() {
        let scene = test_scene();
        let ray = Ray::new(Vec3::new(4.0, 0.0, 0.0), Vec3::Y);
        let hit = scene.traverse(&ray);
        // passes straight through the point light's position
        assert!(hit.is_miss());
    }

    #[test]
    fn shadow_rays_ignore_light_surfaces() {
        let scene = test_scene();
        // from above the sphere toward the area light at y = 5
        let ray = Ray::new(Vec3::new(0.0, 3.0, 0.0), Vec3::Y);
        assert!(!scene.traverse_shadow(&ray, 10.0));
        // through the sphere
        let blocked = Ray::new(Vec3::new(0.0, 1.0, -5.0), Vec3::Z);
        assert!(scene.traverse_shadow(&blocked, 10.0));
    }

    #[test]
    fn shading_data_reflects_the_hit_surface() {
        let scene = test_scene();
        let w = Wavelength::new();
        let ray = Ray::new(Vec3::new(3.0, 2.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let hit = scene.traverse(&ray);
        assert!(!hit.is_light());
        let shading = scene.extract_shading_data(&ray, &hit, &w);
        assert!((shading.frame.normal - Vec3::Y).length() < 1.0e-4);
        assert!((shading.frame.position.y).abs() < 1.0e-3);
    }
}
