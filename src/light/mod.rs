//! The light protocol. Every emitter supports three operations:
//! `illuminate` (sample a direction toward the light from a shading
//! point, for next event estimation), `emit` (sample an outgoing photon,
//! for light tracing and light subpaths) and `radiance` (evaluate the
//! light when a ray hits it directly). The reported pdf pair —
//! `direct_pdf` and `emission_pdf` — feeds the bidirectional MIS
//! machinery.

use enum_dispatch::enum_dispatch;
use glam::Vec3;

use crate::color::{RayColor, Wavelength};
use crate::math::{Ray, ShadingFrame};

pub use self::area::AreaLight;
pub use self::background::BackgroundLight;
pub use self::directional::DirectionalLight;
pub use self::point::PointLight;
pub use self::sphere::SphereLight;
pub use self::spot::SpotLight;

pub mod area;
pub mod background;
pub mod directional;
pub mod point;
pub mod sphere;
pub mod spot;

/// Distance reported for hits on infinite lights.
pub const BACKGROUND_LIGHT_DISTANCE: f32 = f32::MAX;

/// Cosine of the angular aperture below which a directional or spot
/// light degenerates to a Dirac delta.
pub const DELTA_APERTURE_COS: f32 = 0.9999;

/// Fallback scene bounding radius used when a scene has no finite
/// geometry to derive one from.
pub const DEFAULT_SCENE_RADIUS: f32 = 30.0;

pub struct IlluminateParam<'a> {
    /// Shading frame of the illuminated point.
    pub frame: &'a ShadingFrame,
    pub wavelength: &'a Wavelength,
    pub sample: [f32; 3],
    /// Bounding radius of the scene, for infinite lights.
    pub scene_radius: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct IlluminateResult {
    pub radiance: RayColor,
    /// Unit direction from the shading point toward the light.
    pub direction_to_light: Vec3,
    pub distance: f32,
    /// Density of this direction per unit solid angle at the shading
    /// point (squared distance for delta lights).
    pub direct_pdf_w: f32,
    /// Joint density of emitting from the sampled light point in the
    /// reverse direction (position times direction).
    pub emission_pdf_w: f32,
    /// Cosine between the light normal and the direction to the shading
    /// point; 1 for delta and infinite lights.
    pub cos_at_light: f32,
}

impl IlluminateResult {
    pub fn zero() -> Self {
        Self {
            radiance: RayColor::zero(),
            direction_to_light: Vec3::ZERO,
            distance: -1.0,
            direct_pdf_w: 0.0,
            emission_pdf_w: 0.0,
            cos_at_light: 0.0,
        }
    }
}

pub struct EmitParam<'a> {
    pub wavelength: &'a Wavelength,
    pub position_sample: [f32; 3],
    pub direction_sample: (f32, f32),
    pub scene_radius: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct EmitResult {
    /// Emitted radiance, already weighted by the cosine at the light for
    /// area emitters.
    pub radiance: RayColor,
    pub position: Vec3,
    pub direction: Vec3,
    /// Area density of the sampled origin.
    pub direct_pdf_a: f32,
    /// Joint position-direction density of the emitted ray.
    pub emission_pdf_w: f32,
    pub cos_at_light: f32,
}

impl EmitResult {
    pub fn zero() -> Self {
        Self {
            radiance: RayColor::zero(),
            position: Vec3::ZERO,
            direction: Vec3::Z,
            direct_pdf_a: 0.0,
            emission_pdf_w: 0.0,
            cos_at_light: 0.0,
        }
    }
}

pub struct RadianceParam<'a> {
    pub ray: &'a Ray,
    pub hit_point: Vec3,
    pub wavelength: &'a Wavelength,
    pub scene_radius: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct RadianceResult {
    pub radiance: RayColor,
    /// Density of sampling the hit point directly; an area density for
    /// finite lights, a solid-angle density for infinite ones.
    pub direct_pdf_a: f32,
    pub emission_pdf_w: f32,
}

impl RadianceResult {
    pub fn zero() -> Self {
        Self {
            radiance: RayColor::zero(),
            direct_pdf_a: 0.0,
            emission_pdf_w: 0.0,
        }
    }
}

#[enum_dispatch(Lights)]
pub trait Light {
    /// Light has a bounded surface. False for directional and background
    /// lights.
    fn is_finite(&self) -> bool;

    /// Light cannot be hit by a ray; its sampling density is a Dirac.
    fn is_delta(&self) -> bool;

    /// Sample a direction from a shading point toward the light.
    /// Returns zero radiance when the point receives nothing.
    fn illuminate(&self, param: &IlluminateParam) -> IlluminateResult;

    /// Sample an outgoing photon ray from the light surface.
    fn emit(&self, param: &EmitParam) -> EmitResult;

    /// Radiance seen by a ray that hits the light directly. Delta lights
    /// return zero.
    fn radiance(&self, param: &RadianceParam) -> RadianceResult;

    /// Intersection test used by the scene traversal. Delta lights never
    /// report a hit.
    fn test_ray_hit(&self, ray: &Ray) -> Option<f32>;

    /// Surface normal at a point on the light (for MIS cosine factors).
    fn normal(&self, hit_point: Vec3) -> Vec3;
}

#[enum_dispatch]
#[derive(Clone)]
pub enum Lights {
    AreaLight,
    SphereLight,
    PointLight,
    DirectionalLight,
    SpotLight,
    BackgroundLight,
}
