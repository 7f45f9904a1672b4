//! The renderer protocol and the five light-transport strategies built
//! on it: the debug AOV view, the naive path tracer, the MIS path
//! tracer, the light tracer, the bidirectional path tracer and vertex
//! connection and merging.
//!
//! All renderers share the same MIS helpers: the identity heuristic
//! (balance heuristic with exponent 1) and the solid-angle/area density
//! conversions.

use enum_dispatch::enum_dispatch;

use crate::camera::Camera;
use crate::color::RayColor;
use crate::film::Film;
use crate::math::Ray;
use crate::scene::Scene;

pub use self::bdpt::Bdpt;
pub use self::context::{
    LightSamplingStrategy, RendererContexts, RenderingContext, RenderingParams,
};
pub use self::counters::RayTracingCounters;
pub use self::debug::{DebugRenderer, DebugRenderingMode};
pub use self::light_tracer::LightTracer;
pub use self::path_tracer::PathTracer;
pub use self::path_tracer_mis::PathTracerMis;
pub use self::vcm::Vcm;
pub use self::walk::{LightVertex, PathState};

pub mod bdpt;
pub mod context;
pub mod counters;
pub mod debug;
pub mod hash_grid;
pub mod light_tracer;
pub mod path_tracer;
pub mod path_tracer_mis;
pub mod vcm;
pub mod walk;

/// MIS heuristic applied to every density: the power heuristic with
/// exponent 1.
#[inline]
pub(crate) fn mis(pdf: f32) -> f32 {
    pdf
}

/// Balance-heuristic combination of two strategies.
#[inline]
pub(crate) fn combine_mis(sample_pdf: f32, other_pdf: f32) -> f32 {
    let a = mis(sample_pdf);
    let b = mis(other_pdf);
    if a + b <= 0.0 {
        0.0
    } else {
        a / (a + b)
    }
}

/// Convert an area density at a point `distance` away into a solid-angle
/// density at the viewer.
#[inline]
pub(crate) fn pdf_a_to_w(pdf_a: f32, distance: f32, cos_there: f32) -> f32 {
    pdf_a * distance * distance / cos_there.abs().max(1.0e-9)
}

/// Convert a solid-angle density into an area density at a point
/// `distance` away.
#[inline]
pub(crate) fn pdf_w_to_a(pdf_w: f32, distance: f32, cos_there: f32) -> f32 {
    pdf_w * cos_there.abs() / (distance * distance)
}

/// Per-pixel inputs shared by all renderers.
pub struct RenderParam<'a> {
    pub camera: &'a Camera,
    pub film: &'a Film,
    /// Zero-based pass index.
    pub iteration: u32,
    /// Whether splats should also feed the secondary accumulation sum
    /// this pass.
    pub secondary: bool,
}

#[enum_dispatch(Renderers)]
pub trait Renderer {
    fn name(&self) -> &'static str;

    /// Build the per-thread scratch context this renderer needs.
    fn create_context(&self) -> RendererContexts {
        RendererContexts::None
    }

    /// Single-threaded per-pass setup (radius schedules, MIS constants).
    fn pre_render(&mut self, _iteration: u32, _film_width: u32, _film_height: u32) {}

    /// Single-threaded hook between passes with access to every thread
    /// context; VCM merges photon lists and builds its index here.
    fn pre_render_global(&mut self, _contexts: &mut [RenderingContext]) {}

    /// Estimate the radiance arriving along one primary ray.
    fn render_pixel(
        &self,
        scene: &Scene,
        ray: &Ray,
        param: &RenderParam,
        ctx: &mut RenderingContext,
    ) -> RayColor;
}

#[enum_dispatch]
pub enum Renderers {
    DebugRenderer,
    PathTracer,
    PathTracerMis,
    LightTracer,
    Bdpt,
    Vcm,
}

impl Renderers {
    /// Instantiate a renderer by its CLI/scene-file name.
    pub fn by_name(name: &str) -> Option<Renderers> {
        match name {
            "debug" => Some(DebugRenderer::default().into()),
            "pathTracer" | "pt" => Some(PathTracer::default().into()),
            "pathTracerMIS" | "ptmis" => Some(PathTracerMis::default().into()),
            "lightTracer" | "lt" => Some(LightTracer::default().into()),
            "bdpt" => Some(Bdpt::default().into()),
            "vcm" => Some(Vcm::default().into()),
            _ => None,
        }
    }
}
