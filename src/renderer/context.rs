//! Per-thread rendering state and the user-facing rendering parameters.

use rand::{SeedableRng, XorShiftRng};
use serde::Deserialize;

use crate::color::Wavelength;
use crate::sampler::{BlueNoiseTexture, GenericSampler};

use super::counters::RayTracingCounters;
use super::vcm::VcmContext;
use super::walk::LightVertex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightSamplingStrategy {
    /// Sample one uniformly chosen light per estimate.
    Single,
    /// Sample every light per estimate.
    All,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RenderingParams {
    /// Maximum number of path segments.
    pub max_ray_depth: u32,
    /// First depth at which Russian roulette may terminate a path.
    pub min_russian_roulette_depth: u32,
    pub light_sampling_strategy: LightSamplingStrategy,
    /// Edge length of the square tiles handed to workers.
    pub tile_size: u32,
}

impl Default for RenderingParams {
    fn default() -> Self {
        Self {
            max_ray_depth: 12,
            min_russian_roulette_depth: 2,
            light_sampling_strategy: LightSamplingStrategy::Single,
            tile_size: 16,
        }
    }
}

/// Renderer-specific per-thread scratch.
pub enum RendererContexts {
    None,
    /// Light vertices of the pixel currently being rendered.
    Bdpt(Vec<LightVertex>),
    Vcm(VcmContext),
}

impl RendererContexts {
    pub fn bdpt_vertices(&mut self) -> &mut Vec<LightVertex> {
        match self {
            RendererContexts::Bdpt(v) => v,
            _ => unreachable!("renderer context is not BDPT"),
        }
    }

    pub fn vcm(&mut self) -> &mut VcmContext {
        match self {
            RendererContexts::Vcm(c) => c,
            _ => unreachable!("renderer context is not VCM"),
        }
    }
}

/// Everything a worker thread owns while rendering: its sampler, the
/// fallback generator, the wavelength bundle of the current pixel
/// sample, counters and the renderer scratch.
pub struct RenderingContext {
    pub sampler: GenericSampler,
    pub rng: XorShiftRng,
    pub wavelength: Wavelength,
    pub params: RenderingParams,
    pub counters: RayTracingCounters,
    pub renderer_context: RendererContexts,
}

impl RenderingContext {
    pub fn new(
        params: RenderingParams,
        blue_noise: Option<BlueNoiseTexture>,
        thread_index: u32,
    ) -> Self {
        let seed = [
            0x1234_5678 ^ thread_index.wrapping_mul(0x9e37_79b9),
            0x9abc_def0 | 1,
            thread_index.wrapping_add(0x6a09_e667),
            0xbb67_ae85,
        ];
        Self {
            sampler: GenericSampler::new(blue_noise, thread_index),
            rng: XorShiftRng::from_seed(seed),
            wavelength: Wavelength::new(),
            params,
            counters: RayTracingCounters::default(),
            renderer_context: RendererContexts::None,
        }
    }
}
