//! The BSDF protocol. Scattering functions work in the local tangent
//! frame of the hit point (X = tangent, Z = normal) and handle both
//! reflection and transmission. Sampling returns the ray weight already
//! multiplied by |cos(theta_in)| and divided by the sampling pdf, so
//! integrators multiply it straight into the path throughput.
//!
//! Direction convention: both `outgoing_dir` (toward the previous path
//! vertex) and `incoming_dir` (toward the light / the next path vertex)
//! point away from the surface.

use bitflags::bitflags;
use enum_dispatch::enum_dispatch;
use glam::Vec3;

use crate::color::RayColor;

pub use self::dielectric::DielectricBsdf;
pub use self::diffuse::DiffuseBsdf;
pub use self::metal::MetalBsdf;
pub use self::plastic::PlasticBsdf;
pub use self::rough_dielectric::RoughDielectricBsdf;
pub use self::rough_diffuse::RoughDiffuseBsdf;
pub use self::rough_metal::RoughMetalBsdf;

pub mod dielectric;
pub mod diffuse;
pub mod fresnel;
pub mod metal;
pub mod microfacet;
pub mod plastic;
pub mod rough_dielectric;
pub mod rough_diffuse;
pub mod rough_metal;

/// Incoming/outgoing directions closer to grazing than this produce zero
/// contribution and zero pdf, guarding the divisions in the microfacet
/// terms.
pub const COS_EPSILON: f32 = 1.0e-5;

/// Below this roughness a glossy lobe collapses to a specular event:
/// evaluation returns zero and sampling produces a Dirac direction.
pub const SPECULAR_ROUGHNESS_THRESHOLD: f32 = 0.005;

bitflags! {
    /// Kind of scattering event produced by sampling. An empty set is
    /// the null event and terminates the walk.
    pub struct BsdfEvent: u32 {
        const DIFFUSE_REFLECTION   = 1 << 0;
        const DIFFUSE_TRANSMISSION = 1 << 1;
        const GLOSSY_REFLECTION    = 1 << 2;
        const GLOSSY_REFRACTION    = 1 << 3;
        const SPECULAR_REFLECTION  = 1 << 4;
        const SPECULAR_REFRACTION  = 1 << 5;

        const DIFFUSE = Self::DIFFUSE_REFLECTION.bits | Self::DIFFUSE_TRANSMISSION.bits;
        const GLOSSY = Self::GLOSSY_REFLECTION.bits | Self::GLOSSY_REFRACTION.bits;
        const SPECULAR = Self::SPECULAR_REFLECTION.bits | Self::SPECULAR_REFRACTION.bits;

        const REFLECTIVE = Self::DIFFUSE_REFLECTION.bits
            | Self::GLOSSY_REFLECTION.bits
            | Self::SPECULAR_REFLECTION.bits;
        const TRANSMISSIVE = Self::DIFFUSE_TRANSMISSION.bits
            | Self::GLOSSY_REFRACTION.bits
            | Self::SPECULAR_REFRACTION.bits;

        const ANY = Self::REFLECTIVE.bits | Self::TRANSMISSIVE.bits;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfDirection {
    Forward,
    Reverse,
}

/// Material parameters evaluated at the hit point's texture coordinates.
#[derive(Debug, Clone, Copy)]
pub struct SampledMaterialParameters {
    pub base_color: RayColor,
    pub roughness: f32,
    pub metalness: f32,
    /// Index of refraction; for dispersive materials this is already the
    /// hero-wavelength value.
    pub ior: f32,
    /// Imaginary part of the conductor IoR.
    pub k: f32,
}

pub struct SamplingContext<'a> {
    pub params: &'a SampledMaterialParameters,
    /// Fixed direction, local space, pointing away from the surface.
    pub outgoing_dir: Vec3,
    pub sample: [f32; 3],
}

#[derive(Debug, Clone, Copy)]
pub struct BsdfSample {
    /// Generated direction, local space, pointing away from the surface.
    pub incoming_dir: Vec3,
    /// Ray weight: f * |cos(theta_in)| / pdf.
    pub weight: RayColor,
    /// Solid-angle density of the generated direction; 1 for Dirac
    /// events weighted by the branch probability where applicable.
    pub pdf: f32,
    pub event: BsdfEvent,
}

impl BsdfSample {
    /// No valid scattering; the caller terminates the walk.
    pub fn null() -> Self {
        Self {
            incoming_dir: Vec3::ZERO,
            weight: RayColor::zero(),
            pdf: 0.0,
            event: BsdfEvent::empty(),
        }
    }
}

pub struct EvaluationContext<'a> {
    pub params: &'a SampledMaterialParameters,
    /// Local space, toward the previous path vertex.
    pub outgoing_dir: Vec3,
    /// Local space, toward the light.
    pub incoming_dir: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct BsdfEvaluation {
    /// f * |cos(theta_in)|.
    pub weight: RayColor,
    /// Density of sampling `incoming_dir` given `outgoing_dir`.
    pub pdf_forward: f32,
    /// Density of sampling `outgoing_dir` given `incoming_dir`.
    pub pdf_reverse: f32,
}

impl BsdfEvaluation {
    pub fn zero() -> Self {
        Self {
            weight: RayColor::zero(),
            pdf_forward: 0.0,
            pdf_reverse: 0.0,
        }
    }
}

#[enum_dispatch(Bsdfs)]
pub trait Bsdf {
    fn name(&self) -> &'static str;

    /// Whether the distribution is a Dirac delta: sampling only produces
    /// specular events and evaluation always returns zero.
    fn is_delta(&self) -> bool;

    /// Importance-sample an incoming direction for the fixed outgoing
    /// direction.
    fn sample(&self, ctx: &SamplingContext) -> BsdfSample;

    /// Evaluate the weight and both pdfs for a fixed direction pair.
    /// Delta distributions return zero.
    fn evaluate(&self, ctx: &EvaluationContext) -> BsdfEvaluation;

    /// Probability density of the direction pair for forward or reverse
    /// sampling.
    fn pdf(&self, ctx: &EvaluationContext, dir: PdfDirection) -> f32;
}

#[enum_dispatch]
#[derive(Clone, Copy)]
pub enum Bsdfs {
    DiffuseBsdf,
    RoughDiffuseBsdf,
    DielectricBsdf,
    RoughDielectricBsdf,
    MetalBsdf,
    RoughMetalBsdf,
    PlasticBsdf,
}

impl Bsdfs {
    /// Look up a BSDF by its scene-file name.
    pub fn by_name(name: &str) -> Option<Bsdfs> {
        match name {
            "diffuse" => Some(DiffuseBsdf.into()),
            "roughDiffuse" => Some(RoughDiffuseBsdf.into()),
            "dielectric" => Some(DielectricBsdf.into()),
            "roughDielectric" => Some(RoughDielectricBsdf.into()),
            "metal" => Some(MetalBsdf.into()),
            "roughMetal" => Some(RoughMetalBsdf.into()),
            "plastic" => Some(PlasticBsdf.into()),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn params(roughness: f32, ior: f32) -> SampledMaterialParameters {
        SampledMaterialParameters {
            base_color: RayColor::splat(0.8),
            roughness,
            metalness: 0.0,
            ior,
            k: 3.9,
        }
    }
}
