//! Rough conductor: GGX microfacet reflection with the metal Fresnel
//! term. Collapses to the smooth conductor below the specular roughness
//! threshold.

use crate::math::reflect;

use super::fresnel::fresnel_conductor;
use super::metal::MetalBsdf;
use super::microfacet::Ggx;
use super::{
    Bsdf, BsdfEvaluation, BsdfEvent, BsdfSample, EvaluationContext, PdfDirection, SamplingContext,
    COS_EPSILON, SPECULAR_ROUGHNESS_THRESHOLD,
};

#[derive(Debug, Clone, Copy)]
pub struct RoughMetalBsdf;

impl Bsdf for RoughMetalBsdf {
    fn name(&self) -> &'static str {
        "roughMetal"
    }

    fn is_delta(&self) -> bool {
        false
    }

    fn sample(&self, ctx: &SamplingContext) -> BsdfSample {
        if ctx.params.roughness < SPECULAR_ROUGHNESS_THRESHOLD {
            return MetalBsdf.sample(ctx);
        }

        let outgoing = ctx.outgoing_dir;
        if outgoing.z < COS_EPSILON {
            return BsdfSample::null();
        }

        let ggx = Ggx::new(ctx.params.roughness);
        let m = ggx.sample((ctx.sample[0], ctx.sample[1]));
        let cos_om = outgoing.dot(m);
        if cos_om < COS_EPSILON {
            return BsdfSample::null();
        }

        let incoming = reflect(outgoing, m);
        if incoming.z < COS_EPSILON {
            return BsdfSample::null();
        }

        let f = fresnel_conductor(cos_om, ctx.params.ior, ctx.params.k);
        let g = ggx.g(outgoing, incoming, m);
        BsdfSample {
            incoming_dir: incoming,
            weight: ctx.params.base_color * (f * g * cos_om / (outgoing.z * m.z)),
            pdf: ggx.pdf(m) / (4.0 * cos_om),
            event: BsdfEvent::GLOSSY_REFLECTION,
        }
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> BsdfEvaluation {
        if ctx.params.roughness < SPECULAR_ROUGHNESS_THRESHOLD {
            return BsdfEvaluation::zero();
        }

        let outgoing = ctx.outgoing_dir;
        let incoming = ctx.incoming_dir;
        if outgoing.z < COS_EPSILON || incoming.z < COS_EPSILON {
            return BsdfEvaluation::zero();
        }

        let mut m = outgoing + incoming;
        if m.length_squared() < 1.0e-12 {
            return BsdfEvaluation::zero();
        }
        m = m.normalize();
        let cos_om = outgoing.dot(m);
        if cos_om < COS_EPSILON {
            return BsdfEvaluation::zero();
        }

        let ggx = Ggx::new(ctx.params.roughness);
        let d = ggx.d(m);
        let g = ggx.g(outgoing, incoming, m);
        let f = fresnel_conductor(cos_om, ctx.params.ior, ctx.params.k);

        // f_r cos_i = F D G / (4 cos_o); the half-vector dots are equal
        // for a reflection pair, so forward and reverse densities match
        // up to the cosine they condition on.
        let pdf = ggx.pdf(m) / (4.0 * cos_om);
        BsdfEvaluation {
            weight: ctx.params.base_color * (f * d * g / (4.0 * outgoing.z)),
            pdf_forward: pdf,
            pdf_reverse: pdf,
        }
    }

    fn pdf(&self, ctx: &EvaluationContext, dir: PdfDirection) -> f32 {
        let e = self.evaluate(ctx);
        match dir {
            PdfDirection::Forward => e.pdf_forward,
            PdfDirection::Reverse => e.pdf_reverse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::params;
    use super::*;
    use glam::Vec3;
    use rand::{Rng, SeedableRng, XorShiftRng};

    #[test]
    fn sample_pdf_agrees_with_evaluate() {
        let p = params(0.4, 0.2);
        let mut rng = XorShiftRng::from_seed([41, 42, 43, 44]);
        let outgoing = Vec3::new(0.2, 0.3, 0.9).normalize();
        let mut checked = 0;
        for _ in 0..2000 {
            let s = RoughMetalBsdf.sample(&SamplingContext {
                params: &p,
                outgoing_dir: outgoing,
                sample: [rng.next_f32(), rng.next_f32(), rng.next_f32()],
            });
            if s.event.is_empty() {
                continue;
            }
            let e = RoughMetalBsdf.evaluate(&EvaluationContext {
                params: &p,
                outgoing_dir: outgoing,
                incoming_dir: s.incoming_dir,
            });
            assert!(
                (s.pdf - e.pdf_forward).abs() / s.pdf.max(1.0e-6) < 1.0e-3,
                "pdf {} vs {}",
                s.pdf,
                e.pdf_forward
            );
            checked += 1;
        }
        assert!(checked > 500);
    }

    #[test]
    fn energy_is_bounded() {
        let p = params(0.5, 0.2);
        let outgoing = Vec3::new(0.0, 0.4, 0.9).normalize();
        let mut rng = XorShiftRng::from_seed([51, 52, 53, 54]);
        let n = 100_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            let d = crate::sampling::uniform_sample_hemisphere((rng.next_f32(), rng.next_f32()));
            let e = RoughMetalBsdf.evaluate(&EvaluationContext {
                params: &p,
                outgoing_dir: outgoing,
                incoming_dir: d,
            });
            sum += e.weight.max_value().max(0.0) as f64
                / crate::sampling::uniform_hemisphere_pdf() as f64;
        }
        assert!(sum / n as f64 <= 1.0 + 0.03, "estimate {}", sum / n as f64);
    }
}
