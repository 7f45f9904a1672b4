//! Smooth conductor: a Dirac mirror tinted by the metal Fresnel term.

use glam::Vec3;

use super::fresnel::fresnel_conductor;
use super::{
    Bsdf, BsdfEvaluation, BsdfEvent, BsdfSample, EvaluationContext, PdfDirection, SamplingContext,
    COS_EPSILON,
};

#[derive(Debug, Clone, Copy)]
pub struct MetalBsdf;

impl Bsdf for MetalBsdf {
    fn name(&self) -> &'static str {
        "metal"
    }

    fn is_delta(&self) -> bool {
        true
    }

    fn sample(&self, ctx: &SamplingContext) -> BsdfSample {
        let outgoing = ctx.outgoing_dir;
        if outgoing.z < COS_EPSILON {
            return BsdfSample::null();
        }

        let f = fresnel_conductor(outgoing.z, ctx.params.ior, ctx.params.k);
        BsdfSample {
            incoming_dir: Vec3::new(-outgoing.x, -outgoing.y, outgoing.z),
            weight: ctx.params.base_color * f,
            pdf: 1.0,
            event: BsdfEvent::SPECULAR_REFLECTION,
        }
    }

    fn evaluate(&self, _ctx: &EvaluationContext) -> BsdfEvaluation {
        BsdfEvaluation::zero()
    }

    fn pdf(&self, _ctx: &EvaluationContext, _dir: PdfDirection) -> f32 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::params;
    use super::*;

    #[test]
    fn mirrors_the_outgoing_direction() {
        let p = params(0.0, 0.2);
        let outgoing = Vec3::new(0.5, -0.3, 0.8).normalize();
        let s = MetalBsdf.sample(&SamplingContext {
            params: &p,
            outgoing_dir: outgoing,
            sample: [0.1, 0.2, 0.3],
        });
        assert_eq!(s.event, BsdfEvent::SPECULAR_REFLECTION);
        assert!((s.incoming_dir.x + outgoing.x).abs() < 1.0e-6);
        assert!((s.incoming_dir.z - outgoing.z).abs() < 1.0e-6);
        assert!(s.weight.is_valid());
        assert!(s.weight.max_value() <= 0.8 + 1.0e-4);
    }
}
