//! Lambertian reflection.

use std::f32::consts::FRAC_1_PI;

use crate::sampling::cos_sample_hemisphere;

use super::{
    Bsdf, BsdfEvaluation, BsdfEvent, BsdfSample, EvaluationContext, PdfDirection, SamplingContext,
    COS_EPSILON,
};

#[derive(Debug, Clone, Copy)]
pub struct DiffuseBsdf;

impl Bsdf for DiffuseBsdf {
    fn name(&self) -> &'static str {
        "diffuse"
    }

    fn is_delta(&self) -> bool {
        false
    }

    fn sample(&self, ctx: &SamplingContext) -> BsdfSample {
        if ctx.outgoing_dir.z < COS_EPSILON {
            return BsdfSample::null();
        }

        let incoming = cos_sample_hemisphere((ctx.sample[0], ctx.sample[1]));
        if incoming.z < COS_EPSILON {
            return BsdfSample::null();
        }

        // weight = f cos / pdf = (albedo/pi) cos / (cos/pi) = albedo
        BsdfSample {
            incoming_dir: incoming,
            weight: ctx.params.base_color,
            pdf: incoming.z * FRAC_1_PI,
            event: BsdfEvent::DIFFUSE_REFLECTION,
        }
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> BsdfEvaluation {
        let cos_out = ctx.outgoing_dir.z;
        let cos_in = ctx.incoming_dir.z;
        if cos_out < COS_EPSILON || cos_in < COS_EPSILON {
            return BsdfEvaluation::zero();
        }

        BsdfEvaluation {
            weight: ctx.params.base_color * (cos_in * FRAC_1_PI),
            pdf_forward: cos_in * FRAC_1_PI,
            pdf_reverse: cos_out * FRAC_1_PI,
        }
    }

    fn pdf(&self, ctx: &EvaluationContext, dir: PdfDirection) -> f32 {
        let cos_out = ctx.outgoing_dir.z;
        let cos_in = ctx.incoming_dir.z;
        if cos_out < COS_EPSILON || cos_in < COS_EPSILON {
            return 0.0;
        }
        match dir {
            PdfDirection::Forward => cos_in * FRAC_1_PI,
            PdfDirection::Reverse => cos_out * FRAC_1_PI,
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
    fn sampled_pdf_matches_evaluate() {
        let p = params(0.0, 1.5);
        let mut rng = XorShiftRng::from_seed([11, 3, 5, 7]);
        let outgoing = Vec3::new(0.2, -0.1, 0.9).normalize();
        for _ in 0..1000 {
            let s = DiffuseBsdf.sample(&SamplingContext {
                params: &p,
                outgoing_dir: outgoing,
                sample: [rng.next_f32(), rng.next_f32(), rng.next_f32()],
            });
            if s.event.is_empty() {
                continue;
            }
            let e = DiffuseBsdf.evaluate(&EvaluationContext {
                params: &p,
                outgoing_dir: outgoing,
                incoming_dir: s.incoming_dir,
            });
            assert!((s.pdf - e.pdf_forward).abs() / s.pdf.max(1.0e-6) < 1.0e-4);
        }
    }

    #[test]
    fn energy_is_conserved() {
        // integral of f cos over the hemisphere equals the albedo
        let p = params(0.0, 1.5);
        let outgoing = Vec3::new(0.0, 0.3, 0.95).normalize();
        let mut rng = XorShiftRng::from_seed([1, 2, 3, 4]);
        let n = 100_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            let d =
                crate::sampling::uniform_sample_hemisphere((rng.next_f32(), rng.next_f32()));
            let e = DiffuseBsdf.evaluate(&EvaluationContext {
                params: &p,
                outgoing_dir: outgoing,
                incoming_dir: d,
            });
            sum += e.weight.values[0] as f64 / crate::sampling::uniform_hemisphere_pdf() as f64;
        }
        let estimate = sum / n as f64;
        assert!(estimate <= 1.0 + 0.02);
        assert!((estimate - 0.8).abs() < 0.02, "albedo estimate {}", estimate);
    }
}
