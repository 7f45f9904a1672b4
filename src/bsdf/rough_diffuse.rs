//! Oren-Nayar rough diffuse reflection. Falls back to the plain
//! Lambertian term when the roughness is negligible.

use std::f32::consts::FRAC_1_PI;

use glam::Vec3;

use crate::sampling::cos_sample_hemisphere;

use super::{
    Bsdf, BsdfEvaluation, BsdfEvent, BsdfSample, EvaluationContext, PdfDirection, SamplingContext,
    COS_EPSILON,
};

#[derive(Debug, Clone, Copy)]
pub struct RoughDiffuseBsdf;

/// Oren-Nayar reflectance factor (without albedo or 1/pi) for a local
/// direction pair. `sigma` is the surface roughness interpreted as the
/// slope standard deviation.
fn oren_nayar_term(outgoing: Vec3, incoming: Vec3, sigma: f32) -> f32 {
    let sigma2 = sigma * sigma;
    let a = 1.0 - sigma2 / (2.0 * (sigma2 + 0.33));
    let b = 0.45 * sigma2 / (sigma2 + 0.09);

    let cos_out = outgoing.z;
    let cos_in = incoming.z;
    let sin_out = (1.0 - cos_out * cos_out).max(0.0).sqrt();
    let sin_in = (1.0 - cos_in * cos_in).max(0.0).sqrt();

    // azimuthal difference term: cos(phi_in - phi_out) from projections
    let cos_phi_diff = if sin_out > 1.0e-4 && sin_in > 1.0e-4 {
        let out_phi = Vec3::new(outgoing.x / sin_out, outgoing.y / sin_out, 0.0);
        let in_phi = Vec3::new(incoming.x / sin_in, incoming.y / sin_in, 0.0);
        out_phi.dot(in_phi).max(0.0)
    } else {
        0.0
    };

    let (sin_alpha, tan_beta) = if cos_out > cos_in {
        (sin_in, sin_out / cos_out.max(COS_EPSILON))
    } else {
        (sin_out, sin_in / cos_in.max(COS_EPSILON))
    };

    a + b * cos_phi_diff * sin_alpha * tan_beta
}

impl Bsdf for RoughDiffuseBsdf {
    fn name(&self) -> &'static str {
        "roughDiffuse"
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

        let term = oren_nayar_term(ctx.outgoing_dir, incoming, ctx.params.roughness);
        BsdfSample {
            incoming_dir: incoming,
            weight: ctx.params.base_color * term,
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

        let term = oren_nayar_term(ctx.outgoing_dir, ctx.incoming_dir, ctx.params.roughness);
        BsdfEvaluation {
            weight: ctx.params.base_color * (term * cos_in * FRAC_1_PI),
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
    use rand::{Rng, SeedableRng, XorShiftRng};

    #[test]
    fn zero_roughness_reduces_to_lambertian() {
        let p = params(0.0, 1.5);
        let outgoing = Vec3::new(0.1, 0.4, 0.9).normalize();
        let incoming = Vec3::new(-0.3, 0.2, 0.8).normalize();
        let e = RoughDiffuseBsdf.evaluate(&EvaluationContext {
            params: &p,
            outgoing_dir: outgoing,
            incoming_dir: incoming,
        });
        let lambert = 0.8 * incoming.z * FRAC_1_PI;
        assert!((e.weight.values[0] - lambert).abs() < 1.0e-4);
    }

    #[test]
    fn reciprocity_of_raw_reflectance() {
        let p = params(0.5, 1.5);
        let mut rng = XorShiftRng::from_seed([5, 4, 3, 2]);
        for _ in 0..200 {
            let a = crate::sampling::uniform_sample_hemisphere((rng.next_f32(), rng.next_f32()));
            let b = crate::sampling::uniform_sample_hemisphere((rng.next_f32(), rng.next_f32()));
            if a.z < 1.0e-3 || b.z < 1.0e-3 {
                continue;
            }
            let fwd = RoughDiffuseBsdf.evaluate(&EvaluationContext {
                params: &p,
                outgoing_dir: a,
                incoming_dir: b,
            });
            let rev = RoughDiffuseBsdf.evaluate(&EvaluationContext {
                params: &p,
                outgoing_dir: b,
                incoming_dir: a,
            });
            // strip the cosine premultiplication before comparing
            let f_ab = fwd.weight.values[0] / b.z;
            let f_ba = rev.weight.values[0] / a.z;
            assert!(
                (f_ab - f_ba).abs() < 1.0e-4,
                "non-reciprocal: {} vs {}",
                f_ab,
                f_ba
            );
        }
    }

    #[test]
    fn energy_is_bounded() {
        let p = params(0.8, 1.5);
        let outgoing = Vec3::new(0.0, 0.2, 0.98).normalize();
        let mut rng = XorShiftRng::from_seed([9, 8, 7, 6]);
        let n = 100_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            let d = crate::sampling::uniform_sample_hemisphere((rng.next_f32(), rng.next_f32()));
            let e = RoughDiffuseBsdf.evaluate(&EvaluationContext {
                params: &p,
                outgoing_dir: outgoing,
                incoming_dir: d,
            });
            sum += e.weight.values[0] as f64 / crate::sampling::uniform_hemisphere_pdf() as f64;
        }
        assert!(sum / n as f64 <= 1.0 + 0.02);
    }
}
