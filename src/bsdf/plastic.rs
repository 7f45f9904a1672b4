//! Plastic: a smooth dielectric coat layered over a diffuse base. The
//! coat reflects specularly with the Fresnel probability; what refracts
//! through scatters off the diffuse substrate. Both entry and exit
//! Fresnel transmissions attenuate the diffuse lobe, keeping it
//! reciprocal.

use std::f32::consts::FRAC_1_PI;

use glam::Vec3;

use crate::color::RayColor;
use crate::sampling::cos_sample_hemisphere;

use super::fresnel::fresnel_dielectric;
use super::{
    Bsdf, BsdfEvaluation, BsdfEvent, BsdfSample, EvaluationContext, PdfDirection, SamplingContext,
    COS_EPSILON,
};

#[derive(Debug, Clone, Copy)]
pub struct PlasticBsdf;

impl Bsdf for PlasticBsdf {
    fn name(&self) -> &'static str {
        "plastic"
    }

    fn is_delta(&self) -> bool {
        false
    }

    fn sample(&self, ctx: &SamplingContext) -> BsdfSample {
        let outgoing = ctx.outgoing_dir;
        if outgoing.z < COS_EPSILON {
            return BsdfSample::null();
        }

        let f_out = fresnel_dielectric(outgoing.z, ctx.params.ior);

        if ctx.sample[2] < f_out {
            // coat reflection; the Fresnel factor cancels with the
            // branch probability
            BsdfSample {
                incoming_dir: Vec3::new(-outgoing.x, -outgoing.y, outgoing.z),
                weight: RayColor::one(),
                pdf: f_out,
                event: BsdfEvent::SPECULAR_REFLECTION,
            }
        } else {
            let incoming = cos_sample_hemisphere((ctx.sample[0], ctx.sample[1]));
            if incoming.z < COS_EPSILON {
                return BsdfSample::null();
            }
            let f_in = fresnel_dielectric(incoming.z, ctx.params.ior);
            BsdfSample {
                incoming_dir: incoming,
                weight: ctx.params.base_color * (1.0 - f_in),
                pdf: (1.0 - f_out) * incoming.z * FRAC_1_PI,
                event: BsdfEvent::DIFFUSE_REFLECTION,
            }
        }
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> BsdfEvaluation {
        let cos_out = ctx.outgoing_dir.z;
        let cos_in = ctx.incoming_dir.z;
        if cos_out < COS_EPSILON || cos_in < COS_EPSILON {
            return BsdfEvaluation::zero();
        }

        let f_out = fresnel_dielectric(cos_out, ctx.params.ior);
        let f_in = fresnel_dielectric(cos_in, ctx.params.ior);

        // only the diffuse lobe is evaluable; the coat is a Dirac
        BsdfEvaluation {
            weight: ctx.params.base_color
                * ((1.0 - f_in) * (1.0 - f_out) * cos_in * FRAC_1_PI),
            pdf_forward: (1.0 - f_out) * cos_in * FRAC_1_PI,
            pdf_reverse: (1.0 - f_in) * cos_out * FRAC_1_PI,
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
    use rand::{Rng, SeedableRng, XorShiftRng};

    #[test]
    fn diffuse_lobe_is_reciprocal() {
        let p = params(0.0, 1.5);
        let mut rng = XorShiftRng::from_seed([61, 62, 63, 64]);
        for _ in 0..200 {
            let a = crate::sampling::uniform_sample_hemisphere((rng.next_f32(), rng.next_f32()));
            let b = crate::sampling::uniform_sample_hemisphere((rng.next_f32(), rng.next_f32()));
            if a.z < 1.0e-3 || b.z < 1.0e-3 {
                continue;
            }
            let fwd = PlasticBsdf.evaluate(&EvaluationContext {
                params: &p,
                outgoing_dir: a,
                incoming_dir: b,
            });
            let rev = PlasticBsdf.evaluate(&EvaluationContext {
                params: &p,
                outgoing_dir: b,
                incoming_dir: a,
            });
            let f_ab = fwd.weight.values[0] / b.z;
            let f_ba = rev.weight.values[0] / a.z;
            assert!((f_ab - f_ba).abs() < 1.0e-4);
        }
    }

    #[test]
    fn sample_pdf_agrees_with_evaluate_for_diffuse_events() {
        let p = params(0.0, 1.5);
        let mut rng = XorShiftRng::from_seed([71, 72, 73, 74]);
        let outgoing = Vec3::new(0.3, 0.1, 0.95).normalize();
        for _ in 0..1000 {
            let s = PlasticBsdf.sample(&SamplingContext {
                params: &p,
                outgoing_dir: outgoing,
                sample: [rng.next_f32(), rng.next_f32(), rng.next_f32()],
            });
            if s.event != BsdfEvent::DIFFUSE_REFLECTION {
                continue;
            }
            let e = PlasticBsdf.evaluate(&EvaluationContext {
                params: &p,
                outgoing_dir: outgoing,
                incoming_dir: s.incoming_dir,
            });
            assert!((s.pdf - e.pdf_forward).abs() / s.pdf.max(1.0e-6) < 1.0e-3);
        }
    }

    #[test]
    fn total_energy_stays_below_one() {
        let p = params(0.0, 1.5);
        let outgoing = Vec3::new(0.1, 0.2, 0.97).normalize();
        let mut rng = XorShiftRng::from_seed([81, 82, 83, 84]);
        let n = 100_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            let d = crate::sampling::uniform_sample_hemisphere((rng.next_f32(), rng.next_f32()));
            let e = PlasticBsdf.evaluate(&EvaluationContext {
                params: &p,
                outgoing_dir: outgoing,
                incoming_dir: d,
            });
            sum += e.weight.values[0] as f64 / crate::sampling::uniform_hemisphere_pdf() as f64;
        }
        // diffuse part alone must stay under 1 even before the coat
        assert!(sum / n as f64 <= 1.0);
    }
}
