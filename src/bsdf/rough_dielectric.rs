//! Rough dielectric interface: GGX microfacet reflection and refraction
//! after Walter et al. 2007. Collapses to the smooth dielectric below
//! the specular roughness threshold.

use glam::Vec3;

use crate::math::{reflect, sqr};

use super::dielectric::{refract, DielectricBsdf};
use super::fresnel::fresnel_dielectric;
use super::microfacet::Ggx;
use super::{
    Bsdf, BsdfEvaluation, BsdfEvent, BsdfSample, EvaluationContext, PdfDirection, SamplingContext,
    COS_EPSILON, SPECULAR_ROUGHNESS_THRESHOLD,
};

#[derive(Debug, Clone, Copy)]
pub struct RoughDielectricBsdf;

/// Half vector of a refraction pair, oriented into the upper hemisphere.
/// `inv_eta` is eta_incoming_medium / eta_outgoing_medium.
fn refraction_half_vector(outgoing: Vec3, incoming: Vec3, inv_eta: f32) -> Option<Vec3> {
    let h = -(outgoing + incoming * inv_eta);
    if h.length_squared() < 1.0e-12 {
        return None;
    }
    let h = h.normalize();
    Some(if h.z < 0.0 { -h } else { h })
}

impl Bsdf for RoughDielectricBsdf {
    fn name(&self) -> &'static str {
        "roughDielectric"
    }

    fn is_delta(&self) -> bool {
        false
    }

    fn sample(&self, ctx: &SamplingContext) -> BsdfSample {
        if ctx.params.roughness < SPECULAR_ROUGHNESS_THRESHOLD {
            return DielectricBsdf.sample(ctx);
        }

        let outgoing = ctx.outgoing_dir;
        if outgoing.z.abs() < COS_EPSILON {
            return BsdfSample::null();
        }

        let ggx = Ggx::new(ctx.params.roughness);
        let m = ggx.sample((ctx.sample[0], ctx.sample[1]));
        let cos_om = outgoing.dot(m);
        // reject microfacets back-facing the outgoing direction
        if cos_om.abs() < COS_EPSILON || cos_om * outgoing.z <= 0.0 {
            return BsdfSample::null();
        }

        let f = fresnel_dielectric(cos_om, ctx.params.ior);

        if ctx.sample[2] < f {
            // reflection off the microfacet
            let incoming = reflect(outgoing, m);
            if incoming.z * outgoing.z <= 0.0 || incoming.z.abs() < COS_EPSILON {
                return BsdfSample::null();
            }
            let g = ggx.g(outgoing, incoming, m);
            let weight = ctx.params.base_color
                * (g * cos_om.abs() / (outgoing.z.abs() * m.z));
            BsdfSample {
                incoming_dir: incoming,
                weight,
                pdf: f * ggx.pdf(m) / (4.0 * cos_om.abs()),
                event: BsdfEvent::GLOSSY_REFLECTION,
            }
        } else {
            // refraction through the microfacet
            let incoming = match refract(outgoing, m, ctx.params.ior) {
                Some(d) => d,
                None => return BsdfSample::null(),
            };
            if incoming.z * outgoing.z >= 0.0 || incoming.z.abs() < COS_EPSILON {
                return BsdfSample::null();
            }
            let g = ggx.g(outgoing, incoming, m);

            // eta of the incoming side over the outgoing side
            let inv_eta = if cos_om > 0.0 {
                ctx.params.ior
            } else {
                1.0 / ctx.params.ior
            };
            // radiance-convention Walter weight; the branch probability
            // and the (1-F) in the density cancel
            let weight = ctx.params.base_color
                * (g * cos_om.abs() / (outgoing.z.abs() * m.z * sqr(inv_eta)));
            let cos_im = incoming.dot(m);
            let denom = sqr(cos_om + inv_eta * cos_im);
            if denom < 1.0e-9 {
                return BsdfSample::null();
            }
            let jacobian = sqr(inv_eta) * cos_im.abs() / denom;
            BsdfSample {
                incoming_dir: incoming,
                weight,
                pdf: (1.0 - f) * ggx.pdf(m) * jacobian,
                event: BsdfEvent::GLOSSY_REFRACTION,
            }
        }
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> BsdfEvaluation {
        if ctx.params.roughness < SPECULAR_ROUGHNESS_THRESHOLD {
            return BsdfEvaluation::zero();
        }

        let outgoing = ctx.outgoing_dir;
        let incoming = ctx.incoming_dir;
        if outgoing.z.abs() < COS_EPSILON || incoming.z.abs() < COS_EPSILON {
            return BsdfEvaluation::zero();
        }

        let ggx = Ggx::new(ctx.params.roughness);

        if incoming.z * outgoing.z > 0.0 {
            // reflection side
            let mut m = outgoing + incoming;
            if m.length_squared() < 1.0e-12 {
                return BsdfEvaluation::zero();
            }
            m = m.normalize();
            if m.z < 0.0 {
                m = -m;
            }
            let cos_om = outgoing.dot(m);
            let cos_im = incoming.dot(m);
            if cos_om.abs() < COS_EPSILON
                || cos_im.abs() < COS_EPSILON
                || cos_om * outgoing.z <= 0.0
            {
                return BsdfEvaluation::zero();
            }

            let d = ggx.d(m);
            let g = ggx.g(outgoing, incoming, m);
            let f = fresnel_dielectric(cos_om, ctx.params.ior);

            // f_r cos_i = F D G / (4 |cos_o|)
            let value = f * d * g / (4.0 * outgoing.z.abs());
            BsdfEvaluation {
                weight: ctx.params.base_color * value,
                pdf_forward: f * ggx.pdf(m) / (4.0 * cos_om.abs()),
                pdf_reverse: f * ggx.pdf(m) / (4.0 * cos_im.abs()),
            }
        } else {
            // refraction side
            let inv_eta_fwd = if outgoing.z > 0.0 {
                ctx.params.ior
            } else {
                1.0 / ctx.params.ior
            };
            let m = match refraction_half_vector(outgoing, incoming, inv_eta_fwd) {
                Some(m) => m,
                None => return BsdfEvaluation::zero(),
            };
            let cos_om = outgoing.dot(m);
            let cos_im = incoming.dot(m);
            // a valid transmission half vector has the directions on
            // opposite sides of the microfacet, each front-facing it
            if cos_om * cos_im >= 0.0
                || cos_om.abs() < COS_EPSILON
                || cos_im.abs() < COS_EPSILON
                || cos_om * outgoing.z <= 0.0
            {
                return BsdfEvaluation::zero();
            }

            let d = ggx.d(m);
            let g = ggx.g(outgoing, incoming, m);
            let f = fresnel_dielectric(cos_om, ctx.params.ior);
            if f >= 1.0 {
                return BsdfEvaluation::zero();
            }

            let denom = sqr(cos_om + inv_eta_fwd * cos_im);
            if denom < 1.0e-9 {
                return BsdfEvaluation::zero();
            }

            // Walter eq. 21 premultiplied by |cos_i|, with numerator and
            // denominator scaled by the outgoing medium's index
            let value =
                (cos_im.abs() * cos_om.abs() / (outgoing.z.abs() * denom)) * (1.0 - f) * d * g;

            let jac_fwd = sqr(inv_eta_fwd) * cos_im.abs() / denom;

            // reverse direction swaps the roles of the two media
            let inv_eta_rev = 1.0 / inv_eta_fwd;
            let denom_rev = sqr(cos_im + inv_eta_rev * cos_om);
            let jac_rev = if denom_rev < 1.0e-9 {
                0.0
            } else {
                sqr(inv_eta_rev) * cos_om.abs() / denom_rev
            };

            BsdfEvaluation {
                weight: ctx.params.base_color * value,
                pdf_forward: (1.0 - f) * ggx.pdf(m) * jac_fwd,
                pdf_reverse: (1.0 - f) * ggx.pdf(m) * jac_rev,
            }
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
    fn sample_pdf_agrees_with_evaluate() {
        let p = params(0.3, 1.5);
        let mut rng = XorShiftRng::from_seed([21, 22, 23, 24]);
        let outgoing = Vec3::new(0.3, -0.2, 0.95).normalize();
        let mut checked = 0;
        for _ in 0..2000 {
            let s = RoughDielectricBsdf.sample(&SamplingContext {
                params: &p,
                outgoing_dir: outgoing,
                sample: [rng.next_f32(), rng.next_f32(), rng.next_f32()],
            });
            if s.event.is_empty() {
                continue;
            }
            let e = RoughDielectricBsdf.evaluate(&EvaluationContext {
                params: &p,
                outgoing_dir: outgoing,
                incoming_dir: s.incoming_dir,
            });
            assert!(
                (s.pdf - e.pdf_forward).abs() / s.pdf.max(1.0e-6) < 1.0e-3,
                "sampled pdf {} vs evaluated {} ({:?})",
                s.pdf,
                e.pdf_forward,
                s.event
            );
            checked += 1;
        }
        assert!(checked > 1000);
    }

    #[test]
    fn tiny_roughness_collapses_to_specular() {
        let p = params(0.001, 1.5);
        let outgoing = Vec3::new(0.3, 0.0, 0.95).normalize();
        let s = RoughDielectricBsdf.sample(&SamplingContext {
            params: &p,
            outgoing_dir: outgoing,
            sample: [0.4, 0.6, 0.0],
        });
        assert!(s.event.intersects(BsdfEvent::SPECULAR));
        let e = RoughDielectricBsdf.evaluate(&EvaluationContext {
            params: &p,
            outgoing_dir: outgoing,
            incoming_dir: Vec3::new(-0.3, 0.0, 0.95).normalize(),
        });
        assert!(e.weight.almost_zero());
    }

    #[test]
    fn sampled_weights_are_valid() {
        let p = params(0.5, 1.5);
        let mut rng = XorShiftRng::from_seed([31, 32, 33, 34]);
        let outgoing = Vec3::new(-0.1, 0.4, 0.9).normalize();
        for _ in 0..2000 {
            let s = RoughDielectricBsdf.sample(&SamplingContext {
                params: &p,
                outgoing_dir: outgoing,
                sample: [rng.next_f32(), rng.next_f32(), rng.next_f32()],
            });
            assert!(s.weight.is_valid());
        }
    }
}
