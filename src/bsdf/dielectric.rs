//! Smooth dielectric interface (glass, water). A Dirac distribution that
//! reflects with the Fresnel probability and refracts otherwise.

use glam::Vec3;

use super::fresnel::fresnel_dielectric;
use super::{
    Bsdf, BsdfEvaluation, BsdfEvent, BsdfSample, EvaluationContext, PdfDirection, SamplingContext,
    COS_EPSILON,
};

#[derive(Debug, Clone, Copy)]
pub struct DielectricBsdf;

/// Refract `dir` about the microfacet normal `m` (local space, unit
/// length, not necessarily +Z). `ior` is the material's inside/outside
/// ratio; the side of `dir` relative to `m` picks the orientation.
/// Returns `None` on total internal reflection.
pub(super) fn refract(dir: Vec3, m: Vec3, ior: f32) -> Option<Vec3> {
    let cos_i = dir.dot(m);
    let eta = if cos_i > 0.0 { 1.0 / ior } else { ior };
    let cos_abs = cos_i.abs();

    let sin2_t = eta * eta * (1.0 - cos_abs * cos_abs);
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).max(0.0).sqrt();

    let m_oriented = if cos_i > 0.0 { m } else { -m };
    Some((-dir * eta + m_oriented * (eta * cos_abs - cos_t)).normalize())
}

impl Bsdf for DielectricBsdf {
    fn name(&self) -> &'static str {
        "dielectric"
    }

    fn is_delta(&self) -> bool {
        true
    }

    fn sample(&self, ctx: &SamplingContext) -> BsdfSample {
        let outgoing = ctx.outgoing_dir;
        if outgoing.z.abs() < COS_EPSILON {
            return BsdfSample::null();
        }

        let f = fresnel_dielectric(outgoing.z, ctx.params.ior);

        if ctx.sample[2] < f {
            let incoming = Vec3::new(-outgoing.x, -outgoing.y, outgoing.z);
            BsdfSample {
                incoming_dir: incoming,
                weight: ctx.params.base_color,
                pdf: f,
                event: BsdfEvent::SPECULAR_REFLECTION,
            }
        } else {
            let incoming = match refract(outgoing, Vec3::Z, ctx.params.ior) {
                Some(d) => d,
                None => return BsdfSample::null(),
            };
            if incoming.z.abs() < COS_EPSILON {
                return BsdfSample::null();
            }
            BsdfSample {
                incoming_dir: incoming,
                weight: ctx.params.base_color,
                pdf: 1.0 - f,
                event: BsdfEvent::SPECULAR_REFRACTION,
            }
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
    fn refraction_obeys_snell() {
        let ior = 1.5;
        let outgoing = Vec3::new(0.6, 0.0, 0.8).normalize();
        let t = refract(outgoing, Vec3::Z, ior).unwrap();
        assert!(t.z < 0.0);
        let sin_i = (1.0 - outgoing.z * outgoing.z).sqrt();
        let sin_t = (1.0 - t.z * t.z).sqrt();
        assert!((sin_i - ior * sin_t).abs() < 1.0e-4);
    }

    #[test]
    fn refraction_from_inside_can_totally_reflect() {
        let outgoing = Vec3::new(0.9, 0.0, -(1.0f32 - 0.81).sqrt()).normalize();
        assert!(refract(outgoing, Vec3::Z, 1.5).is_none());
    }

    #[test]
    fn sampling_splits_between_reflection_and_refraction() {
        let p = params(0.0, 1.5);
        let outgoing = Vec3::new(0.4, 0.1, 0.9).normalize();
        let reflect = DielectricBsdf.sample(&SamplingContext {
            params: &p,
            outgoing_dir: outgoing,
            sample: [0.5, 0.5, 0.0],
        });
        assert_eq!(reflect.event, BsdfEvent::SPECULAR_REFLECTION);
        assert!(reflect.incoming_dir.z > 0.0);

        let transmit = DielectricBsdf.sample(&SamplingContext {
            params: &p,
            outgoing_dir: outgoing,
            sample: [0.5, 0.5, 0.99],
        });
        assert_eq!(transmit.event, BsdfEvent::SPECULAR_REFRACTION);
        assert!(transmit.incoming_dir.z < 0.0);
    }

    #[test]
    fn evaluation_of_delta_is_zero() {
        let p = params(0.0, 1.5);
        let e = DielectricBsdf.evaluate(&EvaluationContext {
            params: &p,
            outgoing_dir: Vec3::Z,
            incoming_dir: Vec3::new(0.5, 0.0, 0.86),
        });
        assert!(e.weight.almost_zero());
        assert_eq!(e.pdf_forward, 0.0);
    }
}
