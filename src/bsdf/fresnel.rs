//! Fresnel reflectance terms for dielectric and conducting interfaces.

use crate::math::clamp;

/// Unpolarized Fresnel reflectance of a dielectric boundary. `cos_i` is
/// signed: positive when the ray arrives from the outside. `ior` is the
/// ratio inside/outside for the outside-in case; the sign of `cos_i`
/// selects the correct orientation internally. Returns 1 on total
/// internal reflection.
pub fn fresnel_dielectric(cos_i: f32, ior: f32) -> f32 {
    let cos_i = clamp(cos_i, -1.0, 1.0);
    let (eta_i, eta_t, cos_i) = if cos_i > 0.0 {
        (1.0, ior, cos_i)
    } else {
        (ior, 1.0, -cos_i)
    };

    let sin_t = eta_i / eta_t * (1.0 - cos_i * cos_i).max(0.0).sqrt();
    if sin_t >= 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin_t * sin_t).max(0.0).sqrt();

    let r_par = (eta_t * cos_i - eta_i * cos_t) / (eta_t * cos_i + eta_i * cos_t);
    let r_perp = (eta_i * cos_i - eta_t * cos_t) / (eta_i * cos_i + eta_t * cos_t);
    0.5 * (r_par * r_par + r_perp * r_perp)
}

/// Unpolarized Fresnel reflectance of a conductor with complex IoR
/// `eta + i*k`, for a ray arriving at |cos_i| from the outside.
pub fn fresnel_conductor(cos_i: f32, eta: f32, k: f32) -> f32 {
    let cos_i = clamp(cos_i.abs(), 0.0, 1.0);
    let cos2 = cos_i * cos_i;
    let two_eta_cos = 2.0 * eta * cos_i;
    let t0 = eta * eta + k * k;

    let rs = (t0 - two_eta_cos + cos2) / (t0 + two_eta_cos + cos2);
    let rp = (t0 * cos2 - two_eta_cos + 1.0) / (t0 * cos2 + two_eta_cos + 1.0);
    0.5 * (rs + rp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dielectric_normal_incidence_matches_analytic() {
        // ((n-1)/(n+1))^2 for n = 1.5 is 0.04
        let f = fresnel_dielectric(1.0, 1.5);
        assert!((f - 0.04).abs() < 1.0e-4);
    }

    #[test]
    fn dielectric_grazing_incidence_approaches_one() {
        let f = fresnel_dielectric(1.0e-3, 1.5);
        assert!(f > 0.95);
    }

    #[test]
    fn total_internal_reflection_from_inside() {
        // critical angle for n = 1.5 is ~41.8 degrees
        let cos_inside = 0.5; // 60 degrees, beyond critical
        assert_eq!(fresnel_dielectric(-cos_inside, 1.5), 1.0);
    }

    #[test]
    fn conductor_reflectance_is_high_and_bounded() {
        let f = fresnel_conductor(1.0, 0.2, 3.9);
        assert!(f > 0.9 && f <= 1.0);
        let g = fresnel_conductor(0.1, 0.2, 3.9);
        assert!(g > f - 0.05 && g <= 1.0);
    }
}
