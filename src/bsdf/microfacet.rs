//! GGX (Trowbridge-Reitz) microfacet distribution with the Smith shadow
//! masking term. Shared by the rough dielectric and rough metal lobes.

use std::f32::consts::PI;

use glam::Vec3;

use crate::math::sqr;

/// Isotropic GGX distribution parameterized by alpha = roughness^2.
#[derive(Debug, Clone, Copy)]
pub struct Ggx {
    pub alpha: f32,
}

impl Ggx {
    pub fn new(roughness: f32) -> Self {
        Self {
            alpha: (roughness * roughness).max(1.0e-4),
        }
    }

    /// Normal distribution function D(m); `m` is a microfacet normal in
    /// the upper hemisphere.
    pub fn d(&self, m: Vec3) -> f32 {
        if m.z <= 0.0 {
            return 0.0;
        }
        let a2 = sqr(self.alpha);
        let t = sqr(m.z) * (a2 - 1.0) + 1.0;
        a2 / (PI * sqr(t))
    }

    /// Smith uni-directional shadowing term for direction `v` against
    /// microfacet normal `m`.
    pub fn g1(&self, v: Vec3, m: Vec3) -> f32 {
        let cos_v = v.z;
        if cos_v * v.dot(m) <= 0.0 {
            return 0.0;
        }
        let cos2 = sqr(cos_v);
        let tan2 = ((1.0 - cos2) / cos2).max(0.0);
        2.0 / (1.0 + (1.0 + sqr(self.alpha) * tan2).sqrt())
    }

    /// Separable Smith shadowing-masking for the direction pair.
    pub fn g(&self, outgoing: Vec3, incoming: Vec3, m: Vec3) -> f32 {
        self.g1(outgoing, m) * self.g1(incoming, m)
    }

    /// Sample a microfacet normal proportional to D(m)|m.z|.
    pub fn sample(&self, u: (f32, f32)) -> Vec3 {
        let a2 = sqr(self.alpha);
        let tan2 = a2 * u.0 / (1.0 - u.0).max(1.0e-9);
        let cos_theta = (1.0 / (1.0 + tan2)).sqrt();
        let sin_theta = (1.0 - sqr(cos_theta)).max(0.0).sqrt();
        let phi = 2.0 * PI * u.1;
        Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
    }

    /// Density of [`sample`](Self::sample) with respect to the
    /// microfacet normal.
    pub fn pdf(&self, m: Vec3) -> f32 {
        self.d(m) * m.z.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, XorShiftRng};

    #[test]
    fn ndf_integrates_to_one_over_projected_area() {
        // MC estimate of the integral of D(m) cos(m) over the hemisphere
        // must be 1 for a valid NDF.
        let ggx = Ggx::new(0.4);
        let mut rng = XorShiftRng::from_seed([3, 1, 4, 1]);
        let n = 200_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            let d = crate::sampling::uniform_sample_hemisphere((rng.next_f32(), rng.next_f32()));
            sum += (ggx.d(d) * d.z) as f64 / crate::sampling::uniform_hemisphere_pdf() as f64;
        }
        let estimate = sum / n as f64;
        assert!(
            (estimate - 1.0).abs() < 0.05,
            "NDF normalization estimate {}",
            estimate
        );
    }

    #[test]
    fn sampled_normals_match_pdf_shape() {
        let ggx = Ggx::new(0.25);
        let mut rng = XorShiftRng::from_seed([2, 7, 1, 8]);
        for _ in 0..1000 {
            let m = ggx.sample((rng.next_f32(), rng.next_f32()));
            assert!(m.z > 0.0);
            assert!((m.length() - 1.0).abs() < 1.0e-4);
            assert!(ggx.pdf(m) > 0.0);
        }
    }

    #[test]
    fn g1_is_bounded() {
        let ggx = Ggx::new(0.8);
        let v = Vec3::new(0.3, 0.2, 0.7).normalize();
        let m = Vec3::Z;
        let g = ggx.g1(v, m);
        assert!((0.0..=1.0).contains(&g));
    }
}
