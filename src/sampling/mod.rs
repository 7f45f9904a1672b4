//! Monte Carlo mappings from the unit square onto the shapes the lights
//! and BSDFs sample, together with their probability densities. All
//! functions take uniform samples in [0,1).

use std::f32::consts::{FRAC_1_PI, PI};

use glam::{Vec2, Vec3};

use crate::math::build_orthonormal_basis;

/// Cosine-weighted hemisphere around +Z. The classic Lambertian
/// importance map: pdf = cos(theta) / pi.
pub fn cos_sample_hemisphere(u: (f32, f32)) -> Vec3 {
    let r = u.0.sqrt();
    let phi = 2.0 * PI * u.1;
    let x = r * phi.cos();
    let y = r * phi.sin();
    Vec3::new(x, y, (1.0 - u.0).max(0.0).sqrt())
}

/// Uniform hemisphere around +Z.
pub fn uniform_sample_hemisphere(u: (f32, f32)) -> Vec3 {
    let z = u.0;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.1;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn uniform_hemisphere_pdf() -> f32 {
    0.5 * FRAC_1_PI
}

/// Uniform direction on the full sphere.
pub fn uniform_sample_sphere(u: (f32, f32)) -> Vec3 {
    let z = 1.0 - 2.0 * u.0;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.1;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn uniform_sphere_pdf() -> f32 {
    0.25 * FRAC_1_PI
}

/// Uniform point on the unit disk.
pub fn uniform_sample_disk(u: (f32, f32)) -> Vec2 {
    let r = u.0.sqrt();
    let phi = 2.0 * PI * u.1;
    Vec2::new(r * phi.cos(), r * phi.sin())
}

/// Area density of a uniformly sampled disk of the given radius.
pub fn uniform_circle_pdf(radius: f32) -> f32 {
    FRAC_1_PI / (radius * radius)
}

/// Solid-angle density of a uniformly sampled spherical cap bounded by
/// `cos_theta_max`.
pub fn sphere_cap_pdf(cos_theta_max: f32) -> f32 {
    0.5 * FRAC_1_PI / (1.0 - cos_theta_max)
}

/// Uniform direction inside the cone of half-angle `acos(cos_theta_max)`
/// around `axis`.
pub fn uniform_sample_cone(u: (f32, f32), cos_theta_max: f32, axis: Vec3) -> Vec3 {
    let cos_theta = cos_theta_max + (1.0 - cos_theta_max) * u.0;
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * u.1;
    let (t, b) = build_orthonormal_basis(axis);
    (t * (sin_theta * phi.cos()) + b * (sin_theta * phi.sin()) + axis * cos_theta).normalize()
}

/// Uniform barycentric coordinates on a triangle via the sqrt
/// parameterization.
pub fn uniform_sample_triangle(u: (f32, f32)) -> (f32, f32) {
    let su = u.0.sqrt();
    (1.0 - su, u.1 * su)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, XorShiftRng};

    #[test]
    fn cosine_hemisphere_stays_in_upper_hemisphere() {
        let mut rng = XorShiftRng::from_seed([1, 2, 3, 4]);
        for _ in 0..1000 {
            let d = cos_sample_hemisphere((rng.next_f32(), rng.next_f32()));
            assert!(d.z >= 0.0);
            assert!((d.length() - 1.0).abs() < 1.0e-4);
        }
    }

    #[test]
    fn cone_samples_respect_the_aperture() {
        let mut rng = XorShiftRng::from_seed([5, 6, 7, 8]);
        let axis = Vec3::new(0.3, 0.1, -0.9).normalize();
        let cos_max = 0.8;
        for _ in 0..1000 {
            let d = uniform_sample_cone((rng.next_f32(), rng.next_f32()), cos_max, axis);
            assert!(d.dot(axis) >= cos_max - 1.0e-4);
        }
    }

    #[test]
    fn sphere_cap_pdf_integrates_to_one() {
        // Solid angle of the cap times its constant pdf must be 1.
        let cos_max = 0.3;
        let solid_angle = 2.0 * PI * (1.0 - cos_max);
        assert!((sphere_cap_pdf(cos_max) * solid_angle - 1.0).abs() < 1.0e-5);
    }

    #[test]
    fn triangle_samples_are_valid_barycentrics() {
        let mut rng = XorShiftRng::from_seed([9, 10, 11, 12]);
        for _ in 0..1000 {
            let (a, b) = uniform_sample_triangle((rng.next_f32(), rng.next_f32()));
            assert!(a >= 0.0 && b >= 0.0 && a + b <= 1.0 + 1.0e-5);
        }
    }
}
