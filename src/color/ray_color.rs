//! The radiance carrier. One value per hero wavelength in spectral mode,
//! a linear RGB triple otherwise. Spectral values convert to CIE XYZ via
//! the tabulated color-matching functions weighted by the D65 illuminant;
//! RGB reflectances are upsampled to spectra with the Smits basis
//! decomposition.

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

use glam::Vec3;

use super::tables;
use super::wavelength::WAVELENGTH_COMPONENTS;
use super::{Spectrum, Wavelength, COMPONENTS};

/// Threshold below which a carrier counts as zero contribution.
const ALMOST_ZERO_EPSILON: f32 = 1.0e-6;

/// Scale applied to the sum of the three sampled Smits bases.
#[cfg(feature = "spectral")]
const RGB_TO_SPECTRUM_SCALE: f32 = 0.86445;

/// Empirical scale balancing the spectral tristimulus integral against
/// the RGB pipeline.
#[cfg(feature = "spectral")]
const TRISTIMULUS_SCALE: f32 = 1.0 / 1.33;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayColor {
    pub values: [f32; COMPONENTS],
}

impl RayColor {
    pub fn zero() -> Self {
        Self {
            values: [0.0; COMPONENTS],
        }
    }

    pub fn one() -> Self {
        Self {
            values: [1.0; COMPONENTS],
        }
    }

    pub fn splat(v: f32) -> Self {
        Self {
            values: [v; COMPONENTS],
        }
    }

    /// Carrier that keeps all remaining energy in the hero wavelength
    /// after a dispersion collapse. The factor of N compensates for the
    /// discarded components so expected energy is preserved.
    #[cfg(feature = "spectral")]
    pub fn single_wavelength_fallback() -> Self {
        let mut values = [0.0; COMPONENTS];
        values[0] = COMPONENTS as f32;
        Self { values }
    }

    #[cfg(not(feature = "spectral"))]
    pub fn single_wavelength_fallback() -> Self {
        Self::one()
    }

    /// True when every component is within epsilon of zero.
    pub fn almost_zero(&self) -> bool {
        self.values.iter().all(|v| v.abs() < ALMOST_ZERO_EPSILON)
    }

    /// All components finite. In RGB mode components must also be
    /// non-negative; spectral values may dip slightly below zero because
    /// of the RGB-to-spectrum upsampling.
    pub fn is_valid(&self) -> bool {
        #[cfg(not(feature = "spectral"))]
        if self.values.iter().any(|v| *v < 0.0) {
            return false;
        }
        self.values.iter().all(|v| v.is_finite())
    }

    pub fn max_value(&self) -> f32 {
        self.values.iter().fold(f32::MIN, |m, v| m.max(*v))
    }

    pub fn lerp(a: Self, b: Self, t: f32) -> Self {
        let mut out = Self::zero();
        for i in 0..COMPONENTS {
            out.values[i] = a.values[i] + (b.values[i] - a.values[i]) * t;
        }
        out
    }

    pub fn mul_add_assign(&mut self, a: Self, b: Self) {
        for i in 0..COMPONENTS {
            self.values[i] += a.values[i] * b.values[i];
        }
    }

    pub fn scaled_add_assign(&mut self, a: Self, scale: f32) {
        for i in 0..COMPONENTS {
            self.values[i] += a.values[i] * scale;
        }
    }

    /// Evaluate an RGB-described spectrum at the bundle's wavelengths.
    /// In RGB mode this simply forwards the RGB triple.
    #[cfg(feature = "spectral")]
    pub fn resolve(wavelength: &Wavelength, spectrum: Spectrum) -> Self {
        let r = spectrum.rgb.x;
        let g = spectrum.rgb.y;
        let b = spectrum.rgb.z;

        // Smits decomposition: the smallest channel drives the white
        // base, the complementary base covers the middle channel and a
        // primary base the remainder.
        let (coeff_a, coeff_b, coeff_c, base_b, base_c);
        if r <= g && r <= b {
            coeff_a = r;
            base_b = &tables::RGB_TO_SPECTRUM_CYAN;
            if g <= b {
                base_c = &tables::RGB_TO_SPECTRUM_BLUE;
                coeff_b = g - r;
                coeff_c = b - g;
            } else {
                base_c = &tables::RGB_TO_SPECTRUM_GREEN;
                coeff_b = b - r;
                coeff_c = g - b;
            }
        } else if g <= r && g <= b {
            coeff_a = g;
            base_b = &tables::RGB_TO_SPECTRUM_MAGENTA;
            if r <= b {
                base_c = &tables::RGB_TO_SPECTRUM_BLUE;
                coeff_b = r - g;
                coeff_c = b - r;
            } else {
                base_c = &tables::RGB_TO_SPECTRUM_RED;
                coeff_b = b - g;
                coeff_c = r - b;
            }
        } else {
            coeff_a = b;
            base_b = &tables::RGB_TO_SPECTRUM_YELLOW;
            if r <= g {
                base_c = &tables::RGB_TO_SPECTRUM_GREEN;
                coeff_b = r - b;
                coeff_c = g - r;
            } else {
                base_c = &tables::RGB_TO_SPECTRUM_RED;
                coeff_b = g - b;
                coeff_c = r - g;
            }
        }

        let white = sample_table(&tables::RGB_TO_SPECTRUM_WHITE, wavelength);
        let second = sample_table(base_b, wavelength);
        let third = sample_table(base_c, wavelength);

        let mut out = Self::zero();
        for i in 0..COMPONENTS {
            out.values[i] = (white.values[i] * coeff_a
                + second.values[i] * coeff_b
                + third.values[i] * coeff_c)
                * RGB_TO_SPECTRUM_SCALE;
        }
        out
    }

    #[cfg(not(feature = "spectral"))]
    pub fn resolve(_wavelength: &Wavelength, spectrum: Spectrum) -> Self {
        Self {
            values: [spectrum.rgb.x, spectrum.rgb.y, spectrum.rgb.z],
        }
    }

    /// Reduce the carrier to a CIE XYZ triple by sampling the matching
    /// tables at the bundle wavelengths, weighting by the D65 illuminant
    /// and summing over the bundle. RGB mode passes the values through.
    #[cfg(feature = "spectral")]
    pub fn to_tristimulus(&self, wavelength: &Wavelength) -> Vec3 {
        let illuminant = sample_table(&tables::ILLUMINANT_D65, wavelength);
        let cx = sample_table(&tables::CIE_X, wavelength);
        let cy = sample_table(&tables::CIE_Y, wavelength);
        let cz = sample_table(&tables::CIE_Z, wavelength);

        let mut xyz = Vec3::ZERO;
        for i in 0..COMPONENTS {
            let weight = self.values[i] * illuminant.values[i];
            xyz += Vec3::new(cx.values[i], cy.values[i], cz.values[i]) * weight;
        }
        xyz * (TRISTIMULUS_SCALE * tables::CIE_Y_NORM / COMPONENTS as f32)
    }

    #[cfg(not(feature = "spectral"))]
    pub fn to_tristimulus(&self, _wavelength: &Wavelength) -> Vec3 {
        Vec3::new(self.values[0], self.values[1], self.values[2])
    }
}

/// Piecewise-linear lookup of a tabulated spectrum at each wavelength of
/// the bundle.
#[cfg(feature = "spectral")]
fn sample_table<const K: usize>(table: &[f32; K], wavelength: &Wavelength) -> RayColor {
    debug_assert_eq!(COMPONENTS, WAVELENGTH_COMPONENTS);
    let mut out = RayColor::zero();
    for i in 0..COMPONENTS {
        let w = wavelength.values[i] * (K - 1) as f32;
        let index = (w as usize).min(K - 2);
        let frac = w - index as f32;
        out.values[i] = table[index] + (table[index + 1] - table[index]) * frac;
    }
    out
}

#[cfg(not(feature = "spectral"))]
#[allow(dead_code)]
fn sample_table<const K: usize>(_table: &[f32; K], _wavelength: &Wavelength) -> RayColor {
    RayColor::zero()
}

impl Add for RayColor {
    type Output = RayColor;

    fn add(self, rhs: RayColor) -> RayColor {
        let mut out = self;
        for i in 0..COMPONENTS {
            out.values[i] += rhs.values[i];
        }
        out
    }
}

impl Sub for RayColor {
    type Output = RayColor;

    fn sub(self, rhs: RayColor) -> RayColor {
        let mut out = self;
        for i in 0..COMPONENTS {
            out.values[i] -= rhs.values[i];
        }
        out
    }
}

impl Mul for RayColor {
    type Output = RayColor;

    fn mul(self, rhs: RayColor) -> RayColor {
        let mut out = self;
        for i in 0..COMPONENTS {
            out.values[i] *= rhs.values[i];
        }
        out
    }
}

impl Mul<f32> for RayColor {
    type Output = RayColor;

    fn mul(self, rhs: f32) -> RayColor {
        let mut out = self;
        for v in out.values.iter_mut() {
            *v *= rhs;
        }
        out
    }
}

impl Mul<RayColor> for f32 {
    type Output = RayColor;

    fn mul(self, rhs: RayColor) -> RayColor {
        rhs * self
    }
}

impl Div<f32> for RayColor {
    type Output = RayColor;

    fn div(self, rhs: f32) -> RayColor {
        self * (1.0 / rhs)
    }
}

impl AddAssign for RayColor {
    fn add_assign(&mut self, rhs: RayColor) {
        for i in 0..COMPONENTS {
            self.values[i] += rhs.values[i];
        }
    }
}

impl MulAssign for RayColor {
    fn mul_assign(&mut self, rhs: RayColor) {
        for i in 0..COMPONENTS {
            self.values[i] *= rhs.values[i];
        }
    }
}

impl MulAssign<f32> for RayColor {
    fn mul_assign(&mut self, rhs: f32) {
        for v in self.values.iter_mut() {
            *v *= rhs;
        }
    }
}
