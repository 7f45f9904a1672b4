//! Spectral power distributions described by linear RGB values. The
//! actual spectral shape is reconstructed lazily by
//! [`RayColor::resolve`](super::RayColor::resolve).

use glam::Vec3;

/// An RGB-described SPD. Lights and material parameters store these and
/// resolve them to per-wavelength values at sampling time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spectrum {
    pub rgb: Vec3,
}

impl Spectrum {
    pub fn new(rgb: Vec3) -> Self {
        Self { rgb }
    }

    pub fn splat(v: f32) -> Self {
        Self { rgb: Vec3::splat(v) }
    }

    pub fn black() -> Self {
        Self { rgb: Vec3::ZERO }
    }

    pub fn is_black(&self) -> bool {
        self.rgb == Vec3::ZERO
    }
}

impl From<Vec3> for Spectrum {
    fn from(rgb: Vec3) -> Self {
        Self { rgb }
    }
}

impl std::ops::Mul<Vec3> for Spectrum {
    type Output = Spectrum;

    fn mul(self, rhs: Vec3) -> Spectrum {
        Spectrum { rgb: self.rgb * rhs }
    }
}

impl std::ops::Mul<f32> for Spectrum {
    type Output = Spectrum;

    fn mul(self, rhs: f32) -> Spectrum {
        Spectrum { rgb: self.rgb * rhs }
    }
}
