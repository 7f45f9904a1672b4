//! Radiometry carriers. `RayColor` holds one radiance sample per hero
//! wavelength (or a plain RGB triple when the `spectral` feature is off),
//! `Wavelength` is the bundle of hero wavelengths a path is traced at and
//! `Spectrum` is an RGB-described spectral power distribution that gets
//! upsampled on demand.

pub use self::ray_color::RayColor;
pub use self::spectrum::Spectrum;
pub use self::wavelength::Wavelength;

pub mod ray_color;
pub mod spectrum;
pub mod tables;
pub mod wavelength;

/// Number of radiance samples carried along a ray.
#[cfg(feature = "spectral")]
pub const COMPONENTS: usize = 8;
#[cfg(not(feature = "spectral"))]
pub const COMPONENTS: usize = 3;

/// Convert an accumulated tristimulus triple (CIE XYZ in spectral mode,
/// already linear RGB otherwise) to linear sRGB.
#[cfg(feature = "spectral")]
pub fn tristimulus_to_rgb(xyz: glam::Vec3) -> glam::Vec3 {
    glam::Vec3::new(
        3.2406 * xyz.x - 1.5372 * xyz.y - 0.4986 * xyz.z,
        -0.9689 * xyz.x + 1.8758 * xyz.y + 0.0415 * xyz.z,
        0.0557 * xyz.x - 0.2040 * xyz.y + 1.0570 * xyz.z,
    )
}

#[cfg(not(feature = "spectral"))]
pub fn tristimulus_to_rgb(rgb: glam::Vec3) -> glam::Vec3 {
    rgb
}
