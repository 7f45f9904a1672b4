//! Accumulation buffers and image output. The film keeps two running
//! sums per pixel: the primary sum of every pass and a secondary sum fed
//! every second pass, whose difference estimates per-pixel variance.
//! Tile workers write disjoint pixels through `accumulate`; light-tracer
//! style contributions may land anywhere and go through `splat`, which
//! serializes per channel with an atomic compare-and-swap add.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Vec2, Vec3};

fn atomic_add(slot: &AtomicU32, value: f32) {
    let mut current = slot.load(Ordering::Relaxed);
    loop {
        let updated = f32::from_bits(current) + value;
        match slot.compare_exchange_weak(
            current,
            updated.to_bits(),
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

struct AccumulationBuffer {
    values: Vec<AtomicU32>,
}

impl AccumulationBuffer {
    fn new(pixels: usize) -> Self {
        Self {
            values: (0..pixels * 3).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    fn add(&self, pixel: usize, value: Vec3) {
        atomic_add(&self.values[pixel * 3], value.x);
        atomic_add(&self.values[pixel * 3 + 1], value.y);
        atomic_add(&self.values[pixel * 3 + 2], value.z);
    }

    fn get(&self, pixel: usize) -> Vec3 {
        Vec3::new(
            f32::from_bits(self.values[pixel * 3].load(Ordering::Relaxed)),
            f32::from_bits(self.values[pixel * 3 + 1].load(Ordering::Relaxed)),
            f32::from_bits(self.values[pixel * 3 + 2].load(Ordering::Relaxed)),
        )
    }

    fn clear(&mut self) {
        for v in &mut self.values {
            *v.get_mut() = 0;
        }
    }
}

pub struct Film {
    width: u32,
    height: u32,
    sum: AccumulationBuffer,
    secondary_sum: AccumulationBuffer,
}

impl Film {
    pub fn new(width: u32, height: u32) -> Self {
        let pixels = (width * height) as usize;
        Self {
            width,
            height,
            sum: AccumulationBuffer::new(pixels),
            secondary_sum: AccumulationBuffer::new(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self) {
        self.sum.clear();
        self.secondary_sum.clear();
    }

    /// Add a pixel-local sample. `secondary` routes the sample into the
    /// secondary sum as well (every second pass).
    pub fn accumulate(&self, x: u32, y: u32, value: Vec3, secondary: bool) {
        if !value.is_finite() {
            return;
        }
        let pixel = (y * self.width + x) as usize;
        self.sum.add(pixel, value);
        if secondary {
            self.secondary_sum.add(pixel, value);
        }
    }

    /// Splat a contribution at normalized film coordinates. Multiple
    /// workers may hit the same pixel concurrently.
    pub fn splat(&self, film_uv: Vec2, value: Vec3, secondary: bool) {
        if !value.is_finite() {
            return;
        }
        let x = ((film_uv.x * self.width as f32) as u32).min(self.width - 1);
        let y = ((film_uv.y * self.height as f32) as u32).min(self.height - 1);
        let pixel = (y * self.width + x) as usize;
        self.sum.add(pixel, value);
        if secondary {
            self.secondary_sum.add(pixel, value);
        }
    }

    /// Average accumulated tristimulus value of a pixel after `passes`
    /// passes, converted to linear RGB.
    pub fn pixel(&self, x: u32, y: u32, passes: u32) -> Vec3 {
        let raw = self.sum.get((y * self.width + x) as usize) / passes.max(1) as f32;
        develop(raw)
    }

    /// Mean absolute difference between the half estimates, across all
    /// pixels. A crude variance proxy usable once an even number of
    /// passes has accumulated.
    pub fn estimate_error(&self, passes: u32) -> f32 {
        if passes < 2 {
            return f32::MAX;
        }
        let scale = 1.0 / passes as f32;
        let mut total = 0.0;
        for pixel in 0..(self.width * self.height) as usize {
            let full = self.sum.get(pixel) * scale;
            let half = self.secondary_sum.get(pixel) * (2.0 * scale);
            let diff = full - half;
            total += diff.x.abs() + diff.y.abs() + diff.z.abs();
        }
        total / (self.width * self.height) as f32
    }

    /// Write the tone-mapped (sRGB, 8-bit) image as PNG.
    pub fn save_png(&self, path: &Path, passes: u32) -> Result<()> {
        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let rgb = self.pixel(x, y, passes);
                for c in [rgb.x, rgb.y, rgb.z] {
                    data.push((linear_to_srgb(c) * 255.0 + 0.5) as u8);
                }
            }
        }
        image::save_buffer(path, &data, self.width, self.height, image::RGB(8))
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote {}", path.display());
        Ok(())
    }

    /// Dump the raw HDR accumulator as a PFM (portable float map).
    pub fn save_pfm(&self, path: &Path, passes: u32) -> Result<()> {
        use std::io::Write;

        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut out = std::io::BufWriter::new(file);
        // negative scale marks little-endian
        write!(out, "PF\n{} {}\n-1.0\n", self.width, self.height)?;
        // PFM scanlines run bottom to top
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                let rgb = self.pixel(x, y, passes);
                out.write_f32::<LittleEndian>(rgb.x)?;
                out.write_f32::<LittleEndian>(rgb.y)?;
                out.write_f32::<LittleEndian>(rgb.z)?;
            }
        }
        info!("wrote {}", path.display());
        Ok(())
    }
}

/// Convert an accumulated tristimulus triple to displayable linear RGB.
fn develop(tristimulus: Vec3) -> Vec3 {
    crate::color::tristimulus_to_rgb(tristimulus).max(Vec3::ZERO)
}

fn linear_to_srgb(v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    if v <= 0.0031308 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_averages_over_passes() {
        let film = Film::new(4, 4);
        film.accumulate(1, 2, Vec3::splat(1.0), false);
        film.accumulate(1, 2, Vec3::splat(3.0), false);
        let v = film.pixel(1, 2, 2);
        assert!((v.x - 2.0).abs() < 1.0e-6);
    }

    #[test]
    fn splat_lands_on_the_right_pixel() {
        let film = Film::new(10, 10);
        film.splat(Vec2::new(0.55, 0.35), Vec3::new(1.0, 0.0, 0.0), false);
        let v = film.pixel(5, 3, 1);
        assert!(v.x > 0.0);
        assert_eq!(film.pixel(0, 0, 1), Vec3::ZERO);
    }

    #[test]
    fn non_finite_samples_are_dropped() {
        let film = Film::new(2, 2);
        film.accumulate(0, 0, Vec3::new(f32::NAN, 1.0, 1.0), false);
        assert_eq!(film.pixel(0, 0, 1), Vec3::ZERO);
    }

    #[test]
    fn error_estimate_shrinks_for_consistent_passes() {
        let film = Film::new(2, 2);
        for pass in 0..4 {
            for y in 0..2 {
                for x in 0..2 {
                    film.accumulate(x, y, Vec3::splat(0.5), pass % 2 == 0);
                }
            }
        }
        assert!(film.estimate_error(4) < 1.0e-5);
    }
}
