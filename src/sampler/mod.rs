//! Stratified per-pixel sample generation. Each frame seeds one Halton
//! coordinate per sampling dimension; per pixel, the first few dimensions
//! are decorrelated with a blue-noise dither texture and the rest with a
//! XorShift salt derived from the pixel position. When the seeded
//! dimensions run out the sampler falls back to a plain uniform generator
//! and never blocks.

use std::fs;
use std::path::Path;

use rand::{Rng, SeedableRng, XorShiftRng};

use crate::math::hash_u64;

pub mod halton;

/// Side length of the blue-noise dither texture.
pub const BLUE_NOISE_SIZE: u32 = 128;
/// Number of dithered texture layers, i.e. how many leading dimensions
/// get blue-noise treatment.
pub const BLUE_NOISE_LAYERS: u32 = 4;

/// Raw 128x128x4 u16 dither texture, as stored on disk by the asset
/// pipeline (little-endian, layer-interleaved).
#[derive(Clone)]
pub struct BlueNoiseTexture {
    data: Vec<u16>,
}

impl BlueNoiseTexture {
    /// Load the texture from the asset root. Absence is not an error:
    /// rendering proceeds with salt-only decorrelation.
    pub fn load(data_path: &Path) -> Option<Self> {
        let path = data_path.join("BlueNoise128_RGBA16.dat");
        let expected = (BLUE_NOISE_SIZE * BLUE_NOISE_SIZE * BLUE_NOISE_LAYERS) as usize * 2;
        match fs::read(&path) {
            Ok(bytes) if bytes.len() >= expected => {
                let data = bytes
                    .chunks_exact(2)
                    .take(expected / 2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                info!("blue noise texture loaded from {}", path.display());
                Some(Self { data })
            }
            Ok(_) => {
                warn!("blue noise texture {} is truncated, ignoring", path.display());
                None
            }
            Err(_) => {
                info!("no blue noise texture at {}, using salted sampling", path.display());
                None
            }
        }
    }

    fn value(&self, x: u32, y: u32, layer: u32) -> u16 {
        let pixel = (BLUE_NOISE_SIZE * y + x) as usize;
        self.data[pixel * BLUE_NOISE_LAYERS as usize + layer as usize]
    }
}

fn xor_shift(mut x: u32) -> u32 {
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x
}

/// The per-thread sample source handed to integrators.
pub struct GenericSampler {
    seed: Vec<u32>,
    blue_noise: Option<BlueNoiseTexture>,
    blue_noise_layers: u32,
    pixel_x: u32,
    pixel_y: u32,
    salt: u32,
    samples_generated: usize,
    fallback: XorShiftRng,
}

impl GenericSampler {
    pub fn new(blue_noise: Option<BlueNoiseTexture>, thread_index: u32) -> Self {
        let blue_noise_layers = if blue_noise.is_some() {
            BLUE_NOISE_LAYERS
        } else {
            0
        };
        let h = hash_u64(0x9e37_79b9 ^ u64::from(thread_index) << 32);
        Self {
            seed: Vec::new(),
            blue_noise,
            blue_noise_layers,
            pixel_x: 0,
            pixel_y: 0,
            salt: 1,
            samples_generated: 0,
            fallback: XorShiftRng::from_seed([
                (h >> 32) as u32 | 1,
                h as u32 | 1,
                0x8f1b_bcdc,
                0x5a82_7999 ^ thread_index,
            ]),
        }
    }

    /// Install the per-frame seed sequence, one coordinate per sampling
    /// dimension.
    pub fn reset_frame(&mut self, seed: Vec<u32>) {
        self.seed = seed;
    }

    /// Re-key the sampler for a pixel: derives the dither coordinates and
    /// the XorShift salt and rewinds the dimension counter.
    pub fn reset_pixel(&mut self, x: u32, y: u32) {
        self.pixel_x = x & (BLUE_NOISE_SIZE - 1);
        self.pixel_y = y & (BLUE_NOISE_SIZE - 1);
        self.salt = (hash_u64(u64::from(x) | (u64::from(y) << 16)) as u32) | 1;
        self.samples_generated = 0;
    }

    /// Next 32-bit sample word. Seeded dimensions mix the frame seed with
    /// blue-noise or salt; exhausted dimensions fall back to the uniform
    /// generator.
    pub fn get_int(&mut self) -> u32 {
        if self.samples_generated < self.seed.len() {
            let mut sample = self.seed[self.samples_generated];

            if (self.samples_generated as u32) < self.blue_noise_layers {
                let noise = self
                    .blue_noise
                    .as_ref()
                    .map(|t| t.value(self.pixel_x, self.pixel_y, self.samples_generated as u32))
                    .unwrap_or(0);
                sample = sample.wrapping_add(u32::from(noise) << 16);
            } else {
                let salt = self.salt;
                self.salt = xor_shift(salt);
                sample = sample.wrapping_add(salt);
            }

            self.samples_generated += 1;
            sample
        } else {
            self.fallback.gen::<u32>()
        }
    }

    /// Uniform float in [0,1).
    pub fn get_float(&mut self) -> f32 {
        ((self.get_int() >> 8) as f32 / 16_777_216.0).min(1.0 - f32::EPSILON)
    }

    pub fn get_float2(&mut self) -> (f32, f32) {
        (self.get_float(), self.get_float())
    }

    pub fn get_float3(&mut self) -> [f32; 3] {
        [self.get_float(), self.get_float(), self.get_float()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler_with_seed(dims: usize) -> GenericSampler {
        let mut s = GenericSampler::new(None, 0);
        s.reset_frame((0..dims).map(|d| halton::sequence_value(d, 3)).collect());
        s.reset_pixel(17, 23);
        s
    }

    #[test]
    fn floats_stay_in_unit_interval() {
        let mut s = sampler_with_seed(8);
        for _ in 0..1000 {
            let v = s.get_float();
            assert!((0.0..1.0).contains(&v), "sample {} out of range", v);
        }
    }

    #[test]
    fn exhaustion_falls_back_to_uniform() {
        let mut s = sampler_with_seed(2);
        // consume the seeded dimensions, then keep drawing
        for _ in 0..64 {
            let _ = s.get_float();
        }
        let a = s.get_float();
        let b = s.get_float();
        assert!(a != b || a != s.get_float());
    }

    #[test]
    fn pixels_decorrelate_the_same_dimension() {
        let mut s = sampler_with_seed(8);
        // burn the blue-noise layers so the salt path is hit
        for _ in 0..BLUE_NOISE_LAYERS {
            let _ = s.get_int();
        }
        let v1 = s.get_int();
        s.reset_pixel(99, 1);
        for _ in 0..BLUE_NOISE_LAYERS {
            let _ = s.get_int();
        }
        let v2 = s.get_int();
        assert_ne!(v1, v2);
    }
}
