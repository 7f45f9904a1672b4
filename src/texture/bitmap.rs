//! Bitmap texture backed by an image file. Stored as linear RGB floats;
//! 8-bit sources are de-gamma'd at load time.

use std::path::Path;

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};

use super::Texture;

#[derive(Clone)]
pub struct BitmapTexture {
    width: u32,
    height: u32,
    texels: Vec<Vec3>,
}

impl BitmapTexture {
    pub fn load(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("failed to load texture {}", path.display()))?
            .to_rgb();
        let (width, height) = img.dimensions();
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let p = img.get_pixel(x, y);
                texels.push(Vec3::new(
                    srgb_to_linear(p.data[0]),
                    srgb_to_linear(p.data[1]),
                    srgb_to_linear(p.data[2]),
                ));
            }
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    fn texel(&self, x: u32, y: u32) -> Vec3 {
        self.texels[(y * self.width + x) as usize]
    }
}

fn srgb_to_linear(v: u8) -> f32 {
    let v = v as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

impl Texture for BitmapTexture {
    fn evaluate(&self, uv: Vec2) -> Vec3 {
        // bilinear lookup with wrap addressing
        let u = (uv.x.fract() + 1.0).fract() * self.width as f32 - 0.5;
        let v = (uv.y.fract() + 1.0).fract() * self.height as f32 - 0.5;
        let x0 = u.floor();
        let y0 = v.floor();
        let fx = u - x0;
        let fy = v - y0;
        let wrap = |c: f32, n: u32| -> u32 {
            let m = (c as i64).rem_euclid(n as i64);
            m as u32
        };
        let x0i = wrap(x0, self.width);
        let x1i = wrap(x0 + 1.0, self.width);
        let y0i = wrap(y0, self.height);
        let y1i = wrap(y0 + 1.0, self.height);
        let top = self.texel(x0i, y0i) * (1.0 - fx) + self.texel(x1i, y0i) * fx;
        let bottom = self.texel(x0i, y1i) * (1.0 - fx) + self.texel(x1i, y1i) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}
