use glam::{Vec2, Vec3};

use super::Texture;

/// Two-color checkerboard with a configurable number of tiles per UV
/// unit.
#[derive(Clone, Copy, Debug)]
pub struct CheckerboardTexture {
    pub color_a: Vec3,
    pub color_b: Vec3,
    pub scale: f32,
}

impl CheckerboardTexture {
    pub fn new(color_a: Vec3, color_b: Vec3, scale: f32) -> Self {
        Self {
            color_a,
            color_b,
            scale,
        }
    }
}

impl Texture for CheckerboardTexture {
    fn evaluate(&self, uv: Vec2) -> Vec3 {
        let u = (uv.x * self.scale).floor() as i64;
        let v = (uv.y * self.scale).floor() as i64;
        if (u + v) & 1 == 0 {
            self.color_a
        } else {
            self.color_b
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_tiles_alternate() {
        let t = CheckerboardTexture::new(Vec3::ONE, Vec3::ZERO, 2.0);
        let a = t.evaluate(Vec2::new(0.1, 0.1));
        let b = t.evaluate(Vec2::new(0.6, 0.1));
        let c = t.evaluate(Vec2::new(0.6, 0.6));
        assert_ne!(a, b);
        assert_eq!(a, c);
    }
}
