use glam::{Vec2, Vec3};

use super::Texture;

/// A texture that evaluates to the same color everywhere.
#[derive(Clone, Copy, Debug)]
pub struct ConstantTexture {
    pub color: Vec3,
}

impl ConstantTexture {
    pub fn new(color: Vec3) -> Self {
        Self { color }
    }
}

impl Texture for ConstantTexture {
    fn evaluate(&self, _uv: Vec2) -> Vec3 {
        self.color
    }
}
