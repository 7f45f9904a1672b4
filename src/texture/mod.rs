//! Texture protocol used by material parameters, area-light emission and
//! the background light. Every texture evaluates to a linear RGB triple
//! at a 2D coordinate.

use enum_dispatch::enum_dispatch;
use glam::{Vec2, Vec3};

pub use self::bitmap::BitmapTexture;
pub use self::checkerboard::CheckerboardTexture;
pub use self::constant::ConstantTexture;

pub mod bitmap;
pub mod checkerboard;
pub mod constant;

#[enum_dispatch(Textures)]
pub trait Texture {
    /// Evaluate the texture at `uv`. Coordinates outside [0,1) wrap.
    fn evaluate(&self, uv: Vec2) -> Vec3;
}

#[enum_dispatch]
#[derive(Clone)]
pub enum Textures {
    ConstantTexture,
    CheckerboardTexture,
    BitmapTexture,
}
