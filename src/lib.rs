#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_arguments)]
#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

pub mod bsdf;
pub mod camera;
pub mod color;
pub mod film;
pub mod geometry;
pub mod light;
pub mod material;
pub mod math;
pub mod renderer;
pub mod sampler;
pub mod sampling;
pub mod scene;
pub mod texture;
pub mod viewport;
