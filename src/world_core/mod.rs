#[macro_use]
mod par;

pub mod chunk;
pub mod chunk_generator;
pub mod config;
pub mod erosion;
pub mod error;
pub mod fractal;
pub mod heightmap;
pub mod layer;
pub mod mesh;
pub mod noise;
pub mod permutation;
pub mod pipeline;
pub mod smoothing;
pub mod terrain;
