//! Scalar 2D noise sources.
//!
//! `perlin` is the gradient-noise core used for terrain; `OpenSimplexNoise`
//! wraps the `noise` crate as an alternative with the same interface.

use ::noise::{NoiseFn, OpenSimplex};

use crate::world_core::config::{NoiseConfig, NoiseStrategy};
use crate::world_core::permutation::PermutationTable;

/// Anything that can be sampled at a continuous 2D coordinate.
pub trait NoiseSource: Send + Sync {
    fn sample(&self, x: f64, y: f64) -> f64;
}

/// Smootherstep `6t^5 - 15t^4 + 10t^3`.
#[inline]
pub fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
pub fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

/// Dot product of `(x, y)` with one of eight diagonal gradients picked by the
/// low three bits of `hash`.
#[inline]
pub fn grad(hash: usize, x: f64, y: f64) -> f64 {
    let h = hash & 7;
    let u = if h < 4 { x } else { y };
    let v = if h < 4 { y } else { x };
    let u = if h & 1 == 0 { u } else { -u };
    let v = if h & 2 == 0 { v } else { -v };
    u + v
}

/// 2D gradient noise in roughly `[-1, 1]`.
pub fn perlin(x: f64, y: f64, table: &PermutationTable) -> f64 {
    let x_floor = x.floor();
    let y_floor = y.floor();
    let xi = (x_floor as i64 & 255) as usize;
    let yi = (y_floor as i64 & 255) as usize;
    let xf = x - x_floor;
    let yf = y - y_floor;

    let u = fade(xf);
    let v = fade(yf);

    let a = table.get(xi) + yi;
    let aa = table.get(a);
    let ab = table.get(a + 1);
    let b = table.get(xi + 1) + yi;
    let ba = table.get(b);
    let bb = table.get(b + 1);

    lerp(
        v,
        lerp(
            u,
            grad(table.get(aa), xf, yf),
            grad(table.get(ba), xf - 1.0, yf),
        ),
        lerp(
            u,
            grad(table.get(ab), xf, yf - 1.0),
            grad(table.get(bb), xf - 1.0, yf - 1.0),
        ),
    )
}

pub struct GradientNoise {
    table: PermutationTable,
}

impl GradientNoise {
    pub fn new(table: PermutationTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PermutationTable {
        &self.table
    }
}

impl NoiseSource for GradientNoise {
    fn sample(&self, x: f64, y: f64) -> f64 {
        perlin(x, y, &self.table)
    }
}

pub struct OpenSimplexNoise {
    inner: OpenSimplex,
}

impl OpenSimplexNoise {
    pub fn new(seed: u32) -> Self {
        Self {
            inner: OpenSimplex::new(seed),
        }
    }
}

impl NoiseSource for OpenSimplexNoise {
    fn sample(&self, x: f64, y: f64) -> f64 {
        self.inner.get([x, y])
    }
}

/// Builds the noise source selected by `config.strategy`.
pub fn build_source(config: &NoiseConfig, seed: u32) -> Box<dyn NoiseSource> {
    match config.strategy {
        NoiseStrategy::Perlin => Box::new(GradientNoise::new(PermutationTable::new(
            config.permutation,
            seed,
        ))),
        NoiseStrategy::OpenSimplex => Box::new(OpenSimplexNoise::new(seed)),
    }
}
