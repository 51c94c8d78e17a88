use glam::IVec2;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::world_core::config::NoiseConfig;
use crate::world_core::error::{Result, TerrainError};
use crate::world_core::fractal::FractalComposer;
use crate::world_core::heightmap::{check_dimensions, HeightField};
use crate::world_core::layer::Layer;
use crate::world_core::noise::{build_source, NoiseSource};

/// Samples the fractal composer over a grid of cells. Cells are addressed in
/// global grid units so chunks sampled side by side line up.
pub struct TerrainLayer {
    noise: Box<dyn NoiseSource>,
    config: NoiseConfig,
    chunk_side: usize,
}

impl TerrainLayer {
    pub fn new(seed: u32, config: &NoiseConfig, chunk_side: usize) -> Result<Self> {
        if chunk_side < 2 {
            return Err(TerrainError::InvalidDimensions {
                width: chunk_side,
                depth: chunk_side,
            });
        }
        Ok(Self {
            noise: build_source(config, seed),
            config: config.clone(),
            chunk_side,
        })
    }

    pub fn chunk_side(&self) -> usize {
        self.chunk_side
    }

    /// First global cell of the chunk at `coord`. Chunks overlap by one row.
    pub fn chunk_origin(&self, coord: IVec2) -> (i64, i64) {
        let step = (self.chunk_side - 1) as i64;
        (coord.x as i64 * step, coord.y as i64 * step)
    }

}

impl Layer<IVec2, HeightField> for TerrainLayer {
    fn generate(&self, coord: IVec2) -> HeightField {
        let side = self.chunk_side;
        let values = sample_grid(
            self.noise.as_ref(),
            &self.config,
            self.chunk_origin(coord),
            side,
            side * side,
        );
        HeightField::from_grid(side, side, values)
    }
}

/// Samples a `width` x `depth` block of cells starting at global cell
/// `origin`.
pub fn synthesize<N: NoiseSource + ?Sized>(
    noise: &N,
    config: &NoiseConfig,
    origin: (i64, i64),
    width: usize,
    depth: usize,
) -> Result<HeightField> {
    let cells = check_dimensions(width, depth)?;
    Ok(HeightField::from_grid(
        width,
        depth,
        sample_grid(noise, config, origin, width, cells),
    ))
}

fn sample_grid<N: NoiseSource + ?Sized>(
    noise: &N,
    config: &NoiseConfig,
    origin: (i64, i64),
    width: usize,
    cells: usize,
) -> Vec<f32> {
    let composer = FractalComposer::new(noise, config);
    let scale = config.input_scale;

    maybe_par_iter!(0..cells)
        .map(|idx| {
            let x = (origin.0 + (idx % width) as i64) as f64;
            let z = (origin.1 + (idx / width) as i64) as f64;
            composer.sample(x * scale, z * scale) as f32
        })
        .collect()
}

/// Synthesizes a `width` x `depth` field anchored at the origin.
pub fn generate_height_field(
    width: usize,
    depth: usize,
    seed: u32,
    config: &NoiseConfig,
) -> Result<HeightField> {
    let noise = build_source(config, seed);
    let field = synthesize(noise.as_ref(), config, (0, 0), width, depth)?;
    let (min_height, max_height) = field.range();
    log::debug!("synthesized {width}x{depth} field, heights {min_height:.3}..{max_height:.3}");
    Ok(field)
}
