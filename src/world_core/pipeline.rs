//! Whole-field generation: height source, erosion, smoothing, mesh.

use std::time::Instant;

use crate::world_core::config::{ErosionConfig, HeightSource, TerrainConfig};
use crate::world_core::erosion::{erode, ErosionStats};
use crate::world_core::error::Result;
use crate::world_core::heightmap::HeightField;
use crate::world_core::mesh::{build_mesh, MeshBuffers};
use crate::world_core::smoothing::gaussian_blur;
use crate::world_core::terrain::generate_height_field;

/// Erodes, then blurs, and hands the field back.
pub fn erode_and_smooth(
    mut field: HeightField,
    erosion: &ErosionConfig,
    blur_sigma: f32,
) -> (HeightField, ErosionStats) {
    let stats = erode(&mut field, erosion);
    gaussian_blur(&mut field, blur_sigma);
    (field, stats)
}

pub struct TerrainOutput {
    pub field: HeightField,
    pub mesh: MeshBuffers,
    pub erosion: ErosionStats,
}

pub struct TerrainPipeline {
    config: TerrainConfig,
}

impl TerrainPipeline {
    pub fn new(config: TerrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// The raw field before erosion and smoothing.
    pub fn source_field(&self) -> Result<HeightField> {
        let world = &self.config.world;
        match &self.config.source {
            HeightSource::Procedural => {
                let noise = self.config.effective_noise();
                generate_height_field(world.width, world.depth, world.seed, &noise)
            }
            HeightSource::Image { path } => HeightField::load_image(path),
        }
    }

    pub fn run(&self) -> Result<TerrainOutput> {
        let started = Instant::now();
        let field = self.source_field()?;
        log::info!(
            "height field ready: {}x{} from {:?}",
            field.width(),
            field.depth(),
            self.config.source
        );

        let (field, erosion) =
            erode_and_smooth(field, &self.config.erosion, self.config.smoothing.sigma);
        let mesh = build_mesh(&field, &self.config.mesh);
        log::info!(
            "mesh built: {} vertices, {} triangles in {:.1} ms",
            mesh.vertices.len(),
            mesh.triangle_count(),
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(TerrainOutput {
            field,
            mesh,
            erosion,
        })
    }
}
