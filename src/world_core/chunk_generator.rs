use std::sync::atomic::AtomicBool;

use glam::IVec2;

use crate::world_core::chunk::{ChunkCoord, ChunkData};
use crate::world_core::config::{ErosionConfig, MeshConfig, TerrainConfig};
use crate::world_core::erosion::{erode, erode_with_cancel};
use crate::world_core::error::Result;
use crate::world_core::heightmap::HeightField;
use crate::world_core::layer::Layer;
use crate::world_core::mesh::build_mesh_at;
use crate::world_core::smoothing::gaussian_blur;
use crate::world_core::terrain::TerrainLayer;

/// Runs synthesis, erosion, smoothing and meshing for one chunk. Every stage
/// finishes on the whole field before the next one starts.
pub struct ChunkGenerator {
    terrain_layer: TerrainLayer,
    erosion: ErosionConfig,
    blur_sigma: f32,
    mesh: MeshConfig,
}

impl ChunkGenerator {
    pub fn new(seed: u32, config: &TerrainConfig) -> Result<Self> {
        Ok(Self {
            terrain_layer: TerrainLayer::new(
                seed,
                &config.effective_noise(),
                config.streaming.chunk_size,
            )?,
            erosion: config.erosion.clone(),
            blur_sigma: config.smoothing.sigma,
            mesh: config.mesh.clone(),
        })
    }

    pub fn generate_chunk(&self, coord: ChunkCoord) -> ChunkData {
        let mut field = self.terrain_layer.generate(coord);
        erode(&mut field, &self.erosion);
        self.finish(coord, field)
    }

    /// Returns `None` if `cancel` was raised before erosion finished.
    pub fn generate_chunk_cancellable(
        &self,
        coord: ChunkCoord,
        cancel: &AtomicBool,
    ) -> Option<ChunkData> {
        let mut field = self.terrain_layer.generate(coord);
        let stats = erode_with_cancel(&mut field, &self.erosion, cancel);
        if stats.cancelled {
            log::debug!("chunk ({}, {}) cancelled during erosion", coord.x, coord.y);
            return None;
        }
        Some(self.finish(coord, field))
    }

    fn finish(&self, coord: ChunkCoord, mut field: HeightField) -> ChunkData {
        gaussian_blur(&mut field, self.blur_sigma);
        let mesh = build_mesh_at(&field, &self.mesh, self.terrain_layer.chunk_origin(coord));
        let (min_height, max_height) = field.range();

        ChunkData {
            coord,
            field,
            mesh,
            min_height,
            max_height,
        }
    }

    pub fn chunk_side(&self) -> usize {
        self.terrain_layer.chunk_side()
    }

    pub fn chunk_origin(&self, coord: IVec2) -> (i64, i64) {
        self.terrain_layer.chunk_origin(coord)
    }
}
