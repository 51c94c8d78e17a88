use glam::IVec2;

use crate::world_core::heightmap::HeightField;
use crate::world_core::mesh::MeshBuffers;

/// Integer position of a chunk in the infinite chunk grid, `(x, z)`.
pub type ChunkCoord = IVec2;

#[derive(Clone, Debug)]
pub struct ChunkData {
    pub coord: ChunkCoord,
    pub field: HeightField,
    pub mesh: MeshBuffers,
    pub min_height: f32,
    pub max_height: f32,
}

/// World-space length of one chunk side. Chunks share their edge row, so a
/// chunk of `side` points spans `side - 1` cells.
pub fn chunk_extent(side: usize, horizontal_scale: f32) -> f32 {
    side.saturating_sub(1) as f32 * horizontal_scale
}

/// Chunk containing the world position `(x, z)`. Positions are scaled by
/// `terrain_scale` first and floored, so negative positions map to negative
/// chunks.
pub fn world_to_chunk(x: f32, z: f32, extent: f32, terrain_scale: f32) -> ChunkCoord {
    if extent <= 0.0 {
        return IVec2::ZERO;
    }
    IVec2::new(
        (x * terrain_scale / extent).floor() as i32,
        (z * terrain_scale / extent).floor() as i32,
    )
}

/// Chebyshev distance between two chunk coordinates.
pub fn chunk_distance(a: ChunkCoord, b: ChunkCoord) -> i32 {
    let d = (a - b).abs();
    d.x.max(d.y)
}
