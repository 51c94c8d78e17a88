pub mod cli;
pub mod world_core;
pub mod world_runtime;

pub use world_core::config::TerrainConfig;
pub use world_core::error::{Result, TerrainError};
pub use world_core::heightmap::HeightField;
pub use world_core::mesh::{build_mesh, MeshBuffers, MeshVertex};
pub use world_core::pipeline::{erode_and_smooth, TerrainPipeline};
pub use world_core::terrain::generate_height_field;
