use std::sync::Arc;

use anyhow::{Context, Result};

use terrain_forge::cli::CliArgs;
use terrain_forge::world_core::chunk::chunk_extent;
use terrain_forge::world_core::config::TerrainConfig;
use terrain_forge::world_core::pipeline::TerrainPipeline;
use terrain_forge::world_runtime::SharedWorld;

fn main() -> Result<()> {
    env_logger::init();
    let cli = CliArgs::from_env_args()?;

    let mut config = match &cli.config_path {
        Some(path) => TerrainConfig::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TerrainConfig::load(),
    };
    cli.apply(&mut config);
    log::info!(
        "seed {}, {}x{} cells, source {:?}",
        config.world.seed,
        config.world.width,
        config.world.depth,
        config.source
    );

    let output = TerrainPipeline::new(config.clone())
        .run()
        .context("terrain generation failed")?;
    let (min_height, max_height) = output.field.range();
    log::info!(
        "heights {:.4}..{:.4}, erosion moved {:.4} over {} iteration(s)",
        min_height,
        max_height,
        output.erosion.material_moved,
        output.erosion.iterations
    );
    log::info!(
        "mesh: {} vertex bytes, {} index bytes, {} degenerate tangent triangle(s)",
        output.mesh.vertex_bytes().len(),
        output.mesh.index_bytes().len(),
        output.mesh.degenerate_tangent_triangles
    );

    if let Some(path) = &cli.export_png {
        output
            .field
            .save_png(path)
            .with_context(|| format!("failed to export {}", path.display()))?;
        log::info!("wrote {}", path.display());
    }

    if let Some(steps) = cli.stream_steps {
        stream_along_x(config, steps)?;
    }

    Ok(())
}

/// Walks the reference point half a chunk per step along +X and reports
/// the chunk churn.
fn stream_along_x(config: TerrainConfig, steps: u32) -> Result<()> {
    let stride = 0.5 * chunk_extent(config.streaming.chunk_size, config.mesh.horizontal_scale)
        / config.streaming.terrain_scale.max(f32::EPSILON);
    let world = SharedWorld::new(config.world.seed, Arc::new(config))
        .context("failed to start chunk streaming")?;

    for step in 0..=steps {
        let x = step as f32 * stride;
        let update = world.update(x, 0.0);
        let stats = world.stats();
        log::info!(
            "step {step}: x={x:.3} center ({}, {}) +{} -{}, {} loaded, {} pending",
            stats.center_chunk.x,
            stats.center_chunk.y,
            update.added.len(),
            update.removed.len(),
            stats.loaded_chunks,
            stats.pending_chunks
        );
    }

    Ok(())
}
