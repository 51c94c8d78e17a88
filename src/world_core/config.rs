use std::path::{Path, PathBuf};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::world_core::error::{Result, TerrainError};

pub const DEFAULT_CONFIG_PATH: &str = "terrain.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TerrainConfig {
    pub world: WorldConfig,
    pub source: HeightSource,
    pub noise: NoiseConfig,
    pub erosion: ErosionConfig,
    pub smoothing: SmoothingConfig,
    pub mesh: MeshConfig,
    pub streaming: StreamingConfig,
}

impl TerrainConfig {
    /// Reads `terrain.json` from the working directory, falling back to
    /// defaults when it is missing or broken.
    pub fn load() -> Self {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if !path.exists() {
            log::info!("no {DEFAULT_CONFIG_PATH} found, using defaults");
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(config) => {
                log::info!("loaded {DEFAULT_CONFIG_PATH}");
                config
            }
            Err(e) => {
                log::warn!("{e}, using defaults");
                Self::default()
            }
        }
    }

    /// Noise parameters after applying `world.jitter_seed`, if any.
    pub fn effective_noise(&self) -> NoiseConfig {
        match self.world.jitter_seed {
            Some(seed) => self.noise.jittered(seed),
            None => self.noise.clone(),
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| TerrainError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| TerrainError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u32,
    pub width: usize,
    pub depth: usize,
    /// When set, noise parameters are perturbed with this seed.
    pub jitter_seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            width: 256,
            depth: 256,
            jitter_seed: None,
        }
    }
}

/// Where the initial height field comes from.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeightSource {
    #[default]
    Procedural,
    Image {
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoiseStrategy {
    #[default]
    Perlin,
    OpenSimplex,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PermutationKind {
    #[default]
    Seeded,
    Classic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub strategy: NoiseStrategy,
    pub permutation: PermutationKind,
    pub octaves: u32,
    pub persistence: f64,
    pub lacunarity: f64,
    pub warp_factor: f64,
    pub input_scale: f64,
    pub warp_weight: f64,
    pub ridged_weight: f64,
    pub terrace_steps: u32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            strategy: NoiseStrategy::Perlin,
            permutation: PermutationKind::Seeded,
            octaves: 5,
            persistence: 1.0,
            lacunarity: 2.2,
            warp_factor: 0.05,
            input_scale: 0.004,
            warp_weight: 0.3,
            ridged_weight: 0.7,
            terrace_steps: 10,
        }
    }
}

impl NoiseConfig {
    /// Returns a copy with octaves, persistence and lacunarity perturbed by a
    /// generator seeded from `seed`, so the variation is reproducible.
    pub fn jittered(&self, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let octave_shift: i64 = rng.random_range(-1..=1);
        let octaves = (self.octaves as i64 + octave_shift).max(1) as u32;
        let persistence = self.persistence * rng.random_range(0.9..1.1);
        let lacunarity = self.lacunarity * rng.random_range(0.9..1.1);
        Self {
            octaves,
            persistence,
            lacunarity,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErosionStrategy {
    #[default]
    Flow,
    Threshold,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionConfig {
    pub strategy: ErosionStrategy,
    pub iterations: u32,
    /// Share of a cell's water that leaves it each iteration.
    pub flow_fraction: f32,
    pub sediment_capacity: f32,
    pub rain: f32,
    pub evaporation: f32,
    /// Minimum drop before the threshold strategy moves material.
    pub talus: f32,
    pub threshold_rate: f32,
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            strategy: ErosionStrategy::Flow,
            iterations: 1000,
            flow_fraction: 0.1,
            sediment_capacity: 0.002,
            rain: 0.01,
            evaporation: 0.02,
            talus: 0.1,
            threshold_rate: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub sigma: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { sigma: 2.0 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NormalStrategy {
    #[default]
    FaceAccumulation,
    FiniteDifference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// World units between neighbouring grid cells.
    pub horizontal_scale: f32,
    pub vertical_scale: f32,
    pub uv_scale: f32,
    pub normals: NormalStrategy,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            horizontal_scale: 1.0 / 50.0,
            vertical_scale: 2.0,
            uv_scale: 1.0,
            normals: NormalStrategy::FaceAccumulation,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Grid points per chunk side. Neighbouring chunks share one edge row.
    pub chunk_size: usize,
    pub load_radius: i32,
    pub terrain_scale: f32,
    /// Worker threads for chunk generation; 0 generates inline during update.
    pub threads: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 65,
            load_radius: 2,
            terrain_scale: 1.0,
            threads: 4,
        }
    }
}
