use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::world_core::chunk::{ChunkCoord, ChunkData};
use crate::world_core::config::TerrainConfig;
use crate::world_core::error::Result;
use crate::world_runtime::streaming::{ChunkUpdate, StreamingStats, StreamingWorld};

/// Cloneable handle to one `StreamingWorld`. The driver moves the reference
/// point through `update`; render-side readers only ever take the read lock.
#[derive(Clone)]
pub struct SharedWorld {
    inner: Arc<RwLock<StreamingWorld>>,
}

impl SharedWorld {
    pub fn new(seed: u32, config: Arc<TerrainConfig>) -> Result<Self> {
        Ok(Self::from_world(StreamingWorld::new(seed, config)?))
    }

    pub fn from_world(world: StreamingWorld) -> Self {
        Self {
            inner: Arc::new(RwLock::new(world)),
        }
    }

    pub fn update(&self, x: f32, z: f32) -> ChunkUpdate {
        self.write().update(x, z)
    }

    /// Runs `f` against the current chunk set under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&StreamingWorld) -> R) -> R {
        f(&self.read_guard())
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<Arc<ChunkData>> {
        self.read_guard().chunk(coord).cloned()
    }

    pub fn stats(&self) -> StreamingStats {
        self.read_guard().stats()
    }

    // A panicking writer leaves the chunk map consistent, so poisoning is ignored.
    fn read_guard(&self) -> RwLockReadGuard<'_, StreamingWorld> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StreamingWorld> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
