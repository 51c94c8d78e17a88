use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use glam::IVec2;

use crate::world_core::chunk::{chunk_extent, world_to_chunk, ChunkCoord, ChunkData};
use crate::world_core::chunk_generator::ChunkGenerator;
use crate::world_core::config::TerrainConfig;
use crate::world_core::error::Result;

pub struct StreamingStats {
    pub loaded_chunks: usize,
    pub pending_chunks: usize,
    pub center_chunk: IVec2,
}

/// Chunks that appeared in or left the loaded set during one `update`,
/// each list sorted row by row.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChunkUpdate {
    pub added: Vec<ChunkCoord>,
    pub removed: Vec<ChunkCoord>,
}

impl ChunkUpdate {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ChunkLoader trait: where and when chunk generation runs
// ---------------------------------------------------------------------------

trait ChunkLoader: Send + Sync {
    fn dispatch(&mut self, coord: ChunkCoord);
    fn poll(&mut self) -> Vec<ChunkData>;
    fn pending_count(&self) -> usize;
    fn cancel_outside(&mut self, required: &HashSet<ChunkCoord>);
}

// ---------------------------------------------------------------------------
// Threaded: rayon pool, results funnelled back through one channel
// ---------------------------------------------------------------------------

#[cfg(feature = "parallel")]
mod threaded {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::Mutex;

    use rayon::{ThreadPool, ThreadPoolBuilder};

    use crate::world_core::error::TerrainError;

    struct Finished {
        coord: ChunkCoord,
        job: u64,
        chunk: Option<ChunkData>,
    }

    struct PendingJob {
        job: u64,
        cancel: Arc<AtomicBool>,
    }

    pub struct ThreadedLoader {
        pool: ThreadPool,
        sender: Sender<Finished>,
        // Receiver is !Sync; the mutex is only ever taken by the owning thread.
        receiver: Mutex<Receiver<Finished>>,
        pending: HashMap<ChunkCoord, PendingJob>,
        next_job: u64,
        generator: Arc<ChunkGenerator>,
    }

    impl ThreadedLoader {
        pub fn new(threads: usize, generator: Arc<ChunkGenerator>) -> Result<Self> {
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads.max(1))
                .thread_name(|i| format!("chunk-gen-{i}"))
                .build()
                .map_err(|e| TerrainError::LoaderSetup(e.to_string()))?;
            let (sender, receiver) = mpsc::channel();
            Ok(Self {
                pool,
                sender,
                receiver: Mutex::new(receiver),
                pending: HashMap::new(),
                next_job: 0,
                generator,
            })
        }
    }

    impl ChunkLoader for ThreadedLoader {
        fn dispatch(&mut self, coord: ChunkCoord) {
            if self.pending.contains_key(&coord) {
                return;
            }
            let job = self.next_job;
            self.next_job += 1;
            let cancel = Arc::new(AtomicBool::new(false));
            self.pending.insert(
                coord,
                PendingJob {
                    job,
                    cancel: Arc::clone(&cancel),
                },
            );

            let tx = self.sender.clone();
            let generator = Arc::clone(&self.generator);
            self.pool.spawn(move || {
                let chunk = if cancel.load(Ordering::Relaxed) {
                    None
                } else {
                    generator.generate_chunk_cancellable(coord, &cancel)
                };
                let _ = tx.send(Finished { coord, job, chunk });
            });
        }

        fn poll(&mut self) -> Vec<ChunkData> {
            let mut completed = Vec::new();
            let Ok(receiver) = self.receiver.lock() else {
                return completed;
            };
            while let Ok(finished) = receiver.try_recv() {
                let current = self
                    .pending
                    .get(&finished.coord)
                    .is_some_and(|pending| pending.job == finished.job);
                if !current {
                    continue;
                }
                self.pending.remove(&finished.coord);
                if let Some(chunk) = finished.chunk {
                    completed.push(chunk);
                }
            }
            completed
        }

        fn pending_count(&self) -> usize {
            self.pending.len()
        }

        fn cancel_outside(&mut self, required: &HashSet<ChunkCoord>) {
            self.pending.retain(|coord, pending| {
                let keep = required.contains(coord);
                if !keep {
                    pending.cancel.store(true, Ordering::Relaxed);
                }
                keep
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Sync: everything dispatched is generated on the next poll
// ---------------------------------------------------------------------------

mod sync {
    use super::*;

    pub struct SyncLoader {
        queue: Vec<ChunkCoord>,
        generator: Arc<ChunkGenerator>,
    }

    impl SyncLoader {
        pub fn new(generator: Arc<ChunkGenerator>) -> Self {
            Self {
                queue: Vec::new(),
                generator,
            }
        }
    }

    impl ChunkLoader for SyncLoader {
        fn dispatch(&mut self, coord: ChunkCoord) {
            if !self.queue.contains(&coord) {
                self.queue.push(coord);
            }
        }

        fn poll(&mut self) -> Vec<ChunkData> {
            self.queue
                .drain(..)
                .map(|coord| self.generator.generate_chunk(coord))
                .collect()
        }

        fn pending_count(&self) -> usize {
            self.queue.len()
        }

        fn cancel_outside(&mut self, required: &HashSet<ChunkCoord>) {
            self.queue.retain(|coord| required.contains(coord));
        }
    }
}

fn build_loader(
    threads: usize,
    generator: Arc<ChunkGenerator>,
) -> Result<Box<dyn ChunkLoader>> {
    if threads == 0 {
        return Ok(Box::new(sync::SyncLoader::new(generator)));
    }
    #[cfg(feature = "parallel")]
    {
        Ok(Box::new(threaded::ThreadedLoader::new(threads, generator)?))
    }
    #[cfg(not(feature = "parallel"))]
    {
        log::warn!("built without `parallel`, ignoring {threads} worker(s) and generating inline");
        Ok(Box::new(sync::SyncLoader::new(generator)))
    }
}

// ---------------------------------------------------------------------------
// StreamingWorld: the loaded chunk set around a moving reference point
// ---------------------------------------------------------------------------

pub struct StreamingWorld {
    seed: u32,
    load_radius: i32,
    extent: f32,
    terrain_scale: f32,
    loaded: HashMap<ChunkCoord, Arc<ChunkData>>,
    center_chunk: IVec2,
    loader: Box<dyn ChunkLoader>,
}

impl StreamingWorld {
    pub fn new(seed: u32, config: Arc<TerrainConfig>) -> Result<Self> {
        let generator = Arc::new(ChunkGenerator::new(seed, &config)?);
        let streaming = &config.streaming;
        let loader = build_loader(streaming.threads, generator)?;
        log::info!(
            "streaming world: seed {}, chunk size {}, radius {}, {} worker(s)",
            seed,
            streaming.chunk_size,
            streaming.load_radius,
            streaming.threads
        );

        Ok(Self {
            seed,
            load_radius: streaming.load_radius.max(0),
            extent: chunk_extent(streaming.chunk_size, config.mesh.horizontal_scale),
            terrain_scale: streaming.terrain_scale,
            loaded: HashMap::new(),
            center_chunk: IVec2::ZERO,
            loader,
        })
    }

    /// Moves the reference point to world `(x, z)`. Chunks outside the
    /// square of `load_radius` around its chunk are dropped and their
    /// pending jobs cancelled; missing chunks inside it are requested.
    pub fn update(&mut self, x: f32, z: f32) -> ChunkUpdate {
        let started = Instant::now();
        self.center_chunk = world_to_chunk(x, z, self.extent, self.terrain_scale);
        let required = required_coords(self.center_chunk, self.load_radius);

        self.loader.cancel_outside(&required);
        let mut removed: Vec<ChunkCoord> = self
            .loaded
            .keys()
            .filter(|coord| !required.contains(*coord))
            .copied()
            .collect();
        for coord in &removed {
            self.loaded.remove(coord);
            log::info!("evicted chunk ({}, {})", coord.x, coord.y);
        }

        for &coord in &required {
            if !self.loaded.contains_key(&coord) {
                self.loader.dispatch(coord);
            }
        }

        let mut added = Vec::new();
        for chunk in self.loader.poll() {
            let coord = chunk.coord;
            log::info!(
                "loaded chunk ({}, {}), heights {:.3}..{:.3}",
                coord.x,
                coord.y,
                chunk.min_height,
                chunk.max_height
            );
            self.loaded.insert(coord, Arc::new(chunk));
            added.push(coord);
        }

        sort_coords(&mut added);
        sort_coords(&mut removed);
        if !added.is_empty() || !removed.is_empty() {
            log::debug!(
                "chunk update at ({}, {}): +{} -{} in {:.1} ms",
                self.center_chunk.x,
                self.center_chunk.y,
                added.len(),
                removed.len(),
                started.elapsed().as_secs_f64() * 1000.0
            );
        }
        ChunkUpdate { added, removed }
    }

    pub fn chunks(&self) -> &HashMap<ChunkCoord, Arc<ChunkData>> {
        &self.loaded
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Arc<ChunkData>> {
        self.loaded.get(&coord)
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn stats(&self) -> StreamingStats {
        StreamingStats {
            loaded_chunks: self.loaded.len(),
            pending_chunks: self.loader.pending_count(),
            center_chunk: self.center_chunk,
        }
    }
}

fn sort_coords(coords: &mut [ChunkCoord]) {
    coords.sort_by_key(|c| (c.y, c.x));
}

/// Square neighbourhood of `center`. Near the edge of the `i32` grid the
/// square is clipped rather than wrapped.
fn required_coords(center: IVec2, radius: i32) -> HashSet<IVec2> {
    let width = radius.saturating_mul(2).saturating_add(1).max(1) as usize;
    let mut required = HashSet::with_capacity(width.saturating_mul(width));

    for z in -radius..=radius {
        for x in -radius..=radius {
            required.insert(IVec2::new(
                center.x.saturating_add(x),
                center.y.saturating_add(z),
            ));
        }
    }

    required
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_core::chunk::chunk_distance;

    fn config(threads: usize) -> Arc<TerrainConfig> {
        let mut config = TerrainConfig::default();
        config.streaming.chunk_size = 9;
        config.streaming.load_radius = 1;
        config.streaming.threads = threads;
        config.erosion.iterations = 5;
        Arc::new(config)
    }

    #[test]
    fn required_coords_form_a_square_around_the_center() {
        let required = required_coords(IVec2::new(4, -2), 2);
        assert_eq!(required.len(), 25);
        assert!(required
            .iter()
            .all(|&c| chunk_distance(c, IVec2::new(4, -2)) <= 2));
        assert_eq!(required_coords(IVec2::ZERO, 0).len(), 1);
    }

    #[test]
    fn first_update_loads_the_whole_neighbourhood() {
        let mut world = StreamingWorld::new(42, config(0)).unwrap();
        let update = world.update(0.0, 0.0);

        assert_eq!(update.added.len(), 9);
        assert!(update.removed.is_empty());
        assert_eq!(update.added[0], IVec2::new(-1, -1));
        assert_eq!(update.added[8], IVec2::new(1, 1));
        assert_eq!(world.chunks().len(), 9);
        assert_eq!(world.stats().pending_chunks, 0);
    }

    #[test]
    fn standing_still_changes_nothing() {
        let mut world = StreamingWorld::new(42, config(0)).unwrap();
        world.update(0.05, 0.05);
        assert!(world.update(0.06, 0.04).is_empty());
    }

    #[test]
    fn moving_one_chunk_swaps_a_column() {
        let mut world = StreamingWorld::new(42, config(0)).unwrap();
        world.update(0.0, 0.0);
        let extent = chunk_extent(9, 1.0 / 50.0);
        let update = world.update(extent * 1.5, 0.0);

        assert_eq!(world.stats().center_chunk, IVec2::new(1, 0));
        assert_eq!(
            update.added,
            vec![IVec2::new(2, -1), IVec2::new(2, 0), IVec2::new(2, 1)]
        );
        assert_eq!(
            update.removed,
            vec![IVec2::new(-1, -1), IVec2::new(-1, 0), IVec2::new(-1, 1)]
        );
        assert_eq!(world.chunks().len(), 9);
        assert!(world.chunk(IVec2::new(-1, 0)).is_none());
    }

    #[test]
    fn negative_positions_floor_into_negative_chunks() {
        let mut world = StreamingWorld::new(42, config(0)).unwrap();
        world.update(-0.001, -0.001);
        assert_eq!(world.stats().center_chunk, IVec2::new(-1, -1));
        assert!(world.chunk(IVec2::new(-2, -2)).is_some());
    }

    #[test]
    fn required_coords_clip_at_the_grid_edge() {
        let required = required_coords(IVec2::new(i32::MAX, i32::MIN), 1);
        assert_eq!(required.len(), 4);
        assert!(required.contains(&IVec2::new(i32::MAX - 1, i32::MIN + 1)));
        assert!(required.iter().all(|c| c.x >= i32::MAX - 1 && c.y <= i32::MIN + 1));
    }

    #[test]
    fn far_reference_points_stay_on_their_side_of_the_grid() {
        let mut world = StreamingWorld::new(42, config(0)).unwrap();
        let update = world.update(1.0e9, 0.0);

        assert_eq!(world.stats().center_chunk, IVec2::new(i32::MAX, 0));
        assert_eq!(update.added.len(), 6);
        assert!(world.chunks().keys().all(|c| c.x >= i32::MAX - 1));
        for chunk in world.chunks().values() {
            assert!(chunk.field.values().iter().all(|h| h.is_finite()));
        }

        assert!(world.update(1.0e12, 0.0).is_empty());
        assert_eq!(world.update(-1.0e12, 0.0).removed.len(), 6);
        assert!(world.chunks().keys().all(|c| c.x <= i32::MIN + 1));
    }

    #[test]
    fn neighbouring_chunks_share_their_edge_heights() {
        let mut config = (*config(0)).clone();
        config.erosion.iterations = 0;
        config.smoothing.sigma = 0.0;
        let mut world = StreamingWorld::new(3, Arc::new(config)).unwrap();
        world.update(0.0, 0.0);

        let left = world.chunk(IVec2::new(0, 0)).unwrap();
        let right = world.chunk(IVec2::new(1, 0)).unwrap();
        for z in 0..9 {
            assert_eq!(left.field.get(8, z), right.field.get(0, z));
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn threaded_loader_eventually_delivers_every_chunk() {
        let mut world = StreamingWorld::new(42, config(2)).unwrap();
        let mut added = world.update(0.0, 0.0).added;
        for _ in 0..1000 {
            if world.chunks().len() == 9 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
            added.extend(world.update(0.0, 0.0).added);
        }

        assert_eq!(world.chunks().len(), 9);
        assert_eq!(added.len(), 9);
        assert_eq!(world.stats().pending_chunks, 0);

        let sync = {
            let mut world = StreamingWorld::new(42, config(0)).unwrap();
            world.update(0.0, 0.0);
            world
        };
        for (coord, chunk) in world.chunks() {
            assert_eq!(chunk.field, sync.chunks()[coord].field);
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn jumping_away_cancels_pending_jobs() {
        let mut world = StreamingWorld::new(42, config(1)).unwrap();
        world.update(0.0, 0.0);
        world.update(1000.0, 1000.0);
        let stats = world.stats();
        assert!(stats.pending_chunks <= 9);
        assert!(world
            .chunks()
            .keys()
            .all(|&c| chunk_distance(c, stats.center_chunk) <= 1));
    }
}
