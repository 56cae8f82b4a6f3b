//! # World Module
//!
//! The streaming engine. A `World` owns every loaded chunk and keeps the set
//! of resident chunks tracking the player: a 1 Hz evaluation pass decides
//! which chunk coordinates should be loaded or unloaded, per-frame queue
//! processing performs a bounded amount of that work, and a separate bounded
//! pass regenerates stale meshes. Everything runs on the caller's thread;
//! the budgets and queues are what keep a frame from stalling.
//!
//! Chunk loading prefers a saved file when a store is attached and falls back
//! to terrain generation. Unloading writes player-edited chunks back to disk
//! first.

use cgmath::{Point3, Vector3};
use log::{debug, info, warn};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use web_time::Instant;

use crate::block::{BlockSide, BlockType};
use crate::chunk::{
    block_index, mesh, Aabb, Chunk, ChunkNeighborhood, ExposureMask, CHUNK_SIZE, CHUNK_VOLUME,
};
use crate::config::StreamingConfig;
use crate::error::WorldError;
use crate::storage::{PlayerRecord, WorldIndex, WorldStore};
use crate::terrain::{PerlinTerrain, TerrainGenerator};

pub mod column;
pub mod raycast;
pub mod visibility;

use column::ColumnSpan;
pub use raycast::RaycastResult;
pub use visibility::ChunkVisibilityManager;

/// Horizontal streaming window, in chunk offsets from the player's chunk.
/// The window is 16 columns wide on each axis, asymmetric around the player.
const WINDOW_MIN: i32 = -8;
const WINDOW_MAX: i32 = 7;

/// Capacity of the recent-edit ring.
const EDIT_RING_CAPACITY: usize = 64;

/// One entry in the recent-edit ring.
#[derive(Copy, Clone, Debug)]
pub struct BlockEdit {
    /// World-space block coordinate that was edited
    pub position: Point3<i32>,
    /// Block type before the edit
    pub old: BlockType,
    /// Block type after the edit
    pub new: BlockType,
    /// When the edit happened
    pub at: Instant,
}

/// A snapshot of the engine's bookkeeping, for HUDs and logs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Number of loaded chunks
    pub chunk_count: usize,
    /// Number of loaded chunks with a stale mesh
    pub dirty_count: usize,
    /// Number of chunks in the visible (exposed) set
    pub visible_count: usize,
    /// Total entries across the load and unload queues
    pub pending_ops: usize,
}

/// The voxel world and its streaming state.
pub struct World {
    seed: u64,
    config: StreamingConfig,
    chunks: HashMap<Point3<i32>, Chunk>,
    visible: HashSet<Point3<i32>>,
    load_queue: VecDeque<Point3<i32>>,
    load_queued: HashSet<Point3<i32>>,
    unload_queue: VecDeque<Point3<i32>>,
    unload_queued: HashSet<Point3<i32>>,
    columns: HashMap<(i32, i32), ColumnSpan>,
    recent_edits: VecDeque<BlockEdit>,
    last_evaluate: Option<Instant>,
    frames_since_load: u64,
    player_chunk: Point3<i32>,
    terrain: Box<dyn TerrainGenerator>,
    store: Option<WorldStore>,
}

impl World {
    /// Creates a fresh world with the default Perlin terrain and config.
    pub fn new(seed: u64) -> Self {
        Self::with_terrain(seed, Box::new(PerlinTerrain::new(seed)), StreamingConfig::default())
    }

    /// Creates a world with an explicit terrain generator and config.
    pub fn with_terrain(
        seed: u64,
        terrain: Box<dyn TerrainGenerator>,
        config: StreamingConfig,
    ) -> Self {
        info!("creating world with seed {seed}");
        World {
            seed,
            config,
            chunks: HashMap::new(),
            visible: HashSet::new(),
            load_queue: VecDeque::new(),
            load_queued: HashSet::new(),
            unload_queue: VecDeque::new(),
            unload_queued: HashSet::new(),
            columns: HashMap::new(),
            recent_edits: VecDeque::new(),
            last_evaluate: None,
            frames_since_load: 0,
            player_chunk: Point3::new(0, 0, 0),
            terrain,
            store: None,
        }
    }

    /// Opens a saved world from a store.
    ///
    /// A missing index file is not an error: the world starts fresh from
    /// `default_seed` and will begin writing files into the store. The saved
    /// player state, if any, is returned alongside the world so the host can
    /// restore the camera.
    pub fn load_from(
        store: WorldStore,
        default_seed: u64,
        config: StreamingConfig,
    ) -> Result<(Self, Option<PlayerRecord>), WorldError> {
        let index = store.read_index()?;
        let seed = match &index {
            Some(index) => {
                info!("opening saved world: seed {}, {} chunk files", index.seed, index.chunks.len());
                index.seed
            }
            None => {
                info!("no saved world found, starting fresh with seed {default_seed}");
                default_seed
            }
        };
        let player = store.read_player()?;
        let mut world =
            Self::with_terrain(seed, Box::new(PerlinTerrain::new(seed)), config);
        world.store = Some(store);
        Ok((world, player))
    }

    /// Attaches an on-disk store; loads will consult it and unloads will
    /// flush edited chunks into it.
    pub fn attach_store(&mut self, store: WorldStore) {
        self.store = Some(store);
    }

    /// The world generation seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Converts a world-space block coordinate to the containing chunk's
    /// coordinate.
    pub fn world_to_chunk_pos(position: Point3<i32>) -> Point3<i32> {
        Point3::new(
            position.x.div_euclid(CHUNK_SIZE),
            position.y.div_euclid(CHUNK_SIZE),
            position.z.div_euclid(CHUNK_SIZE),
        )
    }

    /// Converts a world-space block coordinate to its chunk-local coordinate.
    pub fn world_to_local_pos(position: Point3<i32>) -> Point3<i32> {
        Point3::new(
            position.x.rem_euclid(CHUNK_SIZE),
            position.y.rem_euclid(CHUNK_SIZE),
            position.z.rem_euclid(CHUNK_SIZE),
        )
    }

    /// Whether the chunk at a chunk coordinate is currently loaded.
    pub fn chunk_exists(&self, position: Point3<i32>) -> bool {
        self.chunks.contains_key(&position)
    }

    /// The loaded chunk at a chunk coordinate, if any.
    pub fn chunk_at(&self, position: Point3<i32>) -> Option<&Chunk> {
        self.chunks.get(&position)
    }

    /// Whether the chunk at a chunk coordinate is in the visible set.
    pub fn is_visible(&self, position: Point3<i32>) -> bool {
        self.visible.contains(&position)
    }

    /// The collision boxes of a loaded chunk, in world space.
    pub fn chunk_collider(&mut self, position: Point3<i32>) -> Option<&[Aabb]> {
        self.chunks.get_mut(&position).map(|chunk| chunk.collider())
    }

    /// The block type at a world-space coordinate.
    ///
    /// # Errors
    /// `ChunkNotLoaded` if the containing chunk is not resident. Queries
    /// never trigger loading.
    pub fn block_at_world(&self, position: Point3<i32>) -> Result<BlockType, WorldError> {
        let chunk_pos = Self::world_to_chunk_pos(position);
        let chunk = self
            .chunks
            .get(&chunk_pos)
            .ok_or(WorldError::ChunkNotLoaded(chunk_pos))?;
        let local = Self::world_to_local_pos(position);
        chunk.block_at(local.x, local.y, local.z)
    }

    /// Whether the block at a world coordinate is solid. Unloaded space is
    /// treated as non-solid.
    fn solid_at(&self, position: Point3<i32>) -> bool {
        let chunk_pos = Self::world_to_chunk_pos(position);
        match self.chunks.get(&chunk_pos) {
            Some(chunk) => {
                let local = Self::world_to_local_pos(position);
                chunk.is_solid_local(local.x, local.y, local.z)
            }
            None => false,
        }
    }

    /// Casts a ray and returns the first solid block it enters.
    pub fn raycast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> RaycastResult {
        raycast::march(|pos| self.solid_at(pos), origin, direction, max_distance)
    }

    /// Changes the block at a world-space coordinate.
    ///
    /// Writing the type a block already has is a complete no-op: no dirty
    /// flag, no edit-ring entry, no neighbor invalidation. Otherwise the
    /// chunk is marked modified and dirty, its exposure mask is recomputed,
    /// and when the edit sits on a chunk boundary whose face flag changed,
    /// the loaded neighbor's opposing face is recomputed and its mesh marked
    /// stale.
    ///
    /// # Returns
    /// The previous block type.
    ///
    /// # Errors
    /// `ChunkNotLoaded` if the containing chunk is not resident; edits never
    /// trigger loading.
    pub fn set_block(
        &mut self,
        position: Point3<i32>,
        block_type: BlockType,
    ) -> Result<BlockType, WorldError> {
        let chunk_pos = Self::world_to_chunk_pos(position);
        let local = Self::world_to_local_pos(position);
        let chunk = self
            .chunks
            .get_mut(&chunk_pos)
            .ok_or(WorldError::ChunkNotLoaded(chunk_pos))?;
        let old = chunk.block_at(local.x, local.y, local.z)?;
        if old == block_type {
            return Ok(old);
        }
        let before = chunk.exposure();
        chunk.set_block_local(local.x, local.y, local.z, block_type)?;
        chunk.set_modified(true);
        chunk.set_dirty(true);

        if self.recent_edits.len() == EDIT_RING_CAPACITY {
            self.recent_edits.pop_front();
        }
        self.recent_edits.push_back(BlockEdit {
            position,
            old,
            new: block_type,
            at: Instant::now(),
        });

        let after = self.recompute_exposure(chunk_pos);

        // Boundary edits whose face flag flipped invalidate the matching
        // face of the loaded neighbor.
        for side in BlockSide::all() {
            if !Self::on_boundary(local, side) {
                continue;
            }
            if before.face(side) != after.face(side) {
                let neighbor_pos = chunk_pos + side.offset();
                self.refresh_face(neighbor_pos, side.opposite());
                if let Some(neighbor) = self.chunks.get_mut(&neighbor_pos) {
                    neighbor.set_dirty(true);
                }
            }
        }
        Ok(old)
    }

    /// Whether a local coordinate lies in the boundary layer of a face.
    fn on_boundary(local: Point3<i32>, side: BlockSide) -> bool {
        match side {
            BlockSide::LEFT => local.x == 0,
            BlockSide::RIGHT => local.x == CHUNK_SIZE - 1,
            BlockSide::BOTTOM => local.y == 0,
            BlockSide::TOP => local.y == CHUNK_SIZE - 1,
            BlockSide::BACK => local.z == 0,
            BlockSide::FRONT => local.z == CHUNK_SIZE - 1,
        }
    }

    /// The most recent block edits, oldest first.
    pub fn recent_edits(&self) -> impl Iterator<Item = &BlockEdit> {
        self.recent_edits.iter()
    }

    /// Current bookkeeping counters.
    pub fn stats(&self) -> WorldStats {
        WorldStats {
            chunk_count: self.chunks.len(),
            dirty_count: self.chunks.values().filter(|c| c.is_dirty()).count(),
            visible_count: self.visible.len(),
            pending_ops: self.load_queue.len() + self.unload_queue.len(),
        }
    }

    /// Whether a chunk coordinate falls inside the horizontal streaming
    /// window around the player's chunk.
    fn in_window(&self, position: Point3<i32>) -> bool {
        let dx = position.x - self.player_chunk.x;
        let dz = position.z - self.player_chunk.z;
        (WINDOW_MIN..=WINDOW_MAX).contains(&dx) && (WINDOW_MIN..=WINDOW_MAX).contains(&dz)
    }

    /// Whether a coordinate is still worth loading when it reaches the front
    /// of the queue. Evaluation may be a second old by then.
    fn load_worthy(&self, position: Point3<i32>) -> bool {
        let margin = self.config.column_margin;
        let dx = position.x - self.player_chunk.x;
        let dz = position.z - self.player_chunk.z;
        if dx < WINDOW_MIN - margin
            || dx > WINDOW_MAX + margin
            || dz < WINDOW_MIN - margin
            || dz > WINDOW_MAX + margin
        {
            return false;
        }
        match self.columns.get(&(position.x, position.z)) {
            Some(span) => {
                position.y >= span.min_exposed_y - 1 && position.y <= span.max_exposed_y + 1
            }
            None => (position.y - self.player_chunk.y).abs() <= self.config.vertical_range,
        }
    }

    /// Whether a loaded chunk must stay resident.
    fn should_keep(&self, position: Point3<i32>) -> bool {
        if position.y < self.config.min_unload_chunk_y {
            return true;
        }
        if self.in_window(position) {
            return true;
        }
        if (position.y - self.player_chunk.y).abs() <= self.config.vertical_range {
            return true;
        }
        if self.visible.contains(&position) {
            return true;
        }
        let Some(chunk) = self.chunks.get(&position) else {
            return false;
        };
        if chunk.is_exposed() {
            return true;
        }
        BlockSide::all().iter().any(|side| {
            self.chunks
                .get(&(position + side.offset()))
                .map_or(false, Chunk::is_exposed)
        })
    }

    /// Decides which chunk coordinates to load and unload.
    ///
    /// Runs at most once per `evaluate_interval_ms`; calls in between return
    /// immediately. Non-finite player positions are discarded.
    ///
    /// Load candidates come from the 16x16 horizontal window of columns
    /// around the player (plus remembered columns just outside it); each
    /// column contributes its recorded exposed span widened by one chunk, or
    /// the player's chunk y plus/minus the configured range when nothing is
    /// recorded yet. Candidates are enqueued closest-first. Unload candidates
    /// are loaded chunks with no reason to stay, enqueued farthest-first.
    pub fn evaluate_chunks_needed(&mut self, player_pos: Point3<f32>) {
        if !player_pos.x.is_finite() || !player_pos.y.is_finite() || !player_pos.z.is_finite() {
            warn!("discarding non-finite player position ({}, {}, {})", player_pos.x, player_pos.y, player_pos.z);
            return;
        }
        if let Some(last) = self.last_evaluate {
            if last.elapsed() < Duration::from_millis(self.config.evaluate_interval_ms) {
                return;
            }
        }
        self.last_evaluate = Some(Instant::now());

        self.player_chunk = Point3::new(
            (player_pos.x / CHUNK_SIZE as f32).floor() as i32,
            (player_pos.y / CHUNK_SIZE as f32).floor() as i32,
            (player_pos.z / CHUNK_SIZE as f32).floor() as i32,
        );
        let pc = self.player_chunk;
        let margin = self.config.column_margin;

        let mut candidate_columns: HashSet<(i32, i32)> = HashSet::new();
        for dx in WINDOW_MIN..=WINDOW_MAX {
            for dz in WINDOW_MIN..=WINDOW_MAX {
                candidate_columns.insert((pc.x + dx, pc.z + dz));
            }
        }
        for &(cx, cz) in self.columns.keys() {
            let dx = cx - pc.x;
            let dz = cz - pc.z;
            if dx >= WINDOW_MIN - margin
                && dx <= WINDOW_MAX + margin
                && dz >= WINDOW_MIN - margin
                && dz <= WINDOW_MAX + margin
            {
                candidate_columns.insert((cx, cz));
            }
        }

        let mut loads: Vec<Point3<i32>> = Vec::new();
        for (cx, cz) in candidate_columns {
            let range = match self.columns.get(&(cx, cz)) {
                Some(span) => span.min_exposed_y - 1..=span.max_exposed_y + 1,
                None => pc.y - self.config.vertical_range..=pc.y + self.config.vertical_range,
            };
            for cy in range {
                let pos = Point3::new(cx, cy, cz);
                if !self.chunks.contains_key(&pos) && !self.load_queued.contains(&pos) {
                    loads.push(pos);
                }
            }
        }
        loads.sort_by_key(|pos| chunk_distance2(*pos, pc));
        for pos in loads {
            self.load_queued.insert(pos);
            self.load_queue.push_back(pos);
        }

        let mut unloads: Vec<Point3<i32>> = self
            .chunks
            .keys()
            .copied()
            .filter(|pos| !self.unload_queued.contains(pos) && !self.should_keep(*pos))
            .collect();
        unloads.sort_by_key(|pos| Reverse(chunk_distance2(*pos, pc)));
        for pos in unloads {
            self.unload_queued.insert(pos);
            self.unload_queue.push_back(pos);
        }

        debug!(
            "evaluated streaming around chunk ({}, {}, {}): {} queued loads, {} queued unloads",
            pc.x,
            pc.y,
            pc.z,
            self.load_queue.len(),
            self.unload_queue.len()
        );
    }

    /// Performs a bounded amount of queued load/unload work.
    ///
    /// Loads run first, up to their per-frame cap inside the wall-clock
    /// budget, re-checking at dequeue time that the coordinate is still
    /// wanted. Unloads only run on frames where the load queue fully
    /// drained, so arriving terrain always wins over housekeeping.
    pub fn process_chunk_queues(&mut self) {
        let start = Instant::now();
        let budget = Duration::from_millis(self.config.queue_budget_ms);

        let mut loaded = 0;
        while loaded < self.config.max_loads_per_frame && start.elapsed() < budget {
            let Some(pos) = self.load_queue.pop_front() else {
                break;
            };
            self.load_queued.remove(&pos);
            if self.chunks.contains_key(&pos) || !self.load_worthy(pos) {
                continue;
            }
            self.load_chunk(pos);
            loaded += 1;
        }
        if !self.load_queue.is_empty() {
            return;
        }

        let mut unloaded = 0;
        while unloaded < self.config.max_unloads_per_frame && start.elapsed() < budget {
            let Some(pos) = self.unload_queue.pop_front() else {
                break;
            };
            self.unload_queued.remove(&pos);
            if !self.chunks.contains_key(&pos) || self.should_keep(pos) {
                continue;
            }
            self.unload_chunk(pos);
            unloaded += 1;
        }
    }

    /// Loads one chunk immediately, bypassing the queues. Used by callers
    /// that need a specific chunk resident right now (tests, the visibility
    /// sweep, spawn setup).
    pub fn ensure_chunk_loaded(&mut self, position: Point3<i32>) {
        if !self.chunks.contains_key(&position) {
            self.load_chunk(position);
        }
    }

    /// Materializes the chunk at a coordinate from disk if a file exists,
    /// else from terrain, and inserts it.
    fn load_chunk(&mut self, position: Point3<i32>) {
        let from_disk = match &self.store {
            Some(store) => match store.read_chunk(position) {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!(
                        "failed to read chunk ({}, {}, {}): {err}; regenerating",
                        position.x, position.y, position.z
                    );
                    None
                }
            },
            None => None,
        };
        let chunk = match from_disk {
            Some(chunk) => chunk,
            None => self.generate_chunk(position),
        };
        self.insert_chunk(chunk);
    }

    /// Generates a chunk's blocks from the terrain collaborator.
    fn generate_chunk(&self, position: Point3<i32>) -> Chunk {
        let base = position * CHUNK_SIZE;
        let mut blocks = vec![0u8; CHUNK_VOLUME];
        for z in 0..CHUNK_SIZE {
            for y in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    blocks[block_index(x, y, z)] = self
                        .terrain
                        .block_type_at(base.x + x, base.y + y, base.z + z)
                        .id();
                }
            }
        }
        Chunk::from_parts(position, blocks, false, false)
    }

    /// Inserts a freshly loaded chunk: computes its exposure against the
    /// current residents, updates the visible set and column metadata, and
    /// refreshes the facing exposure flag of each loaded neighbor.
    fn insert_chunk(&mut self, mut chunk: Chunk) {
        let position = chunk.position;
        let mask = ChunkNeighborhood::gather(&self.chunks, position).exposure_mask(&chunk);
        chunk.set_exposure(mask);
        if mask.any() {
            self.visible.insert(position);
            self.columns
                .entry((position.x, position.z))
                .and_modify(|span| span.widen(position.y))
                .or_insert_with(|| ColumnSpan::at(position.y));
            if self.in_window(position) {
                chunk.set_dirty(true);
            }
        }
        self.chunks.insert(position, chunk);
        for side in BlockSide::all() {
            self.refresh_face(position + side.offset(), side.opposite());
        }
    }

    /// Removes a chunk, flushing it to disk first when it carries edits. A
    /// failed write is logged and the chunk dropped anyway; streaming never
    /// stalls on the filesystem.
    fn unload_chunk(&mut self, position: Point3<i32>) {
        let Some(chunk) = self.chunks.remove(&position) else {
            return;
        };
        if chunk.is_modified() {
            match &self.store {
                Some(store) => {
                    if let Err(err) = store.write_chunk(&chunk) {
                        warn!(
                            "failed to persist chunk ({}, {}, {}), edits lost: {err}",
                            position.x, position.y, position.z
                        );
                    }
                }
                None => warn!(
                    "unloading modified chunk ({}, {}, {}) with no store attached, edits lost",
                    position.x, position.y, position.z
                ),
            }
        }
        self.visible.remove(&position);
        for side in BlockSide::all() {
            self.refresh_face(position + side.offset(), side.opposite());
        }
    }

    /// Recomputes the full exposure mask of a loaded chunk and applies it,
    /// keeping the visible set and column metadata in step. A chunk whose
    /// mask empties leaves the visible set and drops its cached mesh.
    ///
    /// # Returns
    /// The new mask (the old mask if the chunk is not loaded).
    fn recompute_exposure(&mut self, position: Point3<i32>) -> ExposureMask {
        let Some(chunk) = self.chunks.get(&position) else {
            return ExposureMask::default();
        };
        let mask = ChunkNeighborhood::gather(&self.chunks, position).exposure_mask(chunk);
        if let Some(chunk) = self.chunks.get_mut(&position) {
            chunk.set_exposure(mask);
        }
        if mask.any() {
            self.visible.insert(position);
            self.columns
                .entry((position.x, position.z))
                .and_modify(|span| span.widen(position.y))
                .or_insert_with(|| ColumnSpan::at(position.y));
        } else {
            self.visible.remove(&position);
            if let Some(chunk) = self.chunks.get_mut(&position) {
                chunk.drop_mesh();
            }
        }
        mask
    }

    /// Recomputes a single exposure face of a loaded chunk, updating the
    /// visible set and marking the mesh stale when the flag actually flips.
    /// A chunk whose mask empties leaves the visible set and drops its
    /// cached mesh.
    fn refresh_face(&mut self, position: Point3<i32>, side: BlockSide) {
        let Some(chunk) = self.chunks.get(&position) else {
            return;
        };
        let exposed = ChunkNeighborhood::gather(&self.chunks, position).exposure_face(chunk, side);
        let mut mask = chunk.exposure();
        if mask.face(side) == exposed {
            return;
        }
        mask.set_face(side, exposed);
        if let Some(chunk) = self.chunks.get_mut(&position) {
            chunk.set_exposure(mask);
            chunk.set_dirty(true);
        }
        if mask.any() {
            self.visible.insert(position);
            self.columns
                .entry((position.x, position.z))
                .and_modify(|span| span.widen(position.y))
                .or_insert_with(|| ColumnSpan::at(position.y));
        } else {
            self.visible.remove(&position);
            if let Some(chunk) = self.chunks.get_mut(&position) {
                chunk.drop_mesh();
            }
        }
    }

    /// Regenerates stale meshes, highest priority first, within per-frame
    /// count and wall-clock caps.
    ///
    /// If the dirty set has ballooned past the configured cap, flags outside
    /// the player's immediate 3x3x3 chunk neighborhood are force-cleared
    /// first; a dirty set that large means something upstream is marking far
    /// too aggressively, and remeshing the whole backlog would freeze the
    /// frame loop for seconds. For the first few frames after a world opens,
    /// both the count cap and the budget are multiplied so the initial scene
    /// fills in quickly.
    pub fn update_dirty_chunk_meshes(&mut self, max_per_frame: usize) {
        self.frames_since_load = self.frames_since_load.saturating_add(1);
        let factor = if self.frames_since_load <= self.config.startup_boost_frames {
            self.config.startup_boost_factor.max(1) as usize
        } else {
            1
        };
        let cap = max_per_frame.saturating_mul(factor);
        let budget = Duration::from_millis(self.config.mesh_budget_ms * factor as u64);
        let pc = self.player_chunk;

        let mut dirty: Vec<Point3<i32>> = self
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.is_dirty())
            .map(|(pos, _)| *pos)
            .collect();

        if dirty.len() > self.config.dirty_chunk_cap {
            warn!(
                "dirty set has {} chunks (cap {}), clearing flags outside the player neighborhood",
                dirty.len(),
                self.config.dirty_chunk_cap
            );
            dirty.retain(|pos| {
                let near = (pos.x - pc.x).abs() <= 1
                    && (pos.y - pc.y).abs() <= 1
                    && (pos.z - pc.z).abs() <= 1;
                if !near {
                    if let Some(chunk) = self.chunks.get_mut(pos) {
                        chunk.set_dirty(false);
                    }
                }
                near
            });
        }

        dirty.sort_by_key(|pos| (self.mesh_priority(*pos), chunk_distance2(*pos, pc)));

        let start = Instant::now();
        let mut built = 0;
        for pos in dirty {
            if built >= cap || start.elapsed() >= budget {
                break;
            }
            let mesh = {
                let Some(chunk) = self.chunks.get(&pos) else {
                    continue;
                };
                if !chunk.is_dirty() {
                    continue;
                }
                let hood = ChunkNeighborhood::gather(&self.chunks, pos);
                mesh::build(chunk, &hood, self.config.disable_greedy_meshing)
            };
            if let Some(chunk) = self.chunks.get_mut(&pos) {
                chunk.install_mesh(mesh);
            }
            built += 1;
        }
    }

    /// Remeshing priority class, lower first: the player's own chunk
    /// neighborhood, then exposed in-window chunks, then the rest of the
    /// window, then everything else.
    fn mesh_priority(&self, position: Point3<i32>) -> u8 {
        let pc = self.player_chunk;
        let near = (position.x - pc.x).abs() <= 1
            && (position.y - pc.y).abs() <= 1
            && (position.z - pc.z).abs() <= 1;
        if near {
            return 0;
        }
        let exposed = self
            .chunks
            .get(&position)
            .map_or(false, Chunk::is_exposed);
        if self.in_window(position) {
            if exposed {
                1
            } else {
                2
            }
        } else {
            3
        }
    }

    /// Runs one full streaming frame with the configured caps.
    pub fn tick(&mut self, player_pos: Point3<f32>) {
        self.evaluate_chunks_needed(player_pos);
        self.process_chunk_queues();
        let cap = self.config.max_meshes_per_frame;
        self.update_dirty_chunk_meshes(cap);
    }

    /// Writes the world to a store: every modified resident chunk, the index
    /// (merged with chunk files already on disk), and optionally the player.
    pub fn save_to(
        &self,
        store: &WorldStore,
        player: Option<&PlayerRecord>,
    ) -> Result<(), WorldError> {
        let mut on_disk: HashSet<[i32; 3]> = match store.read_index()? {
            Some(index) => index.chunks.into_iter().collect(),
            None => HashSet::new(),
        };
        for (pos, chunk) in &self.chunks {
            if chunk.is_modified() {
                store.write_chunk(chunk)?;
                on_disk.insert([pos.x, pos.y, pos.z]);
            }
        }
        let mut chunks: Vec<[i32; 3]> = on_disk.into_iter().collect();
        chunks.sort();
        store.write_index(&WorldIndex {
            seed: self.seed,
            chunks,
        })?;
        if let Some(player) = player {
            store.write_player(player)?;
        }
        info!("saved world (seed {})", self.seed);
        Ok(())
    }

    /// Writes the world to the attached store, if any.
    pub fn save(&self, player: Option<&PlayerRecord>) -> Result<(), WorldError> {
        match &self.store {
            Some(store) => self.save_to(store, player),
            None => {
                warn!("save requested but no store is attached");
                Ok(())
            }
        }
    }

    /// Whether the chunk at a coordinate contains any solid voxel with a
    /// transparent 6-neighbor (cross-chunk at the boundary). Direct per-voxel
    /// scan used by the visibility sweep.
    pub(crate) fn has_exposed_voxel(&self, position: Point3<i32>) -> bool {
        let Some(chunk) = self.chunks.get(&position) else {
            return false;
        };
        let hood = ChunkNeighborhood::gather(&self.chunks, position);
        for z in 0..CHUNK_SIZE {
            for y in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    if !chunk.is_solid_local(x, y, z) {
                        continue;
                    }
                    for side in BlockSide::all() {
                        let o = side.offset();
                        if hood.is_transparent(chunk, x + o.x, y + o.y, z + o.z) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }
}

/// Squared distance between two chunk coordinates.
fn chunk_distance2(a: Point3<i32>, b: Point3<i32>) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    let dz = (a.z - b.z) as i64;
    dx * dx + dy * dy + dz * dz
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::FlatTerrain;

    fn flat_world() -> World {
        World::with_terrain(
            1,
            Box::new(FlatTerrain { surface: 64 }),
            StreamingConfig::default(),
        )
    }

    fn drain_queues(world: &mut World) {
        while world.stats().pending_ops > 0 {
            world.process_chunk_queues();
        }
    }

    #[test]
    fn world_and_local_coordinates_round_trip() {
        let pos = Point3::new(-1, 64, 17);
        assert_eq!(World::world_to_chunk_pos(pos), Point3::new(-1, 4, 1));
        assert_eq!(World::world_to_local_pos(pos), Point3::new(15, 0, 1));
    }

    #[test]
    fn evaluation_loads_terrain_around_the_player() {
        let mut world = flat_world();
        world.evaluate_chunks_needed(Point3::new(8.0, 70.0, 8.0));
        assert!(world.stats().pending_ops > 0);
        drain_queues(&mut world);
        assert!(world.chunk_exists(Point3::new(0, 4, 0)));
        assert_eq!(
            world.block_at_world(Point3::new(0, 64, 0)).unwrap(),
            BlockType::GRASS
        );
    }

    #[test]
    fn surface_in_a_top_layer_is_exposed() {
        // Surface at y = 79 puts the grass in the top boundary layer of
        // chunk y = 4, where the mask heuristic can see it.
        let mut world = World::with_terrain(
            1,
            Box::new(FlatTerrain { surface: 79 }),
            StreamingConfig::default(),
        );
        world.ensure_chunk_loaded(Point3::new(0, 4, 0));
        world.ensure_chunk_loaded(Point3::new(0, 5, 0));
        let surface = world.chunk_at(Point3::new(0, 4, 0)).unwrap();
        assert!(surface.exposure().face(BlockSide::TOP));
        // The pure-air chunk above counts as exposed on its bottom face.
        let sky = world.chunk_at(Point3::new(0, 5, 0)).unwrap();
        assert!(sky.exposure().face(BlockSide::BOTTOM));
        assert!(world.is_visible(Point3::new(0, 5, 0)));
    }

    #[test]
    fn loaded_chunks_never_sit_in_the_load_queue() {
        let mut world = flat_world();
        world.evaluate_chunks_needed(Point3::new(8.0, 70.0, 8.0));
        for _ in 0..10 {
            world.process_chunk_queues();
            for pos in &world.load_queue {
                assert!(!world.chunks.contains_key(pos));
            }
        }
    }

    #[test]
    fn non_finite_player_position_is_discarded() {
        let mut world = flat_world();
        world.evaluate_chunks_needed(Point3::new(f32::NAN, 70.0, 8.0));
        assert_eq!(world.stats().pending_ops, 0);
        world.evaluate_chunks_needed(Point3::new(8.0, f32::INFINITY, 8.0));
        assert_eq!(world.stats().pending_ops, 0);
    }

    #[test]
    fn set_block_on_unloaded_chunk_is_an_error() {
        let mut world = flat_world();
        assert!(matches!(
            world.set_block(Point3::new(0, 64, 0), BlockType::AIR),
            Err(WorldError::ChunkNotLoaded(_))
        ));
    }

    #[test]
    fn set_block_same_type_is_a_complete_noop() {
        let mut world = flat_world();
        world.ensure_chunk_loaded(Point3::new(0, 4, 0));
        // Settle the load-time dirty flag.
        world.update_dirty_chunk_meshes(64);
        let old = world
            .set_block(Point3::new(5, 64, 5), BlockType::GRASS)
            .unwrap();
        assert_eq!(old, BlockType::GRASS);
        let chunk = world.chunk_at(Point3::new(0, 4, 0)).unwrap();
        assert!(!chunk.is_dirty());
        assert!(!chunk.is_modified());
        assert_eq!(world.recent_edits().count(), 0);
    }

    #[test]
    fn set_block_records_the_edit_and_dirties_the_chunk() {
        let mut world = flat_world();
        world.ensure_chunk_loaded(Point3::new(0, 4, 0));
        world.update_dirty_chunk_meshes(64);
        let old = world
            .set_block(Point3::new(5, 64, 5), BlockType::AIR)
            .unwrap();
        assert_eq!(old, BlockType::GRASS);
        let chunk = world.chunk_at(Point3::new(0, 4, 0)).unwrap();
        assert!(chunk.is_dirty());
        assert!(chunk.is_modified());
        let edit = world.recent_edits().next().unwrap();
        assert_eq!(edit.position, Point3::new(5, 64, 5));
        assert_eq!(edit.old, BlockType::GRASS);
        assert_eq!(edit.new, BlockType::AIR);
    }

    #[test]
    fn edit_ring_is_bounded() {
        let mut world = flat_world();
        world.ensure_chunk_loaded(Point3::new(0, 4, 0));
        for i in 0..(EDIT_RING_CAPACITY as i32 + 10) {
            let ty = if i % 2 == 0 {
                BlockType::AIR
            } else {
                BlockType::STONE
            };
            world.set_block(Point3::new(5, 64, 5), ty).unwrap();
        }
        assert_eq!(world.recent_edits().count(), EDIT_RING_CAPACITY);
    }

    #[test]
    fn boundary_edit_invalidates_the_neighbor_face() {
        let mut world = flat_world();
        // Two vertically adjacent chunks above the surface: both pure air.
        let lower = Point3::new(0, 6, 0);
        let upper = Point3::new(0, 7, 0);
        world.ensure_chunk_loaded(lower);
        world.ensure_chunk_loaded(upper);
        world.update_dirty_chunk_meshes(64);
        assert!(!world.chunk_at(upper).unwrap().exposure().face(BlockSide::BOTTOM));

        // A solid block in the lower chunk's top layer (y = 111) exposes the
        // upper chunk's bottom face through the pure-air rule.
        world
            .set_block(Point3::new(4, 111, 4), BlockType::STONE)
            .unwrap();
        let neighbor = world.chunk_at(upper).unwrap();
        assert!(neighbor.exposure().face(BlockSide::BOTTOM));
        assert!(neighbor.is_dirty());
    }

    #[test]
    fn mesh_is_dropped_when_a_chunk_stops_being_exposed() {
        let mut world = flat_world();
        let lower = Point3::new(0, 6, 0);
        let upper = Point3::new(0, 7, 0);
        world.ensure_chunk_loaded(lower);
        world.ensure_chunk_loaded(upper);
        world
            .set_block(Point3::new(4, 111, 4), BlockType::STONE)
            .unwrap();
        world.update_dirty_chunk_meshes(64);
        assert!(world.is_visible(upper));
        assert!(world.chunk_at(upper).unwrap().mesh().is_some());

        // Removing the block un-exposes both chunks; their cached meshes go
        // with the visibility.
        world
            .set_block(Point3::new(4, 111, 4), BlockType::AIR)
            .unwrap();
        let sky = world.chunk_at(upper).unwrap();
        assert!(!sky.exposure().any());
        assert!(sky.mesh().is_none());
        assert!(!world.is_visible(upper));
        assert!(world.chunk_at(lower).unwrap().mesh().is_none());
    }

    #[test]
    fn raycast_hits_the_surface() {
        let mut world = flat_world();
        world.ensure_chunk_loaded(Point3::new(0, 4, 0));
        let result = world.raycast(
            Point3::new(0.5, 65.5, 0.5),
            Vector3::new(0.0, -1.0, 0.0),
            10.0,
        );
        assert!(result.hit);
        assert_eq!(result.block_pos, Point3::new(0, 64, 0));
        assert_eq!(result.face_normal, Vector3::new(0.0, 1.0, 0.0));
        assert!((result.distance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn stats_reflect_residency() {
        let mut world = flat_world();
        assert_eq!(world.stats(), WorldStats::default());
        world.ensure_chunk_loaded(Point3::new(0, 4, 0));
        let stats = world.stats();
        assert_eq!(stats.chunk_count, 1);
        assert_eq!(stats.visible_count, 1);
    }

    #[test]
    fn mesh_update_clears_dirty_flags() {
        let mut world = flat_world();
        world.ensure_chunk_loaded(Point3::new(0, 4, 0));
        world.set_block(Point3::new(5, 64, 5), BlockType::AIR).unwrap();
        assert!(world.stats().dirty_count > 0);
        world.update_dirty_chunk_meshes(64);
        assert_eq!(world.stats().dirty_count, 0);
        assert!(world.chunk_at(Point3::new(0, 4, 0)).unwrap().mesh().is_some());
    }

    #[test]
    fn runaway_dirty_set_self_heals() {
        let mut config = StreamingConfig::default();
        config.dirty_chunk_cap = 4;
        let mut world = World::with_terrain(1, Box::new(FlatTerrain { surface: 64 }), config);
        for x in 0..3 {
            for z in 0..3 {
                let pos = Point3::new(x + 4, 4, z + 4);
                world.ensure_chunk_loaded(pos);
                if let Some(chunk) = world.chunks.get_mut(&pos) {
                    chunk.set_dirty(true);
                }
            }
        }
        // Player chunk is (0, 0, 0); all nine dirty chunks are outside the
        // 3x3x3 neighborhood, so the cap clears them without meshing.
        world.update_dirty_chunk_meshes(0);
        assert_eq!(world.stats().dirty_count, 0);
    }
}
