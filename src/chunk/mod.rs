//! # Chunk Module
//!
//! This module provides the `Chunk` struct and related functionality for
//! managing 16x16x16 blocks of voxel data, along with the per-chunk state the
//! streaming engine tracks: the face exposure mask, the mesh/collider caches,
//! and the `dirty`/`modified` lifecycle flags.
//!
//! ## Storage
//!
//! Blocks are stored as a single flat `Vec` of raw block-type ids with an
//! explicit `(x, y, z) -> index` mapping. This keeps the hot scans (exposure,
//! meshing, colliders) cache-friendly and makes the serialized form a plain
//! byte array.
//!
//! ## Lifecycle flags
//!
//! - `dirty`: the cached mesh no longer matches the block data and must be
//!   regenerated before rendering.
//! - `modified`: the chunk was touched by a player edit and must be written
//!   to disk on unload. Chunks that were only ever generated procedurally are
//!   never persisted.

use cgmath::{Point3, Vector3};
use std::collections::HashMap;

use crate::block::{BlockSide, BlockType, BlockTypeId};
use crate::error::WorldError;

pub mod mesh;

use mesh::ChunkMesh;

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_SIZE: i32 = 16;
/// The total number of blocks in a chunk (CHUNK_SIZE³).
pub const CHUNK_VOLUME: usize = (CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Maps a local block coordinate to its index in the flat block array.
///
/// The layout is x-major within a row, then y, then z:
/// `x + CHUNK_SIZE * (y + CHUNK_SIZE * z)`.
#[inline]
pub fn block_index(x: i32, y: i32, z: i32) -> usize {
    (x + CHUNK_SIZE * (y + CHUNK_SIZE * z)) as usize
}

/// Whether a local coordinate lies inside the chunk bounds on all axes.
#[inline]
pub fn in_bounds(x: i32, y: i32, z: i32) -> bool {
    (0..CHUNK_SIZE).contains(&x) && (0..CHUNK_SIZE).contains(&y) && (0..CHUNK_SIZE).contains(&z)
}

/// Per-chunk record of which of the six faces border non-solid space.
///
/// The mask drives the load/unload and visibility heuristics; it is always
/// recomputed synchronously when the chunk's blocks (or a loaded neighbor's
/// shared face) change, so a loaded chunk's mask is never stale relative to
/// its own block data.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExposureMask {
    faces: [bool; 6],
}

impl ExposureMask {
    /// Returns whether the given face borders non-solid space.
    pub fn face(&self, side: BlockSide) -> bool {
        self.faces[side as usize]
    }

    /// Sets the flag for a single face.
    pub fn set_face(&mut self, side: BlockSide, exposed: bool) {
        self.faces[side as usize] = exposed;
    }

    /// Returns whether any face is exposed.
    pub fn any(&self) -> bool {
        self.faces.iter().any(|&f| f)
    }
}

/// An axis-aligned bounding box in world space, used by the physics query
/// surface instead of the render mesh.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the box
    pub min: Point3<f32>,
    /// Maximum corner of the box
    pub max: Point3<f32>,
}

/// Represents a 16x16x16 collection of voxel blocks in the world.
///
/// Chunks are the unit of loading, meshing, and persistence. Each chunk owns
/// its block data plus the derived state the streaming engine needs: the
/// exposure mask and the lazily generated mesh and collider caches.
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    pub position: Point3<i32>,
    blocks: Vec<BlockTypeId>,
    exposure: ExposureMask,
    dirty: bool,
    modified: bool,
    mesh: Option<ChunkMesh>,
    collider: Option<Vec<Aabb>>,
}

impl Chunk {
    /// Creates a new, completely empty chunk (all blocks are air).
    ///
    /// # Arguments
    /// * `position` - The chunk coordinates of the new chunk
    pub fn empty(position: Point3<i32>) -> Self {
        Chunk {
            position,
            blocks: vec![BlockType::AIR.id(); CHUNK_VOLUME],
            exposure: ExposureMask::default(),
            dirty: false,
            modified: false,
            mesh: None,
            collider: None,
        }
    }

    /// Reconstructs a chunk from a deserialized block array and flags.
    ///
    /// The exposure mask is left cleared; the caller (the streaming engine)
    /// recomputes it against the current neighborhood after insertion.
    ///
    /// # Arguments
    /// * `position` - The chunk coordinates the data belongs to
    /// * `blocks` - The full flat block-id array (must be `CHUNK_VOLUME` long)
    /// * `modified` - Whether the chunk carried player edits when saved
    /// * `dirty` - Whether the chunk's mesh was stale when saved
    pub fn from_parts(
        position: Point3<i32>,
        blocks: Vec<BlockTypeId>,
        modified: bool,
        dirty: bool,
    ) -> Self {
        debug_assert_eq!(blocks.len(), CHUNK_VOLUME);
        Chunk {
            position,
            blocks,
            exposure: ExposureMask::default(),
            dirty,
            modified,
            mesh: None,
            collider: None,
        }
    }

    /// Returns the raw block-id array, used by persistence.
    pub fn blocks(&self) -> &[BlockTypeId] {
        &self.blocks
    }

    /// Gets the block type at the specified chunk-relative coordinates.
    ///
    /// # Arguments
    /// * `x`, `y`, `z` - Local coordinates within the chunk
    ///
    /// # Returns
    /// The block type, or `WorldError::OutOfRange` if any coordinate falls
    /// outside `0..CHUNK_SIZE`. Coordinates are never clamped.
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> Result<BlockType, WorldError> {
        if !in_bounds(x, y, z) {
            return Err(WorldError::OutOfRange { x, y, z });
        }
        Ok(BlockType::from_id(self.blocks[block_index(x, y, z)]))
    }

    /// Sets the block type at the specified chunk-relative coordinates.
    ///
    /// This is the raw mutation primitive: it updates the block array and
    /// drops the collider cache, but leaves the lifecycle flags and exposure
    /// mask to the caller (`World::set_block` owns that bookkeeping).
    ///
    /// # Arguments
    /// * `x`, `y`, `z` - Local coordinates within the chunk
    /// * `block_type` - The new block type
    ///
    /// # Returns
    /// The previous block type, or `WorldError::OutOfRange`.
    pub fn set_block_local(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        block_type: BlockType,
    ) -> Result<BlockType, WorldError> {
        if !in_bounds(x, y, z) {
            return Err(WorldError::OutOfRange { x, y, z });
        }
        let index = block_index(x, y, z);
        let old = BlockType::from_id(self.blocks[index]);
        self.blocks[index] = block_type.id();
        self.collider = None;
        Ok(old)
    }

    /// The block type at an already-validated local coordinate.
    #[inline]
    pub(crate) fn block_type_local(&self, x: i32, y: i32, z: i32) -> BlockType {
        BlockType::from_id(self.blocks[block_index(x, y, z)])
    }

    /// Whether the block at an already-validated local coordinate is solid.
    #[inline]
    pub(crate) fn is_solid_local(&self, x: i32, y: i32, z: i32) -> bool {
        self.block_type_local(x, y, z).is_solid()
    }

    /// Whether the chunk contains no solid blocks at all.
    pub fn is_air_only(&self) -> bool {
        self.blocks
            .iter()
            .all(|&id| BlockType::from_id(id).is_transparent())
    }

    /// Whether the outermost block layer on the given face contains at least
    /// one solid block.
    pub fn boundary_layer_has_solid(&self, side: BlockSide) -> bool {
        boundary_cells(side).any(|(x, y, z)| self.is_solid_local(x, y, z))
    }

    /// Returns this chunk's current exposure mask.
    pub fn exposure(&self) -> ExposureMask {
        self.exposure
    }

    /// Replaces the exposure mask; called by the streaming engine after a
    /// neighborhood-aware recomputation.
    pub fn set_exposure(&mut self, mask: ExposureMask) {
        self.exposure = mask;
    }

    /// Whether any face of this chunk borders non-solid space.
    pub fn is_exposed(&self) -> bool {
        self.exposure.any()
    }

    /// Whether the cached mesh is stale relative to the block data.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the mesh as stale (or clears the flag after regeneration).
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Whether this chunk carries player edits and must be persisted.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Flags the chunk as carrying player edits.
    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// Returns the finished mesh, if one has been generated and is current.
    pub fn mesh(&self) -> Option<&ChunkMesh> {
        self.mesh.as_ref()
    }

    /// Installs a freshly generated mesh and clears the dirty flag.
    pub fn install_mesh(&mut self, mesh: ChunkMesh) {
        self.mesh = Some(mesh);
        self.dirty = false;
    }

    /// Drops the cached mesh (used when a chunk leaves the visible set).
    pub fn drop_mesh(&mut self) {
        self.mesh = None;
    }

    /// Returns the collision boxes covering all solid blocks in this chunk.
    ///
    /// The boxes are in world space. The list is cached and rebuilt on the
    /// first call after any block mutation; `set_block_local` is the single
    /// invalidation point, so there is no hidden mutation behind a shared
    /// reference.
    pub fn collider(&mut self) -> &[Aabb] {
        if self.collider.is_none() {
            self.collider = Some(self.build_collider());
        }
        self.collider.as_deref().unwrap_or(&[])
    }

    /// Builds the collider boxes by scanning rows of solid blocks.
    ///
    /// Consecutive solid blocks along X are merged into a single box; the
    /// union of the boxes is exactly the set of solid cells.
    fn build_collider(&self) -> Vec<Aabb> {
        let origin = Point3::new(
            (self.position.x * CHUNK_SIZE) as f32,
            (self.position.y * CHUNK_SIZE) as f32,
            (self.position.z * CHUNK_SIZE) as f32,
        );
        let mut boxes = Vec::new();
        for z in 0..CHUNK_SIZE {
            for y in 0..CHUNK_SIZE {
                let mut x = 0;
                while x < CHUNK_SIZE {
                    if !self.is_solid_local(x, y, z) {
                        x += 1;
                        continue;
                    }
                    let run_start = x;
                    while x < CHUNK_SIZE && self.is_solid_local(x, y, z) {
                        x += 1;
                    }
                    boxes.push(Aabb {
                        min: origin + Vector3::new(run_start as f32, y as f32, z as f32),
                        max: origin + Vector3::new(x as f32, (y + 1) as f32, (z + 1) as f32),
                    });
                }
            }
        }
        boxes
    }
}

/// Iterates the local coordinates of the outermost block layer on a face.
pub fn boundary_cells(side: BlockSide) -> impl Iterator<Item = (i32, i32, i32)> {
    let last = CHUNK_SIZE - 1;
    (0..CHUNK_SIZE).flat_map(move |a| {
        (0..CHUNK_SIZE).map(move |b| match side {
            BlockSide::LEFT => (0, a, b),
            BlockSide::RIGHT => (last, a, b),
            BlockSide::BOTTOM => (a, 0, b),
            BlockSide::TOP => (a, last, b),
            BlockSide::BACK => (a, b, 0),
            BlockSide::FRONT => (a, b, last),
        })
    })
}

/// A read-only view of the up-to-six loaded chunks surrounding one chunk
/// position, used for the cross-chunk lookups in exposure computation and
/// meshing.
///
/// An absent neighbor (not loaded) is treated as non-solid space: boundary
/// faces against the void are considered exposed and are meshed.
pub struct ChunkNeighborhood<'a> {
    neighbors: [Option<&'a Chunk>; 6],
}

impl<'a> ChunkNeighborhood<'a> {
    /// Collects the loaded neighbors of `position` from the world's chunk map.
    pub fn gather(chunks: &'a HashMap<Point3<i32>, Chunk>, position: Point3<i32>) -> Self {
        let mut neighbors = [None; 6];
        for side in BlockSide::all() {
            neighbors[side as usize] = chunks.get(&(position + side.offset()));
        }
        ChunkNeighborhood { neighbors }
    }

    /// A neighborhood with no loaded neighbors, for isolated meshing.
    pub fn detached() -> Self {
        ChunkNeighborhood {
            neighbors: [None; 6],
        }
    }

    /// Returns the loaded neighbor across the given face, if any.
    pub fn neighbor(&self, side: BlockSide) -> Option<&'a Chunk> {
        self.neighbors[side as usize]
    }

    /// Whether the cell at a local coordinate (possibly one step outside the
    /// chunk) is transparent.
    ///
    /// In-chunk coordinates are answered from `chunk` itself; coordinates one
    /// step outside are answered from the matching neighbor, wrapping the
    /// out-of-range axis. Cells in unloaded chunks count as transparent.
    pub fn is_transparent(&self, chunk: &Chunk, x: i32, y: i32, z: i32) -> bool {
        if in_bounds(x, y, z) {
            return !chunk.is_solid_local(x, y, z);
        }
        let (side, nx, ny, nz) = if x < 0 {
            (BlockSide::LEFT, x + CHUNK_SIZE, y, z)
        } else if x >= CHUNK_SIZE {
            (BlockSide::RIGHT, x - CHUNK_SIZE, y, z)
        } else if y < 0 {
            (BlockSide::BOTTOM, x, y + CHUNK_SIZE, z)
        } else if y >= CHUNK_SIZE {
            (BlockSide::TOP, x, y - CHUNK_SIZE, z)
        } else if z < 0 {
            (BlockSide::BACK, x, y, z + CHUNK_SIZE)
        } else {
            (BlockSide::FRONT, x, y, z - CHUNK_SIZE)
        };
        match self.neighbors[side as usize] {
            Some(neighbor) => !neighbor.is_solid_local(nx, ny, nz),
            None => true,
        }
    }

    /// Recomputes the full exposure mask for `chunk` against this
    /// neighborhood.
    pub fn exposure_mask(&self, chunk: &Chunk) -> ExposureMask {
        let mut mask = ExposureMask::default();
        for side in BlockSide::all() {
            mask.set_face(side, self.exposure_face(chunk, side));
        }
        mask
    }

    /// Recomputes the exposure flag for a single face of `chunk`.
    ///
    /// A face is exposed when any boundary-layer block is solid with a
    /// non-solid outward neighbor cell, or when the boundary layer is
    /// entirely air and the loaded adjacent chunk presents at least one solid
    /// block across the shared plane. The latter rule is what keeps pure-air
    /// chunks directly above terrain flagged as exposed on their lower face.
    pub fn exposure_face(&self, chunk: &Chunk, side: BlockSide) -> bool {
        let offset = side.offset();
        let mut layer_all_air = true;
        for (x, y, z) in boundary_cells(side) {
            if !chunk.is_solid_local(x, y, z) {
                continue;
            }
            layer_all_air = false;
            if self.is_transparent(chunk, x + offset.x, y + offset.y, z + offset.z) {
                return true;
            }
        }
        if layer_all_air {
            if let Some(neighbor) = self.neighbors[side as usize] {
                return neighbor.boundary_layer_has_solid(side.opposite());
            }
        }
        false
    }
}
