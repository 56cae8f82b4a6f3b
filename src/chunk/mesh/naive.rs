//! One-quad-per-visible-face meshing.
//!
//! The baseline strategy: every solid block contributes a unit quad for each
//! face whose neighbor cell is transparent. Kept as the debugging baseline
//! the greedy mesher is validated against.

use cgmath::Vector3;

use crate::block::BlockSide;
use crate::chunk::{Chunk, ChunkNeighborhood, CHUNK_SIZE};

use super::face::{cell_to_grid, Face};
use super::{face_visible, ChunkMesh};

/// Emits one unit quad for every visible block face in the chunk.
pub fn build(chunk: &Chunk, hood: &ChunkNeighborhood, origin: Vector3<f32>, mesh: &mut ChunkMesh) {
    for z in 0..CHUNK_SIZE {
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let block_type = chunk.block_type_local(x, y, z);
                if !block_type.is_solid() {
                    continue;
                }
                for side in BlockSide::all() {
                    if face_visible(chunk, hood, x, y, z, side) {
                        let (d, a, b) = cell_to_grid(side, x, y, z);
                        mesh.add_face(&Face::quad(side, d, a, b, 1, 1, block_type), origin);
                    }
                }
            }
        }
    }
}
