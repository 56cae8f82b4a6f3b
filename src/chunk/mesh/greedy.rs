//! Greedy meshing implementation for voxel rendering.
//!
//! For each of the six face directions and each depth slice, the mesher
//! builds a 2D grid of "this cell needs a quad of type T" entries, then
//! repeatedly takes the first unconsumed cell, grows the widest possible run
//! of the same type, grows that strip downward while every cell in the next
//! row still matches, and emits a single quad for the merged rectangle.
//!
//! The merged surface is geometrically identical to the naive mesher's
//! output; only the quad count differs, and it is never larger.

use bitvec::prelude::*;
use cgmath::Vector3;

use crate::block::{BlockSide, BlockType, BlockTypeId};
use crate::chunk::{Chunk, ChunkNeighborhood, CHUNK_SIZE};

use super::face::{grid_to_cell, Face};
use super::{face_visible, ChunkMesh};

const SLICE_AREA: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

#[inline]
fn slice_index(a: i32, b: i32) -> usize {
    (a + b * CHUNK_SIZE) as usize
}

/// Emits merged quads for every visible block face in the chunk.
pub fn build(chunk: &Chunk, hood: &ChunkNeighborhood, origin: Vector3<f32>, mesh: &mut ChunkMesh) {
    let mut grid = [0 as BlockTypeId; SLICE_AREA];
    for side in BlockSide::all() {
        for depth in 0..CHUNK_SIZE {
            if fill_slice(chunk, hood, side, depth, &mut grid) {
                merge_slice(side, depth, &grid, mesh, origin);
            }
        }
    }
}

/// Populates the slice grid with the block type of every cell that needs a
/// quad on `side` at this depth.
///
/// Air's id (0) doubles as the "no quad" marker: air blocks never emit faces,
/// so a zero entry is unambiguous.
///
/// # Returns
/// Whether the slice contains any face at all.
fn fill_slice(
    chunk: &Chunk,
    hood: &ChunkNeighborhood,
    side: BlockSide,
    depth: i32,
    grid: &mut [BlockTypeId; SLICE_AREA],
) -> bool {
    let mut any = false;
    for b in 0..CHUNK_SIZE {
        for a in 0..CHUNK_SIZE {
            let (x, y, z) = grid_to_cell(side, depth, a, b);
            let block_type = chunk.block_type_local(x, y, z);
            let needs_quad =
                block_type.is_solid() && face_visible(chunk, hood, x, y, z, side);
            grid[slice_index(a, b)] = if needs_quad { block_type.id() } else { 0 };
            any |= needs_quad;
        }
    }
    any
}

/// Merges the slice grid into maximal same-type rectangles and emits them.
fn merge_slice(
    side: BlockSide,
    depth: i32,
    grid: &[BlockTypeId; SLICE_AREA],
    mesh: &mut ChunkMesh,
    origin: Vector3<f32>,
) {
    let mut consumed = bitvec![0; SLICE_AREA];
    for b in 0..CHUNK_SIZE {
        for a in 0..CHUNK_SIZE {
            let id = grid[slice_index(a, b)];
            if id == 0 || consumed[slice_index(a, b)] {
                continue;
            }

            // Grow the run as wide as the row allows.
            let mut width = 1;
            while a + width < CHUNK_SIZE
                && grid[slice_index(a + width, b)] == id
                && !consumed[slice_index(a + width, b)]
            {
                width += 1;
            }

            // Grow downward while the whole width-strip still matches.
            let mut height = 1;
            'grow: while b + height < CHUNK_SIZE {
                for i in 0..width {
                    let index = slice_index(a + i, b + height);
                    if grid[index] != id || consumed[index] {
                        break 'grow;
                    }
                }
                height += 1;
            }

            for db in 0..height {
                for da in 0..width {
                    consumed.set(slice_index(a + da, b + db), true);
                }
            }

            let block_type = BlockType::from_id(id);
            mesh.add_face(
                &Face::quad(side, depth, a, b, width, height, block_type),
                origin,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;
    use crate::chunk::mesh;

    fn solid_chunk() -> Chunk {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        for z in 0..CHUNK_SIZE {
            for y in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    chunk.set_block_local(x, y, z, BlockType::STONE).unwrap();
                }
            }
        }
        chunk
    }

    #[test]
    fn single_block_matches_naive() {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        chunk.set_block_local(5, 5, 5, BlockType::DIRT).unwrap();
        let hood = ChunkNeighborhood::detached();
        let greedy = mesh::build(&chunk, &hood, false);
        let naive = mesh::build(&chunk, &hood, true);
        assert_eq!(greedy.triangle_count(), 12);
        assert_eq!(naive.triangle_count(), 12);
    }

    #[test]
    fn full_chunk_collapses_to_six_quads() {
        let chunk = solid_chunk();
        let hood = ChunkNeighborhood::detached();
        let greedy = mesh::build(&chunk, &hood, false);
        assert_eq!(greedy.triangle_count(), 12);
        assert_eq!(greedy.vertices.len(), 24);
    }

    #[test]
    fn greedy_never_exceeds_naive() {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        fastrand::seed(7);
        for z in 0..CHUNK_SIZE {
            for y in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    if fastrand::f32() < 0.4 {
                        let ty = if fastrand::bool() {
                            BlockType::STONE
                        } else {
                            BlockType::DIRT
                        };
                        chunk.set_block_local(x, y, z, ty).unwrap();
                    }
                }
            }
        }
        let hood = ChunkNeighborhood::detached();
        let greedy = mesh::build(&chunk, &hood, false);
        let naive = mesh::build(&chunk, &hood, true);
        assert!(greedy.triangle_count() <= naive.triangle_count());
        assert!(!greedy.is_empty());
    }

    #[test]
    fn different_types_do_not_merge() {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        chunk.set_block_local(0, 0, 0, BlockType::STONE).unwrap();
        chunk.set_block_local(1, 0, 0, BlockType::DIRT).unwrap();
        let hood = ChunkNeighborhood::detached();
        let greedy = mesh::build(&chunk, &hood, false);
        // Two blocks of different types: no faces merge, 10 visible faces
        // (the shared face pair is occluded).
        assert_eq!(greedy.triangle_count(), 20);
    }

    #[test]
    fn merged_rectangle_spans_extents() {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        for x in 0..4 {
            for z in 0..3 {
                chunk.set_block_local(x, 0, z, BlockType::GRASS).unwrap();
            }
        }
        let hood = ChunkNeighborhood::detached();
        let greedy = mesh::build(&chunk, &hood, false);
        // A 4x3x1 slab has 6 merged quads, one per side.
        assert_eq!(greedy.triangle_count(), 12);
        let max_x = greedy
            .vertices
            .iter()
            .map(|v| v.position[0])
            .fold(f32::MIN, f32::max);
        let max_z = greedy
            .vertices
            .iter()
            .map(|v| v.position[2])
            .fold(f32::MIN, f32::max);
        assert_eq!(max_x, 4.0);
        assert_eq!(max_z, 3.0);
    }
}
