//! # Chunk Meshing Module
//!
//! Converts a chunk's block data into a renderable triangle mesh. Two
//! strategies are provided: a naive mesher that emits one quad per visible
//! block face, and a greedy mesher that merges coplanar same-type faces into
//! maximal rectangles. Both produce the same outer surface; greedy simply
//! uses fewer quads, and never more than naive for the same input.
//!
//! The output is an opaque vertex/index buffer pair. The render layer uploads
//! it as-is; this crate owns no GPU resources.

use cgmath::Vector3;

use crate::chunk::{Chunk, ChunkNeighborhood, CHUNK_SIZE};

pub mod face;
mod greedy;
mod naive;

pub use face::Face;

/// A vertex in the chunk mesh.
///
/// The layout is plain position+normal+uv so the render layer can hand the
/// buffer straight to the GPU.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes)
/// - Normal: [f32; 3] (12 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
///
/// Total size: 32 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position in world space
    pub position: [f32; 3],
    /// Outward face normal (shared by all four vertices of a quad)
    pub normal: [f32; 3],
    /// Texture coordinates; merged quads carry uvs spanning the full
    /// rectangle so tiled textures repeat per block
    pub uv: [f32; 2],
}

/// A finished chunk mesh: one vertex buffer and one index buffer.
///
/// Indices describe counter-clockwise triangles, two per quad.
#[derive(Debug, Default, Clone)]
pub struct ChunkMesh {
    /// The vertex data for this mesh
    pub vertices: Vec<Vertex>,
    /// The index data for this mesh
    pub indices: Vec<u32>,
}

impl ChunkMesh {
    /// Creates a new, empty mesh.
    pub fn new() -> Self {
        ChunkMesh::default()
    }

    /// Appends one quad face to the mesh.
    ///
    /// The face's four corners are emitted in `ll, lr, ul, ur` order with the
    /// quad normal replicated across them, followed by the six indices for
    /// the two triangles.
    ///
    /// # Arguments
    /// * `face` - The quad to append
    /// * `origin` - World-space offset of the owning chunk's corner
    pub fn add_face(&mut self, face: &Face, origin: Vector3<f32>) {
        let base = self.vertices.len() as u32;
        let normal: [f32; 3] = face.side.normal().into();
        let (w, h) = (face.width as f32, face.height as f32);
        let uvs = [[0.0, 0.0], [w, 0.0], [0.0, h], [w, h]];
        for (corner, uv) in face.corners().into_iter().zip(uvs) {
            self.vertices.push(Vertex {
                position: [
                    corner.x as f32 + origin.x,
                    corner.y as f32 + origin.y,
                    corner.z as f32 + origin.z,
                ],
                normal,
                uv,
            });
        }
        self.indices.extend([
            base,
            base + 1,
            base + 3,
            base,
            base + 3,
            base + 2,
        ]);
    }

    /// The number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the mesh contains no geometry at all.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Generates the mesh for a chunk against its loaded neighborhood.
///
/// # Arguments
/// * `chunk` - The chunk to mesh
/// * `hood` - The loaded neighbors, for cross-chunk face visibility
/// * `disable_greedy` - When true, fall back to one quad per visible face
///
/// # Returns
/// The finished mesh, positioned in world space.
pub fn build(chunk: &Chunk, hood: &ChunkNeighborhood, disable_greedy: bool) -> ChunkMesh {
    let origin = Vector3::new(
        (chunk.position.x * CHUNK_SIZE) as f32,
        (chunk.position.y * CHUNK_SIZE) as f32,
        (chunk.position.z * CHUNK_SIZE) as f32,
    );
    let mut mesh = ChunkMesh::new();
    if disable_greedy {
        naive::build(chunk, hood, origin, &mut mesh);
    } else {
        greedy::build(chunk, hood, origin, &mut mesh);
    }
    mesh
}

/// Whether the face of the block at `(x, y, z)` toward `side` is visible,
/// i.e. the adjacent cell (possibly in a neighbor chunk) does not occlude it.
pub(crate) fn face_visible(
    chunk: &Chunk,
    hood: &ChunkNeighborhood,
    x: i32,
    y: i32,
    z: i32,
    side: crate::block::BlockSide,
) -> bool {
    let offset = side.offset();
    hood.is_transparent(chunk, x + offset.x, y + offset.y, z + offset.z)
}
