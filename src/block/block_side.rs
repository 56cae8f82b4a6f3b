//! # Block Side Module
//!
//! This module defines the different faces/sides of a voxel block and the
//! axis arithmetic shared by exposure tracking, meshing, and raycasting.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel block.
///
/// Each variant is assigned a unique integer value so the exposure mask and
/// per-side mesh buffers can be indexed directly by `side as usize`.
///
/// The axis mapping is: RIGHT = +X, LEFT = -X, TOP = +Y, BOTTOM = -Y,
/// FRONT = +Z, BACK = -Z.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    ///
    /// The order matches the discriminant values, so
    /// `BlockSide::all()[side as usize] == side`.
    ///
    /// # Returns
    /// An array containing all `BlockSide` variants.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// Returns the unit offset from a block to its neighbor across this face.
    ///
    /// # Returns
    /// An integer vector with exactly one non-zero component.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(0, 0, 1),
            BlockSide::BACK => Vector3::new(0, 0, -1),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(-1, 0, 0),
            BlockSide::RIGHT => Vector3::new(1, 0, 0),
        }
    }

    /// Returns the outward face normal as a float vector.
    pub fn normal(self) -> Vector3<f32> {
        let o = self.offset();
        Vector3::new(o.x as f32, o.y as f32, o.z as f32)
    }

    /// Returns the face on the opposite side of the block.
    ///
    /// Used when a boundary edit in one chunk invalidates the matching face
    /// of the adjacent chunk.
    pub fn opposite(self) -> BlockSide {
        match self {
            BlockSide::FRONT => BlockSide::BACK,
            BlockSide::BACK => BlockSide::FRONT,
            BlockSide::BOTTOM => BlockSide::TOP,
            BlockSide::TOP => BlockSide::BOTTOM,
            BlockSide::LEFT => BlockSide::RIGHT,
            BlockSide::RIGHT => BlockSide::LEFT,
        }
    }
}
