//! # Block Module
//!
//! Block-type identifiers and per-face direction handling for the voxel grid.
//! Block data is stored chunk-side as raw ids (`BlockTypeId`); this module
//! owns the id space and the solidity/transparency predicates that the
//! meshing, exposure, and raycast code consult.

pub mod block_side;
pub mod block_type;

pub use block_side::BlockSide;
pub use block_type::BlockType;

/// The integer representation used for block types in chunk storage and on
/// disk. One byte per block keeps a chunk's payload at 4 KiB.
pub type BlockTypeId = u8;
