//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world.
//! It provides functionality for block type identification, conversion from
//! raw storage ids, and the transparency predicate used for face culling.

use num_derive::FromPrimitive;

use super::BlockTypeId;

/// Enumerates all possible block types in the voxel world.
///
/// Each variant represents a distinct type of block. The `FromPrimitive`
/// derive allows conversion from the raw ids used in chunk storage and on
/// disk, which is how deserialized block arrays are interpreted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u8)]
pub enum BlockType {
    /// An air block, which is non-solid and transparent.
    #[default]
    AIR,

    /// The base terrain filler below the surface layers.
    STONE,

    /// A basic dirt block, found directly under the surface.
    DIRT,

    /// The surface block of generated terrain.
    GRASS,

    /// Loose surface material used near the terrain floor.
    SAND,

    /// A wooden block, only produced by player edits.
    WOOD,
}

impl BlockType {
    /// Converts a raw storage id to a `BlockType`.
    ///
    /// Unknown ids decode to `AIR` rather than failing: a chunk file carrying
    /// ids from a newer block set should still load, and dropping unknown
    /// blocks to air is the least surprising degradation.
    ///
    /// # Arguments
    /// * `id` - The block type as stored in a chunk's block array
    ///
    /// # Returns
    /// The corresponding `BlockType`, or `AIR` for unknown ids.
    pub fn from_id(id: BlockTypeId) -> Self {
        num::FromPrimitive::from_u8(id).unwrap_or(BlockType::AIR)
    }

    /// Returns the raw storage id for this block type.
    pub fn id(self) -> BlockTypeId {
        self as BlockTypeId
    }

    /// Whether this block type occludes the faces of its neighbors.
    ///
    /// This is the single extension point for translucent block types; today
    /// only `AIR` is transparent and every other id is opaque.
    pub fn is_transparent(self) -> bool {
        matches!(self, BlockType::AIR)
    }

    /// Whether this block type participates in collision and meshing.
    pub fn is_solid(self) -> bool {
        !self.is_transparent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for ty in [
            BlockType::AIR,
            BlockType::STONE,
            BlockType::DIRT,
            BlockType::GRASS,
            BlockType::SAND,
            BlockType::WOOD,
        ] {
            assert_eq!(BlockType::from_id(ty.id()), ty);
        }
    }

    #[test]
    fn unknown_ids_decode_to_air() {
        assert_eq!(BlockType::from_id(200), BlockType::AIR);
    }

    #[test]
    fn only_air_is_transparent() {
        assert!(BlockType::AIR.is_transparent());
        assert!(BlockType::STONE.is_solid());
        assert!(BlockType::WOOD.is_solid());
    }
}
