//! # Terrain Module
//!
//! The streaming engine treats terrain generation as an external
//! collaborator: a pure function from world coordinates to block types. This
//! module defines that interface and ships a Perlin-noise default so the
//! crate is usable out of the box and the tests have deterministic terrain.

use noise::{NoiseFn, Perlin};

use crate::block::BlockType;

/// The terrain collaborator interface consumed by chunk generation.
///
/// Implementations must be pure: the same coordinates always yield the same
/// answer for a given generator instance. The streaming engine calls
/// `block_type_at` once per voxel when a chunk has no saved file on disk.
pub trait TerrainGenerator {
    /// The terrain surface height (in blocks) at a world column.
    fn height_at(&self, x: i32, z: i32) -> i32;

    /// The block type at a world position.
    fn block_type_at(&self, x: i32, y: i32, z: i32) -> BlockType;
}

/// Baseline sea-floor height around which the noise varies.
const BASE_HEIGHT: f64 = 64.0;
/// Vertical amplitude of the height noise, in blocks.
const HEIGHT_AMPLITUDE: f64 = 24.0;
/// Scaling factor applied to world coordinates when sampling the noise.
const NOISE_SCALE: f64 = 0.01;
/// Surface heights at or below this are beach material instead of grass.
const SAND_HEIGHT: i32 = 58;

/// Height-map terrain driven by 2D Perlin noise.
///
/// Columns are solid up to `height_at(x, z)`: stone at depth, dirt near the
/// surface, and a grass (or sand, near the floor) cap. Everything above is
/// air.
pub struct PerlinTerrain {
    perlin: Perlin,
}

impl PerlinTerrain {
    /// Creates a generator for the given world seed.
    ///
    /// The seed is truncated to the noise function's 32-bit seed space; two
    /// worlds whose seeds differ only in the high bits will share terrain.
    pub fn new(seed: u64) -> Self {
        PerlinTerrain {
            perlin: Perlin::new(seed as u32),
        }
    }
}

impl TerrainGenerator for PerlinTerrain {
    fn height_at(&self, x: i32, z: i32) -> i32 {
        let sample = self
            .perlin
            .get([x as f64 * NOISE_SCALE, z as f64 * NOISE_SCALE]);
        (BASE_HEIGHT + sample * HEIGHT_AMPLITUDE).floor() as i32
    }

    fn block_type_at(&self, x: i32, y: i32, z: i32) -> BlockType {
        let height = self.height_at(x, z);
        if y > height {
            BlockType::AIR
        } else if y == height {
            if height <= SAND_HEIGHT {
                BlockType::SAND
            } else {
                BlockType::GRASS
            }
        } else if y >= height - 3 {
            BlockType::DIRT
        } else {
            BlockType::STONE
        }
    }
}

/// A flat world at a fixed surface height, used by tests that need exact
/// control over which blocks exist.
pub struct FlatTerrain {
    /// The y coordinate of the highest solid block in every column.
    pub surface: i32,
}

impl TerrainGenerator for FlatTerrain {
    fn height_at(&self, _x: i32, _z: i32) -> i32 {
        self.surface
    }

    fn block_type_at(&self, _x: i32, y: i32, _z: i32) -> BlockType {
        if y > self.surface {
            BlockType::AIR
        } else if y == self.surface {
            BlockType::GRASS
        } else {
            BlockType::STONE
        }
    }
}
