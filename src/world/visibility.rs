//! Exact per-voxel visibility sweep.
//!
//! The streaming engine's face-mask heuristic is cheap but coarse: it only
//! inspects chunk boundary layers. This manager is the slow, precise
//! counterpart: it walks the player's chunk neighborhood, loads anything
//! missing on demand, and marks a chunk visible when any of its solid voxels
//! touches non-solid space. The world's exposure-driven visible set remains
//! the rendering signal; this set serves callers that need the exact answer
//! for the chunks immediately around the player.

use cgmath::Point3;
use std::collections::HashSet;

use crate::chunk::CHUNK_SIZE;
use crate::world::World;

/// Tracks exact visibility for the chunks around the player.
pub struct ChunkVisibilityManager {
    radius: i32,
    visible: HashSet<Point3<i32>>,
}

impl ChunkVisibilityManager {
    /// Creates a manager covering a cube of `2 * radius + 1` chunks per axis
    /// around the player's chunk.
    pub fn new(radius: i32) -> Self {
        ChunkVisibilityManager {
            radius,
            visible: HashSet::new(),
        }
    }

    /// Rebuilds the visible set for the neighborhood around `player_pos`,
    /// loading any missing chunk in it on demand.
    pub fn update(&mut self, world: &mut World, player_pos: Point3<f32>) {
        let pc = Point3::new(
            (player_pos.x / CHUNK_SIZE as f32).floor() as i32,
            (player_pos.y / CHUNK_SIZE as f32).floor() as i32,
            (player_pos.z / CHUNK_SIZE as f32).floor() as i32,
        );
        self.visible.clear();
        for dx in -self.radius..=self.radius {
            for dy in -self.radius..=self.radius {
                for dz in -self.radius..=self.radius {
                    let pos = Point3::new(pc.x + dx, pc.y + dy, pc.z + dz);
                    world.ensure_chunk_loaded(pos);
                    if world.has_exposed_voxel(pos) {
                        self.visible.insert(pos);
                    }
                }
            }
        }
    }

    /// Whether the last sweep found a visible surface in this chunk.
    pub fn is_visible(&self, position: Point3<i32>) -> bool {
        self.visible.contains(&position)
    }

    /// Number of chunks the last sweep marked visible.
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }
}
