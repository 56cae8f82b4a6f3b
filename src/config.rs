//! Streaming engine tuning knobs.
//!
//! Every budget and cap the frame loop enforces lives here, so a host can
//! load alternative tunings from a JSON file without recompiling. The
//! defaults are the stock tuning.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::WorldError;

/// Tunable limits for the streaming engine.
///
/// All fields have defaults, so a JSON config file only needs to name the
/// values it overrides.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Minimum interval between load/unload evaluations, in milliseconds.
    pub evaluate_interval_ms: u64,
    /// Wall-clock budget for one frame of queue processing, in milliseconds.
    pub queue_budget_ms: u64,
    /// Wall-clock budget for one frame of mesh regeneration, in milliseconds.
    pub mesh_budget_ms: u64,
    /// Maximum chunk loads processed per frame.
    pub max_loads_per_frame: usize,
    /// Maximum chunk unloads processed per frame. Unloads only run on frames
    /// where the load queue drained, so this can safely be larger.
    pub max_unloads_per_frame: usize,
    /// Maximum mesh regenerations per frame.
    pub max_meshes_per_frame: usize,
    /// Number of frames after a world load during which the mesh caps and
    /// budget are raised, so the initial scene fills in quickly.
    pub startup_boost_frames: u64,
    /// Multiplier applied to the mesh cap and budget during the boost window.
    pub startup_boost_factor: u32,
    /// Dirty-set size above which the world force-clears dirty flags outside
    /// the player's immediate chunk neighborhood.
    pub dirty_chunk_cap: usize,
    /// Chunks below this chunk y are never unloaded.
    pub min_unload_chunk_y: i32,
    /// Vertical half-range (in chunks) loaded around the player when a column
    /// has no recorded exposure span.
    pub vertical_range: i32,
    /// How far (in columns) outside the horizontal window remembered columns
    /// are still considered for loading.
    pub column_margin: i32,
    /// Use the naive one-quad-per-face mesher instead of greedy merging.
    pub disable_greedy_meshing: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        StreamingConfig {
            evaluate_interval_ms: 1000,
            queue_budget_ms: 16,
            mesh_budget_ms: 50,
            max_loads_per_frame: 6,
            max_unloads_per_frame: 12,
            max_meshes_per_frame: 6,
            startup_boost_frames: 20,
            startup_boost_factor: 4,
            dirty_chunk_cap: 512,
            min_unload_chunk_y: 4,
            vertical_range: 2,
            column_margin: 2,
            disable_greedy_meshing: false,
        }
    }
}

impl StreamingConfig {
    /// Loads a config from a JSON file.
    ///
    /// # Errors
    /// Returns `WorldError::Io` if the file cannot be read and
    /// `WorldError::Config` if it is not valid JSON for this shape.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WorldError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
