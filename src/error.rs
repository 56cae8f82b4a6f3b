//! Error taxonomy for the streaming core.
//!
//! Failures in this crate fall into two classes: programming errors surfaced
//! at the API boundary (`OutOfRange`) and recoverable environment failures
//! (`Io`, `Codec`). Everything recoverable degrades to "regenerate" or "skip"
//! inside the streaming loop; only the public query and persistence surfaces
//! propagate these variants to the caller.

use cgmath::Point3;
use thiserror::Error;

/// Errors produced by the world, chunk, and storage surfaces.
#[derive(Debug, Error)]
pub enum WorldError {
    /// A local block coordinate fell outside `0..CHUNK_SIZE`.
    ///
    /// Out-of-range access is a programming error at the call site; it is
    /// rejected rather than clamped.
    #[error("local block coordinate ({x}, {y}, {z}) is out of range")]
    OutOfRange {
        /// Local x coordinate that was requested
        x: i32,
        /// Local y coordinate that was requested
        y: i32,
        /// Local z coordinate that was requested
        z: i32,
    },

    /// A world-space query landed in a chunk that is not currently loaded.
    #[error("chunk ({}, {}, {}) is not loaded", .0.x, .0.y, .0.z)]
    ChunkNotLoaded(Point3<i32>),

    /// An underlying filesystem operation failed.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// A binary payload could not be encoded or decoded.
    #[error("codec failure: {0}")]
    Codec(#[from] bincode::Error),

    /// A configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
