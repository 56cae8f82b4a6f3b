#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! A chunk-streaming voxel world core: block storage, surface meshing, block
//! queries, and binary persistence, with no rendering or windowing attached.
//!
//! The world is a sparse grid of 16x16x16 chunks that tracks the player. A
//! rate-limited evaluation pass decides which chunks to load and unload,
//! per-frame queue processing performs a bounded slice of that work, and a
//! separate bounded pass turns edited chunks back into triangle meshes.
//! Everything runs cooperatively on the caller's thread.
//!
//! ## Key Modules
//!
//! * `world` - The streaming engine: residency, queues, edits, raycasts
//! * `chunk` - Chunk storage, exposure masks, colliders, and the meshers
//! * `block` - Block types and face/side arithmetic
//! * `terrain` - The terrain generator interface and the default Perlin noise
//!   implementation
//! * `storage` - On-disk world format (index, chunk files, player state)
//!
//! ## Usage
//!
//! ```rust
//! use cgmath::Point3;
//! use voxel_world::World;
//!
//! let mut world = World::new(42);
//! // Once per frame:
//! world.tick(Point3::new(8.0, 70.0, 8.0));
//! ```

pub mod block;
pub mod chunk;
pub mod config;
pub mod error;
pub mod storage;
pub mod terrain;
pub mod world;

pub use block::{BlockSide, BlockType};
pub use chunk::{Chunk, ExposureMask, CHUNK_SIZE};
pub use config::StreamingConfig;
pub use error::WorldError;
pub use world::{ChunkVisibilityManager, RaycastResult, World, WorldStats};
