//! # Storage Module
//!
//! Binary persistence for worlds. A saved world is a directory containing:
//!
//! - `world.dat`: the index, as `u64` seed, `u64` chunk count, then one
//!   `(i32, i32, i32)` chunk coordinate per saved chunk, little-endian.
//! - `chunks/{cx}_{cy}_{cz}.chunk`: one file per chunk that carried player
//!   edits, holding the full 4096-byte block-id array plus the
//!   `modified`/`dirty` flags. Procedurally generated, never-edited chunks
//!   are not written.
//! - `player.player`: fixed-layout player state, as position (3 x f32),
//!   yaw, pitch, flying flag.
//!
//! bincode's fixed-width little-endian integer encoding realizes these
//! layouts directly from the serde derives.
//!
//! Reads are deliberately forgiving: a missing or corrupt chunk file is
//! reported as absent so the streaming engine regenerates the chunk instead
//! of failing the load.

use cgmath::Point3;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use crate::chunk::{Chunk, CHUNK_VOLUME};
use crate::error::WorldError;

/// File name of the world index inside a save directory.
const INDEX_FILE: &str = "world.dat";
/// Subdirectory holding the per-chunk files.
const CHUNKS_DIR: &str = "chunks";
/// File name of the player state inside a save directory.
const PLAYER_FILE: &str = "player.player";

/// Serialized form of a single chunk.
#[derive(Serialize, Deserialize)]
struct ChunkRecord {
    blocks: Vec<u8>,
    modified: bool,
    dirty: bool,
}

/// Serialized world index: the seed plus the coordinates of every chunk that
/// has a file on disk. Chunk bodies live in the per-chunk files.
#[derive(Serialize, Deserialize)]
pub struct WorldIndex {
    /// The world generation seed
    pub seed: u64,
    /// Coordinates of the chunks with saved files
    pub chunks: Vec<[i32; 3]>,
}

/// Serialized player state.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PlayerRecord {
    /// World-space position
    pub position: [f32; 3],
    /// Horizontal look angle in degrees
    pub yaw: f32,
    /// Vertical look angle in degrees
    pub pitch: f32,
    /// Whether flight mode was active
    pub flying: bool,
}

/// Handle to a world save directory.
pub struct WorldStore {
    root: PathBuf,
}

impl WorldStore {
    /// Opens a store rooted at the given directory. The directory (and its
    /// `chunks/` subdirectory) is created on the first write, not here.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        WorldStore { root: root.into() }
    }

    /// The path of the per-chunk file for a chunk coordinate.
    fn chunk_path(&self, position: Point3<i32>) -> PathBuf {
        self.root.join(CHUNKS_DIR).join(format!(
            "{}_{}_{}.chunk",
            position.x, position.y, position.z
        ))
    }

    /// Writes one chunk's block data and flags to its file.
    ///
    /// # Errors
    /// Propagates filesystem and encoding failures; the caller decides
    /// whether a failed write is fatal (at unload time it is not).
    pub fn write_chunk(&self, chunk: &Chunk) -> Result<(), WorldError> {
        fs::create_dir_all(self.root.join(CHUNKS_DIR))?;
        let record = ChunkRecord {
            blocks: chunk.blocks().to_vec(),
            modified: chunk.is_modified(),
            dirty: chunk.is_dirty(),
        };
        let file = File::create(self.chunk_path(chunk.position))?;
        bincode::serialize_into(BufWriter::new(file), &record)?;
        Ok(())
    }

    /// Reads the chunk at a coordinate, if a usable file exists.
    ///
    /// A missing file returns `Ok(None)`. A short or otherwise corrupt file
    /// is logged and also returns `Ok(None)` so the caller regenerates the
    /// chunk; per-chunk corruption is never an error.
    pub fn read_chunk(&self, position: Point3<i32>) -> Result<Option<Chunk>, WorldError> {
        let path = self.chunk_path(position);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let record: ChunkRecord = match bincode::deserialize_from(BufReader::new(file)) {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    "chunk file {} is unreadable ({}); regenerating",
                    path.display(),
                    err
                );
                return Ok(None);
            }
        };
        if record.blocks.len() != CHUNK_VOLUME {
            warn!(
                "chunk file {} is truncated ({} of {} blocks); regenerating",
                path.display(),
                record.blocks.len(),
                CHUNK_VOLUME
            );
            return Ok(None);
        }
        Ok(Some(Chunk::from_parts(
            position,
            record.blocks,
            record.modified,
            record.dirty,
        )))
    }

    /// Writes the world index.
    pub fn write_index(&self, index: &WorldIndex) -> Result<(), WorldError> {
        fs::create_dir_all(&self.root)?;
        let file = File::create(self.root.join(INDEX_FILE))?;
        bincode::serialize_into(BufWriter::new(file), index)?;
        Ok(())
    }

    /// Reads the world index, if one exists. A missing index is not an
    /// error; the world starts fresh from its seed.
    pub fn read_index(&self) -> Result<Option<WorldIndex>, WorldError> {
        let file = match File::open(self.root.join(INDEX_FILE)) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(bincode::deserialize_from(BufReader::new(file))?))
    }

    /// Writes the player state file.
    pub fn write_player(&self, player: &PlayerRecord) -> Result<(), WorldError> {
        fs::create_dir_all(&self.root)?;
        let file = File::create(self.root.join(PLAYER_FILE))?;
        bincode::serialize_into(BufWriter::new(file), player)?;
        Ok(())
    }

    /// Reads the player state file, if one exists.
    pub fn read_player(&self) -> Result<Option<PlayerRecord>, WorldError> {
        let file = match File::open(self.root.join(PLAYER_FILE)) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(bincode::deserialize_from(BufReader::new(file))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;

    #[test]
    fn chunk_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorldStore::new(dir.path());

        let mut chunk = Chunk::empty(Point3::new(2, -1, 3));
        fastrand::seed(11);
        for _ in 0..500 {
            let (x, y, z) = (fastrand::i32(0..16), fastrand::i32(0..16), fastrand::i32(0..16));
            chunk.set_block_local(x, y, z, BlockType::STONE).unwrap();
        }
        chunk.set_modified(true);
        store.write_chunk(&chunk).unwrap();

        let restored = store.read_chunk(Point3::new(2, -1, 3)).unwrap().unwrap();
        assert_eq!(restored.blocks(), chunk.blocks());
        assert!(restored.is_modified());
    }

    #[test]
    fn missing_chunk_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorldStore::new(dir.path());
        assert!(store.read_chunk(Point3::new(0, 0, 0)).unwrap().is_none());
    }

    #[test]
    fn corrupt_chunk_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorldStore::new(dir.path());
        fs::create_dir_all(dir.path().join(CHUNKS_DIR)).unwrap();
        fs::write(dir.path().join(CHUNKS_DIR).join("0_0_0.chunk"), b"\x03\x00").unwrap();
        assert!(store.read_chunk(Point3::new(0, 0, 0)).unwrap().is_none());
    }

    #[test]
    fn index_layout_is_fixed_little_endian() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorldStore::new(dir.path());
        let index = WorldIndex {
            seed: 0x0102030405060708,
            chunks: vec![[1, -2, 3]],
        };
        store.write_index(&index).unwrap();

        let bytes = fs::read(dir.path().join(INDEX_FILE)).unwrap();
        assert_eq!(bytes.len(), 8 + 8 + 12);
        assert_eq!(&bytes[0..8], &0x0102030405060708u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &1u64.to_le_bytes());
        assert_eq!(&bytes[16..20], &1i32.to_le_bytes());
        assert_eq!(&bytes[20..24], &(-2i32).to_le_bytes());
    }

    #[test]
    fn player_record_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorldStore::new(dir.path());
        assert!(store.read_player().unwrap().is_none());
        let player = PlayerRecord {
            position: [1.5, 70.0, -3.25],
            yaw: 90.0,
            pitch: -12.5,
            flying: true,
        };
        store.write_player(&player).unwrap();
        assert_eq!(store.read_player().unwrap().unwrap(), player);
    }
}
