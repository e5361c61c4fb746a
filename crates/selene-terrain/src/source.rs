//! Backends that fetch raw tile payloads.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::tile::TileCoord;

/// A request for one tile's payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileRequest {
    pub coord: TileCoord,
    /// Asset name from the manifest's naming template.
    pub name: String,
}

/// Errors from fetching or decoding a tile.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to read tile '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no payload for tile {0}")]
    Missing(TileCoord),
    #[error("tile payload is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("tile {0} lies outside the grid")]
    OutOfGrid(TileCoord),
}

/// Fetches raw tile payloads. Called from loader worker threads.
pub trait TileSource: Send + Sync {
    fn fetch(&self, request: &TileRequest) -> Result<Vec<u8>, FetchError>;
}

/// Reads `<base>/<name>` from the filesystem.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    base: PathBuf,
}

impl DirectorySource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl TileSource for DirectorySource {
    fn fetch(&self, request: &TileRequest) -> Result<Vec<u8>, FetchError> {
        std::fs::read(self.base.join(&request.name)).map_err(|source| FetchError::Io {
            name: request.name.clone(),
            source,
        })
    }
}

/// Payloads held in memory, keyed by tile coordinate.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    tiles: FxHashMap<TileCoord, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, coord: TileCoord, payload: Vec<u8>) {
        self.tiles.insert(coord, payload);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_tile(mut self, coord: TileCoord, payload: Vec<u8>) -> Self {
        self.insert(coord, payload);
        self
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl TileSource for MemorySource {
    fn fetch(&self, request: &TileRequest) -> Result<Vec<u8>, FetchError> {
        self.tiles
            .get(&request.coord)
            .cloned()
            .ok_or(FetchError::Missing(request.coord))
    }
}
