//! Loaded tiles with a copy-on-write voxel buffer.
//!
//! The fetched payload is kept as the tile's pristine buffer. Readers share it
//! through an [`Arc`] until the first mutation clones it into a private working
//! buffer, so unmodified tiles cost one allocation and a snapshot is an `Arc`
//! clone.
//!
//! Mutations blend over the voxel's existing value, so successive writes
//! layer. Repeating the exact last write on a voxel it left untouched since
//! reproduces the same result instead of compounding.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::dynamic_color::DynamicSlot;
use crate::mip::{MipLevel, Mips};
use crate::voxel::VoxelBuffer;

/// Grid position of a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub row: u32,
    pub column: u32,
}

impl TileCoord {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Load state of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileState {
    Unloaded,
    Loading,
    Loaded,
}

/// Per-slot storage in the store's tile array.
#[derive(Debug, Default)]
pub(crate) enum TileSlot {
    #[default]
    Unloaded,
    Loading,
    Loaded(Box<Tile>),
}

impl TileSlot {
    pub(crate) fn state(&self) -> TileState {
        match self {
            TileSlot::Unloaded => TileState::Unloaded,
            TileSlot::Loading => TileState::Loading,
            TileSlot::Loaded(_) => TileState::Loaded,
        }
    }
}

/// A fully loaded tile: voxel data plus its mip levels.
#[derive(Clone, Debug)]
pub struct Tile {
    coord: TileCoord,
    edge: u32,
    pristine: Arc<VoxelBuffer>,
    current: Arc<VoxelBuffer>,
    mips: Mips,
    color_writes: FxHashMap<usize, LastWrite<[u8; 3]>>,
    elevation_writes: FxHashMap<usize, LastWrite<u8>>,
}

/// The most recent blend applied to one voxel channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LastWrite<T> {
    target: T,
    alpha: u8,
    base: T,
    result: T,
}

impl<T: Copy + PartialEq> LastWrite<T> {
    /// Base to blend over: the recorded one if this write repeats the last
    /// and the voxel still holds its result, otherwise `existing`.
    fn base_for(last: Option<&Self>, target: T, alpha: u8, existing: T) -> T {
        match last {
            Some(last) if last.target == target && last.alpha == alpha && last.result == existing => {
                last.base
            }
            _ => existing,
        }
    }
}

/// Raw read of one record at some level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RawSample {
    pub elevation: u8,
    pub color: [u8; 3],
    pub sentinel: Option<DynamicSlot>,
}

impl Tile {
    /// Wrap a decoded payload and build its mips.
    pub fn new(coord: TileCoord, buffer: VoxelBuffer, edge: u32) -> Self {
        let mips = Mips::build(&buffer, edge);
        let pristine = Arc::new(buffer);
        Self {
            coord,
            edge,
            current: Arc::clone(&pristine),
            pristine,
            mips,
            color_writes: FxHashMap::default(),
            elevation_writes: FxHashMap::default(),
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn edge(&self) -> u32 {
        self.edge
    }

    /// Full-resolution voxels including mutations.
    pub fn voxels(&self) -> &VoxelBuffer {
        &self.current
    }

    /// Full-resolution voxels as fetched.
    pub fn pristine(&self) -> &VoxelBuffer {
        &self.pristine
    }

    pub fn mips(&self) -> &Mips {
        &self.mips
    }

    /// Shared handle to the current full-resolution buffer.
    pub fn snapshot(&self) -> Arc<VoxelBuffer> {
        Arc::clone(&self.current)
    }

    /// `true` once a mutation has split the working buffer from the pristine one.
    pub fn is_modified(&self) -> bool {
        !Arc::ptr_eq(&self.current, &self.pristine)
    }

    /// Read the record covering local `(x, y)` at `level`.
    pub(crate) fn read(&self, level: MipLevel, local_x: u32, local_y: u32) -> RawSample {
        let (buffer, edge) = self
            .mips
            .level(level)
            .unwrap_or((self.current.as_ref(), self.edge));
        let shift = level.shift();
        let x = (local_x >> shift).min(edge - 1) as usize;
        let y = (local_y >> shift).min(edge - 1) as usize;
        let index = y * edge as usize + x;
        RawSample {
            elevation: buffer.elevation(index),
            color: buffer.color(index),
            sentinel: buffer.sentinel(index),
        }
    }

    fn index(&self, local_x: u32, local_y: u32) -> usize {
        local_y as usize * self.edge as usize + local_x as usize
    }

    /// Blend `color` over the current color at local `(x, y)`.
    pub(crate) fn blend_color(&mut self, local_x: u32, local_y: u32, color: [u8; 3], alpha: u8) {
        let index = self.index(local_x, local_y);
        let existing = self.current.color(index);
        let base = LastWrite::base_for(self.color_writes.get(&index), color, alpha, existing);
        let blended = std::array::from_fn(|c| blend(color[c], base[c], alpha));

        let current = Arc::make_mut(&mut self.current);
        current.set_color(index, blended);
        let result = current.color(index);
        self.color_writes.insert(
            index,
            LastWrite {
                target: color,
                alpha,
                base,
                result,
            },
        );
    }

    /// Blend `elevation` over the current elevation at local `(x, y)`.
    pub(crate) fn blend_elevation(&mut self, local_x: u32, local_y: u32, elevation: u8, alpha: u8) {
        let index = self.index(local_x, local_y);
        let existing = self.current.elevation(index);
        let base =
            LastWrite::base_for(self.elevation_writes.get(&index), elevation, alpha, existing);
        let result = blend(elevation, base, alpha);

        Arc::make_mut(&mut self.current).set_elevation(index, result);
        self.elevation_writes.insert(
            index,
            LastWrite {
                target: elevation,
                alpha,
                base,
                result,
            },
        );
    }
}

/// `round((target·alpha + base·(255 − alpha)) / 255)`.
pub(crate) fn blend(target: u8, base: u8, alpha: u8) -> u8 {
    if alpha == u8::MAX {
        return target;
    }
    let alpha = alpha as u32;
    let weighted = target as u32 * alpha + base as u32 * (255 - alpha);
    ((weighted + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_tile(edge: u32, record: [u8; 4]) -> Tile {
        let buffer = VoxelBuffer::FullColor(vec![record; (edge * edge) as usize]);
        Tile::new(TileCoord::new(0, 0), buffer, edge)
    }

    #[test]
    fn test_new_tile_shares_pristine() {
        let tile = flat_tile(4, [1, 2, 3, 4]);
        assert!(!tile.is_modified());
        let snapshot = tile.snapshot();
        assert_eq!(Arc::strong_count(&snapshot), 3);
    }

    #[test]
    fn test_mutation_splits_from_pristine() {
        let mut tile = flat_tile(4, [1, 2, 3, 4]);
        let before = tile.snapshot();
        tile.blend_elevation(1, 2, 99, 0xFF);

        assert!(tile.is_modified());
        assert_eq!(tile.voxels().elevation(9), 99);
        assert_eq!(tile.pristine().elevation(9), 1);
        assert_eq!(before.elevation(9), 1, "snapshot must not observe the write");
    }

    #[test]
    fn test_blend_is_idempotent() {
        let mut tile = flat_tile(4, [0, 0, 0, 0]);
        tile.blend_color(0, 0, [200, 100, 50], 128);
        let once = tile.voxels().color(0);
        tile.blend_color(0, 0, [200, 100, 50], 128);
        assert_eq!(tile.voxels().color(0), once);
        assert_eq!(once, [100, 50, 25]);
    }

    #[test]
    fn test_partial_write_layers_over_opaque_write() {
        let mut tile = flat_tile(4, [0, 0, 0, 0]);
        tile.blend_color(2, 1, [200, 200, 200], 0xFF);
        tile.blend_color(2, 1, [100, 100, 100], 128);
        assert_eq!(tile.voxels().color(6), [150, 150, 150]);

        tile.blend_elevation(2, 1, 100, 0xFF);
        tile.blend_elevation(2, 1, 50, 128);
        assert_eq!(tile.voxels().elevation(6), 75);
        // Repeating the last write does not compound.
        tile.blend_elevation(2, 1, 50, 128);
        assert_eq!(tile.voxels().elevation(6), 75);
    }

    #[test]
    fn test_repeat_after_other_write_layers_again() {
        let mut tile = flat_tile(4, [0, 0, 0, 0]);
        tile.blend_elevation(0, 0, 200, 128);
        assert_eq!(tile.voxels().elevation(0), 100);
        tile.blend_elevation(0, 0, 0, 0xFF);
        tile.blend_elevation(0, 0, 200, 128);
        assert_eq!(tile.voxels().elevation(0), 100);
        tile.blend_elevation(0, 0, 100, 0xFF);
        tile.blend_elevation(0, 0, 200, 128);
        assert_eq!(tile.voxels().elevation(0), 150);
    }

    #[test]
    fn test_blend_endpoints() {
        assert_eq!(blend(200, 10, 0xFF), 200);
        assert_eq!(blend(200, 10, 0), 10);
        for alpha in 1..=254u8 {
            let value = blend(200, 0, alpha);
            assert!(value > 0 && value < 200, "alpha {alpha} gave {value}");
        }
    }

    #[test]
    fn test_read_uses_level_resolution() {
        let records = (0..64u8).map(|i| [i, 0, 0, 0]).collect();
        let tile = Tile::new(TileCoord::new(0, 0), VoxelBuffer::FullColor(records), 8);

        assert_eq!(tile.read(MipLevel::Full, 3, 2).elevation, 19);
        // Block (1, 0) of the 4×4 mip covers columns 4..8, rows 0..4.
        let expected = (0..4)
            .flat_map(|y| (4..8).map(move |x| y * 8 + x))
            .sum::<u32>()
            / 16;
        assert_eq!(tile.read(MipLevel::Mip4, 5, 1).elevation as u32, expected);
    }

    #[test]
    fn test_coord_display() {
        assert_eq!(TileCoord::new(2, 7).to_string(), "(2, 7)");
    }
}
