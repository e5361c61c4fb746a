//! Voxel records and the per-tile voxel buffer.

use selene_config::TileFormat;

use crate::dynamic_color::DynamicSlot;
use crate::source::FetchError;

/// Spacing, in voxels, of the grid lines drawn over unloaded tiles.
pub const GRID_LINE_SPACING: u32 = 16;

/// A resolved voxel as returned by the store's sampling operations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Voxel {
    /// Elevation in world units (stored byte times the vertical scalar).
    pub elevation: f32,
    /// RGB color, with dynamic substitution already applied.
    pub color: [u8; 3],
    /// `true` if `color` came from a dynamic color slot.
    pub dynamic: bool,
    /// `true` if the owning tile was not loaded (or lies outside the grid).
    pub unloaded: bool,
    /// `true` for placeholders that sit on a grid line.
    pub grid_line: bool,
}

impl Voxel {
    /// Placeholder returned for voxels whose tile has no data.
    pub fn placeholder(local_x: u32, local_y: u32) -> Self {
        Self {
            elevation: 0.0,
            color: [0, 0, 0],
            dynamic: false,
            unloaded: true,
            grid_line: local_x % GRID_LINE_SPACING == 0 || local_y % GRID_LINE_SPACING == 0,
        }
    }

    /// Color as opaque RGBA.
    pub fn rgba(&self) -> [u8; 4] {
        [self.color[0], self.color[1], self.color[2], 0xFF]
    }
}

/// Raw voxel records of one tile level, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoxelBuffer {
    /// `[elevation, red, green, blue]` records.
    FullColor(Vec<[u8; 4]>),
    /// `[elevation, white]` records.
    Monochrome(Vec<[u8; 2]>),
}

impl VoxelBuffer {
    /// Decode a tile payload. The payload must hold exactly `edge²` records.
    pub fn from_payload(format: TileFormat, bytes: &[u8], edge: u32) -> Result<Self, FetchError> {
        let expected = edge as usize * edge as usize * format.bytes_per_voxel();
        if bytes.len() != expected {
            return Err(FetchError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        Ok(match format {
            TileFormat::FullColor => VoxelBuffer::FullColor(
                bytes
                    .chunks_exact(4)
                    .map(|r| [r[0], r[1], r[2], r[3]])
                    .collect(),
            ),
            TileFormat::Monochrome => {
                VoxelBuffer::Monochrome(bytes.chunks_exact(2).map(|r| [r[0], r[1]]).collect())
            }
        })
    }

    /// The record layout of this buffer.
    pub fn format(&self) -> TileFormat {
        match self {
            VoxelBuffer::FullColor(_) => TileFormat::FullColor,
            VoxelBuffer::Monochrome(_) => TileFormat::Monochrome,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        match self {
            VoxelBuffer::FullColor(records) => records.len(),
            VoxelBuffer::Monochrome(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored elevation byte.
    pub fn elevation(&self, index: usize) -> u8 {
        match self {
            VoxelBuffer::FullColor(records) => records[index][0],
            VoxelBuffer::Monochrome(records) => records[index][0],
        }
    }

    /// Stored color, white replicated for monochrome records. No dynamic
    /// substitution.
    pub fn color(&self, index: usize) -> [u8; 3] {
        match self {
            VoxelBuffer::FullColor(records) => {
                let [_, r, g, b] = records[index];
                [r, g, b]
            }
            VoxelBuffer::Monochrome(records) => {
                let w = records[index][1];
                [w, w, w]
            }
        }
    }

    /// The dynamic slot a record's sentinel value selects, if any.
    pub fn sentinel(&self, index: usize) -> Option<DynamicSlot> {
        match self {
            VoxelBuffer::FullColor(records) => {
                let [_, r, g, _] = records[index];
                if r == 0xFF {
                    Some(DynamicSlot::Primary)
                } else if g == 0xFF {
                    Some(DynamicSlot::Secondary)
                } else {
                    None
                }
            }
            VoxelBuffer::Monochrome(records) => match records[index][1] {
                0xFF => Some(DynamicSlot::Primary),
                0xFD | 0xFE => Some(DynamicSlot::Secondary),
                _ => None,
            },
        }
    }

    pub fn set_elevation(&mut self, index: usize, elevation: u8) {
        match self {
            VoxelBuffer::FullColor(records) => records[index][0] = elevation,
            VoxelBuffer::Monochrome(records) => records[index][0] = elevation,
        }
    }

    /// Store a color. Monochrome records keep only the green component.
    pub fn set_color(&mut self, index: usize, color: [u8; 3]) {
        match self {
            VoxelBuffer::FullColor(records) => {
                records[index][1] = color[0];
                records[index][2] = color[1];
                records[index][3] = color[2];
            }
            VoxelBuffer::Monochrome(records) => records[index][1] = color[1],
        }
    }
}
