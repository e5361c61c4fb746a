//! Tile manifest: the JSON document describing a terrain data set.
//!
//! The manifest gives the grid shape, the tile edge and voxel layout, wrap
//! behaviour, the elevation scalar, and the template used to name tile assets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const ROW_PLACEHOLDER: &str = "${row}";
const COLUMN_PLACEHOLDER: &str = "${column}";

/// Per-voxel byte layout of a tile payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileFormat {
    /// `[elevation, red, green, blue]`.
    #[serde(rename = "eRGB8")]
    FullColor,
    /// `[elevation, white]`, white is replicated to all color channels on read.
    #[serde(rename = "eW8")]
    Monochrome,
}

impl TileFormat {
    /// Number of payload bytes per voxel.
    pub fn bytes_per_voxel(self) -> usize {
        match self {
            TileFormat::FullColor => 4,
            TileFormat::Monochrome => 2,
        }
    }
}

/// Parsed and validated tile manifest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Pixels (voxels) per degree of arc. Informational.
    #[serde(default = "default_ppd")]
    pub ppd: u32,
    /// Number of tile rows.
    pub row_count: u32,
    /// Number of tile columns.
    pub column_count: u32,
    /// Tile edge in voxels. Must be a power of two.
    pub tile_dimension: u32,
    /// Voxel byte layout.
    pub format: TileFormat,
    /// Wrap tile columns around (full planetary circumference).
    #[serde(default)]
    pub wrap_horizontally: bool,
    /// Wrap tile rows around.
    #[serde(default)]
    pub wrap_vertically: bool,
    /// Multiplier from elevation byte to world units.
    pub vertical_scalar: f32,
    /// Asset name template containing `${row}` and `${column}`.
    pub tile_name_pattern: String,
    /// Directory tile names are resolved against. Set by [`Manifest::from_path`].
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn default_ppd() -> u32 {
    64
}

impl Manifest {
    /// Parse and validate a manifest from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let manifest: Manifest = serde_json::from_str(json).map_err(ConfigError::ManifestError)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read, parse and validate a manifest file. Tile names resolve relative to
    /// the manifest's directory.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let mut manifest = Self::from_json_str(&contents)?;
        manifest.base_dir = Some(
            path.parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        );
        log::info!(
            "Loaded manifest {} ({}x{} tiles of {})",
            path.display(),
            manifest.row_count,
            manifest.column_count,
            manifest.tile_dimension
        );
        Ok(manifest)
    }

    /// Check the invariants the terrain grid relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_count == 0 || self.column_count == 0 {
            return Err(ConfigError::EmptyGrid {
                rows: self.row_count,
                columns: self.column_count,
            });
        }
        if !self.tile_dimension.is_power_of_two() {
            return Err(ConfigError::NonPowerOfTwoTileEdge(self.tile_dimension));
        }
        if !self.vertical_scalar.is_finite() || self.vertical_scalar <= 0.0 {
            return Err(ConfigError::InvalidVerticalScalar(self.vertical_scalar));
        }
        for placeholder in [ROW_PLACEHOLDER, COLUMN_PLACEHOLDER] {
            if !self.tile_name_pattern.contains(placeholder) {
                return Err(ConfigError::InvalidNamePattern {
                    pattern: self.tile_name_pattern.clone(),
                    placeholder,
                });
            }
        }
        Ok(())
    }

    /// Asset name for the tile at `(row, column)`.
    pub fn tile_name(&self, row: u32, column: u32) -> String {
        self.tile_name_pattern
            .replace(ROW_PLACEHOLDER, &row.to_string())
            .replace(COLUMN_PLACEHOLDER, &column.to_string())
    }

    /// `log2(tile_dimension)`.
    pub fn tile_shift(&self) -> u32 {
        self.tile_dimension.trailing_zeros()
    }

    /// Expected payload size of one tile in bytes.
    pub fn payload_len(&self) -> usize {
        let edge = self.tile_dimension as usize;
        edge * edge * self.format.bytes_per_voxel()
    }

    /// World extent along X in voxels.
    pub fn world_width(&self) -> u64 {
        self.column_count as u64 * self.tile_dimension as u64
    }

    /// World extent along Y in voxels.
    pub fn world_height(&self) -> u64 {
        self.row_count as u64 * self.tile_dimension as u64
    }
}
