//! Tile grid geometry: world coordinate to tile mapping, wrapping, and
//! geographic helpers.

use selene_config::{Manifest, TileFormat};

use crate::tile::TileCoord;

/// Grid shape and voxel layout derived from a validated manifest.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    pub rows: u32,
    pub columns: u32,
    /// Tile edge in voxels (power of two).
    pub edge: u32,
    /// `log2(edge)`.
    pub shift: u32,
    /// `edge - 1`.
    pub mask: u32,
    pub wrap_horizontally: bool,
    pub wrap_vertically: bool,
    /// Elevation byte to world units.
    pub vertical_scalar: f32,
    pub format: TileFormat,
    /// Voxels per degree of arc.
    pub ppd: u32,
}

/// Where a world coordinate falls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    /// Owning tile, `None` outside a non-wrapping grid.
    pub tile: Option<TileCoord>,
    pub local_x: u32,
    pub local_y: u32,
}

impl Grid {
    /// Build from a manifest that has passed [`Manifest::validate`].
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            rows: manifest.row_count,
            columns: manifest.column_count,
            edge: manifest.tile_dimension,
            shift: manifest.tile_shift(),
            mask: manifest.tile_dimension - 1,
            wrap_horizontally: manifest.wrap_horizontally,
            wrap_vertically: manifest.wrap_vertically,
            vertical_scalar: manifest.vertical_scalar,
            format: manifest.format,
            ppd: manifest.ppd,
        }
    }

    pub fn tile_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    pub fn contains(&self, row: u32, column: u32) -> bool {
        row < self.rows && column < self.columns
    }

    /// Row-major index of an in-range tile.
    pub fn index(&self, coord: TileCoord) -> usize {
        coord.row as usize * self.columns as usize + coord.column as usize
    }

    pub fn coord_of(&self, index: usize) -> TileCoord {
        let columns = self.columns as usize;
        TileCoord::new((index / columns) as u32, (index % columns) as u32)
    }

    /// Map a world position to its tile and local voxel.
    pub fn locate(&self, x: f32, y: f32) -> Location {
        let ix = x.floor() as i64;
        let iy = y.floor() as i64;
        let column = wrap_axis(ix >> self.shift, self.columns, self.wrap_horizontally);
        let row = wrap_axis(iy >> self.shift, self.rows, self.wrap_vertically);

        Location {
            tile: row.zip(column).map(|(row, column)| TileCoord::new(row, column)),
            local_x: (ix & self.mask as i64) as u32,
            local_y: (iy & self.mask as i64) as u32,
        }
    }

    /// World extent along X in voxels.
    pub fn total_width(&self) -> f64 {
        self.columns as f64 * self.edge as f64
    }

    /// World extent along Y in voxels.
    pub fn total_height(&self) -> f64 {
        self.rows as f64 * self.edge as f64
    }

    /// Wrap `x` into the world when the grid wraps horizontally, otherwise
    /// clamp it to `[0, width - 1]`.
    pub fn normalize_x(&self, x: f32) -> f32 {
        normalize(x, self.total_width() as f32, self.wrap_horizontally)
    }

    /// Vertical counterpart of [`normalize_x`](Self::normalize_x).
    pub fn normalize_y(&self, y: f32) -> f32 {
        normalize(y, self.total_height() as f32, self.wrap_vertically)
    }

    /// Longitude in `[0, 360)` degrees. The world's left edge is 180°.
    pub fn longitude_of(&self, x: f64) -> f64 {
        norm360(x / self.total_width() * 360.0 + 180.0)
    }

    pub fn x_for_longitude(&self, longitude: f64) -> f64 {
        norm360(longitude - 180.0) / 360.0 * self.total_width()
    }

    /// Latitude in degrees, positive north of the world's middle row.
    pub fn latitude_of(&self, y: f64) -> f64 {
        (self.total_height() / 2.0 - y) / self.total_width() * 360.0
    }

    pub fn y_for_latitude(&self, latitude: f64) -> f64 {
        -latitude / 360.0 * self.total_width() + self.total_height() / 2.0
    }
}

fn wrap_axis(index: i64, count: u32, wrap: bool) -> Option<u32> {
    if wrap {
        Some(index.rem_euclid(count as i64) as u32)
    } else if (0..count as i64).contains(&index) {
        Some(index as u32)
    } else {
        None
    }
}

fn normalize(value: f32, extent: f32, wrap: bool) -> f32 {
    if wrap {
        let wrapped = value.rem_euclid(extent);
        // rem_euclid can round up to `extent` for tiny negative inputs.
        if wrapped >= extent { 0.0 } else { wrapped }
    } else {
        value.clamp(0.0, extent - 1.0)
    }
}

fn norm360(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}
