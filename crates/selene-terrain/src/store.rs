//! The terrain store: tile array, on-demand loading, sampling and mutation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use selene_config::{ConfigError, Manifest, TerrainConfig};

use crate::dynamic_color::{DynamicPalette, DynamicSlot};
use crate::events::{TileEvent, TileEventBuffer, TileListeners, TileLoadedCallback};
use crate::grid::Grid;
use crate::line::{Segment, SegmentPoints};
use crate::loader::{FetchOutcome, TileLoader, default_thread_count};
use crate::mip::MipLevel;
use crate::source::{DirectorySource, FetchError, TileRequest};
use crate::tile::{RawSample, Tile, TileCoord, TileSlot, TileState};
use crate::voxel::{Voxel, VoxelBuffer};

/// Result of [`TerrainStore::tile_at`].
#[derive(Debug)]
pub enum TileLookup<'a> {
    Loaded(&'a Tile),
    /// A fetch is outstanding (or was just requested).
    Pending,
    OutOfRange,
}

/// Owns the tile grid and answers voxel queries.
///
/// Single-threaded: fetches run on the loader's workers, but every tile state
/// transition happens in [`poll_loads`](Self::poll_loads) on the owning thread.
#[derive(Debug)]
pub struct TerrainStore {
    manifest: Manifest,
    grid: Grid,
    tiles: Vec<TileSlot>,
    loader: TileLoader,
    palette: DynamicPalette,
    events: TileEventBuffer,
    listeners: TileListeners,
}

impl TerrainStore {
    /// Validate `manifest` and allocate an all-`Unloaded` grid.
    pub fn configure(manifest: Manifest, loader: TileLoader) -> Result<Self, ConfigError> {
        manifest.validate()?;
        let grid = Grid::from_manifest(&manifest);
        let mut tiles = Vec::with_capacity(grid.tile_count());
        tiles.resize_with(grid.tile_count(), TileSlot::default);

        tracing::info!(
            rows = grid.rows,
            columns = grid.columns,
            edge = grid.edge,
            format = ?grid.format,
            "terrain store configured"
        );

        Ok(Self {
            manifest,
            grid,
            tiles,
            loader,
            palette: DynamicPalette::default(),
            events: TileEventBuffer::new(),
            listeners: TileListeners::default(),
        })
    }

    /// Read the manifest at `path` and stream tiles from its directory.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        let manifest = Manifest::from_path(path)?;
        let source = DirectorySource::new(manifest.base_dir.clone().unwrap_or_default());
        Self::configure(manifest, TileLoader::with_defaults(Arc::new(source)))
    }

    /// Open the configured manifest with the configured loader size and palette.
    pub fn from_config(config: &TerrainConfig) -> Result<Self, ConfigError> {
        let manifest = Manifest::from_path(&config.manifest_path)?;
        let source = DirectorySource::new(manifest.base_dir.clone().unwrap_or_default());
        let threads = match config.fetch_threads {
            0 => default_thread_count(),
            n => n as usize,
        };
        let loader = TileLoader::new(Arc::new(source), threads, config.max_in_flight as usize);

        let mut store = Self::configure(manifest, loader)?;
        store.palette = DynamicPalette::from_config(config);
        Ok(store)
    }

    // --- Tile lifecycle ---

    /// Look up a tile by raw grid position, requesting it if unloaded.
    pub fn tile_at(&mut self, row: u32, column: u32) -> TileLookup<'_> {
        if !self.grid.contains(row, column) {
            return TileLookup::OutOfRange;
        }
        let index = self.touch(TileCoord::new(row, column));
        match &self.tiles[index] {
            TileSlot::Loaded(tile) => TileLookup::Loaded(tile),
            TileSlot::Loading | TileSlot::Unloaded => TileLookup::Pending,
        }
    }

    /// Request `coord` if it is unloaded. Returns its index.
    fn touch(&mut self, coord: TileCoord) -> usize {
        let index = self.grid.index(coord);
        if matches!(self.tiles[index], TileSlot::Unloaded) {
            let request = TileRequest {
                coord,
                name: self.manifest.tile_name(coord.row, coord.column),
            };
            match self.loader.submit(request) {
                Ok(()) => {
                    tracing::trace!(%coord, "tile requested");
                    self.tiles[index] = TileSlot::Loading;
                }
                Err(_) => tracing::trace!(%coord, "loader saturated, tile stays unloaded"),
            }
        }
        index
    }

    /// Apply every completed fetch. Returns the number of tiles that loaded.
    pub fn poll_loads(&mut self) -> usize {
        let outcomes = self.loader.drain_results();
        self.apply_outcomes(outcomes)
    }

    /// Block up to `timeout` for at least one completion, then apply all
    /// available ones. Returns the number of tiles that loaded.
    pub fn wait_for_loads(&mut self, timeout: Duration) -> usize {
        let outcomes = self.loader.wait_for_results(timeout);
        self.apply_outcomes(outcomes)
    }

    fn apply_outcomes(&mut self, outcomes: Vec<FetchOutcome>) -> usize {
        outcomes
            .into_iter()
            .map(|outcome| self.complete(outcome))
            .filter(|&loaded| loaded)
            .count()
    }

    fn complete(&mut self, outcome: FetchOutcome) -> bool {
        let coord = outcome.coord;
        if !self.grid.contains(coord.row, coord.column) {
            return false;
        }
        let index = self.grid.index(coord);
        if !matches!(self.tiles[index], TileSlot::Loading) {
            tracing::debug!(%coord, "ignoring completion for tile that is not loading");
            return false;
        }

        let (format, edge) = (self.grid.format, self.grid.edge);
        let decoded = outcome
            .result
            .and_then(|bytes| VoxelBuffer::from_payload(format, &bytes, edge));

        match decoded {
            Ok(buffer) => {
                tracing::debug!(%coord, fetch_time_us = outcome.fetch_time_us, "tile loaded");
                self.finish_load(coord, buffer);
                true
            }
            Err(err) => {
                tracing::warn!(%coord, %err, "tile fetch failed, will retry");
                self.tiles[index] = TileSlot::Unloaded;
                self.events.send(TileEvent::Failed {
                    coord,
                    reason: err.to_string(),
                });
                false
            }
        }
    }

    fn finish_load(&mut self, coord: TileCoord, buffer: VoxelBuffer) {
        let index = self.grid.index(coord);
        self.tiles[index] = TileSlot::Loaded(Box::new(Tile::new(coord, buffer, self.grid.edge)));
        self.events.send(TileEvent::Loaded(coord));
        self.listeners.notify(coord);
    }

    /// Complete a tile synchronously from an in-memory payload.
    pub fn install_tile(&mut self, row: u32, column: u32, bytes: &[u8]) -> Result<(), FetchError> {
        let coord = TileCoord::new(row, column);
        if !self.grid.contains(row, column) {
            return Err(FetchError::OutOfGrid(coord));
        }
        let buffer = VoxelBuffer::from_payload(self.grid.format, bytes, self.grid.edge)?;
        self.finish_load(coord, buffer);
        Ok(())
    }

    /// Per-frame update: retire the events of two frames ago, apply finished
    /// fetches, then advance the dynamic colors.
    pub fn tick(&mut self, now_millis: u64) {
        self.events.swap();
        self.poll_loads();
        self.palette.update(now_millis);
    }

    // --- Sampling ---

    /// Full-resolution voxel at world `(x, y)`.
    pub fn sample(&mut self, x: f32, y: f32) -> Voxel {
        self.sample_level(x, y, MipLevel::Full)
    }

    /// Voxel from the 4×4 mip.
    pub fn sample4(&mut self, x: f32, y: f32) -> Voxel {
        self.sample_level(x, y, MipLevel::Mip4)
    }

    /// Voxel from the 16×16 mip.
    pub fn sample16(&mut self, x: f32, y: f32) -> Voxel {
        self.sample_level(x, y, MipLevel::Mip16)
    }

    fn sample_level(&mut self, x: f32, y: f32, level: MipLevel) -> Voxel {
        let location = self.grid.locate(x, y);
        let Some(coord) = location.tile else {
            return Voxel::placeholder(location.local_x, location.local_y);
        };
        let index = self.touch(coord);
        match &self.tiles[index] {
            TileSlot::Loaded(tile) => {
                self.resolve(tile.read(level, location.local_x, location.local_y))
            }
            _ => Voxel::placeholder(location.local_x, location.local_y),
        }
    }

    fn resolve(&self, raw: RawSample) -> Voxel {
        let (color, dynamic) = match raw.sentinel {
            Some(slot) => (self.palette.color(slot), true),
            None => (raw.color, false),
        };
        Voxel {
            elevation: raw.elevation as f32 * self.grid.vertical_scalar,
            color,
            dynamic,
            unloaded: false,
            grid_line: false,
        }
    }

    /// Bilinear blend of the four full-resolution neighbours around `(x, y)`.
    pub fn sample_bilinear(&mut self, x: f32, y: f32) -> Voxel {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;

        let v00 = self.sample(x0, y0);
        let v10 = self.sample(x0 + 1.0, y0);
        let v01 = self.sample(x0, y0 + 1.0);
        let v11 = self.sample(x0 + 1.0, y0 + 1.0);

        let mix = |a: f32, b: f32, c: f32, d: f32| {
            (1.0 - fy) * ((1.0 - fx) * a + fx * b) + fy * ((1.0 - fx) * c + fx * d)
        };
        let neighbours = [v00, v10, v01, v11];

        Voxel {
            elevation: mix(v00.elevation, v10.elevation, v01.elevation, v11.elevation),
            color: std::array::from_fn(|c| {
                let [a, b, cc, d] = neighbours.map(|v| v.color[c] as f32);
                mix(a, b, cc, d).round() as u8
            }),
            dynamic: neighbours.iter().any(|v| v.dynamic),
            unloaded: neighbours.iter().any(|v| v.unloaded),
            grid_line: v00.unloaded && v00.grid_line,
        }
    }

    /// `count` evenly spaced elevations from `(x0, y0)` to `(x1, y1)` inclusive.
    pub fn sample_line_elevations(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        count: usize,
    ) -> LineElevations<'_> {
        LineElevations {
            store: self,
            points: Segment::new(x0, y0, x1, y1, count).points(),
        }
    }

    /// `count` evenly spaced RGBA colors from `(x0, y0)` to `(x1, y1)` inclusive.
    pub fn sample_line_colors(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        count: usize,
    ) -> LineColors<'_> {
        LineColors {
            store: self,
            points: Segment::new(x0, y0, x1, y1, count).points(),
        }
    }

    // --- Mutation ---

    /// Blend `color` into the voxel at `(x, y)`. Returns `false` if its tile
    /// is not loaded.
    pub fn mutate_color(&mut self, x: f32, y: f32, color: [u8; 3], alpha: u8) -> bool {
        self.mutate(x, y, |tile, lx, ly| tile.blend_color(lx, ly, color, alpha))
    }

    /// Blend an elevation byte into the voxel at `(x, y)`. Returns `false` if
    /// its tile is not loaded.
    pub fn mutate_elevation(&mut self, x: f32, y: f32, elevation: u8, alpha: u8) -> bool {
        self.mutate(x, y, |tile, lx, ly| {
            tile.blend_elevation(lx, ly, elevation, alpha)
        })
    }

    fn mutate(&mut self, x: f32, y: f32, apply: impl FnOnce(&mut Tile, u32, u32)) -> bool {
        let location = self.grid.locate(x, y);
        let Some(coord) = location.tile else {
            return false;
        };
        let index = self.touch(coord);
        match &mut self.tiles[index] {
            TileSlot::Loaded(tile) => {
                apply(tile, location.local_x, location.local_y);
                true
            }
            _ => false,
        }
    }

    // --- Dynamic colors ---

    pub fn set_dynamic_color_slot(
        &mut self,
        slot: DynamicSlot,
        min: [u8; 3],
        max: [u8; 3],
        period_seconds: f32,
    ) {
        self.palette.set_slot(slot, min, max, period_seconds);
    }

    /// Current color of `slot` as of the last [`tick`](Self::tick).
    pub fn dynamic_color(&self, slot: DynamicSlot) -> [u8; 3] {
        self.palette.color(slot)
    }

    pub fn palette(&self) -> &DynamicPalette {
        &self.palette
    }

    // --- Notifications ---

    /// Replace the tile-loaded callback.
    pub fn set_tile_loaded_callback(&mut self, callback: impl FnMut(TileCoord) + 'static) {
        self.listeners.set_callback(Box::new(callback));
    }

    /// Register an additional tile-loaded listener.
    pub fn add_tile_loaded_listener(&mut self, listener: impl FnMut(TileCoord) + 'static) {
        self.listeners.add(Box::new(listener) as TileLoadedCallback);
    }

    pub fn events(&self) -> &TileEventBuffer {
        &self.events
    }

    /// Advance the event buffer by one frame. [`tick`](Self::tick) does this
    /// itself; call it directly only when driving `poll_loads` by hand.
    pub fn swap_events(&mut self) {
        self.events.swap();
    }

    // --- Coordinates ---

    pub fn normalize_x(&self, x: f32) -> f32 {
        self.grid.normalize_x(x)
    }

    pub fn normalize_y(&self, y: f32) -> f32 {
        self.grid.normalize_y(y)
    }

    pub fn longitude_of(&self, x: f64) -> f64 {
        self.grid.longitude_of(x)
    }

    pub fn x_for_longitude(&self, longitude: f64) -> f64 {
        self.grid.x_for_longitude(longitude)
    }

    pub fn latitude_of(&self, y: f64) -> f64 {
        self.grid.latitude_of(y)
    }

    pub fn y_for_latitude(&self, latitude: f64) -> f64 {
        self.grid.y_for_latitude(latitude)
    }

    // --- Introspection ---

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn tile_state(&self, row: u32, column: u32) -> Option<TileState> {
        self.grid
            .contains(row, column)
            .then(|| self.tiles[self.grid.index(TileCoord::new(row, column))].state())
    }

    /// Shared handle to a loaded tile's current voxels.
    pub fn tile_snapshot(&self, row: u32, column: u32) -> Option<Arc<VoxelBuffer>> {
        if !self.grid.contains(row, column) {
            return None;
        }
        match &self.tiles[self.grid.index(TileCoord::new(row, column))] {
            TileSlot::Loaded(tile) => Some(tile.snapshot()),
            _ => None,
        }
    }

    pub fn loaded_tile_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|slot| matches!(slot, TileSlot::Loaded(_)))
            .count()
    }

    pub fn in_flight_count(&self) -> u64 {
        self.loader.in_flight_count()
    }

    pub fn vertical_scalar(&self) -> f32 {
        self.grid.vertical_scalar
    }

    pub fn ppd(&self) -> u32 {
        self.grid.ppd
    }
}

/// Lazy elevations along a segment. See [`TerrainStore::sample_line_elevations`].
pub struct LineElevations<'a> {
    store: &'a mut TerrainStore,
    points: SegmentPoints,
}

impl Iterator for LineElevations<'_> {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let (x, y) = self.points.next()?;
        Some(self.store.sample(x, y).elevation)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.points.size_hint()
    }
}

/// Lazy RGBA colors along a segment. See [`TerrainStore::sample_line_colors`].
pub struct LineColors<'a> {
    store: &'a mut TerrainStore,
    points: SegmentPoints,
}

impl Iterator for LineColors<'_> {
    type Item = [u8; 4];

    fn next(&mut self) -> Option<[u8; 4]> {
        let (x, y) = self.points.next()?;
        Some(self.store.sample(x, y).rgba())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.points.size_hint()
    }
}
