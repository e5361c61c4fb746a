//! Column raymarcher.
//!
//! Casts one ray per screen column across the terrain height field, stepping
//! through three distance bands of increasing stride and sampling coarser mips
//! further out. Each column is painted bottom-up: a sample only draws the rows
//! between the highest row painted so far and its own projected top, so nearer
//! terrain occludes anything behind it without a depth buffer.

use std::ops::Range;

use glam::{Vec2, Vec3};
use selene_config::RenderConfig;
use selene_terrain::{TerrainStore, Voxel};

use crate::bands::{Bands, Fog};
use crate::pose::CameraPose;
use crate::raster::{CLEAR, RasterBuffer};
use crate::shear::{DEFAULT_SHEAR_ROWS, ShearTable};
use crate::surface::{DisplaySurface, SurfaceError};

/// Horizon position as a fraction of screen height, measured from the bottom.
const HORIZON_FRACTION: f32 = 0.625;
const DEFAULT_FIELD_OF_VIEW: f32 = 1.396;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Band {
    Near,
    Mid,
    Far,
}

impl Band {
    fn step(self) -> f32 {
        match self {
            Band::Near => 0.25,
            Band::Mid => 1.0,
            Band::Far => 4.0,
        }
    }
}

/// Per-column occlusion state. Rows are counted from the bottom of the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnState {
    height: u32,
    floor: u32,
    painted: u32,
    filled: bool,
}

impl ColumnState {
    pub fn new(height: u32) -> Self {
        Self {
            height,
            floor: 0,
            painted: 0,
            filled: false,
        }
    }

    /// Offer a sample whose projection reaches row `top`. Returns the rows
    /// to paint, or `None` if the sample is hidden behind what is already
    /// drawn. A top at or past the screen height fills the column.
    pub fn accept(&mut self, top: f32) -> Option<Range<u32>> {
        if self.filled || top.is_nan() {
            return None;
        }
        let height = self.height as f32;
        let top = if top >= height {
            self.filled = true;
            height
        } else {
            top
        };
        if top < self.floor as f32 {
            return None;
        }

        let end = (top.ceil() as u32).min(self.height);
        let rows = self.floor..end;
        self.floor = self.floor.max(top as u32);
        self.painted = self.painted.max(end);
        Some(rows)
    }

    /// Lowest row a further sample may still paint.
    pub fn floor(&self) -> u32 {
        self.floor
    }

    /// One past the highest row painted.
    pub fn painted(&self) -> u32 {
        self.painted
    }

    pub fn is_filled(&self) -> bool {
        self.filled
    }
}

/// Ray state while marching one column.
struct March {
    position: Vec2,
    step: Vec2,
    step_z: f32,
    distance: f32,
    dist_z: f32,
}

impl March {
    fn advance(&mut self, stride: f32) {
        self.position += self.step * stride;
        self.dist_z += self.step_z * stride;
        self.distance += stride;
    }
}

#[derive(Debug)]
pub struct Raymarcher {
    raster: RasterBuffer,
    field_of_view: f32,
    screen_distance: f32,
    horizon_row: f32,
    bands: Bands,
    fog: Fog,
    fog_enabled: bool,
    fog_color: [u8; 3],
    grid_color: [u8; 3],
    pixel_doubling: bool,
    interpolation: bool,
    pitch: f32,
    roll: f32,
    shear: ShearTable,
    shear_row: usize,
}

impl Raymarcher {
    /// A raymarcher for a `width`×`height` raster. Zero dimensions are
    /// raised to 1.
    pub fn new(width: u32, height: u32, field_of_view: f32, maximum_roll: f32) -> Self {
        let field_of_view = if field_of_view.is_finite() && field_of_view > 0.0 {
            field_of_view
        } else {
            DEFAULT_FIELD_OF_VIEW
        };
        let maximum_roll = maximum_roll.abs();
        let width = width.max(1);
        let height = height.max(1);
        let shear = ShearTable::new(width, maximum_roll, DEFAULT_SHEAR_ROWS);
        let shear_row = shear.row_for_roll(0.0);

        let mut raymarcher = Self {
            raster: RasterBuffer::new(width, height),
            field_of_view,
            screen_distance: 0.0,
            horizon_row: 0.0,
            bands: Bands::new(0.0, 0.0, 0.0),
            fog: Fog::new(0.0, 0.0),
            fog_enabled: true,
            fog_color: [0, 0, 0],
            grid_color: [0x40, 0x40, 0x40],
            pixel_doubling: true,
            interpolation: false,
            pitch: 0.0,
            roll: 0.0,
            shear,
            shear_row,
        };
        raymarcher.update_projection(width, height);
        raymarcher
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        let mut raymarcher = Self::new(
            config.width,
            config.height,
            config.field_of_view,
            config.maximum_roll,
        );
        raymarcher.pixel_doubling = config.pixel_double;
        raymarcher.interpolation = config.interpolation;
        raymarcher.fog_enabled = config.fog;
        raymarcher.fog_color = config.fog_color;
        raymarcher.grid_color = config.grid_color;
        if let Some(bands) = config.bands {
            raymarcher.set_bands(bands.near, bands.mid, bands.far);
        }
        raymarcher
    }

    /// Derive screen distance, horizon, default bands and fog from the size.
    fn update_projection(&mut self, width: u32, height: u32) {
        self.screen_distance = (width as f32 / 2.0) / (self.field_of_view / 2.0).tan();
        self.horizon_row = (height as f32 * HORIZON_FRACTION).trunc();
        self.bands = Bands::from_screen_distance(self.screen_distance);
        self.fog = Fog::from_bands(&self.bands);
    }

    /// Reallocate the raster and rebuild everything derived from its size.
    /// Custom bands and fog are replaced by the defaults for the new size.
    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if self.raster.dimensions() == (width, height) {
            return;
        }

        self.raster = RasterBuffer::new(width, height);
        self.update_projection(width, height);
        self.shear = ShearTable::new(width, self.shear.maximum_roll(), self.shear.rows());
        self.shear_row = self.shear.row_for_roll(self.roll);
        log::debug!(
            "Raymarcher resized to {}x{} (screen distance {:.1}, bands {:?})",
            width,
            height,
            self.screen_distance,
            self.bands
        );
    }

    // --- Rendering ---

    /// Render one frame of `store` as seen from `pose`. The pose's pitch and
    /// roll replace the current ones.
    pub fn render(&mut self, store: &mut TerrainStore, pose: &CameraPose) {
        self.set_pitch(pose.pitch);
        self.set_roll(pose.roll);

        let (width, _) = self.raster.dimensions();
        let (sin, cos) = pose.yaw.sin_cos();
        let stride = if self.pixel_doubling { 2 } else { 1 };
        let center = width as f32 / 2.0;

        for column in (0..width).step_by(stride) {
            let h = column as f32 - center + 0.5;
            let direction = Vec2::new(
                h * cos + self.screen_distance * sin,
                h * sin - self.screen_distance * cos,
            );
            let magnitude = direction.length();
            let shear = self.shear.row(self.shear_row)[column as usize];
            let march = March {
                position: pose.position.truncate(),
                step: direction / magnitude,
                step_z: self.screen_distance / magnitude,
                distance: 0.0,
                dist_z: 0.0,
            };
            self.march_column(store, pose.position, column, march, shear);
        }
    }

    fn march_column(
        &mut self,
        store: &mut TerrainStore,
        eye: Vec3,
        column: u32,
        mut march: March,
        shear: f32,
    ) {
        let height = self.raster.height();
        let base = shear + self.horizon_row + self.pitch;
        let mut state = ColumnState::new(height);

        'bands: for (band, limit) in [
            (Band::Near, self.bands.near),
            (Band::Mid, self.bands.mid),
            (Band::Far, self.bands.far),
        ] {
            while march.distance < limit {
                march.advance(band.step());

                let mut fog_weight = 0.0;
                if band == Band::Far && self.fog_enabled {
                    fog_weight = self.fog.weight(march.distance);
                    if fog_weight >= 1.0 {
                        break 'bands;
                    }
                }

                let (x, y) = (march.position.x, march.position.y);
                let voxel = match band {
                    Band::Near if self.interpolation => store.sample_bilinear(x, y),
                    Band::Near => store.sample(x, y),
                    Band::Mid => store.sample4(x, y),
                    Band::Far => store.sample16(x, y),
                };

                let top = (voxel.elevation - eye.z) / march.dist_z + base;
                let Some(rows) = state.accept(top) else {
                    continue;
                };

                let mut color = self.voxel_color(&voxel);
                if fog_weight > 0.0 {
                    color = Fog::blend(color, self.fog_color, fog_weight);
                }
                self.paint(column, rows, [color[0], color[1], color[2], 0xFF]);

                if state.is_filled() {
                    break 'bands;
                }
            }
        }

        if !state.is_filled() {
            self.paint(column, state.painted()..height, CLEAR);
        }
    }

    fn voxel_color(&self, voxel: &Voxel) -> [u8; 3] {
        if voxel.unloaded && voxel.grid_line {
            self.grid_color
        } else {
            voxel.color
        }
    }

    fn paint(&mut self, column: u32, rows: Range<u32>, rgba: [u8; 4]) {
        self.raster.fill_rows_from_bottom(column, rows.clone(), rgba);
        if self.pixel_doubling {
            self.raster.fill_rows_from_bottom(column + 1, rows, rgba);
        }
    }

    /// Hand the current raster to `surface`.
    pub fn present(&self, surface: &mut dyn DisplaySurface) -> Result<(), SurfaceError> {
        surface.present(&self.raster)
    }

    // --- Settings ---

    /// Set band boundaries and reset fog to the last fifth of the far band.
    pub fn set_bands(&mut self, near: f32, mid: f32, far: f32) {
        self.bands = Bands::new(near, mid, far);
        self.fog = Fog::from_bands(&self.bands);
    }

    pub fn set_fog(&mut self, fog: Fog) {
        self.fog = fog;
    }

    pub fn set_fog_enabled(&mut self, enabled: bool) {
        self.fog_enabled = enabled;
    }

    pub fn set_fog_color(&mut self, color: [u8; 3]) {
        self.fog_color = color;
    }

    pub fn set_grid_color(&mut self, color: [u8; 3]) {
        self.grid_color = color;
    }

    pub fn set_pixel_doubling(&mut self, enabled: bool) {
        self.pixel_doubling = enabled;
    }

    /// Bilinear sampling in the near band.
    pub fn set_interpolation(&mut self, enabled: bool) {
        self.interpolation = enabled;
    }

    /// Vertical horizon offset in pixels.
    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = if pitch.is_finite() { pitch } else { 0.0 };
    }

    /// Roll in radians, clamped to the maximum roll.
    pub fn set_roll(&mut self, roll: f32) {
        let maximum = self.shear.maximum_roll();
        self.roll = if roll.is_finite() {
            roll.clamp(-maximum, maximum)
        } else {
            0.0
        };
        self.shear_row = self.shear.row_for_roll(self.roll);
    }

    // --- Accessors ---

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    /// Projection distance to the screen plane, in pixels.
    pub fn screen_distance(&self) -> f32 {
        self.screen_distance
    }

    /// Horizon row counted from the bottom, before pitch and roll.
    pub fn horizon_row(&self) -> f32 {
        self.horizon_row
    }

    pub fn bands(&self) -> Bands {
        self.bands
    }

    pub fn fog(&self) -> Fog {
        self.fog
    }

    pub fn fog_enabled(&self) -> bool {
        self.fog_enabled
    }

    pub fn fog_color(&self) -> [u8; 3] {
        self.fog_color
    }

    pub fn grid_color(&self) -> [u8; 3] {
        self.grid_color
    }

    pub fn pixel_doubling(&self) -> bool {
        self.pixel_doubling
    }

    pub fn interpolation(&self) -> bool {
        self.interpolation
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn roll(&self) -> f32 {
        self.roll
    }

    pub fn maximum_roll(&self) -> f32 {
        self.shear.maximum_roll()
    }

    /// Shear table row selected by the current roll.
    pub fn shear_row(&self) -> usize {
        self.shear_row
    }

    pub fn raster(&self) -> &RasterBuffer {
        &self.raster
    }

    pub fn raster_mut(&mut self) -> &mut RasterBuffer {
        &mut self.raster
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use selene_config::Manifest;
    use selene_terrain::{MemorySource, TileLoader};

    use super::*;
    use crate::surface::MemorySurface;

    const EDGE: u32 = 4;

    /// A grid of flat tiles with edge 4 and vertical scalar 1.
    fn flat_grid(rows: u32, columns: u32, elevation: u8, color: [u8; 3]) -> TerrainStore {
        let manifest = Manifest::from_json_str(&format!(
            r#"{{
                "rowCount": {rows},
                "columnCount": {columns},
                "tileDimension": {EDGE},
                "format": "eRGB8",
                "verticalScalar": 1.0,
                "tileNamePattern": "t_${{row}}_${{column}}.bin"
            }}"#
        ))
        .unwrap();
        let mut store = TerrainStore::configure(
            manifest,
            TileLoader::inline(Arc::new(MemorySource::default())),
        )
        .unwrap();

        let payload: Vec<u8> = (0..EDGE * EDGE)
            .flat_map(|_| [elevation, color[0], color[1], color[2]])
            .collect();
        for row in 0..rows {
            for column in 0..columns {
                store.install_tile(row, column, &payload).unwrap();
            }
        }
        store
    }

    /// 16 voxels wide and 32 deep, room for far-band samples.
    fn flat_store(elevation: u8, color: [u8; 3]) -> TerrainStore {
        flat_grid(8, 4, elevation, color)
    }

    fn empty_store() -> TerrainStore {
        let manifest = Manifest::from_json_str(
            r#"{
                "rowCount": 2,
                "columnCount": 2,
                "tileDimension": 32,
                "format": "eRGB8",
                "verticalScalar": 1.0,
                "tileNamePattern": "t_${row}_${column}.bin"
            }"#,
        )
        .unwrap();
        TerrainStore::configure(
            manifest,
            TileLoader::inline(Arc::new(MemorySource::default())),
        )
        .unwrap()
    }

    /// A 2×64 raymarcher with small bands, fog off the end of the far band.
    fn narrow_raymarcher() -> Raymarcher {
        let mut raymarcher = Raymarcher::new(2, 64, DEFAULT_FIELD_OF_VIEW, 0.35);
        raymarcher.set_pixel_doubling(false);
        raymarcher.set_bands(1.0, 2.0, 4.0);
        raymarcher.set_fog(Fog::new(3.0, 1.0));
        raymarcher
    }

    fn column_step_z(raymarcher: &Raymarcher, column: u32) -> f32 {
        let h = column as f32 - raymarcher.width() as f32 / 2.0 + 0.5;
        let sd = raymarcher.screen_distance();
        sd / (h * h + sd * sd).sqrt()
    }

    #[test]
    fn test_defaults_follow_size() {
        let raymarcher = Raymarcher::new(320, 200, DEFAULT_FIELD_OF_VIEW, 0.35);
        let sd = 160.0 / (DEFAULT_FIELD_OF_VIEW / 2.0).tan();

        assert!((raymarcher.screen_distance() - sd).abs() < 1e-3);
        assert_eq!(raymarcher.horizon_row(), 125.0);
        assert_eq!(raymarcher.bands(), Bands::from_screen_distance(raymarcher.screen_distance()));
        assert_eq!(raymarcher.fog(), Fog::from_bands(&raymarcher.bands()));
        assert_eq!(raymarcher.shear_row(), DEFAULT_SHEAR_ROWS / 2);
        assert!(raymarcher.pixel_doubling());
        assert!(raymarcher.fog_enabled());
        assert!(!raymarcher.interpolation());
    }

    #[test]
    fn test_from_config() {
        let config = RenderConfig {
            width: 64,
            height: 48,
            bands: Some(selene_config::BandConfig {
                near: 5.0,
                mid: 10.0,
                far: 60.0,
            }),
            fog_color: [1, 2, 3],
            ..Default::default()
        };
        let raymarcher = Raymarcher::from_config(&config);

        assert_eq!(raymarcher.raster().dimensions(), (64, 48));
        assert_eq!(raymarcher.bands(), Bands::new(5.0, 10.0, 60.0));
        assert_eq!(raymarcher.fog(), Fog::new(50.0, 10.0));
        assert_eq!(raymarcher.fog_color(), [1, 2, 3]);
        assert!(raymarcher.pixel_doubling());
        assert!(raymarcher.fog_enabled());
    }

    #[test]
    fn test_two_by_two_flat_terrain() {
        let color = [0x80, 0x60, 0x40];
        let mut store = flat_grid(2, 2, 10, color);
        let mut raymarcher = narrow_raymarcher();

        let pose = CameraPose::new(Vec3::new(4.0, 4.0, 20.0), 0.0);
        raymarcher.render(&mut store, &pose);

        // The last drawn sample is the mid-band one at distance 2; the far
        // band starts at distance 6, already past the fog.
        let top = (10.0 - 20.0) / (2.0 * column_step_z(&raymarcher, 0)) + 40.0;
        let painted = top.ceil() as u32;
        assert_eq!(painted, 35);

        let raster = raymarcher.raster();
        for column in 0..2 {
            for row in 0..painted {
                assert_eq!(
                    raster.pixel_from_bottom(column, row),
                    [0x80, 0x60, 0x40, 0xFF],
                    "column {column} row {row}"
                );
            }
            for row in painted..64 {
                assert_eq!(raster.pixel_from_bottom(column, row), CLEAR);
            }
        }
    }

    #[test]
    fn test_far_band_fog_blends_then_stops() {
        let mut store = flat_store(10, [100, 200, 50]);
        let mut raymarcher = narrow_raymarcher();
        raymarcher.set_bands(1.0, 2.0, 20.0);
        raymarcher.set_fog(Fog::new(10.0, 5.0));

        let pose = CameraPose::new(Vec3::new(8.0, 30.0, 20.0), 0.0);
        raymarcher.render(&mut store, &pose);

        // Far samples at 6 and 10 are unfogged, 14 is 80% fog, 18 ends the ray.
        let raster = raymarcher.raster();
        assert_eq!(raster.pixel_from_bottom(0, 37), [100, 200, 50, 0xFF]);
        assert_eq!(raster.pixel_from_bottom(0, 38), [20, 40, 10, 0xFF]);
        assert_eq!(raster.pixel_from_bottom(0, 39), [20, 40, 10, 0xFF]);
        assert_eq!(raster.pixel_from_bottom(0, 40), CLEAR);
    }

    #[test]
    fn test_fog_disabled_marches_whole_far_band() {
        // 32 voxels wide: the last far sample at distance 22 stays on the grid.
        let mut store = flat_grid(8, 8, 10, [100, 200, 50]);
        let mut raymarcher = narrow_raymarcher();
        raymarcher.set_bands(1.0, 2.0, 20.0);
        raymarcher.set_fog(Fog::new(10.0, 5.0));
        raymarcher.set_fog_enabled(false);

        let pose = CameraPose::new(Vec3::new(16.0, 30.0, 20.0), 0.0);
        raymarcher.render(&mut store, &pose);

        let raster = raymarcher.raster();
        for column in 0..2 {
            assert_eq!(raster.pixel_from_bottom(column, 39), [100, 200, 50, 0xFF]);
            assert_eq!(raster.pixel_from_bottom(column, 40), CLEAR);
        }
    }

    #[test]
    fn test_off_grid_far_sample_paints_placeholder() {
        let mut store = flat_store(10, [100, 200, 50]);
        let mut raymarcher = narrow_raymarcher();
        raymarcher.set_bands(1.0, 2.0, 20.0);
        raymarcher.set_fog_enabled(false);

        // Column 0 leaves the 16-voxel-wide grid at x < 0 on its last sample
        // (distance 22, local voxel (15, 9), off the grid lines). Its
        // elevation-zero top still reaches the partially painted row 39.
        let pose = CameraPose::new(Vec3::new(8.0, 30.0, 20.0), 0.0);
        raymarcher.render(&mut store, &pose);

        let raster = raymarcher.raster();
        assert_eq!(raster.pixel_from_bottom(0, 38), [100, 200, 50, 0xFF]);
        assert_eq!(raster.pixel_from_bottom(0, 39), [0, 0, 0, 0xFF]);
        assert_eq!(raster.pixel_from_bottom(0, 40), CLEAR);
    }

    #[test]
    fn test_terrain_above_eye_fills_column() {
        let mut store = flat_store(10, [9, 8, 7]);
        let mut raymarcher = narrow_raymarcher();
        raymarcher.raster_mut().fill_rows_from_bottom(0, 0..64, [1, 1, 1, 1]);

        let pose = CameraPose::new(Vec3::new(8.0, 30.0, 0.0), 0.0);
        raymarcher.render(&mut store, &pose);

        let raster = raymarcher.raster();
        for row in 0..64 {
            assert_eq!(raster.pixel_from_bottom(0, row), [9, 8, 7, 0xFF]);
        }
    }

    #[test]
    fn test_stale_rows_cleared() {
        let mut store = flat_store(10, [9, 8, 7]);
        let mut raymarcher = narrow_raymarcher();
        raymarcher.raster_mut().fill_rows_from_bottom(0, 0..64, [1, 1, 1, 1]);

        let pose = CameraPose::new(Vec3::new(8.0, 30.0, 20.0), 0.0);
        raymarcher.render(&mut store, &pose);

        assert_eq!(raymarcher.raster().pixel_from_bottom(0, 63), CLEAR);
    }

    #[test]
    fn test_pixel_doubling_copies_column() {
        let mut store = flat_store(10, [0x80, 0x60, 0x40]);
        let mut raymarcher = narrow_raymarcher();
        raymarcher.set_pixel_doubling(true);
        raymarcher.raster_mut().fill_rows_from_bottom(1, 0..64, [1, 1, 1, 1]);

        let pose = CameraPose::new(Vec3::new(8.0, 30.0, 20.0), 0.0);
        raymarcher.render(&mut store, &pose);

        let raster = raymarcher.raster();
        for row in 0..64 {
            assert_eq!(raster.pixel_from_bottom(1, row), raster.pixel_from_bottom(0, row));
        }
        assert_eq!(raster.pixel_from_bottom(1, 0), [0x80, 0x60, 0x40, 0xFF]);
    }

    #[test]
    fn test_pitch_raises_horizon() {
        let mut store = flat_store(10, [9, 8, 7]);
        let mut raymarcher = narrow_raymarcher();

        let pose = CameraPose::new(Vec3::new(8.0, 30.0, 20.0), 0.0).with_pitch(5.0);
        raymarcher.render(&mut store, &pose);

        assert_eq!(raymarcher.pitch(), 5.0);
        // 34.58 + 5 reaches row 39.
        assert_eq!(raymarcher.raster().pixel_from_bottom(0, 39), [9, 8, 7, 0xFF]);
        assert_eq!(raymarcher.raster().pixel_from_bottom(0, 40), CLEAR);
    }

    #[test]
    fn test_roll_clamped_to_maximum() {
        let mut raymarcher = Raymarcher::new(16, 16, DEFAULT_FIELD_OF_VIEW, 0.35);
        raymarcher.set_roll(2.0);
        assert_eq!(raymarcher.roll(), 0.35);
        assert_eq!(raymarcher.shear_row(), DEFAULT_SHEAR_ROWS - 1);

        raymarcher.set_roll(-2.0);
        assert_eq!(raymarcher.shear_row(), 0);

        raymarcher.set_roll(f32::NAN);
        assert_eq!(raymarcher.roll(), 0.0);
        assert_eq!(raymarcher.shear_row(), DEFAULT_SHEAR_ROWS / 2);
    }

    #[test]
    fn test_render_applies_pose_roll() {
        let mut store = flat_store(10, [9, 8, 7]);
        let mut raymarcher = narrow_raymarcher();
        let pose = CameraPose::new(Vec3::new(8.0, 30.0, 20.0), 0.0).with_roll(0.35);
        raymarcher.render(&mut store, &pose);
        assert_eq!(raymarcher.shear_row(), DEFAULT_SHEAR_ROWS - 1);
    }

    #[test]
    fn test_placeholder_colors() {
        let mut raymarcher = Raymarcher::new(4, 4, DEFAULT_FIELD_OF_VIEW, 0.0);
        raymarcher.set_grid_color([5, 6, 7]);

        assert_eq!(raymarcher.voxel_color(&Voxel::placeholder(0, 3)), [5, 6, 7]);
        assert_eq!(raymarcher.voxel_color(&Voxel::placeholder(3, 3)), [0, 0, 0]);
    }

    #[test]
    fn test_unloaded_terrain_draws_only_placeholders() {
        let mut store = empty_store();
        let mut raymarcher = Raymarcher::new(8, 32, DEFAULT_FIELD_OF_VIEW, 0.0);
        raymarcher.set_grid_color([5, 6, 7]);
        raymarcher.set_fog_enabled(false);

        let pose = CameraPose::new(Vec3::new(8.5, 20.5, 10.0), 0.0);
        raymarcher.render(&mut store, &pose);

        for pixel in raymarcher.raster().as_bytes().chunks_exact(4) {
            assert!(
                pixel == [5, 6, 7, 0xFF] || pixel == [0, 0, 0, 0xFF] || pixel == CLEAR,
                "unexpected pixel {pixel:?}"
            );
        }
    }

    #[test]
    fn test_column_floor_never_decreases() {
        let mut state = ColumnState::new(100);
        let mut seed = 12345u32;
        let mut last_floor = 0;

        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let top = (seed >> 16) as f32 / 65536.0 * 90.0 - 10.0;
            if let Some(rows) = state.accept(top) {
                assert!(rows.start >= last_floor);
                assert!(rows.end <= 100);
            }
            assert!(state.floor() >= last_floor);
            assert!(state.painted() >= state.floor());
            last_floor = state.floor();
        }
        assert!(!state.is_filled());
    }

    #[test]
    fn test_column_state_occlusion() {
        let mut state = ColumnState::new(10);
        assert_eq!(state.accept(-1.0), None);
        assert_eq!(state.accept(3.5), Some(0..4));
        assert_eq!(state.floor(), 3);
        assert_eq!(state.accept(2.0), None);
        assert_eq!(state.accept(f32::NAN), None);
        assert_eq!(state.accept(12.0), Some(3..10));
        assert!(state.is_filled());
        assert_eq!(state.painted(), 10);
        assert_eq!(state.accept(15.0), None);
    }

    #[test]
    fn test_resize_rebuilds_projection() {
        let mut raymarcher = Raymarcher::new(64, 40, DEFAULT_FIELD_OF_VIEW, 0.35);
        raymarcher.set_bands(1.0, 2.0, 3.0);
        raymarcher.set_roll(0.35);
        raymarcher.resize(128, 80);

        assert_eq!(raymarcher.raster().dimensions(), (128, 80));
        assert_eq!(raymarcher.horizon_row(), 50.0);
        assert_eq!(raymarcher.bands(), Bands::from_screen_distance(raymarcher.screen_distance()));
        assert_eq!(raymarcher.shear_row(), DEFAULT_SHEAR_ROWS - 1);

        raymarcher.resize(0, 0);
        assert_eq!(raymarcher.raster().dimensions(), (1, 1));
    }

    #[test]
    fn test_present_hands_raster_to_surface() {
        let mut store = flat_store(10, [9, 8, 7]);
        let mut raymarcher = narrow_raymarcher();
        raymarcher.render(&mut store, &CameraPose::new(Vec3::new(8.0, 30.0, 20.0), 0.0));

        let mut surface = MemorySurface::new();
        raymarcher.present(&mut surface).unwrap();
        assert_eq!(surface.frame_count(), 1);
        assert_eq!(surface.last_frame(), Some(raymarcher.raster()));
    }
}
