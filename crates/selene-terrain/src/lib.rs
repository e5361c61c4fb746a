//! Tiled, asynchronously streamed heightfield store with mip levels, point
//! mutation and animated dynamic colors.

mod dynamic_color;
mod events;
mod grid;
mod line;
mod loader;
mod mip;
mod procedural;
mod source;
mod store;
mod tile;
mod voxel;

pub use dynamic_color::{DynamicColor, DynamicPalette, DynamicSlot};
pub use events::{TileEvent, TileEventBuffer, TileLoadedCallback};
pub use grid::{Grid, Location};
pub use line::{Segment, SegmentPoints};
pub use loader::{FetchOutcome, TileLoader};
pub use mip::{MipLevel, Mips};
pub use procedural::{ProceduralParams, ProceduralSource};
pub use source::{DirectorySource, FetchError, MemorySource, TileRequest, TileSource};
pub use store::{LineColors, LineElevations, TerrainStore, TileLookup};
pub use tile::{Tile, TileCoord, TileState};
pub use voxel::{GRID_LINE_SPACING, Voxel, VoxelBuffer};
