//! CPU voxel-column raymarcher: casts one ray per screen column through the
//! terrain store and paints a perspective silhouette into an RGBA raster.

pub mod bands;
pub mod pose;
pub mod raster;
pub mod raymarcher;
pub mod shear;
pub mod surface;

pub use bands::{Bands, Fog};
pub use pose::CameraPose;
pub use raster::RasterBuffer;
pub use raymarcher::{ColumnState, Raymarcher};
pub use shear::{DEFAULT_SHEAR_ROWS, ShearTable};
pub use surface::{DisplaySurface, MemorySurface, PngSurface, SurfaceError};
