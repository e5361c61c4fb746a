//! Configuration for Selene.
//!
//! Two independent documents live here: the JSON tile manifest that describes a
//! terrain data set, and the RON settings file that controls rendering, tile
//! streaming and diagnostics. Both fail with [`ConfigError`].

mod config;
mod error;
mod manifest;

pub use config::{
    BandConfig, Config, DebugConfig, DynamicColorConfig, RenderConfig, TerrainConfig,
};
pub use error::ConfigError;
pub use manifest::{Manifest, TileFormat};
