//! Settings structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Raymarcher settings.
    pub render: RenderConfig,
    /// Terrain store and tile streaming settings.
    pub terrain: TerrainConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Raymarcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// Horizontal field of view in radians.
    pub field_of_view: f32,
    /// Largest roll the shear table covers, in radians.
    pub maximum_roll: f32,
    /// Cast every second column and duplicate it.
    pub pixel_double: bool,
    /// Blend the far band toward the fog color.
    pub fog: bool,
    /// Fog color (RGB).
    pub fog_color: [u8; 3],
    /// Bilinear sampling in the near band.
    pub interpolation: bool,
    /// Color painted for the grid lines of unloaded tiles.
    pub grid_color: [u8; 3],
    /// Explicit band boundaries. `None` derives them from the field of view.
    pub bands: Option<BandConfig>,
}

/// Explicit near/mid/far band boundaries in world units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BandConfig {
    pub near: f32,
    pub mid: f32,
    pub far: f32,
}

/// Terrain store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Path of the JSON tile manifest.
    pub manifest_path: PathBuf,
    /// Tile fetch worker threads (0 = one per spare core).
    pub fetch_threads: u32,
    /// Maximum queued tile fetches.
    pub max_in_flight: u32,
    /// Dynamic color slot 0 (red sentinel).
    pub dynamic_primary: DynamicColorConfig,
    /// Dynamic color slot 1 (green sentinel).
    pub dynamic_secondary: DynamicColorConfig,
}

/// One oscillating dynamic color.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DynamicColorConfig {
    pub min: [u8; 3],
    pub max: [u8; 3],
    pub period_seconds: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Directory for JSON log files in debug builds.
    pub log_dir: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 400,
            field_of_view: 1.396,
            maximum_roll: 0.35,
            pixel_double: true,
            fog: true,
            fog_color: [0, 0, 0],
            interpolation: false,
            grid_color: [0x40, 0x40, 0x40],
            bands: None,
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("terrain/manifest.json"),
            fetch_threads: 0,
            max_in_flight: 64,
            dynamic_primary: DynamicColorConfig {
                min: [0x33, 0x00, 0x00],
                max: [0xFF, 0x00, 0x00],
                period_seconds: 2.0,
            },
            dynamic_secondary: DynamicColorConfig {
                min: [0x00, 0x33, 0x00],
                max: [0x00, 0xFF, 0x00],
                period_seconds: 2.0,
            },
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("width: 640"));
        assert!(ron_str.contains("max_in_flight: 64"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.render.bands = Some(BandConfig {
            near: 10.0,
            mid: 100.0,
            far: 400.0,
        });
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let config: Config = ron::from_str("(render: ())").unwrap();
        assert_eq!(config.terrain, TerrainConfig::default());
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.render.width = 1280;
        config.render.pixel_double = false;
        config.terrain.manifest_path = PathBuf::from("moon/manifest.json");

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.render.fog = false;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(!result.unwrap().render.fog);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}
