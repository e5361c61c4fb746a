//! Configuration error types.

/// Errors that can occur when loading settings or validating a tile manifest.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a settings file or manifest from disk.
    #[error("failed to read config: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to write the settings file to disk.
    #[error("failed to write config: {0}")]
    WriteError(#[source] std::io::Error),

    /// Failed to parse RON content.
    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// Failed to serialize settings to RON.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),

    /// The manifest is not valid JSON or a required field is missing.
    #[error("malformed manifest: {0}")]
    ManifestError(#[source] serde_json::Error),

    /// Tile edges must be a power of two so coordinates split by shift/mask.
    #[error("tile dimension {0} is not a power of two")]
    NonPowerOfTwoTileEdge(u32),

    /// The grid has no tiles.
    #[error("grid must have at least one row and column (got {rows}x{columns})")]
    EmptyGrid { rows: u32, columns: u32 },

    /// The vertical scalar must be finite and positive.
    #[error("invalid vertical scalar {0}")]
    InvalidVerticalScalar(f32),

    /// The tile naming template is missing a placeholder.
    #[error("tile name pattern {pattern:?} is missing {placeholder}")]
    InvalidNamePattern {
        pattern: String,
        placeholder: &'static str,
    },
}
