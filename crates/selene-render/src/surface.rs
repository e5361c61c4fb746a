//! Display surfaces a finished raster is presented to.

use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};

use crate::raster::RasterBuffer;

/// Errors from presenting a frame.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
    #[error("raster of {width}x{height} does not match its pixel data")]
    InvalidRaster { width: u32, height: u32 },
}

/// Receives each finished frame.
pub trait DisplaySurface {
    fn present(&mut self, raster: &RasterBuffer) -> Result<(), SurfaceError>;
}

/// Keeps a copy of the last presented frame. For headless hosts and tests.
#[derive(Debug, Default)]
pub struct MemorySurface {
    last_frame: Option<RasterBuffer>,
    frames: u64,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&RasterBuffer> {
        self.last_frame.as_ref()
    }

    /// Number of frames presented so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

impl DisplaySurface for MemorySurface {
    fn present(&mut self, raster: &RasterBuffer) -> Result<(), SurfaceError> {
        match &mut self.last_frame {
            Some(frame) if frame.dimensions() == raster.dimensions() => frame.clone_from(raster),
            slot => *slot = Some(raster.clone()),
        }
        self.frames += 1;
        Ok(())
    }
}

/// Writes every presented frame to a PNG file, overwriting the previous one.
#[derive(Debug)]
pub struct PngSurface {
    path: PathBuf,
    frames: u64,
}

impl PngSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frames: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

impl DisplaySurface for PngSurface {
    fn present(&mut self, raster: &RasterBuffer) -> Result<(), SurfaceError> {
        let (width, height) = raster.dimensions();
        let image = RgbaImage::from_raw(width, height, raster.as_bytes().to_vec())
            .ok_or(SurfaceError::InvalidRaster { width, height })?;
        image.save_with_format(&self.path, ImageFormat::Png)?;

        self.frames += 1;
        log::debug!("Wrote frame {} to {}", self.frames, self.path.display());
        Ok(())
    }
}
