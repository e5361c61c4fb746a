//! CPU-writable RGBA raster the raymarcher paints into.

use std::ops::Range;

/// Transparent background.
pub const CLEAR: [u8; 4] = [0, 0, 0, 0];

/// Row-major RGBA8 pixels, row 0 at the top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    /// Length = `width * height * 4`.
    pixels: Vec<u8>,
}

impl RasterBuffer {
    /// A fully transparent raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let offset = self.offset(x, y);
        self.pixels[offset..offset + 4].copy_from_slice(&rgba);
    }

    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = self.offset(x, y);
        let mut rgba = [0; 4];
        rgba.copy_from_slice(&self.pixels[offset..offset + 4]);
        rgba
    }

    /// Pixel in column `x`, `row` counted up from the bottom edge.
    pub fn pixel_from_bottom(&self, x: u32, row: u32) -> [u8; 4] {
        self.pixel(x, self.height - 1 - row)
    }

    /// Paint `rows` (counted up from the bottom edge) of column `x`. Rows past
    /// the top are ignored.
    pub fn fill_rows_from_bottom(&mut self, x: u32, rows: Range<u32>, rgba: [u8; 4]) {
        if x >= self.width {
            return;
        }
        for row in rows.start..rows.end.min(self.height) {
            self.set_pixel(x, self.height - 1 - row, rgba);
        }
    }

    /// Reset every pixel to [`CLEAR`].
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }
}
