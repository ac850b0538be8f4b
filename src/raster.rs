//! # Raster Buffer & Surface Capture
//!
//! The rendered document arrives as one RGB8 pixel buffer produced by an
//! external renderer behind the [`SurfaceCapture`] port. The core never
//! draws; it only crops horizontal bands out of this buffer and re-encodes
//! them into artifacts.

use std::io::Cursor;

use crate::error::{RapportError, Result};

/// A row-major RGB8 pixel buffer of known dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    /// Wrap an RGB8 buffer. Rejects zero dimensions and length mismatches
    /// up front so downstream cropping can assume a well-formed buffer.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RapportError::InvalidRaster(format!(
                "zero dimension: {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(RapportError::InvalidRaster(format!(
                "buffer is {} bytes, expected {} for {}x{} RGB",
                pixels.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A single-color raster. Mostly useful for capture fakes in tests.
    pub fn solid(width: u32, height: u32, rgb: (u8, u8, u8)) -> Result<Self> {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..width as usize * height as usize {
            pixels.extend_from_slice(&[rgb.0, rgb.1, rgb.2]);
        }
        Self::from_rgb(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The raw bytes of the full-width horizontal band starting at row `y`,
    /// `rows` rows tall. Clamped to the buffer.
    pub fn band(&self, y: u32, rows: u32) -> &[u8] {
        let y = y.min(self.height);
        let end = y.saturating_add(rows).min(self.height);
        let stride = self.width as usize * 3;
        &self.pixels[y as usize * stride..end as usize * stride]
    }

    /// Encode the whole buffer as a PNG, the raster-image export artifact.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let img: image::RgbImage =
            image::ImageBuffer::from_raw(self.width, self.height, self.pixels.clone())
                .ok_or_else(|| {
                    RapportError::InvalidRaster("buffer length mismatch".to_string())
                })?;
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageOutputFormat::Png)?;
        Ok(buf.into_inner())
    }
}

/// What the capture collaborator is asked to render.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureOptions {
    pub include_cover_page: bool,
    pub include_table_of_contents: bool,
}

/// Port to the external renderer: one shot, whole document, one raster.
/// Must complete before pagination begins.
pub trait SurfaceCapture {
    fn capture(&self, options: &CaptureOptions) -> Result<Raster>;
}
