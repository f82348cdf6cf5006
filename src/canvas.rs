// src/canvas.rs

//! RGBA pixel buffers: the target image and the evolving string canvas.
//!
//! A `PixelBuffer` is a flat `width * height * 4` byte vector in RGBA
//! order. The coordinator and every evaluator worker hold their own copy;
//! buffers are compared byte-for-byte in tests, so all writes must go
//! through the same blending path.

use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::FilterType;

use crate::color::Rgba;

/// An owned RGBA raster, `width * height * 4` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Creates a buffer of the given dimensions filled with one color.
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&color.channels());
        }
        PixelBuffer {
            width,
            height,
            data,
        }
    }

    /// Converts a decoded image into a buffer of the given dimensions.
    ///
    /// The source is scaled to cover the full canvas while preserving its
    /// aspect ratio, then center-cropped, so the shorter image dimension
    /// always spans the canvas.
    pub fn from_image(image: &image::DynamicImage, width: u32, height: u32) -> Self {
        let resized = image.resize_to_fill(width, height, FilterType::Lanczos3);
        PixelBuffer {
            width,
            height,
            data: resized.to_rgba8().into_raw(),
        }
    }

    /// Loads an image file and converts it via [`PixelBuffer::from_image`].
    pub fn open(path: &Path, width: u32, height: u32) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to open image {}", path.display()))?;
        Ok(Self::from_image(&image, width, height))
    }

    /// Buffer width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw RGBA bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the raw RGBA bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Reads one pixel. Panics when `(x, y)` is outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        assert!(x < self.width && y < self.height);
        let i = ((y * self.width + x) * 4) as usize;
        Rgba::new(self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3])
    }

    /// Writes the buffer to `path` as a PNG.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        image::save_buffer(
            path,
            &self.data,
            self.width,
            self.height,
            image::ColorType::Rgba8,
        )
        .with_context(|| format!("Failed to write PNG {}", path.display()))
    }
}
