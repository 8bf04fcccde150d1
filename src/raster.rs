//! Caller-facing raster images.
//!
//! [`FrameImageAdapter::wrap`] turns a [`PackedBuffer`] into a
//! [`RasterImage`]: a packed RGBA pixel buffer with `stride == 4 × width`
//! covering `[0, width) × [0, height)`.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use image::{ExtendedColorType, ImageFormat, RgbaImage};

use crate::convert::TARGET_BYTES_PER_PIXEL;
use crate::error::VidframesError;
use crate::packetize::PackedBuffer;

/// A decoded video frame as packed, row-major RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
}

impl RasterImage {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row (`4 × width`).
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// `(min_x, min_y, max_x, max_y)`, maxima exclusive.
    pub fn bounds(&self) -> (u32, u32, u32, u32) {
        (0, 0, self.width, self.height)
    }

    /// Pixel bytes, `stride × height` long.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA value at `(x, y)`, or `None` outside the bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride + x as usize * TARGET_BYTES_PER_PIXEL;
        let mut rgba = [0; 4];
        rgba.copy_from_slice(&self.pixels[offset..offset + TARGET_BYTES_PER_PIXEL]);
        Some(rgba)
    }

    /// Take ownership of the pixel bytes.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Convert into an [`image::RgbaImage`] without copying.
    pub fn into_rgba_image(self) -> Result<RgbaImage, VidframesError> {
        let (width, height) = (self.width, self.height);
        let actual = self.pixels.len();
        RgbaImage::from_raw(width, height, self.pixels).ok_or(VidframesError::LayoutMismatch {
            actual,
            expected: self.stride * height as usize,
            width,
            height,
        })
    }

    /// Save the image. The format is inferred from the file extension.
    ///
    /// # Errors
    ///
    /// [`VidframesError::ImageError`] for an unknown extension or an encoder
    /// failure, [`VidframesError::IoError`] if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VidframesError> {
        let path = path.as_ref();
        let format = ImageFormat::from_path(path)?;

        let mut writer = BufWriter::new(File::create(path)?);
        image::write_buffer_with_format(
            &mut writer,
            &self.pixels,
            self.width,
            self.height,
            ExtendedColorType::Rgba8,
            format,
        )?;
        writer.flush()?;
        Ok(())
    }
}

/// Wraps packed buffers into [`RasterImage`]s.
pub struct FrameImageAdapter;

impl FrameImageAdapter {
    /// Adapt `buffer` as a `width × height` RGBA image.
    ///
    /// # Errors
    ///
    /// [`VidframesError::LayoutMismatch`] if the buffer's stride is not
    /// `4 × width` or its length is not `stride × height`.
    pub fn wrap(
        buffer: PackedBuffer,
        width: u32,
        height: u32,
    ) -> Result<RasterImage, VidframesError> {
        let stride = width as usize * TARGET_BYTES_PER_PIXEL;
        let expected = stride * height as usize;
        if buffer.stride() != stride || buffer.len() != expected {
            return Err(VidframesError::LayoutMismatch {
                actual: buffer.len(),
                expected,
                width,
                height,
            });
        }

        Ok(RasterImage {
            pixels: buffer.into_data(),
            width,
            height,
            stride,
        })
    }
}
