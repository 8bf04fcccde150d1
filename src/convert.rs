//! FFmpeg-backed convert stage.
//!
//! [`ScaleStage`] wraps an swscale context configured once with the source
//! geometry and the fixed RGBA target. Frames whose geometry differs from
//! the configured source are rejected.

use ffmpeg_next::{
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::Context as ScalingContext,
};

use crate::config::ScalingFilter;
use crate::error::VidframesError;
use crate::stage::ConvertStage;

/// Pixel format every converted frame is delivered in.
pub const TARGET_PIXEL_FORMAT: Pixel = Pixel::RGBA;

/// Bytes per pixel of [`TARGET_PIXEL_FORMAT`].
pub const TARGET_BYTES_PER_PIXEL: usize = 4;

/// Resamples decoded frames into the target size and RGBA.
pub struct ScaleStage {
    scaler: ScalingContext,
}

impl ScaleStage {
    /// Configure a resampler from `(source_format, source_width, source_height)`
    /// to `(target_width, target_height)` RGBA.
    ///
    /// # Errors
    ///
    /// Returns [`VidframesError::ConversionSetup`] if swscale rejects the
    /// configuration (unknown source format, zero dimensions).
    pub fn new(
        source_format: Pixel,
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        filter: ScalingFilter,
    ) -> Result<Self, VidframesError> {
        let scaler = ScalingContext::get(
            source_format,
            source_width,
            source_height,
            TARGET_PIXEL_FORMAT,
            target_width,
            target_height,
            filter.to_ffmpeg_flags(),
        )
        .map_err(|error| {
            VidframesError::ConversionSetup(format!(
                "{source_format:?} {source_width}x{source_height} -> \
                 {TARGET_PIXEL_FORMAT:?} {target_width}x{target_height}: {error}"
            ))
        })?;

        Ok(Self { scaler })
    }
}

impl ConvertStage for ScaleStage {
    type Input = VideoFrame;
    type Output = VideoFrame;

    fn transform(&mut self, frames: Vec<VideoFrame>) -> Result<Vec<VideoFrame>, VidframesError> {
        frames
            .into_iter()
            .map(|frame| {
                let mut converted = VideoFrame::empty();
                self.scaler
                    .run(&frame, &mut converted)
                    .map_err(|error| VidframesError::ConversionError(error.to_string()))?;
                converted.set_pts(frame.pts());
                Ok(converted)
            })
            .collect()
    }
}
