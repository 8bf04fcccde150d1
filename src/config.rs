//! Decoder configuration.
//!
//! [`DecoderOptions`] fixes the pipeline's target geometry, resampling
//! filter and packetizer at open time. The target pixel format is always
//! packed RGBA.
//!
//! # Example
//!
//! ```no_run
//! use vidframes::{Decoder, DecoderOptions, PacketizerKind, ScalingFilter};
//!
//! let options = DecoderOptions::new()
//!     .with_resolution(Some(320), None)
//!     .with_scaling_filter(ScalingFilter::Lanczos)
//!     .with_packetizer(PacketizerKind::RawVideo);
//! let decoder = Decoder::open_with_options("input.mp4", &options)?;
//! println!("{:?}", decoder.size());
//! # Ok::<(), vidframes::VidframesError>(())
//! ```

use ffmpeg_next::software::scaling::Flags as ScalingFlags;

use crate::error::VidframesError;

/// Interpolation filter used when converting decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalingFilter {
    /// Bicubic interpolation. This is the default.
    #[default]
    Bicubic,
    /// Bilinear interpolation.
    Bilinear,
    /// Lanczos resampling.
    Lanczos,
    /// Nearest neighbour.
    Point,
    /// Area averaging.
    Area,
}

impl ScalingFilter {
    pub(crate) fn to_ffmpeg_flags(self) -> ScalingFlags {
        match self {
            ScalingFilter::Bicubic => ScalingFlags::BICUBIC,
            ScalingFilter::Bilinear => ScalingFlags::BILINEAR,
            ScalingFilter::Lanczos => ScalingFlags::LANCZOS,
            ScalingFilter::Point => ScalingFlags::POINT,
            ScalingFilter::Area => ScalingFlags::AREA,
        }
    }

    /// Parse a filter name as accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "bicubic" | "cubic" => Some(ScalingFilter::Bicubic),
            "bilinear" | "linear" => Some(ScalingFilter::Bilinear),
            "lanczos" => Some(ScalingFilter::Lanczos),
            "point" | "nearest" => Some(ScalingFilter::Point),
            "area" => Some(ScalingFilter::Area),
            _ => None,
        }
    }
}

/// How converted frames are linearized into packed buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketizerKind {
    /// Copy the converted plane row by row, dropping any line padding.
    #[default]
    Linear,
    /// Run frames through FFmpeg's `rawvideo` encoder.
    RawVideo,
}

impl PacketizerKind {
    /// Parse a packetizer name as accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "linear" => Some(PacketizerKind::Linear),
            "rawvideo" | "raw" => Some(PacketizerKind::RawVideo),
            _ => None,
        }
    }
}

/// Settings applied when a [`Decoder`](crate::Decoder) is opened.
///
/// When no dimensions are set the source resolution is used. Setting one
/// dimension together with
/// [`maintain_aspect_ratio`](DecoderOptions::maintain_aspect_ratio)
/// computes the other automatically.
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    /// Target width. `None` keeps the source width.
    pub width: Option<u32>,
    /// Target height. `None` keeps the source height.
    pub height: Option<u32>,
    /// When `true` and only one dimension is given, the other preserves the
    /// source aspect ratio.
    pub maintain_aspect_ratio: bool,
    /// Resampling filter.
    pub scaling_filter: ScalingFilter,
    /// Packetizer implementation.
    pub packetizer: PacketizerKind,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderOptions {
    /// Source resolution, bicubic filter, linear packetizer.
    pub fn new() -> Self {
        Self {
            width: None,
            height: None,
            maintain_aspect_ratio: true,
            scaling_filter: ScalingFilter::default(),
            packetizer: PacketizerKind::default(),
        }
    }

    /// Set a custom target resolution. `None` keeps the source value.
    #[must_use]
    pub fn with_resolution(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Control whether aspect ratio is preserved when only one dimension is
    /// given. Defaults to `true`.
    #[must_use]
    pub fn with_maintain_aspect_ratio(mut self, maintain: bool) -> Self {
        self.maintain_aspect_ratio = maintain;
        self
    }

    /// Set the resampling filter.
    #[must_use]
    pub fn with_scaling_filter(mut self, filter: ScalingFilter) -> Self {
        self.scaling_filter = filter;
        self
    }

    /// Set the packetizer implementation.
    #[must_use]
    pub fn with_packetizer(mut self, packetizer: PacketizerKind) -> Self {
        self.packetizer = packetizer;
        self
    }

    /// Reject explicitly requested zero dimensions.
    pub(crate) fn validate(&self) -> Result<(), VidframesError> {
        if self.width == Some(0) || self.height == Some(0) {
            return Err(VidframesError::InvalidOptions(
                "target dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the target `(width, height)` for the given source size.
    pub(crate) fn resolve_dimensions(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) if self.maintain_aspect_ratio && source_width > 0 => {
                let ratio = w as f64 / source_width as f64;
                let h = (source_height as f64 * ratio).round() as u32;
                (w, h.max(1))
            }
            (Some(w), None) => (w, source_height),
            (None, Some(h)) if self.maintain_aspect_ratio && source_height > 0 => {
                let ratio = h as f64 / source_height as f64;
                let w = (source_width as f64 * ratio).round() as u32;
                (w.max(1), h)
            }
            (None, Some(h)) => (source_width, h),
            (None, None) => (source_width, source_height),
        }
    }
}
