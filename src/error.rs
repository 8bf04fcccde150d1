//! Error types for the `vidframes` crate.
//!
//! [`VidframesError`] is returned by every fallible operation. Setup-time
//! variants come out of [`Decoder::open`](crate::Decoder::open); per-pull
//! variants come out of [`Decoder::pull`](crate::Decoder::pull) and end the
//! frame sequence.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `vidframes` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VidframesError {
    /// The container could not be opened (bad path or unsupported format).
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::Decoder::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The container has no video stream the toolkit is willing to select.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// No decoder or encoder is available for the required codec.
    #[error("Codec unavailable: {0}")]
    CodecUnavailable(String),

    /// A codec was found but its context could not be opened.
    #[error("Failed to open codec: {0}")]
    CodecOpen(String),

    /// The resampler rejected the source/target geometry.
    #[error("Failed to configure frame conversion: {0}")]
    ConversionSetup(String),

    /// A compressed unit could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// A decoded frame could not be converted to the target layout.
    #[error("Failed to convert video frame: {0}")]
    ConversionError(String),

    /// A converted frame could not be linearized into a packed buffer.
    #[error("Failed to packetize video frame: {0}")]
    PacketizeError(String),

    /// The container failed to deliver the next compressed unit.
    ///
    /// Ordinary end of input is not an error and never surfaces here.
    #[error("Failed to read from container: {0}")]
    ReadError(String),

    /// A packed buffer did not match the geometry it was adapted to.
    #[error("Packed buffer is {actual} bytes but {expected} were expected for {width}x{height}")]
    LayoutMismatch {
        /// Buffer length that was produced.
        actual: usize,
        /// Buffer length implied by `stride × height`.
        expected: usize,
        /// Target width in pixels.
        width: u32,
        /// Target height in pixels.
        height: u32,
    },

    /// The decoder was used after [`close`](crate::Decoder::close).
    #[error("Decoder has already been closed")]
    Closed,

    /// The supplied [`DecoderOptions`](crate::DecoderOptions) cannot be honoured.
    #[error("Invalid decoder options: {0}")]
    InvalidOptions(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while writing images.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while encoding an output file.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for VidframesError {
    fn from(error: FfmpegError) -> Self {
        VidframesError::FfmpegError(error.to_string())
    }
}
