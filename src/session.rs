//! Container session and video stream selection.
//!
//! A [`Session`] owns the opened FFmpeg demuxer. At open time it asks FFmpeg
//! for the best video stream and records that stream's metadata as an
//! immutable [`StreamDescriptor`]. Afterwards it only hands out compressed
//! units, of every stream, in container order.

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational, codec::Parameters, format::Pixel,
    format::context::Input, media::Type,
};

use crate::decode::open_video_decoder;
use crate::error::VidframesError;
use crate::stage::{StreamUnit, UnitSource};

/// Read-only metadata about the selected video stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct StreamDescriptor {
    /// Index of the stream inside the container.
    pub index: usize,
    /// Declared frame count. Advisory only: may be `0` or inaccurate.
    pub frame_count: u64,
    /// Source width in pixels.
    pub width: u32,
    /// Source height in pixels.
    pub height: u32,
    /// Source pixel format.
    pub pixel_format: Pixel,
    /// Stream time base.
    pub time_base: Rational,
    /// Average frames per second, `0.0` when the container does not say.
    pub frames_per_second: f64,
    /// Codec name (e.g. `"h264"`).
    pub codec: String,
}

/// An open container with exactly one designated video stream.
pub struct Session {
    input: Input,
    descriptor: StreamDescriptor,
    path: PathBuf,
}

impl Session {
    /// Open the container at `path` and select its best video stream.
    ///
    /// # Errors
    ///
    /// - [`VidframesError::FileOpen`] if the container cannot be opened.
    /// - [`VidframesError::NoVideoStream`] if no video stream qualifies.
    /// - [`VidframesError::CodecUnavailable`] / [`VidframesError::CodecOpen`]
    ///   if the stream's decoder cannot be probed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VidframesError> {
        let path = path.as_ref().to_path_buf();
        crate::ffmpeg::initialize()?;

        log::debug!("Opening container: {}", path.display());
        let input = ffmpeg_next::format::input(&path).map_err(|error| VidframesError::FileOpen {
            path: path.clone(),
            reason: error.to_string(),
        })?;

        let descriptor = describe_best_video_stream(&input)?;
        log::debug!(
            "Selected video stream {} ({} {}x{} {:?}, ~{} frames)",
            descriptor.index,
            descriptor.codec,
            descriptor.width,
            descriptor.height,
            descriptor.pixel_format,
            descriptor.frame_count,
        );

        Ok(Self {
            input,
            descriptor,
            path,
        })
    }

    /// Metadata of the selected video stream.
    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    /// Codec parameters of the selected video stream.
    pub(crate) fn video_parameters(&self) -> Result<Parameters, VidframesError> {
        self.input
            .stream(self.descriptor.index)
            .map(|stream| stream.parameters())
            .ok_or(VidframesError::NoVideoStream)
    }
}

impl UnitSource for Session {
    type Unit = Packet;

    fn next_unit(&mut self) -> Result<Option<Packet>, VidframesError> {
        let mut packet = Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) => Ok(Some(packet)),
            Err(FfmpegError::Eof) => Ok(None),
            Err(error) => Err(VidframesError::ReadError(error.to_string())),
        }
    }
}

impl StreamUnit for Packet {
    fn stream_index(&self) -> usize {
        self.stream()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        log::debug!("Closing container: {}", self.path.display());
    }
}

fn describe_best_video_stream(input: &Input) -> Result<StreamDescriptor, VidframesError> {
    let stream = input
        .streams()
        .best(Type::Video)
        .ok_or(VidframesError::NoVideoStream)?;

    let parameters = stream.parameters();
    let codec = parameters.id().name().to_string();
    let probe = open_video_decoder(parameters)?;

    let frame_rate = stream.avg_frame_rate();
    let frames_per_second = if frame_rate.denominator() != 0 {
        frame_rate.numerator() as f64 / frame_rate.denominator() as f64
    } else {
        0.0
    };

    let time_base = stream.time_base();
    let declared = stream.frames();
    let frame_count = if declared > 0 {
        declared as u64
    } else {
        let seconds = if stream.duration() > 0 {
            crate::utilities::pts_to_seconds(stream.duration(), time_base)
        } else {
            input.duration().max(0) as f64 / 1_000_000.0
        };
        crate::utilities::estimate_frame_count(seconds, frames_per_second)
    };

    Ok(StreamDescriptor {
        index: stream.index(),
        frame_count,
        width: probe.width(),
        height: probe.height(),
        pixel_format: probe.format(),
        time_base,
        frames_per_second,
        codec,
    })
}
