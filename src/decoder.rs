//! The FFmpeg-backed [`Decoder`].
//!
//! `Decoder` is the main entry point of the crate. It opens a container,
//! selects its best video stream and assembles a [`Pipeline`] of FFmpeg
//! stages that emits one packed RGBA [`RasterImage`] per presentable frame.
//!
//! # Example
//!
//! ```no_run
//! use vidframes::Decoder;
//!
//! let mut decoder = Decoder::open("input.mp4")?;
//! let (width, height) = decoder.size();
//! println!("{width}x{height}, about {} frames", decoder.frame_count());
//!
//! let mut index = 0;
//! loop {
//!     let pull = decoder.pull()?;
//!     if !pull.more {
//!         break;
//!     }
//!     for image in pull.images {
//!         image.save(format!("out/{index}.png"))?;
//!         index += 1;
//!     }
//! }
//! decoder.close()?;
//! # Ok::<(), vidframes::VidframesError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;

use crate::config::DecoderOptions;
use crate::convert::ScaleStage;
use crate::decode::VideoDecodeStage;
use crate::error::VidframesError;
use crate::packetize::Packetizer;
use crate::pipeline::{Pipeline, Pull};
use crate::raster::RasterImage;
use crate::session::{Session, StreamDescriptor};
use crate::stage::DrainState;

/// Pulls decoded frames out of a media file as raster images.
///
/// Created via [`Decoder::open`] or [`Decoder::open_with_options`]. Call
/// [`pull`](Decoder::pull) until it reports `more == false`, then
/// [`close`](Decoder::close). Dropping an unclosed decoder releases its
/// resources in the same order `close` does.
pub struct Decoder {
    pipeline: Pipeline<Session, VideoDecodeStage, ScaleStage, Packetizer>,
    descriptor: StreamDescriptor,
    width: u32,
    height: u32,
}

impl Debug for Decoder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Decoder")
            .field("descriptor", &self.descriptor)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("drain_state", &self.pipeline.drain_state())
            .field("closed", &self.pipeline.is_closed())
            .finish_non_exhaustive()
    }
}

impl Decoder {
    /// Open `path` with default options: source resolution, bicubic
    /// resampling, linear packetizer.
    ///
    /// # Errors
    ///
    /// - [`VidframesError::FileOpen`] if the container cannot be opened.
    /// - [`VidframesError::NoVideoStream`] if it has no usable video stream.
    /// - [`VidframesError::CodecUnavailable`] / [`VidframesError::CodecOpen`]
    ///   if a codec cannot be found or opened.
    /// - [`VidframesError::ConversionSetup`] if the resampler rejects the
    ///   geometry.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VidframesError> {
        Self::open_with_options(path, &DecoderOptions::default())
    }

    /// Open `path` with custom [`DecoderOptions`].
    ///
    /// Everything acquired before a failure is released before returning.
    ///
    /// # Errors
    ///
    /// As [`open`](Decoder::open), plus [`VidframesError::InvalidOptions`].
    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        options: &DecoderOptions,
    ) -> Result<Self, VidframesError> {
        options.validate()?;

        let session = Session::open(path)?;
        let descriptor = session.descriptor().clone();

        let decode = VideoDecodeStage::new(session.video_parameters()?, descriptor.index)?;
        let (width, height) = options.resolve_dimensions(decode.width(), decode.height());

        let convert = ScaleStage::new(
            decode.format(),
            decode.width(),
            decode.height(),
            width,
            height,
            options.scaling_filter,
        )?;
        let packetize = Packetizer::new(options.packetizer, width, height)?;

        log::debug!(
            "Decoder ready: stream {} -> {width}x{height} RGBA ({:?}, {:?} packetizer)",
            descriptor.index,
            options.scaling_filter,
            options.packetizer,
        );

        let pipeline = Pipeline::new(
            session,
            decode,
            convert,
            packetize,
            descriptor.index,
            width,
            height,
        );

        Ok(Self {
            pipeline,
            descriptor,
            width,
            height,
        })
    }

    /// Target `(width, height)` of every produced image.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Frame count declared by the container.
    ///
    /// Advisory only: may be `0` or differ from the number of images
    /// actually produced.
    pub fn frame_count(&self) -> u64 {
        self.descriptor.frame_count
    }

    /// Metadata of the selected video stream.
    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    /// Current drain progress.
    pub fn drain_state(&self) -> DrainState {
        self.pipeline.drain_state()
    }

    /// Returns `true` after [`close`](Decoder::close).
    pub fn is_closed(&self) -> bool {
        self.pipeline.is_closed()
    }

    /// Produce the next batch of images.
    ///
    /// # Errors
    ///
    /// [`VidframesError::ReadError`], [`VidframesError::VideoDecodeError`],
    /// [`VidframesError::ConversionError`] or
    /// [`VidframesError::PacketizeError`] end the sequence.
    /// [`VidframesError::Closed`] after [`close`](Decoder::close).
    pub fn pull(&mut self) -> Result<Pull, VidframesError> {
        self.pipeline.pull()
    }

    /// Iterate over every remaining image.
    ///
    /// ```no_run
    /// use vidframes::Decoder;
    ///
    /// let mut decoder = Decoder::open("input.mp4")?;
    /// for (index, image) in decoder.images().enumerate() {
    ///     image?.save(format!("frame_{index:06}.png"))?;
    /// }
    /// # Ok::<(), vidframes::VidframesError>(())
    /// ```
    pub fn images(&mut self) -> impl Iterator<Item = Result<RasterImage, VidframesError>> + '_ {
        self.pipeline.images()
    }

    /// Release all FFmpeg resources.
    ///
    /// # Errors
    ///
    /// [`VidframesError::Closed`] if called more than once.
    pub fn close(&mut self) -> Result<(), VidframesError> {
        log::debug!("Closing decoder for stream {}", self.descriptor.index);
        self.pipeline.close()
    }
}
