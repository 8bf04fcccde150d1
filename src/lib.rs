//! # vidframes
//!
//! Pull decoded video frames out of media containers as packed RGBA raster
//! images, powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vidframes::Decoder;
//!
//! let mut decoder = Decoder::open("input.mp4")?;
//! loop {
//!     let pull = decoder.pull()?;
//!     if !pull.more {
//!         break;
//!     }
//!     for image in pull.images {
//!         assert_eq!(image.stride(), 4 * image.width() as usize);
//!     }
//! }
//! decoder.close()?;
//! # Ok::<(), vidframes::VidframesError>(())
//! ```
//!
//! ## How frames flow
//!
//! Each [`Decoder::pull`] reads one compressed unit from the container and
//! drives it through four stages:
//!
//! 1. **Decode**: the stream's codec turns the unit into zero or more raw
//!    frames. Units of other streams are skipped with a no-output tick.
//! 2. **Convert**: swscale resamples each frame to the target size and RGBA
//!    (bicubic by default).
//! 3. **Packetize**: each converted frame becomes a packed buffer with a
//!    stride of `4 × width`.
//! 4. **Adapt**: each buffer is wrapped as a [`RasterImage`].
//!
//! Codecs may hold frames back for reordering. Once the container runs dry
//! the decoder drains both buffering stages over the following pulls and
//! only then reports `more == false`.
//!
//! The stages are traits ([`UnitSource`], [`DecodeStage`], [`ConvertStage`],
//! [`PacketizeStage`]) so [`Pipeline`] can be driven by other backends.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod config;
pub mod convert;
pub mod decode;
pub mod decoder;
pub mod error;
pub mod ffmpeg;
pub mod packetize;
pub mod pipeline;
pub mod raster;
pub mod session;
pub mod stage;
mod utilities;

pub use config::{DecoderOptions, PacketizerKind, ScalingFilter};
pub use convert::ScaleStage;
pub use decode::VideoDecodeStage;
pub use decoder::Decoder;
pub use error::VidframesError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use packetize::{LinearPacketizer, PackedBuffer, Packetizer, RawVideoPacketizer};
pub use pipeline::{Images, Pipeline, Pull};
pub use raster::{FrameImageAdapter, RasterImage};
pub use session::{Session, StreamDescriptor};
pub use stage::{
    ConvertStage, DecodeStage, DrainState, PacketizeStage, StageState, StreamUnit, UnitSource,
};
