//! Packetize stage: converted frames to packed buffers.
//!
//! Two implementations share the [`PacketizeStage`] contract:
//!
//! - [`LinearPacketizer`] copies the converted RGBA plane row by row into a
//!   tightly packed buffer. It buffers nothing; its state tag only tracks
//!   the drain handshake.
//! - [`RawVideoPacketizer`] drives FFmpeg's `rawvideo` encoder, which emits
//!   the same packed layout as packets and has the usual send/receive/flush
//!   cycle.
//!
//! [`Packetizer`] selects between them at open time.

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    encoder::video::Encoder as VideoEncoder,
    frame::Video as VideoFrame,
    util::error::EAGAIN,
};

use crate::config::PacketizerKind;
use crate::convert::{TARGET_BYTES_PER_PIXEL, TARGET_PIXEL_FORMAT};
use crate::error::VidframesError;
use crate::stage::{PacketizeStage, StageState};

/// A contiguous row-major byte buffer with a known stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBuffer {
    data: Vec<u8>,
    stride: usize,
}

impl PackedBuffer {
    /// Wrap `data` whose rows are `stride` bytes apart.
    pub fn new(data: Vec<u8>, stride: usize) -> Self {
        Self { data, stride }
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take ownership of the raw bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

fn refuse_after_done(state: StageState, frames: usize) -> Result<(), VidframesError> {
    if state.is_done() && frames > 0 {
        return Err(VidframesError::PacketizeError(format!(
            "{frames} frame(s) fed after drain completed"
        )));
    }
    Ok(())
}

/// Copies converted frames into packed buffers.
pub struct LinearPacketizer {
    width: u32,
    height: u32,
    state: StageState,
}

impl LinearPacketizer {
    /// Packetizer for RGBA frames of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            state: StageState::Ready,
        }
    }

    fn linearize(&self, frame: &VideoFrame) -> Result<PackedBuffer, VidframesError> {
        if frame.format() != TARGET_PIXEL_FORMAT
            || frame.width() != self.width
            || frame.height() != self.height
        {
            return Err(VidframesError::PacketizeError(format!(
                "expected {TARGET_PIXEL_FORMAT:?} {}x{}, got {:?} {}x{}",
                self.width,
                self.height,
                frame.format(),
                frame.width(),
                frame.height(),
            )));
        }

        let data =
            crate::utilities::frame_to_buffer(frame, self.width, self.height, TARGET_BYTES_PER_PIXEL)
                .ok_or_else(|| {
                    VidframesError::PacketizeError("frame plane shorter than its geometry".to_string())
                })?;
        Ok(PackedBuffer::new(
            data,
            self.width as usize * TARGET_BYTES_PER_PIXEL,
        ))
    }
}

impl PacketizeStage for LinearPacketizer {
    type Frame = VideoFrame;

    fn feed(
        &mut self,
        frames: Vec<VideoFrame>,
        drain: bool,
    ) -> Result<Vec<PackedBuffer>, VidframesError> {
        refuse_after_done(self.state, frames.len())?;
        if drain {
            self.state.begin_drain();
        }

        let no_input = frames.is_empty();
        let buffers = frames
            .iter()
            .map(|frame| self.linearize(frame))
            .collect::<Result<Vec<_>, _>>()?;

        if no_input {
            self.state.settle(buffers.len());
        }
        Ok(buffers)
    }

    fn state(&self) -> StageState {
        self.state
    }
}

/// Packs converted frames through FFmpeg's `rawvideo` encoder.
///
/// End of stream is signalled to the encoder on the first drained call that
/// carries no frames, so frames still arriving from a draining decoder are
/// accepted until then.
pub struct RawVideoPacketizer {
    encoder: VideoEncoder,
    stride: usize,
    next_pts: i64,
    eof_sent: bool,
    state: StageState,
}

impl RawVideoPacketizer {
    /// Open a `rawvideo` encoder for RGBA frames of the given size.
    ///
    /// # Errors
    ///
    /// [`VidframesError::CodecUnavailable`] if FFmpeg was built without the
    /// encoder, [`VidframesError::CodecOpen`] if it cannot be opened.
    pub fn new(width: u32, height: u32) -> Result<Self, VidframesError> {
        let codec = ffmpeg_next::encoder::find(Id::RAWVIDEO).ok_or_else(|| {
            VidframesError::CodecUnavailable("rawvideo encoder not available".to_string())
        })?;

        let mut encoder = CodecContext::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|error| VidframesError::CodecOpen(format!("rawvideo: {error}")))?;
        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(TARGET_PIXEL_FORMAT);
        encoder.set_time_base(Rational::new(1, 1));

        // Some builds flag rawvideo as experimental for non-native formats.
        unsafe {
            (*encoder.as_mut_ptr()).strict_std_compliance =
                ffmpeg_sys_next::FF_COMPLIANCE_EXPERIMENTAL as i32;
        }

        let encoder = encoder
            .open_as(codec)
            .map_err(|error| VidframesError::CodecOpen(format!("rawvideo: {error}")))?;

        Ok(Self {
            encoder,
            stride: width as usize * TARGET_BYTES_PER_PIXEL,
            next_pts: 0,
            eof_sent: false,
            state: StageState::Ready,
        })
    }

    fn receive_into(&mut self, buffers: &mut Vec<PackedBuffer>) -> Result<(), VidframesError> {
        loop {
            let mut packet = Packet::empty();
            match self.encoder.receive_packet(&mut packet) {
                Ok(()) => {
                    let data = packet.data().map(<[u8]>::to_vec).unwrap_or_default();
                    buffers.push(PackedBuffer::new(data, self.stride));
                }
                Err(FfmpegError::Eof) => return Ok(()),
                Err(FfmpegError::Other { errno }) if errno == EAGAIN => return Ok(()),
                Err(error) => return Err(VidframesError::PacketizeError(error.to_string())),
            }
        }
    }
}

impl PacketizeStage for RawVideoPacketizer {
    type Frame = VideoFrame;

    fn feed(
        &mut self,
        frames: Vec<VideoFrame>,
        drain: bool,
    ) -> Result<Vec<PackedBuffer>, VidframesError> {
        refuse_after_done(self.state, frames.len())?;
        if self.eof_sent && !frames.is_empty() {
            return Err(VidframesError::PacketizeError(
                "frames fed after encoder flush".to_string(),
            ));
        }
        if drain {
            self.state.begin_drain();
        }

        let no_input = frames.is_empty();
        let mut buffers = Vec::with_capacity(frames.len());
        for mut frame in frames {
            frame.set_pts(Some(self.next_pts));
            self.next_pts += 1;
            self.encoder
                .send_frame(&frame)
                .map_err(|error| VidframesError::PacketizeError(error.to_string()))?;
            self.receive_into(&mut buffers)?;
        }

        if no_input && self.state == StageState::Draining && !self.eof_sent {
            self.encoder
                .send_eof()
                .map_err(|error| VidframesError::PacketizeError(error.to_string()))?;
            self.eof_sent = true;
            self.receive_into(&mut buffers)?;
        }

        if no_input {
            self.state.settle(buffers.len());
        }
        Ok(buffers)
    }

    fn state(&self) -> StageState {
        self.state
    }
}

/// The packetizer selected by [`PacketizerKind`].
pub enum Packetizer {
    /// See [`LinearPacketizer`].
    Linear(LinearPacketizer),
    /// See [`RawVideoPacketizer`].
    RawVideo(RawVideoPacketizer),
}

impl Packetizer {
    /// Build the packetizer of the given kind for RGBA frames of the given size.
    pub fn new(kind: PacketizerKind, width: u32, height: u32) -> Result<Self, VidframesError> {
        Ok(match kind {
            PacketizerKind::Linear => Packetizer::Linear(LinearPacketizer::new(width, height)),
            PacketizerKind::RawVideo => {
                Packetizer::RawVideo(RawVideoPacketizer::new(width, height)?)
            }
        })
    }
}

impl PacketizeStage for Packetizer {
    type Frame = VideoFrame;

    fn feed(
        &mut self,
        frames: Vec<VideoFrame>,
        drain: bool,
    ) -> Result<Vec<PackedBuffer>, VidframesError> {
        match self {
            Packetizer::Linear(stage) => stage.feed(frames, drain),
            Packetizer::RawVideo(stage) => stage.feed(frames, drain),
        }
    }

    fn state(&self) -> StageState {
        match self {
            Packetizer::Linear(stage) => stage.state(),
            Packetizer::RawVideo(stage) => stage.state(),
        }
    }
}
