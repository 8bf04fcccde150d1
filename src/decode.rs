//! FFmpeg-backed decode stage.

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::{Parameters, context::Context as CodecContext},
    decoder::Video as VideoDecoder,
    frame::Video as VideoFrame,
    util::error::EAGAIN,
};

use crate::error::VidframesError;
use crate::stage::{DecodeStage, StageState};

/// Open a video decoder for the given stream parameters.
pub(crate) fn open_video_decoder(parameters: Parameters) -> Result<VideoDecoder, VidframesError> {
    let id = parameters.id();
    let context = CodecContext::from_parameters(parameters)
        .map_err(|error| VidframesError::CodecOpen(format!("{id:?}: {error}")))?;
    context.decoder().video().map_err(|error| match error {
        FfmpegError::DecoderNotFound => {
            VidframesError::CodecUnavailable(format!("no decoder for {id:?}"))
        }
        other => VidframesError::CodecOpen(format!("{id:?}: {other}")),
    })
}

/// Decodes packets of one video stream into raw frames.
///
/// Packets of any other stream are ignored. The decoder may hold frames
/// back for reordering; they are released once [`DecodeStage::feed`] is
/// called with `None`.
pub struct VideoDecodeStage {
    decoder: VideoDecoder,
    stream_index: usize,
    state: StageState,
}

impl VideoDecodeStage {
    /// Open a decoder for the stream at `stream_index`.
    pub fn new(parameters: Parameters, stream_index: usize) -> Result<Self, VidframesError> {
        let decoder = open_video_decoder(parameters)?;
        Ok(Self {
            decoder,
            stream_index,
            state: StageState::Ready,
        })
    }

    /// Width of decoded frames.
    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    /// Height of decoded frames.
    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    /// Pixel format of decoded frames.
    pub fn format(&self) -> ffmpeg_next::format::Pixel {
        self.decoder.format()
    }

    fn receive_all(&mut self) -> Result<Vec<VideoFrame>, VidframesError> {
        let mut frames = Vec::new();
        loop {
            let mut frame = VideoFrame::empty();
            match self.decoder.receive_frame(&mut frame) {
                Ok(()) => frames.push(frame),
                Err(FfmpegError::Eof) => break,
                Err(FfmpegError::Other { errno }) if errno == EAGAIN => break,
                Err(error) => return Err(VidframesError::VideoDecodeError(error.to_string())),
            }
        }
        Ok(frames)
    }
}

impl DecodeStage for VideoDecodeStage {
    type Unit = Packet;
    type Frame = VideoFrame;

    fn feed(&mut self, unit: Option<&Packet>) -> Result<Vec<VideoFrame>, VidframesError> {
        match unit {
            Some(packet) if packet.stream() != self.stream_index => return Ok(Vec::new()),
            Some(packet) => {
                if self.state != StageState::Ready {
                    return Err(VidframesError::VideoDecodeError(
                        "packet fed after end of input".to_string(),
                    ));
                }
                self.decoder
                    .send_packet(packet)
                    .map_err(|error| VidframesError::VideoDecodeError(error.to_string()))?;
            }
            None => match self.state {
                StageState::Ready => {
                    self.decoder
                        .send_eof()
                        .map_err(|error| VidframesError::VideoDecodeError(error.to_string()))?;
                    self.state.begin_drain();
                    log::debug!("Decoder for stream {} draining", self.stream_index);
                }
                StageState::Draining => {}
                StageState::Done => return Ok(Vec::new()),
            },
        }

        let frames = self.receive_all()?;
        self.state.settle(frames.len());
        if self.state.is_done() {
            log::debug!("Decoder for stream {} drained", self.stream_index);
        }
        Ok(frames)
    }

    fn state(&self) -> StageState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_next::{codec::Id, media::Type};

    /// An H.264 decode stage opened from bare codec parameters, or `None`
    /// when this FFmpeg build ships no H.264 decoder.
    fn h264_stage(stream_index: usize) -> Option<VideoDecodeStage> {
        ffmpeg_next::init().expect("init");
        ffmpeg_next::decoder::find(Id::H264)?;

        let mut parameters = Parameters::new();
        unsafe {
            let raw = parameters.as_mut_ptr();
            (*raw).codec_type = Type::Video.into();
            (*raw).codec_id = Id::H264.into();
        }
        Some(VideoDecodeStage::new(parameters, stream_index).expect("open decoder"))
    }

    fn packet_for(stream: usize) -> Packet {
        let mut packet = Packet::copy(&[0, 0, 0, 1]);
        packet.set_stream(stream);
        packet
    }

    #[test]
    fn foreign_packets_are_ignored() {
        let Some(mut stage) = h264_stage(0) else {
            return;
        };

        let frames = stage.feed(Some(&packet_for(1))).expect("feed");
        assert!(frames.is_empty());
        assert_eq!(stage.state(), StageState::Ready);
    }

    #[test]
    fn empty_decoder_drains_in_one_call() {
        let Some(mut stage) = h264_stage(0) else {
            return;
        };

        assert!(stage.feed(None).expect("drain").is_empty());
        assert_eq!(stage.state(), StageState::Done);

        // EOF is sent once; later drained calls are terminal no-ops.
        assert!(stage.feed(None).expect("drain again").is_empty());
        assert_eq!(stage.state(), StageState::Done);
    }

    #[test]
    fn packets_after_end_of_input_are_refused() {
        let Some(mut stage) = h264_stage(0) else {
            return;
        };

        stage.feed(None).expect("drain");
        assert!(matches!(
            stage.feed(Some(&packet_for(0))),
            Err(VidframesError::VideoDecodeError(_))
        ));
        // Foreign packets stay harmless even after draining.
        assert!(stage.feed(Some(&packet_for(3))).expect("foreign").is_empty());
    }
}
