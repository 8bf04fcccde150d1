//! Stage seams and drain states.
//!
//! The frame pipeline is assembled from four stages: a [`UnitSource`] that
//! demuxes compressed units, a [`DecodeStage`] that turns units into raw
//! frames, a [`ConvertStage`] that resamples raw frames into the target
//! layout, and a [`PacketizeStage`] that linearizes converted frames into
//! [`PackedBuffer`]s. The FFmpeg-backed implementations live in
//! [`session`](crate::session), [`decode`](crate::decode),
//! [`convert`](crate::convert) and [`packetize`](crate::packetize); any other
//! implementation can be driven by [`Pipeline`](crate::Pipeline).
//!
//! Both buffering stages carry an explicit [`StageState`]. Once told to
//! drain they never return to [`StageState::Ready`], and they become
//! [`StageState::Done`] on the first drained call that yields nothing.

use crate::error::VidframesError;
use crate::packetize::PackedBuffer;

/// Lifecycle of a buffering codec stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageState {
    /// Accepting new input.
    #[default]
    Ready,
    /// Input has ended; buffered output is being flushed.
    Draining,
    /// Nothing is buffered and nothing more will be produced.
    Done,
}

impl StageState {
    /// Enter [`StageState::Draining`] if still [`StageState::Ready`].
    pub fn begin_drain(&mut self) {
        if *self == StageState::Ready {
            *self = StageState::Draining;
        }
    }

    /// Record the output count of a drained call. Zero output completes the
    /// drain.
    pub fn settle(&mut self, produced: usize) {
        if *self == StageState::Draining && produced == 0 {
            *self = StageState::Done;
        }
    }

    /// Returns `true` once the stage has been fully drained.
    pub fn is_done(self) -> bool {
        self == StageState::Done
    }
}

/// Pipeline-level drain progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainState {
    /// Still pulling compressed units from the source.
    #[default]
    Streaming,
    /// The source reported end of input; stages are being flushed.
    Draining,
    /// No stage has further output. Terminal.
    Exhausted,
}

impl DrainState {
    /// Returns `true` for [`DrainState::Exhausted`].
    pub fn is_exhausted(self) -> bool {
        self == DrainState::Exhausted
    }
}

/// A compressed unit tagged with the stream it belongs to.
pub trait StreamUnit {
    /// Index of the container stream this unit belongs to.
    fn stream_index(&self) -> usize;
}

/// Produces compressed units in container order.
pub trait UnitSource {
    /// The compressed unit type.
    type Unit: StreamUnit;

    /// Read the next unit of any stream.
    ///
    /// Returns `Ok(None)` at end of input. Read failures are errors and are
    /// never reported as end of input.
    fn next_unit(&mut self) -> Result<Option<Self::Unit>, VidframesError>;
}

/// Turns compressed units into raw decoded frames.
pub trait DecodeStage {
    /// The compressed unit type accepted.
    type Unit;
    /// The raw frame type produced.
    type Frame;

    /// Feed one unit, or `None` once the source has ended.
    ///
    /// Units of a foreign stream are ignored and yield nothing. The first
    /// `None` moves the stage to [`StageState::Draining`]; repeated `None`
    /// calls flush buffered frames until one yields nothing.
    fn feed(&mut self, unit: Option<&Self::Unit>) -> Result<Vec<Self::Frame>, VidframesError>;

    /// Current lifecycle state.
    fn state(&self) -> StageState;
}

/// Converts raw frames into the pipeline's fixed target layout.
pub trait ConvertStage {
    /// The raw frame type accepted.
    type Input;
    /// The converted frame type produced.
    type Output;

    /// Convert every frame, preserving count and order.
    fn transform(&mut self, frames: Vec<Self::Input>) -> Result<Vec<Self::Output>, VidframesError>;
}

/// Linearizes converted frames into packed buffers.
pub trait PacketizeStage {
    /// The converted frame type accepted.
    type Frame;

    /// Feed converted frames. With `drain` set the stage also flushes what
    /// it has buffered, and a drained call with no frames that yields nothing
    /// moves it to [`StageState::Done`].
    fn feed(
        &mut self,
        frames: Vec<Self::Frame>,
        drain: bool,
    ) -> Result<Vec<PackedBuffer>, VidframesError>;

    /// Current lifecycle state.
    fn state(&self) -> StageState;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_ignored_while_ready() {
        let mut state = StageState::Ready;
        state.settle(0);
        assert_eq!(state, StageState::Ready);
    }

    #[test]
    fn drain_completes_on_empty_yield() {
        let mut state = StageState::Ready;
        state.begin_drain();
        assert_eq!(state, StageState::Draining);
        state.settle(2);
        assert_eq!(state, StageState::Draining);
        state.settle(0);
        assert!(state.is_done());
    }

    #[test]
    fn done_never_reopens() {
        let mut state = StageState::Done;
        state.begin_drain();
        state.settle(3);
        assert_eq!(state, StageState::Done);
    }
}
