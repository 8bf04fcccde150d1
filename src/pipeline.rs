//! Pull-driven frame pipeline and drain protocol.
//!
//! [`Pipeline`] owns one [`UnitSource`] and the three downstream stages. Each
//! [`pull`](Pipeline::pull) reads at most one compressed unit and pushes it
//! through decode, convert and packetize, returning whatever images fall out.
//!
//! When the source reports end of input the pipeline enters
//! [`DrainState::Draining`] and keeps feeding "no input" to the decode stage
//! and drained calls to the packetize stage. It becomes
//! [`DrainState::Exhausted`] once both stages report [`StageState::Done`].

use std::collections::VecDeque;

use crate::error::VidframesError;
use crate::raster::{FrameImageAdapter, RasterImage};
use crate::stage::{
    ConvertStage, DecodeStage, DrainState, PacketizeStage, StageState, StreamUnit, UnitSource,
};

/// The outcome of one [`Pipeline::pull`].
#[derive(Debug, Default)]
#[must_use]
pub struct Pull {
    /// `false` once the pipeline is exhausted; stop pulling.
    pub more: bool,
    /// Images produced by this call, in presentation order. May be empty.
    pub images: Vec<RasterImage>,
}

impl Pull {
    fn tick() -> Self {
        Self {
            more: true,
            images: Vec::new(),
        }
    }

    fn finished() -> Self {
        Self::default()
    }
}

/// Owned stages. Field order is release order.
struct Stages<S, D, C, P> {
    decode: D,
    source: S,
    packetize: P,
    convert: C,
}

impl<S, D, C, P> Stages<S, D, C, P> {
    fn release(self) {
        let Stages {
            decode,
            source,
            packetize,
            convert,
        } = self;
        drop(decode);
        drop(source);
        drop(packetize);
        drop(convert);
    }
}

/// Drives a source through decode, convert and packetize stages.
pub struct Pipeline<S, D, C, P> {
    stages: Option<Stages<S, D, C, P>>,
    stream_index: usize,
    width: u32,
    height: u32,
    drain: DrainState,
}

impl<S, D, C, P> Pipeline<S, D, C, P>
where
    S: UnitSource,
    D: DecodeStage<Unit = S::Unit>,
    C: ConvertStage<Input = D::Frame>,
    P: PacketizeStage<Frame = C::Output>,
{
    /// Assemble a pipeline for the stream at `stream_index`, producing
    /// `width × height` images.
    pub fn new(
        source: S,
        decode: D,
        convert: C,
        packetize: P,
        stream_index: usize,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            stages: Some(Stages {
                decode,
                source,
                packetize,
                convert,
            }),
            stream_index,
            width,
            height,
            drain: DrainState::Streaming,
        }
    }

    /// Current drain progress.
    pub fn drain_state(&self) -> DrainState {
        self.drain
    }

    /// Returns `true` after [`close`](Pipeline::close).
    pub fn is_closed(&self) -> bool {
        self.stages.is_none()
    }

    /// Produce the next batch of images.
    ///
    /// `Pull { more: true, images: [] }` is a no-output tick; keep pulling.
    /// Once `more` is `false` every later call returns the same.
    ///
    /// # Errors
    ///
    /// [`VidframesError::Closed`] after [`close`](Pipeline::close). Any stage
    /// error is fatal: it is returned once and the pipeline is exhausted.
    pub fn pull(&mut self) -> Result<Pull, VidframesError> {
        if self.stages.is_none() {
            return Err(VidframesError::Closed);
        }
        if self.drain.is_exhausted() {
            return Ok(Pull::finished());
        }

        self.step().inspect_err(|error| {
            log::debug!("Pipeline aborted: {error}");
            self.drain = DrainState::Exhausted;
        })
    }

    fn step(&mut self) -> Result<Pull, VidframesError> {
        let stages = self.stages.as_mut().ok_or(VidframesError::Closed)?;

        let unit = match self.drain {
            DrainState::Streaming => match stages.source.next_unit()? {
                Some(unit) => Some(unit),
                None => {
                    log::debug!("End of input; draining stages");
                    self.drain = DrainState::Draining;
                    None
                }
            },
            DrainState::Draining | DrainState::Exhausted => None,
        };

        let raw = stages.decode.feed(unit.as_ref())?;
        if unit
            .as_ref()
            .is_some_and(|unit| unit.stream_index() != self.stream_index)
        {
            return Ok(Pull::tick());
        }

        let converted = stages.convert.transform(raw)?;
        let draining = self.drain == DrainState::Draining;
        let buffers = stages.packetize.feed(converted, draining)?;

        if draining
            && stages.decode.state() == StageState::Done
            && stages.packetize.state() == StageState::Done
        {
            log::debug!("Pipeline exhausted");
            self.drain = DrainState::Exhausted;
        }

        if buffers.is_empty() {
            return Ok(if self.drain.is_exhausted() {
                Pull::finished()
            } else {
                Pull::tick()
            });
        }

        let images = buffers
            .into_iter()
            .map(|buffer| FrameImageAdapter::wrap(buffer, self.width, self.height))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Pull { more: true, images })
    }

    /// Iterate over images, pulling across no-output ticks.
    ///
    /// Stops after exhaustion or after yielding the first error.
    pub fn images(&mut self) -> Images<'_, S, D, C, P> {
        Images {
            pipeline: self,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Release all stages: decode, then source, then packetize, then convert.
    ///
    /// # Errors
    ///
    /// [`VidframesError::Closed`] if already closed.
    pub fn close(&mut self) -> Result<(), VidframesError> {
        let stages = self.stages.take().ok_or(VidframesError::Closed)?;
        log::debug!("Releasing pipeline stages");
        stages.release();
        Ok(())
    }
}

impl<S, D, C, P> Drop for Pipeline<S, D, C, P> {
    fn drop(&mut self) {
        if let Some(stages) = self.stages.take() {
            log::warn!("Pipeline dropped without close; releasing stages");
            stages.release();
        }
    }
}

/// Iterator over the images of a [`Pipeline`].
///
/// Created via [`Pipeline::images`].
pub struct Images<'a, S, D, C, P> {
    pipeline: &'a mut Pipeline<S, D, C, P>,
    pending: VecDeque<RasterImage>,
    finished: bool,
}

impl<S, D, C, P> Iterator for Images<'_, S, D, C, P>
where
    S: UnitSource,
    D: DecodeStage<Unit = S::Unit>,
    C: ConvertStage<Input = D::Frame>,
    P: PacketizeStage<Frame = C::Output>,
{
    type Item = Result<RasterImage, VidframesError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(image) = self.pending.pop_front() {
                return Some(Ok(image));
            }
            if self.finished {
                return None;
            }

            match self.pipeline.pull() {
                Ok(pull) => {
                    self.finished = !pull.more;
                    self.pending.extend(pull.images);
                }
                Err(error) => {
                    self.finished = true;
                    return Some(Err(error));
                }
            }
        }
    }
}
