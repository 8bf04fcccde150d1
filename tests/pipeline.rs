//! Drain protocol tests.
//!
//! These drive `Pipeline` with in-memory stages so that reordering depth,
//! interleaved foreign streams and stage failures can be controlled exactly.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
};

use vidframes::{
    ConvertStage, DecodeStage, DrainState, PackedBuffer, PacketizeStage, Pipeline, RasterImage,
    StageState, StreamUnit, UnitSource, VidframesError,
};

const VIDEO: usize = 0;
const AUDIO: usize = 1;

type ReleaseLog = Rc<RefCell<Vec<&'static str>>>;

#[derive(Debug, Clone)]
struct Unit {
    stream: usize,
    sequence: u32,
}

impl StreamUnit for Unit {
    fn stream_index(&self) -> usize {
        self.stream
    }
}

struct MockSource {
    units: VecDeque<Unit>,
    end_reported: Rc<Cell<bool>>,
    fail_after: Option<usize>,
    served: usize,
    log: ReleaseLog,
}

impl UnitSource for MockSource {
    type Unit = Unit;

    fn next_unit(&mut self) -> Result<Option<Unit>, VidframesError> {
        if self.fail_after == Some(self.served) {
            return Err(VidframesError::ReadError("truncated container".to_string()));
        }
        self.served += 1;
        let unit = self.units.pop_front();
        if unit.is_none() {
            self.end_reported.set(true);
        }
        Ok(unit)
    }
}

impl Drop for MockSource {
    fn drop(&mut self) {
        self.log.borrow_mut().push("source");
    }
}

/// Holds back `depth` frames, then releases one per drained call.
struct MockDecode {
    depth: usize,
    buffer: VecDeque<u32>,
    state: StageState,
    fail_on: Option<u32>,
    drained_calls: Rc<Cell<usize>>,
    log: ReleaseLog,
}

impl DecodeStage for MockDecode {
    type Unit = Unit;
    type Frame = u32;

    fn feed(&mut self, unit: Option<&Unit>) -> Result<Vec<u32>, VidframesError> {
        match unit {
            Some(unit) if unit.stream != VIDEO => Ok(Vec::new()),
            Some(unit) => {
                if self.fail_on == Some(unit.sequence) {
                    return Err(VidframesError::VideoDecodeError("corrupt unit".to_string()));
                }
                self.buffer.push_back(unit.sequence);
                let mut frames = Vec::new();
                while self.buffer.len() > self.depth {
                    frames.extend(self.buffer.pop_front());
                }
                Ok(frames)
            }
            None => {
                self.drained_calls.set(self.drained_calls.get() + 1);
                if self.state.is_done() {
                    return Ok(Vec::new());
                }
                self.state.begin_drain();
                let frames: Vec<u32> = self.buffer.pop_front().into_iter().collect();
                self.state.settle(frames.len());
                Ok(frames)
            }
        }
    }

    fn state(&self) -> StageState {
        self.state
    }
}

impl Drop for MockDecode {
    fn drop(&mut self) {
        self.log.borrow_mut().push("decode");
    }
}

#[derive(Debug)]
struct Converted {
    sequence: u32,
}

struct MockConvert {
    log: ReleaseLog,
}

impl ConvertStage for MockConvert {
    type Input = u32;
    type Output = Converted;

    fn transform(&mut self, frames: Vec<u32>) -> Result<Vec<Converted>, VidframesError> {
        Ok(frames.into_iter().map(|sequence| Converted { sequence }).collect())
    }
}

impl Drop for MockConvert {
    fn drop(&mut self) {
        self.log.borrow_mut().push("convert");
    }
}

/// Holds back `depth` frames; every byte of a buffer is its frame number.
struct MockPacketize {
    width: u32,
    height: u32,
    depth: usize,
    buffer: VecDeque<Converted>,
    state: StageState,
    log: ReleaseLog,
}

impl MockPacketize {
    fn pack(&self, frame: Converted) -> PackedBuffer {
        let stride = self.width as usize * 4;
        PackedBuffer::new(
            vec![frame.sequence as u8; stride * self.height as usize],
            stride,
        )
    }
}

impl PacketizeStage for MockPacketize {
    type Frame = Converted;

    fn feed(
        &mut self,
        frames: Vec<Converted>,
        drain: bool,
    ) -> Result<Vec<PackedBuffer>, VidframesError> {
        if self.state.is_done() && !frames.is_empty() {
            return Err(VidframesError::PacketizeError("fed after drain".to_string()));
        }
        if drain {
            self.state.begin_drain();
        }

        let no_input = frames.is_empty();
        self.buffer.extend(frames);
        let mut ready = Vec::new();
        while self.buffer.len() > self.depth {
            ready.extend(self.buffer.pop_front());
        }
        if no_input && self.state == StageState::Draining {
            ready.extend(self.buffer.pop_front());
        }

        if no_input {
            self.state.settle(ready.len());
        }
        Ok(ready.into_iter().map(|frame| self.pack(frame)).collect())
    }

    fn state(&self) -> StageState {
        self.state
    }
}

impl Drop for MockPacketize {
    fn drop(&mut self) {
        self.log.borrow_mut().push("packetize");
    }
}

type MockPipeline = Pipeline<MockSource, MockDecode, MockConvert, MockPacketize>;

struct Harness {
    pipeline: MockPipeline,
    end_reported: Rc<Cell<bool>>,
    drained_calls: Rc<Cell<usize>>,
    log: ReleaseLog,
}

struct Setup {
    units: Vec<Unit>,
    width: u32,
    height: u32,
    decode_depth: usize,
    packetize_depth: usize,
    fail_read_after: Option<usize>,
    fail_decode_on: Option<u32>,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            units: video_units(10),
            width: 64,
            height: 48,
            decode_depth: 0,
            packetize_depth: 0,
            fail_read_after: None,
            fail_decode_on: None,
        }
    }
}

impl Setup {
    fn build(self) -> Harness {
        let end_reported = Rc::new(Cell::new(false));
        let drained_calls = Rc::new(Cell::new(0));
        let log: ReleaseLog = Rc::new(RefCell::new(Vec::new()));

        let pipeline = Pipeline::new(
            MockSource {
                units: self.units.into(),
                end_reported: end_reported.clone(),
                fail_after: self.fail_read_after,
                served: 0,
                log: log.clone(),
            },
            MockDecode {
                depth: self.decode_depth,
                buffer: VecDeque::new(),
                state: StageState::Ready,
                fail_on: self.fail_decode_on,
                drained_calls: drained_calls.clone(),
                log: log.clone(),
            },
            MockConvert { log: log.clone() },
            MockPacketize {
                width: self.width,
                height: self.height,
                depth: self.packetize_depth,
                buffer: VecDeque::new(),
                state: StageState::Ready,
                log: log.clone(),
            },
            VIDEO,
            self.width,
            self.height,
        );

        Harness {
            pipeline,
            end_reported,
            drained_calls,
            log,
        }
    }
}

fn video_units(count: u32) -> Vec<Unit> {
    (0..count)
        .map(|sequence| Unit {
            stream: VIDEO,
            sequence,
        })
        .collect()
}

fn interleave_audio(units: Vec<Unit>) -> Vec<Unit> {
    units
        .into_iter()
        .flat_map(|unit| {
            let audio = Unit {
                stream: AUDIO,
                sequence: 1000 + unit.sequence,
            };
            [audio, unit]
        })
        .collect()
}

/// Pull until `more == false`, recording whether the source had reported
/// end of input when each image was returned.
fn drain_all(harness: &mut Harness) -> (Vec<(RasterImage, bool)>, usize) {
    let mut images = Vec::new();
    let mut pulls = 0;
    loop {
        pulls += 1;
        assert!(pulls < 1_000, "pipeline did not terminate");
        let pull = harness.pipeline.pull().expect("pull failed");
        if !pull.more {
            assert!(pull.images.is_empty());
            break;
        }
        let ended = harness.end_reported.get();
        images.extend(pull.images.into_iter().map(|image| (image, ended)));
    }
    (images, pulls)
}

fn sequence_of(image: &RasterImage) -> u8 {
    image.pixels()[0]
}

// ── Scenario A ─────────────────────────────────────────────────────

#[test]
fn ten_frames_without_reordering() {
    let mut harness = Setup::default().build();
    let (images, _) = drain_all(&mut harness);

    assert_eq!(images.len(), 10);
    for (image, _) in &images {
        assert_eq!(image.width(), 64);
        assert_eq!(image.height(), 48);
        assert_eq!(image.stride(), 256);
        assert_eq!(image.pixels().len(), 64 * 48 * 4);
        assert_eq!(image.pixels().len(), image.stride() * image.height() as usize);
    }
    let order: Vec<u8> = images.iter().map(|(image, _)| sequence_of(image)).collect();
    assert_eq!(order, (0..10).collect::<Vec<u8>>());
}

// ── Scenario B ─────────────────────────────────────────────────────

#[test]
fn reordered_tail_emerges_only_while_draining() {
    let mut harness = Setup {
        decode_depth: 3,
        ..Setup::default()
    }
    .build();
    let (images, _) = drain_all(&mut harness);

    assert_eq!(images.len(), 10);
    let (before, after): (Vec<_>, Vec<_>) = images.iter().partition(|(_, ended)| !ended);
    assert_eq!(before.len(), 7);
    assert_eq!(
        after.iter().map(|(image, _)| sequence_of(image)).collect::<Vec<_>>(),
        vec![7, 8, 9]
    );
}

#[test]
fn packetize_buffer_is_flushed_too() {
    let mut harness = Setup {
        decode_depth: 1,
        packetize_depth: 2,
        ..Setup::default()
    }
    .build();
    let (images, _) = drain_all(&mut harness);

    let order: Vec<u8> = images.iter().map(|(image, _)| sequence_of(image)).collect();
    assert_eq!(order, (0..10).collect::<Vec<u8>>());
    assert_eq!(images.iter().filter(|(_, ended)| *ended).count(), 3);
}

// ── Scenario C ─────────────────────────────────────────────────────

#[test]
fn foreign_stream_units_do_not_change_output() {
    let mut plain = Setup {
        decode_depth: 2,
        ..Setup::default()
    }
    .build();
    let mut mixed = Setup {
        units: interleave_audio(video_units(10)),
        decode_depth: 2,
        ..Setup::default()
    }
    .build();

    let (plain_images, plain_pulls) = drain_all(&mut plain);
    let (mixed_images, mixed_pulls) = drain_all(&mut mixed);

    assert_eq!(plain_images.len(), mixed_images.len());
    assert_eq!(mixed_pulls, plain_pulls + 10);
    for ((a, _), (b, _)) in plain_images.iter().zip(&mixed_images) {
        assert_eq!(a, b);
    }
}

#[test]
fn foreign_unit_yields_a_no_output_tick() {
    let mut harness = Setup {
        units: vec![Unit {
            stream: AUDIO,
            sequence: 0,
        }],
        ..Setup::default()
    }
    .build();

    let pull = harness.pipeline.pull().expect("pull");
    assert!(pull.more);
    assert!(pull.images.is_empty());
    assert_eq!(harness.pipeline.drain_state(), DrainState::Streaming);
}

// ── Scenario D ─────────────────────────────────────────────────────

#[test]
fn empty_stream_finishes_on_first_pull() {
    let mut harness = Setup {
        units: Vec::new(),
        ..Setup::default()
    }
    .build();

    let pull = harness.pipeline.pull().expect("pull");
    assert!(!pull.more);
    assert!(pull.images.is_empty());
    assert_eq!(harness.pipeline.drain_state(), DrainState::Exhausted);
}

#[test]
fn audio_only_units_finish_without_images() {
    let mut harness = Setup {
        units: vec![
            Unit {
                stream: AUDIO,
                sequence: 0,
            };
            3
        ],
        ..Setup::default()
    }
    .build();

    let (images, pulls) = drain_all(&mut harness);
    assert!(images.is_empty());
    assert_eq!(pulls, 4);
}

// ── drain protocol ─────────────────────────────────────────────────

#[test]
fn draining_is_monotonic_and_bounded() {
    let decode_depth = 4;
    let packetize_depth = 2;
    let mut harness = Setup {
        decode_depth,
        packetize_depth,
        ..Setup::default()
    }
    .build();

    let mut states = Vec::new();
    loop {
        let pull = harness.pipeline.pull().expect("pull");
        states.push(harness.pipeline.drain_state());
        if !pull.more {
            break;
        }
    }

    let first_drain = states
        .iter()
        .position(|state| *state != DrainState::Streaming)
        .expect("never drained");
    assert!(
        states[first_drain..]
            .iter()
            .all(|state| *state != DrainState::Streaming)
    );
    let draining_pulls = states.len() - first_drain;
    assert!(
        draining_pulls <= decode_depth + packetize_depth + 2,
        "took {draining_pulls} pulls to drain"
    );
    assert_eq!(states.last(), Some(&DrainState::Exhausted));
}

#[test]
fn exhausted_pipeline_keeps_reporting_no_more() {
    let mut harness = Setup::default().build();
    drain_all(&mut harness);

    for _ in 0..3 {
        let pull = harness.pipeline.pull().expect("pull");
        assert!(!pull.more);
        assert!(pull.images.is_empty());
    }
}

#[test]
fn images_iterator_skips_ticks() {
    let mut harness = Setup {
        units: interleave_audio(video_units(6)),
        decode_depth: 2,
        ..Setup::default()
    }
    .build();

    let images: Vec<RasterImage> = harness
        .pipeline
        .images()
        .collect::<Result<_, _>>()
        .expect("iteration failed");
    assert_eq!(images.len(), 6);
    assert!(harness.pipeline.drain_state().is_exhausted());
}

// ── failures ───────────────────────────────────────────────────────

#[test]
fn read_failure_is_not_end_of_input() {
    let mut harness = Setup {
        fail_read_after: Some(4),
        ..Setup::default()
    }
    .build();

    let mut result = Ok(());
    for _ in 0..10 {
        match harness.pipeline.pull() {
            Ok(_) => continue,
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    assert!(matches!(result, Err(VidframesError::ReadError(_))));
    assert_eq!(harness.drained_calls.get(), 0, "read failure must not drain");
    assert!(!harness.end_reported.get());

    let pull = harness.pipeline.pull().expect("pull after failure");
    assert!(!pull.more);
}

#[test]
fn decode_failure_aborts_sequence() {
    let mut harness = Setup {
        fail_decode_on: Some(2),
        ..Setup::default()
    }
    .build();

    let images: Vec<_> = harness.pipeline.images().collect();
    assert_eq!(images.len(), 3);
    assert!(images[..2].iter().all(Result::is_ok));
    assert!(matches!(images[2], Err(VidframesError::VideoDecodeError(_))));
}

#[test]
fn mismatched_buffer_is_rejected() {
    let end_reported = Rc::new(Cell::new(false));
    let log: ReleaseLog = Rc::new(RefCell::new(Vec::new()));
    // Packetizer packs 32-pixel rows while the pipeline expects 64.
    let mut pipeline = Pipeline::new(
        MockSource {
            units: video_units(1).into(),
            end_reported,
            fail_after: None,
            served: 0,
            log: log.clone(),
        },
        MockDecode {
            depth: 0,
            buffer: VecDeque::new(),
            state: StageState::Ready,
            fail_on: None,
            drained_calls: Rc::new(Cell::new(0)),
            log: log.clone(),
        },
        MockConvert { log: log.clone() },
        MockPacketize {
            width: 32,
            height: 48,
            depth: 0,
            buffer: VecDeque::new(),
            state: StageState::Ready,
            log: log.clone(),
        },
        VIDEO,
        64,
        48,
    );

    assert!(matches!(
        pipeline.pull(),
        Err(VidframesError::LayoutMismatch { .. })
    ));
}

// ── teardown ───────────────────────────────────────────────────────

#[test]
fn close_releases_in_dependency_order() {
    let mut harness = Setup::default().build();
    harness.pipeline.pull().expect("pull");
    assert!(harness.log.borrow().is_empty());

    harness.pipeline.close().expect("close");
    assert_eq!(
        *harness.log.borrow(),
        vec!["decode", "source", "packetize", "convert"]
    );
    assert!(harness.pipeline.is_closed());
}

#[test]
fn use_after_close_is_rejected() {
    let mut harness = Setup::default().build();
    harness.pipeline.close().expect("close");

    assert!(matches!(harness.pipeline.pull(), Err(VidframesError::Closed)));
    assert!(matches!(harness.pipeline.close(), Err(VidframesError::Closed)));
}

#[test]
fn drop_without_close_still_releases() {
    let harness = Setup::default().build();
    let log = harness.log.clone();
    drop(harness);

    assert_eq!(*log.borrow(), vec!["decode", "source", "packetize", "convert"]);
}
