//! Host-side simulation of the sensor and the collaborators.
//!
//! Time is virtual. [`SimCounter`] advances a shared microsecond clock by
//! a fixed step every time it is read, and [`SimLine`] derives the line
//! level from that clock. The decoder's spin loops therefore *are* the
//! passage of time, which makes every timing path deterministic.
//!
//! When the host switches the line to input, the simulated sensor starts
//! replaying a [`Waveform`] anchored at that instant.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

use crate::config::FRAME_BITS;
use crate::dht11::{Frame, Phase};
use crate::hal::counter::TickCounter;
use crate::hal::display::TextDisplay;
use crate::hal::line::{DataLine, Level, LineError, LineMode};
use crate::hal::transport::{LogTransport, TransportError};
use crate::timebase::Preemption;

/// Shared virtual time in microseconds.
#[derive(Clone, Debug, Default)]
pub struct SimTime(Arc<AtomicU32>);

impl SimTime {
    pub fn starting_at(us: u32) -> Self {
        Self(Arc::new(AtomicU32::new(us)))
    }

    /// Current time, without advancing it.
    pub fn peek(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    pub fn advance(&self, us: u32) -> u32 {
        self.0.fetch_add(us, Ordering::AcqRel)
    }
}

/// 1 MHz counter over [`SimTime`]; each read advances time by `step_us`.
#[derive(Clone, Debug)]
pub struct SimCounter {
    time: SimTime,
    step_us: u32,
    enabled: bool,
}

impl SimCounter {
    pub fn new(time: SimTime) -> Self {
        Self::with_step(time, 1)
    }

    pub fn with_step(time: SimTime, step_us: u32) -> Self {
        Self {
            time,
            step_us: step_us.max(1),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl TickCounter for SimCounter {
    fn enable(&mut self) {
        self.enabled = true;
    }

    fn now(&self) -> u32 {
        self.time.advance(self.step_us)
    }

    fn ticks_per_us(&self) -> u32 {
        1
    }
}

/// Sensor pulse widths, in microseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseShape {
    /// Line stays high after release before the sensor answers.
    pub response_delay_us: u32,
    pub ack_low_us: u32,
    pub ack_high_us: u32,
    pub bit_low_us: u32,
    pub zero_high_us: u32,
    pub one_high_us: u32,
    /// Final low after bit 39, then the line is released.
    pub end_low_us: u32,
}

impl PulseShape {
    /// Typical DHT11 timing.
    pub const TYPICAL: Self = Self {
        response_delay_us: 20,
        ack_low_us: 80,
        ack_high_us: 80,
        bit_low_us: 50,
        zero_high_us: 26,
        one_high_us: 70,
        end_low_us: 50,
    };
}

impl Default for PulseShape {
    fn default() -> Self {
        Self::TYPICAL
    }
}

/// What the sensor puts on the line after the host releases it.
///
/// A list of `(level, duration)` segments followed by a level held forever.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Waveform {
    segments: Vec<(Level, u32)>,
    tail: Level,
}

impl Waveform {
    /// Segments before bit 0: response delay, ack low, ack high.
    pub const BIT_BASE: usize = 3;

    /// No sensor on the bus: the pull-up holds the line high.
    pub fn silent() -> Self {
        Self {
            segments: Vec::new(),
            tail: Level::High,
        }
    }

    /// Full response carrying `frame`.
    pub fn frame(frame: &Frame, shape: &PulseShape) -> Self {
        let bits = (0..FRAME_BITS as usize).map(|n| frame.bit(n));
        Self::bits(bits, shape)
    }

    /// Full response carrying an arbitrary bit sequence.
    pub fn bits(bits: impl IntoIterator<Item = bool>, shape: &PulseShape) -> Self {
        let mut segments = vec![
            (Level::High, shape.response_delay_us),
            (Level::Low, shape.ack_low_us),
            (Level::High, shape.ack_high_us),
        ];
        for one in bits {
            segments.push((Level::Low, shape.bit_low_us));
            segments.push((
                Level::High,
                if one { shape.one_high_us } else { shape.zero_high_us },
            ));
        }
        segments.push((Level::Low, shape.end_low_us));
        Self {
            segments,
            tail: Level::High,
        }
    }

    /// Segment index where `phase` is entered.
    pub fn segment_of(phase: Phase) -> usize {
        match phase {
            Phase::Ack => 1,
            Phase::AckRelease => 2,
            Phase::DataStart => Self::BIT_BASE,
            Phase::BitLow(n) => Self::BIT_BASE + 2 * n as usize,
            Phase::BitHigh(n) => Self::BIT_BASE + 2 * n as usize + 1,
        }
    }

    /// Freeze the line at the level it has just before `segment`: the
    /// transition into `segment` never happens.
    pub fn withhold(mut self, segment: usize) -> Self {
        let segment = segment.min(self.segments.len());
        self.tail = match segment {
            0 => Level::High,
            n => self.segments[n - 1].0,
        };
        self.segments.truncate(segment);
        self
    }

    /// Freeze the line so `phase`'s expected transition never happens.
    pub fn withhold_phase(self, phase: Phase) -> Self {
        let segment = match phase {
            // Expected transitions: ack = into low, release = into high,
            // data start = into low of bit 0
            Phase::Ack | Phase::AckRelease | Phase::DataStart => Self::segment_of(phase),
            // Bit phases time out when the level is never left
            Phase::BitLow(_) | Phase::BitHigh(_) => Self::segment_of(phase) + 1,
        };
        self.withhold(segment)
    }

    /// Level `t` microseconds after the release.
    pub fn level_at(&self, t: u32) -> Level {
        let mut edge = 0u32;
        for &(level, duration) in &self.segments {
            edge = edge.saturating_add(duration);
            if t < edge {
                return level;
            }
        }
        self.tail
    }

    /// Total scripted length before the tail.
    pub fn duration_us(&self) -> u32 {
        self.segments.iter().map(|&(_, d)| d).sum()
    }
}

type Script = Box<dyn FnMut(u32) -> Waveform + Send>;

/// Simulated open-drain data line with a DHT11 on it.
pub struct SimLine {
    time: SimTime,
    mode: Cell<LineMode>,
    driven: Cell<Level>,
    released_at: Cell<u32>,
    low_since: Cell<Option<u32>>,
    last_start_low_us: Cell<u32>,
    transactions: Cell<u32>,
    fail_mode: Cell<bool>,
    default: RefCell<Waveform>,
    active: RefCell<Waveform>,
    queued: RefCell<VecDeque<Waveform>>,
    script: RefCell<Option<Script>>,
}

impl SimLine {
    /// Line whose sensor answers every transaction with `waveform`.
    pub fn new(time: SimTime, waveform: Waveform) -> Self {
        Self {
            time,
            mode: Cell::new(LineMode::Output),
            driven: Cell::new(Level::High),
            released_at: Cell::new(0),
            low_since: Cell::new(None),
            last_start_low_us: Cell::new(0),
            transactions: Cell::new(0),
            fail_mode: Cell::new(false),
            active: RefCell::new(waveform.clone()),
            default: RefCell::new(waveform),
            queued: RefCell::new(VecDeque::new()),
            script: RefCell::new(None),
        }
    }

    /// Line whose sensor answers transaction `n` with `script(n)`.
    pub fn scripted(time: SimTime, script: impl FnMut(u32) -> Waveform + Send + 'static) -> Self {
        let line = Self::new(time, Waveform::silent());
        *line.script.borrow_mut() = Some(Box::new(script));
        line
    }

    /// Use `waveform` for the next transaction only, ahead of the default.
    pub fn queue(&self, waveform: Waveform) {
        self.queued.borrow_mut().push_back(waveform);
    }

    /// Make every direction change fail.
    pub fn fail_mode_changes(&self, fail: bool) {
        self.fail_mode.set(fail);
    }

    /// How long the host held the last start condition low.
    pub fn last_start_low_us(&self) -> u32 {
        self.last_start_low_us.get()
    }

    /// Number of times the host released the line.
    pub fn transactions(&self) -> u32 {
        self.transactions.get()
    }

    pub fn mode(&self) -> LineMode {
        self.mode.get()
    }

    fn begin_response(&self) {
        let n = self.transactions.get();
        self.transactions.set(n.wrapping_add(1));
        self.released_at.set(self.time.peek());

        let next = match self.queued.borrow_mut().pop_front() {
            Some(queued) => queued,
            None => match self.script.borrow_mut().as_mut() {
                Some(script) => script(n),
                None => self.default.borrow().clone(),
            },
        };
        *self.active.borrow_mut() = next;
    }
}

impl DataLine for SimLine {
    fn set_mode(&mut self, mode: LineMode) -> Result<(), LineError> {
        if self.fail_mode.get() {
            return Err(LineError::Mode);
        }
        if mode == LineMode::Input && self.mode.get() == LineMode::Output {
            self.begin_response();
        }
        self.mode.set(mode);
        Ok(())
    }

    fn set_level(&mut self, level: Level) -> Result<(), LineError> {
        let now = self.time.peek();
        match (self.driven.get(), level) {
            (Level::High, Level::Low) => self.low_since.set(Some(now)),
            (Level::Low, Level::High) => {
                if let Some(since) = self.low_since.take() {
                    self.last_start_low_us.set(now.wrapping_sub(since));
                }
            }
            _ => {}
        }
        self.driven.set(level);
        Ok(())
    }

    fn level(&self) -> Level {
        match self.mode.get() {
            LineMode::Output => self.driven.get(),
            LineMode::Input => {
                let t = self.time.peek().wrapping_sub(self.released_at.get());
                self.active.borrow().level_at(t)
            }
        }
    }
}

/// Preemption control that records how it was used.
#[derive(Debug, Default)]
pub struct CountingScheduler {
    depth: AtomicI32,
    max_depth: AtomicI32,
    entered: AtomicU32,
}

impl CountingScheduler {
    pub const fn new() -> Self {
        Self {
            depth: AtomicI32::new(0),
            max_depth: AtomicI32::new(0),
            entered: AtomicU32::new(0),
        }
    }

    /// Currently open sections.
    pub fn depth(&self) -> i32 {
        self.depth.load(Ordering::Acquire)
    }

    pub fn max_depth(&self) -> i32 {
        self.max_depth.load(Ordering::Acquire)
    }

    /// Sections opened so far.
    pub fn entered(&self) -> u32 {
        self.entered.load(Ordering::Acquire)
    }
}

impl Preemption for CountingScheduler {
    fn suspend(&self) {
        let depth = self.depth.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_depth.fetch_max(depth, Ordering::AcqRel);
        self.entered.fetch_add(1, Ordering::AcqRel);
    }

    fn resume(&self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Display call as seen by the collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayOp {
    Clear,
    Line(u8, String),
    Update,
}

/// Display that records every call.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    ops: Vec<DisplayOp>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DisplayOp] {
        &self.ops
    }

    /// Text of each line printed, in order.
    pub fn printed(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DisplayOp::Line(_, text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> usize {
        self.ops.iter().filter(|op| **op == DisplayOp::Update).count()
    }
}

impl TextDisplay for RecordingDisplay {
    fn clear(&mut self) {
        self.ops.push(DisplayOp::Clear);
    }

    fn print_line(&mut self, line: u8, text: &str) {
        self.ops.push(DisplayOp::Line(line, text.to_string()));
    }

    fn update(&mut self) {
        self.ops.push(DisplayOp::Update);
    }
}

/// Transport that keeps every write as a string.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    writes: Vec<String>,
    failing: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject all further writes with `TransportError::Timeout`.
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    pub fn clear(&mut self) {
        self.writes.clear();
    }
}

impl LogTransport for MemoryTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.failing {
            return Err(TransportError::Timeout);
        }
        self.writes.push(String::from_utf8_lossy(bytes).into_owned());
        Ok(())
    }
}
