//! DHT11 single-wire protocol decoder.
//!
//! Drives the data line through the fixed handshake and decodes the
//! 40-bit frame purely from pulse timing. Pure logic over the
//! [`DataLine`] and [`TickCounter`] traits; fully testable on host.
//!
//! # Transaction
//!
//! ```text
//! host  ‾‾‾|___18ms___|‾30µs‾|  released (input)
//! dht                           |_80µs_|‾‾80µs‾‾|_50_|‾26/70‾|_50_|‾ ... ‾|_50_|‾‾‾
//!                               ack     release   bit 0           bit 39   end
//! ```
//!
//! A bit is `1` when its high phase is longer than the configured
//! threshold (~50 µs), separating ~26 µs zeros from ~70 µs ones.
//! Frame layout, MSB first: humidity, humidity fraction, temperature,
//! temperature fraction, checksum. The fraction bytes are always zero on
//! this sensor class and are ignored.
//!
//! The whole transaction runs inside an [`Uninterruptible`] section.
//! There are no retries: a failed read is reported and the caller tries
//! again next cycle.

use crate::config::{ProtocolTiming, FRAME_BITS};
use crate::hal::counter::TickCounter;
use crate::hal::line::{DataLine, Level, LineError, LineMode};
use crate::reading::SensorStatus;
use crate::timebase::{Preemption, Timebase, Uninterruptible};

/// Number of bytes in a frame, checksum included.
pub const FRAME_LEN: usize = 5;

/// Protocol step that timed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Sensor pulling the line low after the host releases it.
    Ack,
    /// Sensor releasing the line after its acknowledge pulse.
    AckRelease,
    /// Sensor pulling low to start the data bits.
    DataStart,
    /// Separator low phase of bit `n`.
    BitLow(u8),
    /// Value-carrying high phase of bit `n`.
    BitHigh(u8),
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Phase::Ack => f.write_str("ack"),
            Phase::AckRelease => f.write_str("ack release"),
            Phase::DataStart => f.write_str("data start"),
            Phase::BitLow(n) => write!(f, "bit {} low", n),
            Phase::BitHigh(n) => write!(f, "bit {} high", n),
        }
    }
}

/// Classified read failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorError {
    /// E01: Expected transition missing
    Timeout(Phase),
    /// E02: Frame received, checksum mismatch
    Checksum { expected: u8, received: u8 },
    /// E03: Line driver failure
    Line(LineError),
}

impl SensorError {
    /// Status carried by the Reading for this failure.
    pub fn status(&self) -> SensorStatus {
        match self {
            Self::Timeout(_) => SensorStatus::ErrTimeout,
            Self::Checksum { .. } => SensorStatus::ErrCrc,
            Self::Line(_) => SensorStatus::ErrUnknown,
        }
    }

    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "E01",
            Self::Checksum { .. } => "E02",
            Self::Line(_) => "E03",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "sensor timeout",
            Self::Checksum { .. } => "checksum mismatch",
            Self::Line(_) => "line driver error",
        }
    }
}

impl From<LineError> for SensorError {
    fn from(e: LineError) -> Self {
        SensorError::Line(e)
    }
}

impl core::fmt::Display for SensorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout(phase) => write!(f, "{}: {} ({})", self.code(), self.message(), phase),
            Self::Checksum { expected, received } => write!(
                f,
                "{}: {} (expected {:#04x}, got {:#04x})",
                self.code(),
                self.message(),
                expected,
                received
            ),
            Self::Line(e) => write!(f, "{}: {} ({})", self.code(), self.message(), e),
        }
    }
}

/// Decoded values of a verified frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Measurement {
    pub temperature_c: i16,
    pub humidity_pct: u16,
}

/// Raw 5-byte frame as received.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame(pub [u8; FRAME_LEN]);

impl Frame {
    /// Checksum over the four data bytes: their sum mod 256.
    pub fn checksum_of(data: &[u8; 4]) -> u8 {
        data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
    }

    /// Well-formed frame for the given integer values.
    pub fn from_values(humidity: u8, temperature: u8) -> Self {
        let data = [humidity, 0, temperature, 0];
        Frame([data[0], data[1], data[2], data[3], Self::checksum_of(&data)])
    }

    /// Bit `n` (0..40) in wire order, MSB first.
    #[inline]
    pub fn bit(&self, n: usize) -> bool {
        (self.0[n / 8] >> (7 - (n % 8))) & 1 == 1
    }

    /// Verify the checksum and extract the integer bytes.
    pub fn measurement(&self) -> Result<Measurement, SensorError> {
        let [hum, hum_frac, temp, temp_frac, received] = self.0;
        let expected = Self::checksum_of(&[hum, hum_frac, temp, temp_frac]);
        if expected != received {
            return Err(SensorError::Checksum { expected, received });
        }
        Ok(Measurement {
            temperature_c: temp as i16,
            humidity_pct: hum as u16,
        })
    }
}

/// DHT11 driver.
pub struct Dht11<L: DataLine, C: TickCounter> {
    line: L,
    timebase: Timebase<C>,
    timing: ProtocolTiming,
    last_transaction_us: u32,
}

impl<L: DataLine, C: TickCounter> Dht11<L, C> {
    pub fn new(line: L, counter: C, timing: ProtocolTiming) -> Self {
        Self {
            line,
            timebase: Timebase::new(counter),
            timing,
            last_transaction_us: 0,
        }
    }

    /// Start the timebase and park the line at its idle (high) level.
    pub fn init(&mut self) -> Result<(), LineError> {
        self.timebase.init();
        self.line.set_mode(LineMode::Output)?;
        self.line.set_level(Level::High)
    }

    /// Duration of the most recent transaction, in microseconds.
    pub fn last_transaction_us(&self) -> u32 {
        self.last_transaction_us
    }

    pub fn line(&self) -> &L {
        &self.line
    }

    /// Run one full transaction with preemption held off.
    ///
    /// The line is returned to idle high whatever the outcome.
    pub fn read(&mut self, scheduler: &dyn Preemption) -> Result<Measurement, SensorError> {
        let section = Uninterruptible::enter(scheduler);
        let start = self.timebase.now();

        let frame = self.transact(&section);
        let parked = self.park();

        self.last_transaction_us = self.timebase.elapsed_us(start);
        drop(section);

        let frame = frame?;
        parked?;
        frame.measurement()
    }

    fn park(&mut self) -> Result<(), LineError> {
        self.line.set_mode(LineMode::Output)?;
        self.line.set_level(Level::High)
    }

    fn transact(&mut self, section: &Uninterruptible<'_>) -> Result<Frame, SensorError> {
        let t = self.timing;

        // Start condition
        self.line.set_mode(LineMode::Output)?;
        self.line.set_level(Level::Low)?;
        self.timebase.delay_us(section, t.start_low_us);
        self.line.set_level(Level::High)?;
        self.timebase.delay_us(section, t.release_us);
        self.line.set_mode(LineMode::Input)?;

        // Sensor response
        self.expect(section, Level::Low, t.ack_low_timeout_us, Phase::Ack)?;
        self.expect(section, Level::High, t.ack_high_timeout_us, Phase::AckRelease)?;
        self.expect(section, Level::Low, t.data_start_timeout_us, Phase::DataStart)?;

        // Payload
        let mut bytes = [0u8; FRAME_LEN];
        for bit in 0..FRAME_BITS as usize {
            self.timebase
                .measure_level_duration(section, &self.line, Level::Low, t.bit_low_timeout_us)
                .ok_or(SensorError::Timeout(Phase::BitLow(bit as u8)))?;
            let high_us = self
                .timebase
                .measure_level_duration(section, &self.line, Level::High, t.bit_high_timeout_us)
                .ok_or(SensorError::Timeout(Phase::BitHigh(bit as u8)))?;

            let byte = &mut bytes[bit / 8];
            *byte <<= 1;
            if high_us > t.one_threshold_us {
                *byte |= 1;
            }
        }

        Ok(Frame(bytes))
    }

    #[inline]
    fn expect(
        &self,
        section: &Uninterruptible<'_>,
        level: Level,
        timeout_us: u32,
        phase: Phase,
    ) -> Result<(), SensorError> {
        if self.timebase.wait_for_level(section, &self.line, level, timeout_us) {
            Ok(())
        } else {
            Err(SensorError::Timeout(phase))
        }
    }
}
