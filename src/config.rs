//! Module: config
//!
//! Purpose: Construction-time configuration for the acquisition pipeline.
//!
//! Architecture:
//! - Every timing threshold and alert limit lives here, not in the components
//! - Components receive their section by value at construction
//! - No runtime reconfiguration: values are fixed once the tasks start
//!
//! Safety: Safe. Plain data.

use crate::logging::LogLevel;

/// Hard ceiling for the preemption-disabled decoder transaction.
///
/// Start pulse (~18 ms) plus a full 40-bit frame at worst-case timeouts.
pub const MAX_UNINTERRUPTIBLE_US: u32 = 30_000;

/// Minimum start-low duration the sensor accepts.
pub const MIN_START_LOW_US: u32 = 18_000;

/// Number of payload bits in one frame (4 data bytes + checksum).
pub const FRAME_BITS: u32 = 40;

/// Single-wire protocol timing windows.
///
/// All values in microseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolTiming {
    /// Host start condition: line held low.
    pub start_low_us: u32,
    /// Host release: line driven high before switching to input.
    pub release_us: u32,
    /// Sensor must pull low (acknowledge) within this window.
    pub ack_low_timeout_us: u32,
    /// Sensor must release high within this window.
    pub ack_high_timeout_us: u32,
    /// Sensor must pull low (start of data) within this window.
    pub data_start_timeout_us: u32,
    /// Per-bit separator low phase timeout.
    pub bit_low_timeout_us: u32,
    /// Per-bit high phase timeout.
    pub bit_high_timeout_us: u32,
    /// High phases strictly longer than this decode as `1`.
    pub one_threshold_us: u32,
}

impl ProtocolTiming {
    /// DHT11 datasheet timing with jitter margin.
    pub const DEFAULT: Self = Self {
        start_low_us: 18_000,
        release_us: 30,
        ack_low_timeout_us: 100,
        ack_high_timeout_us: 120,
        data_start_timeout_us: 120,
        bit_low_timeout_us: 120,
        bit_high_timeout_us: 150,
        one_threshold_us: 50,
    };

    /// Longest possible transaction if every phase runs to its timeout.
    pub fn worst_case_us(&self) -> u32 {
        let handshake = self
            .start_low_us
            .saturating_add(self.release_us)
            .saturating_add(self.ack_low_timeout_us)
            .saturating_add(self.ack_high_timeout_us)
            .saturating_add(self.data_start_timeout_us);
        let per_bit = self.bit_low_timeout_us.saturating_add(self.bit_high_timeout_us);
        handshake.saturating_add(per_bit.saturating_mul(FRAME_BITS))
    }

    /// Check the windows are physically consistent and fit the
    /// uninterruptible-section budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_low_us < MIN_START_LOW_US {
            return Err(ConfigError::StartPulseTooShort);
        }
        if !(20..=40).contains(&self.release_us) {
            return Err(ConfigError::ReleaseOutOfRange);
        }
        if self.ack_low_timeout_us == 0
            || self.ack_high_timeout_us == 0
            || self.data_start_timeout_us == 0
            || self.bit_low_timeout_us == 0
            || self.bit_high_timeout_us == 0
        {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.one_threshold_us == 0 || self.one_threshold_us >= self.bit_high_timeout_us {
            return Err(ConfigError::ThresholdOutsideWindow);
        }
        if self.worst_case_us() > MAX_UNINTERRUPTIBLE_US {
            return Err(ConfigError::SectionTooLong);
        }
        Ok(())
    }
}

impl Default for ProtocolTiming {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Alert limits. A reading at or above either limit raises an alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlertThresholds {
    pub temperature_c: i16,
    pub humidity_pct: u16,
}

impl AlertThresholds {
    pub const DEFAULT: Self = Self {
        temperature_c: 30,
        humidity_pct: 70,
    };
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Task cadence, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskPeriods {
    pub acquisition_ms: u32,
    pub log_ms: u32,
    pub alert_ms: u32,
    /// How long the alert task waits for a reading on each wake.
    pub alert_peek_ms: u32,
}

impl TaskPeriods {
    pub const DEFAULT: Self = Self {
        acquisition_ms: 2000,
        log_ms: 2000,
        alert_ms: 500,
        alert_peek_ms: 100,
    };
}

impl Default for TaskPeriods {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Scheduler priorities above idle. Higher runs first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskPriorities {
    pub acquisition: u8,
    pub display: u8,
    pub alert: u8,
    pub log: u8,
}

impl TaskPriorities {
    pub const DEFAULT: Self = Self {
        acquisition: 3,
        display: 2,
        alert: 2,
        log: 1,
    };
}

impl Default for TaskPriorities {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything the application wiring needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub timing: ProtocolTiming,
    pub alert: AlertThresholds,
    pub periods: TaskPeriods,
    pub priorities: TaskPriorities,
    /// Stack size for every task, in bytes.
    pub stack_size: usize,
    /// Diagnostic entries above this level are not written out.
    pub log_level: LogLevel,
}

impl AppConfig {
    pub const DEFAULT: Self = Self {
        timing: ProtocolTiming::DEFAULT,
        alert: AlertThresholds::DEFAULT,
        periods: TaskPeriods::DEFAULT,
        priorities: TaskPriorities::DEFAULT,
        stack_size: 4096,
        log_level: LogLevel::Info,
    };

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()?;
        let p = &self.periods;
        if p.acquisition_ms == 0 || p.log_ms == 0 || p.alert_ms == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration rejected at validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// C01: Start pulse shorter than the sensor minimum
    StartPulseTooShort,
    /// C02: Release pulse outside 20-40 µs
    ReleaseOutOfRange,
    /// C03: A phase timeout is zero
    ZeroTimeout,
    /// C04: Bit threshold not inside the high-phase window
    ThresholdOutsideWindow,
    /// C05: Worst-case transaction exceeds the uninterruptible budget
    SectionTooLong,
    /// C06: A task period is zero
    ZeroPeriod,
}

impl ConfigError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::StartPulseTooShort => "C01",
            Self::ReleaseOutOfRange => "C02",
            Self::ZeroTimeout => "C03",
            Self::ThresholdOutsideWindow => "C04",
            Self::SectionTooLong => "C05",
            Self::ZeroPeriod => "C06",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::StartPulseTooShort => "start pulse below 18 ms",
            Self::ReleaseOutOfRange => "release pulse outside 20-40 us",
            Self::ZeroTimeout => "zero phase timeout",
            Self::ThresholdOutsideWindow => "bit threshold outside high-phase window",
            Self::SectionTooLong => "uninterruptible section over budget",
            Self::ZeroPeriod => "zero task period",
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(ProtocolTiming::default().validate(), Ok(()));
        assert_eq!(AppConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_default_worst_case_fits_budget() {
        // 18000 + 30 + 100 + 120 + 120 + 40 * (120 + 150)
        assert_eq!(ProtocolTiming::DEFAULT.worst_case_us(), 29_170);
        assert!(ProtocolTiming::DEFAULT.worst_case_us() <= MAX_UNINTERRUPTIBLE_US);
    }

    #[test]
    fn test_short_start_pulse_rejected() {
        let timing = ProtocolTiming {
            start_low_us: 17_999,
            ..ProtocolTiming::DEFAULT
        };
        assert_eq!(timing.validate(), Err(ConfigError::StartPulseTooShort));
    }

    #[test]
    fn test_threshold_must_sit_inside_high_window() {
        let timing = ProtocolTiming {
            one_threshold_us: 150,
            ..ProtocolTiming::DEFAULT
        };
        assert_eq!(timing.validate(), Err(ConfigError::ThresholdOutsideWindow));
    }

    #[test]
    fn test_long_bit_windows_exceed_budget() {
        let timing = ProtocolTiming {
            bit_high_timeout_us: 200,
            ..ProtocolTiming::DEFAULT
        };
        assert_eq!(timing.validate(), Err(ConfigError::SectionTooLong));
    }

    #[test]
    fn test_zero_period_rejected() {
        let mut config = AppConfig::DEFAULT;
        config.periods.alert_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPeriod));
    }

    #[test]
    fn test_error_display() {
        let text = format!("{}", ConfigError::SectionTooLong);
        assert!(text.starts_with("C05"));
    }
}
