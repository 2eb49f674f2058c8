//! Alert task: stateless threshold check.
//!
//! Re-evaluated on every wake against whatever reading is current. No
//! de-duplication and no hysteresis: a reading that stays above the limit
//! alerts on every wake.

use std::time::Duration;

use crate::config::AlertThresholds;
use crate::hal::transport::{LogLine, LogTransport, SharedTransport};
use crate::reading::Reading;
use crate::slot::{LatestSlot, Wait};

/// `(temperature, humidity)` if `reading` is valid and at or above either
/// limit.
pub fn exceeds(reading: &Reading, limits: &AlertThresholds) -> Option<(i16, u16)> {
    let (temperature, humidity) = reading.measurement()?;
    if temperature >= limits.temperature_c || humidity >= limits.humidity_pct {
        Some((temperature, humidity))
    } else {
        None
    }
}

pub fn format_alert_line(temperature: i16, humidity: u16) -> LogLine {
    LogLine::format(format_args!("ALERT! T={}C H={}%\r\n", temperature, humidity))
}

pub struct AlertTask<'a, T: LogTransport> {
    slot: &'a LatestSlot,
    transport: &'a SharedTransport<T>,
    limits: AlertThresholds,
    peek: Wait,
    write_failures: u32,
}

impl<'a, T: LogTransport> AlertTask<'a, T> {
    pub fn new(
        slot: &'a LatestSlot,
        transport: &'a SharedTransport<T>,
        limits: AlertThresholds,
        peek_timeout_ms: u32,
    ) -> Self {
        Self {
            slot,
            transport,
            limits,
            peek: Wait::millis(peek_timeout_ms),
            write_failures: 0,
        }
    }

    /// Alert lines the transport rejected.
    pub fn write_failures(&self) -> u32 {
        self.write_failures
    }

    /// One wake. Returns `true` if an alert line was emitted.
    pub fn step(&mut self) -> bool {
        let Some(reading) = self.slot.peek(self.peek) else {
            return false;
        };
        let Some((temperature, humidity)) = exceeds(&reading, &self.limits) else {
            return false;
        };

        let line = format_alert_line(temperature, humidity);
        // Nothing to fall back to if the transport is down
        if self.transport.write(line.as_bytes()).is_err() {
            self.write_failures = self.write_failures.wrapping_add(1);
        }
        true
    }

    /// Fixed sleep after each check (relative delay, not delay-until).
    pub fn run(mut self, period_ms: u32) -> ! {
        let period = Duration::from_millis(period_ms as u64);
        loop {
            self.step();
            std::thread::sleep(period);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::SensorStatus;

    const LIMITS: AlertThresholds = AlertThresholds::DEFAULT;

    #[test]
    fn test_temperature_threshold_inclusive() {
        assert_eq!(exceeds(&Reading::ok(30, 40, 0), &LIMITS), Some((30, 40)));
        assert_eq!(exceeds(&Reading::ok(29, 40, 0), &LIMITS), None);
    }

    #[test]
    fn test_humidity_threshold_inclusive() {
        assert_eq!(exceeds(&Reading::ok(20, 70, 0), &LIMITS), Some((20, 70)));
        assert_eq!(exceeds(&Reading::ok(20, 69, 0), &LIMITS), None);
    }

    #[test]
    fn test_error_reading_never_alerts() {
        let reading = Reading {
            temperature_c: 80,
            humidity_pct: 95,
            timestamp_ms: 0,
            status: SensorStatus::ErrCrc,
        };
        assert_eq!(exceeds(&reading, &LIMITS), None);
    }

    #[test]
    fn test_custom_limits() {
        let limits = AlertThresholds {
            temperature_c: 25,
            humidity_pct: 90,
        };
        assert!(exceeds(&Reading::ok(25, 10, 0), &limits).is_some());
        assert!(exceeds(&Reading::ok(24, 80, 0), &limits).is_none());
    }

    #[test]
    fn test_alert_line_format() {
        assert_eq!(format_alert_line(31, 40).as_str(), "ALERT! T=31C H=40%\r\n");
    }
}
