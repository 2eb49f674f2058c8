//! Module: reading
//!
//! Purpose: The value produced once per acquisition cycle and handed to every
//! consumer through the distribution slot.
//!
//! Architecture:
//! - Compact `Copy` value, replaced wholesale (never patched in place)
//! - Status is data: failed cycles still produce a Reading
//! - Numeric fields are only meaningful when `status == Ok`
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

/// Outcome of one sensor transaction.
///
/// The discriminants are the numeric codes shown on the display and in
/// the log (`Status: 1`, `Sensor error=2`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorStatus {
    /// Frame received and checksum verified.
    Ok = 0,
    /// An expected line transition did not happen within its phase budget.
    ErrTimeout = 1,
    /// Frame received but checksum mismatch; payload discarded.
    ErrCrc = 2,
    /// The transaction could not be carried out at all (line driver failure).
    ErrUnknown = 3,
}

impl SensorStatus {
    /// Numeric status code.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, SensorStatus::Ok)
    }
}

/// A single timestamped sensor reading.
///
/// Size: 9 bytes of payload, padded to 12.
///
/// Construct through [`Reading::ok`] or [`Reading::failed`]: a failed
/// reading always carries zeroed values so a consumer that ignores the
/// status still cannot render a stale measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reading {
    /// Whole degrees Celsius (sensor-native resolution).
    pub temperature_c: i16,

    /// Relative humidity in percent, 0-100.
    pub humidity_pct: u16,

    /// Milliseconds since boot, stamped by the acquisition task.
    pub timestamp_ms: u32,

    /// Transaction outcome.
    pub status: SensorStatus,
}

impl Reading {
    /// Successful reading.
    pub const fn ok(temperature_c: i16, humidity_pct: u16, timestamp_ms: u32) -> Self {
        Self {
            temperature_c,
            humidity_pct,
            timestamp_ms,
            status: SensorStatus::Ok,
        }
    }

    /// Failed reading. Values are zeroed.
    pub const fn failed(status: SensorStatus, timestamp_ms: u32) -> Self {
        Self {
            temperature_c: 0,
            humidity_pct: 0,
            timestamp_ms,
            status,
        }
    }

    /// `(temperature_c, humidity_pct)` if the reading is valid.
    ///
    /// This is the only accessor consumers should use for values.
    #[inline]
    pub fn measurement(&self) -> Option<(i16, u16)> {
        if self.status.is_ok() {
            Some((self.temperature_c, self.humidity_pct))
        } else {
            None
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
