//! Log transport: where formatted log lines leave the device.
//!
//! On target this is UART1 TX-only on GPIO6, requiring an external USB-UART
//! adapter (CH340, CP2102, etc).
//!
//! ```text
//! ESP32-S3 GPIO6 (TX) ──────▶ USB-UART RX
//!                              └─▶ PC Serial Monitor
//! ```

use crate::logging::{LineBuf, LogEntry};

/// Longest line handed to the transport. Longer output is truncated.
pub const LOG_LINE_CAPACITY: usize = 160;

/// A formatted log line.
pub type LogLine = LineBuf<LOG_LINE_CAPACITY>;

/// Transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// W01: Write did not complete within the blocking timeout
    Timeout,
    /// W02: Driver rejected the write
    Io,
}

impl TransportError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "W01",
            Self::Io => "W02",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::Timeout => "write timed out",
            Self::Io => "write failed",
        }
    }
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Blocking byte sink with a bounded timeout.
pub trait LogTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

/// Format a diagnostic entry.
///
/// Format: `[timestamp_ms] LEVEL: message\r\n`
pub fn format_log_entry(entry: &LogEntry) -> LogLine {
    LogLine::format(format_args!(
        "[{:10}] {}: {}\r\n",
        entry.timestamp_ms,
        entry.level.as_str(),
        entry.text()
    ))
}

/// Transport shared by several tasks.
///
/// Each `write` holds the lock for the whole line, so lines from different
/// tasks never interleave.
#[cfg(feature = "std")]
#[derive(Debug, Default)]
pub struct SharedTransport<T> {
    inner: std::sync::Mutex<T>,
}

#[cfg(feature = "std")]
impl<T: LogTransport> SharedTransport<T> {
    pub const fn new(transport: T) -> Self {
        Self {
            inner: std::sync::Mutex::new(transport),
        }
    }

    pub fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        // A panicked writer cannot leave a half-written line behind,
        // so a poisoned lock is still usable.
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.write(bytes)
    }

    /// Run `f` with exclusive access to the transport.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

/// Host transport: standard output.
#[cfg(feature = "std")]
#[derive(Debug, Default)]
pub struct StdoutTransport;

#[cfg(feature = "std")]
impl LogTransport for StdoutTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        use std::io::Write;
        let mut out = std::io::stdout().lock();
        out.write_all(bytes).map_err(|_| TransportError::Io)?;
        out.flush().map_err(|_| TransportError::Io)
    }
}

#[cfg(target_os = "espidf")]
pub use esp::{init_uart_transport, UartTransport, UartTransportConfig};

#[cfg(target_os = "espidf")]
mod esp {
    use super::{LogTransport, TransportError};
    use esp_idf_svc::hal::delay::TickType;
    use esp_idf_svc::hal::gpio;
    use esp_idf_svc::hal::peripheral::Peripheral;
    use esp_idf_svc::hal::uart::{self, UartTxDriver};

    /// UART configuration for logging.
    pub struct UartTransportConfig {
        pub baud_rate: u32,
        /// Bound on waiting for each line to finish transmitting.
        pub timeout_ms: u64,
    }

    impl Default for UartTransportConfig {
        fn default() -> Self {
            Self {
                baud_rate: 115200,
                timeout_ms: 100,
            }
        }
    }

    /// UART TX driver with a per-write completion timeout.
    ///
    /// Handing bytes to the driver has no timeout of its own: it blocks
    /// only while the driver buffers are full, and each caller writes one
    /// line of at most [`LOG_LINE_CAPACITY`](super::LOG_LINE_CAPACITY)
    /// bytes, about 14 ms at 115200 baud. The configured timeout bounds
    /// the wait for that line to finish draining.
    pub struct UartTransport<'d> {
        tx: UartTxDriver<'d>,
        timeout: TickType,
    }

    /// Initialize UART1 TX-only for log output.
    pub fn init_uart_transport<'d>(
        uart: impl Peripheral<P = uart::UART1> + 'd,
        tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
        config: &UartTransportConfig,
    ) -> Result<UartTransport<'d>, esp_idf_svc::sys::EspError> {
        let uart_config = uart::config::Config::default()
            .baudrate(esp_idf_svc::hal::units::Hertz(config.baud_rate));

        let tx = UartTxDriver::new(
            uart,
            tx_pin,
            Option::<gpio::AnyIOPin>::None, // CTS
            Option::<gpio::AnyIOPin>::None, // RTS
            &uart_config,
        )?;

        Ok(UartTransport {
            tx,
            timeout: TickType::new_millis(config.timeout_ms),
        })
    }

    impl LogTransport for UartTransport<'_> {
        fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            self.tx.write(bytes).map_err(|_| TransportError::Io)?;
            self.tx
                .wait_done(self.timeout.ticks())
                .map_err(|_| TransportError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MAX_MSG_LEN};


    #[test]
    fn test_format_log_entry() {
        let entry = LogEntry {
            timestamp_ms: 1234567,
            level: LogLevel::Info,
            len: 11,
            msg: {
                let mut msg = [0u8; MAX_MSG_LEN];
                msg[..11].copy_from_slice(b"Hello world");
                msg
            },
        };

        let line = format_log_entry(&entry);
        let formatted = line.as_str();
        assert!(formatted.contains("1234567"));
        assert!(formatted.contains("INFO"));
        assert!(formatted.ends_with("Hello world\r\n"));
    }

    #[test]
    fn test_format_truncated_message() {
        let entry = LogEntry {
            timestamp_ms: 999,
            level: LogLevel::Error,
            len: 5,
            msg: {
                let mut msg = [0u8; MAX_MSG_LEN];
                msg[..10].copy_from_slice(b"TEST12345X"); // Only first 5 used
                msg
            },
        };

        let line = format_log_entry(&entry);
        let formatted = line.as_str();
        assert!(formatted.contains("ERROR"));
        assert!(formatted.contains("TEST1"));
        assert!(!formatted.contains('X'));
    }

    #[test]
    fn test_log_line_capacity() {
        let long = "y".repeat(400);
        let line = LogLine::format(format_args!("{}", long));
        assert_eq!(line.len(), LOG_LINE_CAPACITY);
    }

    #[cfg(feature = "std")]
    struct Sink(Vec<u8>);

    #[cfg(feature = "std")]
    impl LogTransport for Sink {
        fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            self.0.extend_from_slice(bytes);
            Ok(())
        }
    }

    #[test]
    #[cfg(feature = "std")]
    fn test_shared_transport_serializes_writes() {
        let shared = SharedTransport::new(Sink(Vec::new()));
        shared.write(b"one\r\n").unwrap();
        shared.write(b"two\r\n").unwrap();
        let bytes = shared.with(|sink| sink.0.clone());
        assert_eq!(bytes, b"one\r\ntwo\r\n");
    }
}
