//! Log task: periodic status line plus the diagnostic drain.
//!
//! Lowest priority. Each wake it peeks the slot without waiting, writes
//! one status line, then drains the diagnostic [`LogStream`] to the same
//! transport.

use crate::clock::Ticker;
use crate::hal::transport::{format_log_entry, LogLine, LogTransport, SharedTransport};
use crate::logging::{LogLevel, LogStream};
use crate::reading::Reading;
use crate::slot::{LatestSlot, Wait};

/// Status line for the current slot contents.
pub fn format_status_line(latest: Option<&Reading>) -> LogLine {
    match latest {
        None => LogLine::format(format_args!("Waiting for first sensor reading...\r\n")),
        Some(reading) => match reading.measurement() {
            Some((temperature, humidity)) => LogLine::format(format_args!(
                "[t={}] T={}C H={}%\r\n",
                reading.timestamp_ms, temperature, humidity
            )),
            None => LogLine::format(format_args!(
                "[t={}] Sensor error={}\r\n",
                reading.timestamp_ms,
                reading.status.code()
            )),
        },
    }
}

pub struct LogTask<'a, T: LogTransport> {
    slot: &'a LatestSlot,
    transport: &'a SharedTransport<T>,
    diagnostics: &'a LogStream,
    level: LogLevel,
    write_failures: u32,
}

impl<'a, T: LogTransport> LogTask<'a, T> {
    pub fn new(
        slot: &'a LatestSlot,
        transport: &'a SharedTransport<T>,
        diagnostics: &'a LogStream,
        level: LogLevel,
    ) -> Self {
        Self {
            slot,
            transport,
            diagnostics,
            level,
            write_failures: 0,
        }
    }

    /// Writes the transport rejected. A failed log write has nowhere
    /// else to go, so it is only counted.
    pub fn write_failures(&self) -> u32 {
        self.write_failures
    }

    fn send(&mut self, bytes: &[u8]) {
        if self.transport.write(bytes).is_err() {
            self.write_failures = self.write_failures.wrapping_add(1);
        }
    }

    /// One wake: status line, then diagnostics.
    pub fn step(&mut self) {
        let latest = self.slot.peek(Wait::NoWait);
        let line = format_status_line(latest.as_ref());
        self.send(line.as_bytes());
        self.drain_diagnostics();
    }

    /// Write out pending diagnostic entries at or below the level filter.
    pub fn drain_diagnostics(&mut self) {
        while let Some(entry) = self.diagnostics.drain() {
            if entry.level.enabled(self.level) {
                let line = format_log_entry(&entry);
                self.send(line.as_bytes());
            }
        }

        let dropped = self.diagnostics.take_dropped();
        if dropped > 0 {
            let line = LogLine::format(format_args!("[WARN] Dropped: {}\r\n", dropped));
            self.send(line.as_bytes());
        }
    }

    pub fn run(mut self, period_ms: u32) -> ! {
        let mut ticker = Ticker::every_ms(period_ms);
        loop {
            self.step();
            ticker.wait();
        }
    }
}
