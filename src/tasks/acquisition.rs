//! Acquisition task: periodic driver of the decoder.
//!
//! `Idle → Driving → Publishing → Idle`, once per period. A failed read
//! still publishes (an error-status Reading); there is no retry within a
//! cycle and no memory of earlier failures.

use crate::clock::{SystemClock, Ticker};
use crate::dht11::Dht11;
use crate::hal::counter::TickCounter;
use crate::hal::line::DataLine;
use crate::logging::LogStream;
use crate::reading::Reading;
use crate::slot::{LatestSlot, Publish};
use crate::timebase::Preemption;

/// Where the task is within its cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    Driving,
    Publishing,
}

pub struct AcquisitionTask<'a, L: DataLine, C: TickCounter, K: SystemClock> {
    sensor: Dht11<L, C>,
    scheduler: &'a dyn Preemption,
    clock: K,
    slot: &'a LatestSlot,
    log: &'a LogStream,
    state: AcquisitionState,
}

impl<'a, L: DataLine, C: TickCounter, K: SystemClock> AcquisitionTask<'a, L, C, K> {
    pub fn new(
        sensor: Dht11<L, C>,
        scheduler: &'a dyn Preemption,
        clock: K,
        slot: &'a LatestSlot,
        log: &'a LogStream,
    ) -> Self {
        Self {
            sensor,
            scheduler,
            clock,
            slot,
            log,
            state: AcquisitionState::Idle,
        }
    }

    #[inline]
    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// One acquisition cycle: read, stamp, publish.
    pub fn cycle(&mut self) -> Reading {
        self.state = AcquisitionState::Driving;
        let outcome = self.sensor.read(self.scheduler);
        let now = self.clock.now_ms();

        let reading = match outcome {
            Ok(m) => {
                crate::rt_debug!(
                    self.log,
                    now,
                    "T={}C H={}% ({} us)",
                    m.temperature_c,
                    m.humidity_pct,
                    self.sensor.last_transaction_us()
                );
                Reading::ok(m.temperature_c, m.humidity_pct, now)
            }
            Err(e) => {
                crate::rt_warn!(self.log, now, "read failed: {}", e);
                Reading::failed(e.status(), now)
            }
        };

        self.state = AcquisitionState::Publishing;
        if self.slot.publish(reading) == Publish::Replaced {
            crate::rt_trace!(self.log, now, "unconsumed reading replaced");
        }

        self.state = AcquisitionState::Idle;
        reading
    }

    /// Task body: cycle, then sleep until the next absolute deadline.
    pub fn run(mut self, period_ms: u32) -> ! {
        let mut ticker = Ticker::every_ms(period_ms);
        loop {
            self.cycle();
            ticker.wait();
        }
    }
}
