//! Millisecond system clock and periodic scheduling.

use core::sync::atomic::{AtomicU32, Ordering};

/// Monotonic milliseconds since boot. Used only for timestamps.
pub trait SystemClock {
    fn now_ms(&self) -> u32;
}

impl<T: SystemClock + ?Sized> SystemClock for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Clock set by hand. For tests and replay.
#[derive(Debug, Default)]
pub struct ManualClock {
    ms: AtomicU32,
}

impl ManualClock {
    pub const fn new(start_ms: u32) -> Self {
        Self {
            ms: AtomicU32::new(start_ms),
        }
    }

    pub fn set(&self, ms: u32) {
        self.ms.store(ms, Ordering::Release);
    }

    pub fn advance(&self, ms: u32) {
        self.ms.fetch_add(ms, Ordering::AcqRel);
    }
}

impl SystemClock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.ms.load(Ordering::Acquire)
    }
}

#[cfg(feature = "std")]
pub use hosted::{BootClock, Ticker};

#[cfg(feature = "std")]
mod hosted {
    use super::SystemClock;
    use std::time::{Duration, Instant};

    /// Milliseconds since this clock was created (at boot, in `main`).
    #[derive(Clone, Copy, Debug)]
    pub struct BootClock {
        boot: Instant,
    }

    impl BootClock {
        pub fn new() -> Self {
            Self {
                boot: Instant::now(),
            }
        }
    }

    impl Default for BootClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SystemClock for BootClock {
        fn now_ms(&self) -> u32 {
            // Wraps after ~49 days, like the RTOS tick count
            self.boot.elapsed().as_millis() as u32
        }
    }

    /// Absolute-deadline periodic wait (delay-until).
    ///
    /// Each wake is scheduled from the previous deadline, not from when the
    /// task finished its work, so execution time does not accumulate as
    /// drift. After an overrun, `wait` returns immediately until the
    /// schedule has caught up.
    #[derive(Debug)]
    pub struct Ticker {
        next: Instant,
        period: Duration,
    }

    impl Ticker {
        /// First deadline is one period from now.
        pub fn new(period: Duration) -> Self {
            Self::starting_at(Instant::now(), period)
        }

        /// First deadline is one period after `last_wake`.
        pub fn starting_at(last_wake: Instant, period: Duration) -> Self {
            Self {
                next: last_wake + period,
                period,
            }
        }

        pub fn every_ms(ms: u32) -> Self {
            Self::new(Duration::from_millis(ms as u64))
        }

        /// Next wake time.
        pub fn deadline(&self) -> Instant {
            self.next
        }

        /// Sleep until the next deadline, then advance it by one period.
        pub fn wait(&mut self) {
            let now = Instant::now();
            if self.next > now {
                std::thread::sleep(self.next - now);
            }
            self.next += self.period;
        }
    }
}
