//! Microsecond timebase and the uninterruptible section.
//!
//! Pure spin-waits on a free-running counter. Nothing here suspends the
//! calling task: every spinning operation takes an [`Uninterruptible`]
//! token, so it can only run while the scheduler is held off.
//!
//! All elapsed-time arithmetic is `now.wrapping_sub(start)` followed by a
//! compare, which stays correct across counter rollover.

use core::marker::PhantomData;

use crate::hal::counter::TickCounter;
use crate::hal::line::{DataLine, Level};

/// Scheduler control for the uninterruptible section.
pub trait Preemption {
    /// Stop the scheduler from switching away from the calling task.
    fn suspend(&self);
    /// Undo one `suspend`.
    fn resume(&self);
}

/// Scoped proof that preemption is disabled.
///
/// Created by [`Uninterruptible::enter`], released on drop (including early
/// `?` returns). Not `Send`: the section belongs to the task that opened it.
pub struct Uninterruptible<'a> {
    scheduler: &'a dyn Preemption,
    _not_send: PhantomData<*const ()>,
}

impl<'a> Uninterruptible<'a> {
    pub fn enter(scheduler: &'a dyn Preemption) -> Self {
        scheduler.suspend();
        Self {
            scheduler,
            _not_send: PhantomData,
        }
    }
}

impl Drop for Uninterruptible<'_> {
    fn drop(&mut self) {
        self.scheduler.resume();
    }
}

/// Microsecond timebase over a wrapping tick counter.
pub struct Timebase<C: TickCounter> {
    counter: C,
    ticks_per_us: u32,
    enabled: bool,
}

impl<C: TickCounter> Timebase<C> {
    pub fn new(counter: C) -> Self {
        let ticks_per_us = counter.ticks_per_us().max(1);
        Self {
            counter,
            ticks_per_us,
            enabled: false,
        }
    }

    /// Enable the counter. Safe to call more than once.
    pub fn init(&mut self) {
        if !self.enabled {
            self.counter.enable();
            self.ticks_per_us = self.counter.ticks_per_us().max(1);
            self.enabled = true;
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Raw counter value, for use with [`Timebase::elapsed_us`].
    #[inline]
    pub fn now(&self) -> u32 {
        self.counter.now()
    }

    /// Microseconds since `start` (a value from [`Timebase::now`]).
    #[inline]
    pub fn elapsed_us(&self, start: u32) -> u32 {
        self.counter.now().wrapping_sub(start) / self.ticks_per_us
    }

    #[inline]
    fn ticks(&self, us: u32) -> u32 {
        us.saturating_mul(self.ticks_per_us)
    }

    /// Spin for at least `us` microseconds.
    pub fn delay_us(&self, _section: &Uninterruptible<'_>, us: u32) {
        debug_assert!(self.enabled, "timebase used before init");
        let start = self.counter.now();
        let ticks = self.ticks(us);
        while self.counter.now().wrapping_sub(start) < ticks {
            core::hint::spin_loop();
        }
    }

    /// Poll `line` until it reads `level`.
    ///
    /// Returns `false` once more than `timeout_us` has elapsed.
    pub fn wait_for_level<L: DataLine + ?Sized>(
        &self,
        _section: &Uninterruptible<'_>,
        line: &L,
        level: Level,
        timeout_us: u32,
    ) -> bool {
        debug_assert!(self.enabled, "timebase used before init");
        let start = self.counter.now();
        let limit = self.ticks(timeout_us);
        loop {
            if line.level() == level {
                return true;
            }
            if self.counter.now().wrapping_sub(start) > limit {
                return false;
            }
            core::hint::spin_loop();
        }
    }

    /// How long `line` holds `level`, once it gets there.
    ///
    /// `None` if reaching the level, or leaving it, takes longer than
    /// `timeout_us`.
    pub fn measure_level_duration<L: DataLine + ?Sized>(
        &self,
        section: &Uninterruptible<'_>,
        line: &L,
        level: Level,
        timeout_us: u32,
    ) -> Option<u32> {
        if !self.wait_for_level(section, line, level, timeout_us) {
            return None;
        }

        let start = self.counter.now();
        let limit = self.ticks(timeout_us);
        while line.level() == level {
            if self.counter.now().wrapping_sub(start) > limit {
                return None;
            }
            core::hint::spin_loop();
        }
        Some(self.elapsed_us(start))
    }
}
