//! Free-running tick counter behind the microsecond timebase.

/// A monotonically incrementing 32-bit counter that wraps.
///
/// Callers must only compare elapsed values (`now.wrapping_sub(start)`),
/// never absolute readings.
pub trait TickCounter {
    /// Start the counter. Must be idempotent.
    fn enable(&mut self) {}

    /// Current raw count.
    fn now(&self) -> u32;

    /// Counter ticks per microsecond. Never zero.
    fn ticks_per_us(&self) -> u32;
}

#[cfg(target_os = "espidf")]
pub use esp::EspTimerCounter;

#[cfg(target_os = "espidf")]
mod esp {
    use super::TickCounter;

    /// 1 MHz counter from the ESP-IDF high resolution timer.
    ///
    /// `esp_timer` runs from boot, so `enable` has nothing to do. The 64-bit
    /// value is truncated; wraparound is handled by the timebase.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct EspTimerCounter;

    impl TickCounter for EspTimerCounter {
        #[inline]
        fn now(&self) -> u32 {
            // SAFETY: esp_timer_get_time is always safe to call after boot
            unsafe { esp_idf_svc::sys::esp_timer_get_time() as u32 }
        }

        #[inline]
        fn ticks_per_us(&self) -> u32 {
            1
        }
    }
}
