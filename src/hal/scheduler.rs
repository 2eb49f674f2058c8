//! Scheduler control backing [`Uninterruptible`](crate::timebase::Uninterruptible).

use crate::timebase::Preemption;

/// FreeRTOS scheduler suspension.
///
/// `vTaskSuspendAll` stops context switches on the calling core while
/// leaving interrupts enabled, so the tick and UART keep running. Calls
/// nest; each `resume` balances one `suspend`.
#[cfg(target_os = "espidf")]
#[derive(Clone, Copy, Debug, Default)]
pub struct FreeRtosScheduler;

#[cfg(target_os = "espidf")]
impl Preemption for FreeRtosScheduler {
    #[inline]
    fn suspend(&self) {
        // SAFETY: Always safe from task context; no blocking API may be
        // called until the matching resume, which the timebase never does.
        unsafe { esp_idf_svc::sys::vTaskSuspendAll() };
    }

    #[inline]
    fn resume(&self) {
        // SAFETY: Balanced with the suspend above by the section guard.
        unsafe {
            esp_idf_svc::sys::xTaskResumeAll();
        }
    }
}

/// Hosted OS: the process cannot hold off the kernel scheduler, so the
/// section is a marker only. Used with the simulated sensor, where timing
/// is virtual and preemption cannot corrupt it.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostScheduler;

impl Preemption for HostScheduler {
    #[inline]
    fn suspend(&self) {}

    #[inline]
    fn resume(&self) {}
}
