//! Latest-value distribution slot.
//!
//! Capacity-1, overwrite-on-full. The acquisition task is the only writer;
//! every consumer reads from the same slot.
//!
//! ```text
//!                         ┌──▶ peek (alert, 100 ms)
//! acquisition ──publish──▶ [ R ] ──▶ peek (log, no wait)
//!                         └──▶ take (display, forever)
//! ```
//!
//! # Rules
//!
//! - The slot holds nothing or exactly one complete Reading
//! - Every operation is atomic with respect to the others (internal lock,
//!   held only for a 12-byte copy)
//! - Publishing never blocks and never queues: a stale entry is drained
//!   and replaced
//! - Peek never removes; take always does

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::reading::Reading;

/// How long a peek may block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wait {
    /// Return immediately.
    NoWait,
    /// Block up to the given duration.
    For(Duration),
    /// Block until a reading is available.
    Forever,
}

impl Wait {
    pub fn millis(ms: u32) -> Self {
        if ms == 0 {
            Wait::NoWait
        } else {
            Wait::For(Duration::from_millis(ms as u64))
        }
    }
}

/// Result of a publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Publish {
    /// Slot was empty.
    Inserted,
    /// A reading nobody took was dropped to make room.
    Replaced,
}

/// Capacity-1 latest-value slot.
#[derive(Debug, Default)]
pub struct LatestSlot {
    cell: Mutex<Option<Reading>>,
    filled: Condvar,
}

impl LatestSlot {
    pub const fn new() -> Self {
        Self {
            cell: Mutex::new(None),
            filled: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Reading>> {
        // The guarded value is a Copy replaced in one assignment; a
        // panicking holder cannot leave it half-written.
        self.cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make `reading` the current value.
    ///
    /// Try-insert first; if the slot is still occupied, drain the stale
    /// entry and insert. Never blocks on consumers.
    pub fn publish(&self, reading: Reading) -> Publish {
        let mut cell = self.lock();
        let outcome = match cell.take() {
            None => Publish::Inserted,
            Some(_stale) => Publish::Replaced,
        };
        *cell = Some(reading);
        drop(cell);
        self.filled.notify_all();
        outcome
    }

    /// Read the current value without removing it.
    pub fn peek(&self, wait: Wait) -> Option<Reading> {
        let cell = self.lock();
        match wait {
            Wait::NoWait => *cell,
            Wait::Forever => {
                let cell = self
                    .filled
                    .wait_while(cell, |c| c.is_none())
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *cell
            }
            Wait::For(timeout) => {
                let (cell, _) = self
                    .filled
                    .wait_timeout_while(cell, timeout, |c| c.is_none())
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *cell
            }
        }
    }

    /// Remove and return the current value, blocking until there is one.
    pub fn take(&self) -> Reading {
        let mut cell = self.lock();
        loop {
            if let Some(reading) = cell.take() {
                return reading;
            }
            cell = self
                .filled
                .wait(cell)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Remove the current value, waiting at most `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Option<Reading> {
        let deadline = Instant::now() + timeout;
        let mut cell = self.lock();
        loop {
            if let Some(reading) = cell.take() {
                return Some(reading);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            cell = self
                .filled
                .wait_timeout(cell, remaining)
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .0;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }
}
