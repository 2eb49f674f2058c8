//! The four application tasks.
//!
//! Every task is a struct holding injected references (slot, transport,
//! diagnostic stream) plus a `step`/`cycle` method that does one wake's
//! worth of work, and a `run` loop that never returns. Tests drive the
//! step methods directly.
//!
//! | Task        | Priority | Wakes on                  | Slot access        |
//! |-------------|----------|---------------------------|--------------------|
//! | Acquisition | 3        | every 2000 ms (absolute)  | publish            |
//! | Display     | 2        | new reading               | take (forever)     |
//! | Alert       | 2        | every 500 ms              | peek (100 ms)      |
//! | Log         | 1        | every 2000 ms (absolute)  | peek (no wait)     |

pub mod acquisition;
pub mod alert;
pub mod display;
pub mod log;

pub use acquisition::{AcquisitionState, AcquisitionTask};
pub use alert::AlertTask;
pub use display::DisplayTask;
pub use log::LogTask;
