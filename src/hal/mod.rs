//! Hardware Abstraction Layer for envsense.
//!
//! Thin traits for the collaborators the core drives, with ESP-IDF
//! implementations behind `cfg(target_os = "espidf")`.
//! Business logic stays in core modules, HAL is just I/O.

pub mod counter;
pub mod display;
pub mod line;
pub mod scheduler;
pub mod transport;

pub use counter::TickCounter;
pub use display::TextDisplay;
pub use line::{DataLine, Level, LineError, LineMode};
pub use transport::{LogTransport, TransportError, LOG_LINE_CAPACITY};
