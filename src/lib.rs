//! # envsense
//!
//! DHT11 environmental monitor with a latest-value task pipeline.
//!
//! ## Architecture
//!
//! ```text
//!              ┌──────────────┐   publish   ┌──────┐   take    ┌─────────┐
//! DHT11 ──────▶│ Acquisition  │────────────▶│ slot │──────────▶│ Display │
//! (1-wire)     │ (decoder)    │             │ [R]  │── peek ──▶│ Alert   │
//!              └──────┬───────┘             └──────┘── peek ──▶│ Log     │
//!                     │ rt_warn!/rt_debug!                     └────┬────┘
//!                     └──────────▶ LogStream ──── drain ────────────┘
//! ```
//!
//! - The slot holds at most one Reading; a new one always replaces the old
//! - Failed reads are published too, with an error status
//! - The 40-bit frame is decoded with preemption held off, then released
//!
//! Decoder and timebase are `no_std`; the slot, the tasks and the host
//! simulation need the `std` feature (ESP-IDF std or a desktop OS).

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod config;
pub mod dht11;
pub mod hal;
pub mod logging;
pub mod reading;
pub mod timebase;

pub mod clock;
#[cfg(feature = "std")]
pub mod runtime;
#[cfg(all(feature = "std", not(target_os = "espidf")))]
pub mod sim;
#[cfg(feature = "std")]
pub mod slot;
#[cfg(feature = "std")]
pub mod tasks;

/// Build identification, e.g. `envsense v0.1.0-g1a2b3c4`.
pub const VERSION: &str = env!("VERSION_STRING");

pub use config::{AppConfig, ProtocolTiming};
pub use dht11::{Dht11, Frame, Measurement, Phase, SensorError};
pub use logging::{LogLevel, LogStream};
pub use reading::{Reading, SensorStatus};
pub use timebase::{Preemption, Timebase, Uninterruptible};

#[cfg(feature = "std")]
pub use slot::{LatestSlot, Wait};
