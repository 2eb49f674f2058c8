//! Task spawning and application wiring.
//!
//! Builds the decoder, the slot and the shared transport, then starts the
//! four tasks at their configured priorities. Every shared object lives
//! for the rest of the program: tasks never return.
//!
//! On ESP-IDF, `std::thread` maps onto FreeRTOS tasks; the priority and
//! stack for the next spawn are set through `ThreadSpawnConfiguration`.

use std::thread::JoinHandle;

use crate::clock::BootClock;
use crate::config::{AppConfig, ConfigError};
use crate::dht11::Dht11;
use crate::hal::counter::TickCounter;
use crate::hal::display::TextDisplay;
use crate::hal::line::{DataLine, LineError};
use crate::hal::transport::{LogTransport, SharedTransport};
use crate::logging::LogStream;
use crate::slot::LatestSlot;
use crate::tasks::{AcquisitionTask, AlertTask, DisplayTask, LogTask};
use crate::timebase::Preemption;

/// Diagnostic stream shared by every task, drained by the log task.
pub static DIAGNOSTICS: LogStream = LogStream::new();

/// Name, priority and stack of one task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskSpec {
    /// NUL-terminated, as the RTOS expects.
    pub name: &'static [u8],
    pub priority: u8,
    pub stack_size: usize,
}

impl TaskSpec {
    pub const fn new(name: &'static [u8], priority: u8, stack_size: usize) -> Self {
        Self {
            name,
            priority,
            stack_size,
        }
    }

    /// Name without the terminator.
    pub fn display_name(&self) -> &'static str {
        let bytes = match self.name.split_last() {
            Some((0, rest)) => rest,
            _ => self.name,
        };
        core::str::from_utf8(bytes).unwrap_or("task")
    }
}

/// Task could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// R01: Spawn configuration rejected by the RTOS
    Config,
    /// R02: Thread creation failed
    Thread,
}

impl SpawnError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config => "R01",
            Self::Thread => "R02",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::Config => "spawn configuration rejected",
            Self::Thread => "thread creation failed",
        }
    }
}

impl core::fmt::Display for SpawnError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Start `body` as a task described by `spec`.
pub fn spawn<F>(spec: &TaskSpec, body: F) -> Result<JoinHandle<()>, SpawnError>
where
    F: FnOnce() + Send + 'static,
{
    #[cfg(target_os = "espidf")]
    {
        use esp_idf_svc::hal::task::thread::ThreadSpawnConfiguration;

        ThreadSpawnConfiguration {
            name: Some(spec.name),
            stack_size: spec.stack_size,
            priority: spec.priority,
            ..Default::default()
        }
        .set()
        .map_err(|_| SpawnError::Config)?;
    }

    let handle = std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_size)
        .spawn(body)
        .map_err(|_| SpawnError::Thread);

    #[cfg(target_os = "espidf")]
    {
        use esp_idf_svc::hal::task::thread::ThreadSpawnConfiguration;
        // Later spawns (from libraries) get the defaults back
        ThreadSpawnConfiguration::default()
            .set()
            .map_err(|_| SpawnError::Config)?;
    }

    handle
}

/// Application failed to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    Config(ConfigError),
    Line(LineError),
    Spawn(SpawnError),
}

impl From<ConfigError> for StartError {
    fn from(e: ConfigError) -> Self {
        StartError::Config(e)
    }
}

impl From<LineError> for StartError {
    fn from(e: LineError) -> Self {
        StartError::Line(e)
    }
}

impl From<SpawnError> for StartError {
    fn from(e: SpawnError) -> Self {
        StartError::Spawn(e)
    }
}

impl core::fmt::Display for StartError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {}", e),
            Self::Line(e) => write!(f, "data line: {}", e),
            Self::Spawn(e) => write!(f, "spawn: {}", e),
        }
    }
}

/// Hardware (or simulated hardware) the application runs on.
pub struct Board<L, C, D, T> {
    pub line: L,
    pub counter: C,
    pub display: D,
    pub transport: T,
    pub scheduler: &'static (dyn Preemption + Sync),
}

/// Running application.
pub struct App<T: LogTransport + Send + 'static> {
    transport: &'static SharedTransport<T>,
    handles: Vec<JoinHandle<()>>,
}

impl<T: LogTransport + Send + 'static> App<T> {
    /// Validate `config`, bring up the sensor and start all four tasks.
    pub fn start<L, C, D>(config: AppConfig, board: Board<L, C, D, T>) -> Result<Self, StartError>
    where
        L: DataLine + Send + 'static,
        C: TickCounter + Send + 'static,
        D: TextDisplay + Send + 'static,
    {
        config.validate()?;

        let Board {
            line,
            counter,
            display,
            transport,
            scheduler,
        } = board;

        let mut sensor = Dht11::new(line, counter, config.timing);
        sensor.init()?;

        let slot: &'static LatestSlot = Box::leak(Box::new(LatestSlot::new()));
        let transport: &'static SharedTransport<T> =
            Box::leak(Box::new(SharedTransport::new(transport)));
        let clock = BootClock::new();
        let prio = config.priorities;
        let periods = config.periods;
        let stack = config.stack_size;

        let mut handles = Vec::with_capacity(4);

        handles.push(spawn(
            &TaskSpec::new(b"acquisition\0", prio.acquisition, stack),
            move || {
                AcquisitionTask::new(sensor, scheduler, clock, slot, &DIAGNOSTICS)
                    .run(periods.acquisition_ms);
            },
        )?);

        handles.push(spawn(
            &TaskSpec::new(b"display\0", prio.display, stack),
            move || {
                DisplayTask::new(slot, display).run();
            },
        )?);

        let limits = config.alert;
        handles.push(spawn(&TaskSpec::new(b"alert\0", prio.alert, stack), move || {
            AlertTask::new(slot, transport, limits, periods.alert_peek_ms).run(periods.alert_ms);
        })?);

        let level = config.log_level;
        handles.push(spawn(&TaskSpec::new(b"log\0", prio.log, stack), move || {
            LogTask::new(slot, transport, &DIAGNOSTICS, level).run(periods.log_ms);
        })?);

        Ok(Self {
            transport,
            handles,
        })
    }

    pub fn transport(&self) -> &'static SharedTransport<T> {
        self.transport
    }

    /// Number of tasks started.
    pub fn tasks(&self) -> usize {
        self.handles.len()
    }

    /// Block the caller for good. Tasks never finish.
    pub fn park(self) -> ! {
        for handle in self.handles {
            let _ = handle.join();
        }
        loop {
            std::thread::park();
        }
    }
}
