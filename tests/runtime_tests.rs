//! Application start-up tests
//!
//! The full app runs on the simulated board with shortened periods. Tasks
//! never return, so they keep running in the background after each test.

use std::thread;
use std::time::Duration;

use envsense::config::{AppConfig, ConfigError, ProtocolTiming, TaskPeriods};
use envsense::dht11::Frame;
use envsense::hal::scheduler::HostScheduler;
use envsense::runtime::{App, Board, StartError};
use envsense::sim::{
    MemoryTransport, PulseShape, RecordingDisplay, SimCounter, SimLine, SimTime, Waveform,
};

static SCHEDULER: HostScheduler = HostScheduler;

type SimBoard = Board<SimLine, SimCounter, RecordingDisplay, MemoryTransport>;

fn board(humidity: u8, temperature: u8) -> SimBoard {
    let time = SimTime::default();
    let wave = Waveform::frame(&Frame::from_values(humidity, temperature), &PulseShape::TYPICAL);
    Board {
        line: SimLine::new(time.clone(), wave),
        counter: SimCounter::new(time),
        display: RecordingDisplay::new(),
        transport: MemoryTransport::new(),
        scheduler: &SCHEDULER,
    }
}

#[test]
fn test_app_runs_every_task() {
    let config = AppConfig {
        periods: TaskPeriods {
            acquisition_ms: 50,
            log_ms: 50,
            alert_ms: 10,
            alert_peek_ms: 10,
        },
        ..AppConfig::DEFAULT
    };

    let app = match App::start(config, board(40, 31)) {
        Ok(app) => app,
        Err(e) => panic!("start failed: {}", e),
    };
    assert_eq!(app.tasks(), 4);

    thread::sleep(Duration::from_millis(500));

    let out = app.transport().with(|t| t.writes().to_vec());
    assert!(out.iter().any(|w| w == "ALERT! T=31C H=40%\r\n"));
    assert!(out
        .iter()
        .any(|w| w.starts_with("[t=") && w.ends_with("] T=31C H=40%\r\n")));
}

#[test]
fn test_app_rejects_invalid_timing() {
    let config = AppConfig {
        timing: ProtocolTiming {
            start_low_us: 17_000,
            ..ProtocolTiming::DEFAULT
        },
        ..AppConfig::DEFAULT
    };

    let err = App::start(config, board(40, 22)).err();
    assert_eq!(err, Some(StartError::Config(ConfigError::StartPulseTooShort)));
}

#[test]
fn test_app_rejects_zero_period() {
    let config = AppConfig {
        periods: TaskPeriods {
            log_ms: 0,
            ..TaskPeriods::DEFAULT
        },
        ..AppConfig::DEFAULT
    };

    let err = App::start(config, board(40, 22)).err();
    assert_eq!(err, Some(StartError::Config(ConfigError::ZeroPeriod)));
}
