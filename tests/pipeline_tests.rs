//! Acquisition-to-consumer pipeline tests
//!
//! Tasks are driven one step at a time against the simulated sensor, a
//! manual clock and in-memory collaborators.

use envsense::clock::ManualClock;
use envsense::config::{AlertThresholds, ProtocolTiming};
use envsense::dht11::{Dht11, Frame, Phase};
use envsense::hal::transport::SharedTransport;
use envsense::logging::{LogLevel, LogStream};
use envsense::reading::{Reading, SensorStatus};
use envsense::sim::{
    CountingScheduler, DisplayOp, MemoryTransport, PulseShape, RecordingDisplay, SimCounter,
    SimLine, SimTime, Waveform,
};
use envsense::slot::{LatestSlot, Wait};
use envsense::tasks::{AcquisitionState, AcquisitionTask, AlertTask, DisplayTask, LogTask};

fn make_sensor(waveform: Waveform) -> Dht11<SimLine, SimCounter> {
    let time = SimTime::default();
    let line = SimLine::new(time.clone(), waveform);
    let mut sensor = Dht11::new(line, SimCounter::new(time), ProtocolTiming::DEFAULT);
    sensor.init().unwrap();
    sensor
}

fn frame_wave(humidity: u8, temperature: u8) -> Waveform {
    Waveform::frame(&Frame::from_values(humidity, temperature), &PulseShape::TYPICAL)
}

fn writes(transport: &SharedTransport<MemoryTransport>) -> Vec<String> {
    transport.with(|t| t.writes().to_vec())
}

// ============================================================================
// Acquisition
// ============================================================================

#[test]
fn test_acquisition_publishes_valid_reading() {
    let scheduler = CountingScheduler::new();
    let clock = ManualClock::new(2000);
    let slot = LatestSlot::new();
    let log: LogStream = LogStream::new();

    let mut task = AcquisitionTask::new(make_sensor(frame_wave(48, 23)), &scheduler, &clock, &slot, &log);
    let reading = task.cycle();

    assert_eq!(reading, Reading::ok(23, 48, 2000));
    assert_eq!(slot.peek(Wait::NoWait), Some(reading));
    assert_eq!(task.state(), AcquisitionState::Idle);
    assert_eq!(scheduler.depth(), 0);
}

#[test]
fn test_acquisition_publishes_error_reading() {
    let scheduler = CountingScheduler::new();
    let clock = ManualClock::new(4000);
    let slot = LatestSlot::new();
    let log: LogStream = LogStream::new();

    let mut task = AcquisitionTask::new(make_sensor(Waveform::silent()), &scheduler, &clock, &slot, &log);
    let reading = task.cycle();

    assert_eq!(reading.status, SensorStatus::ErrTimeout);
    assert_eq!(reading.timestamp_ms, 4000);
    assert_eq!(reading.measurement(), None);
    assert_eq!(slot.peek(Wait::NoWait), Some(reading));

    let entry = log.drain().unwrap();
    assert_eq!(entry.level, LogLevel::Warn);
    assert_eq!(entry.text(), "read failed: E01: sensor timeout (ack)");
}

#[test]
fn test_acquisition_replaces_unconsumed_reading() {
    let scheduler = CountingScheduler::new();
    let clock = ManualClock::new(0);
    let slot = LatestSlot::new();
    let log: LogStream = LogStream::new();

    let sensor = make_sensor(frame_wave(40, 20));
    sensor.line().queue(frame_wave(41, 21));
    let mut task = AcquisitionTask::new(sensor, &scheduler, &clock, &slot, &log);

    task.cycle();
    clock.advance(2000);
    task.cycle();

    assert_eq!(slot.take(), Reading::ok(20, 40, 2000));
    assert_eq!(slot.peek(Wait::NoWait), None);
}

#[test]
fn test_acquisition_recovers_after_failure() {
    let scheduler = CountingScheduler::new();
    let clock = ManualClock::new(0);
    let slot = LatestSlot::new();
    let log: LogStream = LogStream::new();

    let wave = frame_wave(52, 25);
    let sensor = make_sensor(wave.clone());
    let mut corrupt = Frame::from_values(52, 25);
    corrupt.0[0] ^= 0x10;
    sensor.line().queue(Waveform::frame(&corrupt, &PulseShape::TYPICAL));
    sensor.line().queue(wave.withhold_phase(Phase::BitHigh(5)));
    let mut task = AcquisitionTask::new(sensor, &scheduler, &clock, &slot, &log);

    assert_eq!(task.cycle().status, SensorStatus::ErrCrc);
    assert_eq!(task.cycle().status, SensorStatus::ErrTimeout);
    assert_eq!(task.cycle(), Reading::ok(25, 52, 0));
    assert_eq!(scheduler.entered(), 3);
}

// ============================================================================
// Display
// ============================================================================

#[test]
fn test_display_renders_values() {
    let slot = LatestSlot::new();
    let mut task = DisplayTask::new(&slot, RecordingDisplay::new());

    slot.publish(Reading::ok(24, 55, 2000));
    task.step();

    assert_eq!(
        task.display().ops(),
        &[
            DisplayOp::Clear,
            DisplayOp::Line(0, "Temp: 24 C".to_string()),
            DisplayOp::Line(1, "Hum : 55 %".to_string()),
            DisplayOp::Update,
        ]
    );
    assert!(slot.is_empty());
}

#[test]
fn test_display_renders_timeout_error() {
    let slot = LatestSlot::new();
    let mut task = DisplayTask::new(&slot, RecordingDisplay::new());

    slot.publish(Reading::failed(SensorStatus::ErrTimeout, 2000));
    task.step();

    assert_eq!(task.display().printed(), vec!["Sensor Error", "Status: 1"]);
    assert_eq!(task.display().updates(), 1);
}

#[test]
fn test_display_renders_each_reading_once() {
    let slot = LatestSlot::new();
    let mut task = DisplayTask::new(&slot, RecordingDisplay::new());

    slot.publish(Reading::ok(20, 40, 0));
    slot.publish(Reading::ok(21, 41, 2000));
    task.step();

    // The replaced reading never reaches the display
    assert_eq!(task.display().printed(), vec!["Temp: 21 C", "Hum : 41 %"]);
}

// ============================================================================
// Alert
// ============================================================================

#[test]
fn test_alert_on_high_temperature() {
    let slot = LatestSlot::new();
    let transport = SharedTransport::new(MemoryTransport::new());
    let mut task = AlertTask::new(&slot, &transport, AlertThresholds::DEFAULT, 0);

    slot.publish(Reading::ok(31, 40, 2000));
    assert!(task.step());
    assert_eq!(writes(&transport), vec!["ALERT! T=31C H=40%\r\n"]);
}

#[test]
fn test_no_alert_in_range() {
    let slot = LatestSlot::new();
    let transport = SharedTransport::new(MemoryTransport::new());
    let mut task = AlertTask::new(&slot, &transport, AlertThresholds::DEFAULT, 0);

    slot.publish(Reading::ok(20, 40, 2000));
    assert!(!task.step());
    assert!(writes(&transport).is_empty());
}

#[test]
fn test_alert_repeats_every_wake() {
    let slot = LatestSlot::new();
    let transport = SharedTransport::new(MemoryTransport::new());
    let mut task = AlertTask::new(&slot, &transport, AlertThresholds::DEFAULT, 0);

    slot.publish(Reading::ok(22, 75, 2000));
    assert!(task.step());
    assert!(task.step());
    assert_eq!(writes(&transport).len(), 2);
    // Peek leaves the reading for the display
    assert!(!slot.is_empty());
}

#[test]
fn test_no_alert_for_error_reading() {
    let slot = LatestSlot::new();
    let transport = SharedTransport::new(MemoryTransport::new());
    let mut task = AlertTask::new(&slot, &transport, AlertThresholds::DEFAULT, 0);

    slot.publish(Reading::failed(SensorStatus::ErrCrc, 2000));
    assert!(!task.step());
}

#[test]
fn test_alert_waits_out_empty_slot() {
    let slot = LatestSlot::new();
    let transport = SharedTransport::new(MemoryTransport::new());
    let mut task = AlertTask::new(&slot, &transport, AlertThresholds::DEFAULT, 20);

    let start = std::time::Instant::now();
    assert!(!task.step());
    assert!(start.elapsed() >= std::time::Duration::from_millis(20));
}

#[test]
fn test_alert_counts_transport_failures() {
    let slot = LatestSlot::new();
    let transport = SharedTransport::new(MemoryTransport::new());
    transport.with(|t| t.set_failing(true));
    let mut task = AlertTask::new(&slot, &transport, AlertThresholds::DEFAULT, 0);

    slot.publish(Reading::ok(31, 40, 2000));
    assert!(task.step());
    assert!(task.step());
    assert_eq!(task.write_failures(), 2);
    assert!(writes(&transport).is_empty());
}

// ============================================================================
// Log
// ============================================================================

#[test]
fn test_log_waiting_before_first_reading() {
    let slot = LatestSlot::new();
    let transport = SharedTransport::new(MemoryTransport::new());
    let log: LogStream = LogStream::new();
    let mut task = LogTask::new(&slot, &transport, &log, LogLevel::Info);

    task.step();
    assert_eq!(writes(&transport), vec!["Waiting for first sensor reading...\r\n"]);
}

#[test]
fn test_log_status_then_diagnostics() {
    let scheduler = CountingScheduler::new();
    let clock = ManualClock::new(2000);
    let slot = LatestSlot::new();
    let log: LogStream = LogStream::new();
    let transport = SharedTransport::new(MemoryTransport::new());

    let mut acquisition =
        AcquisitionTask::new(make_sensor(Waveform::silent()), &scheduler, &clock, &slot, &log);
    let mut logger = LogTask::new(&slot, &transport, &log, LogLevel::Info);

    acquisition.cycle();
    logger.step();

    let out = writes(&transport);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0], "[t=2000] Sensor error=1\r\n");
    assert_eq!(out[1], "[      2000] WARN: read failed: E01: sensor timeout (ack)\r\n");
    assert_eq!(log.pending(), 0);
}

#[test]
fn test_log_filters_debug_entries() {
    let scheduler = CountingScheduler::new();
    let clock = ManualClock::new(6000);
    let slot = LatestSlot::new();
    let log: LogStream = LogStream::new();
    let transport = SharedTransport::new(MemoryTransport::new());

    let mut acquisition =
        AcquisitionTask::new(make_sensor(frame_wave(51, 24)), &scheduler, &clock, &slot, &log);
    let mut logger = LogTask::new(&slot, &transport, &log, LogLevel::Info);

    acquisition.cycle();
    logger.step();

    // Successful cycles log at debug only
    assert_eq!(writes(&transport), vec!["[t=6000] T=24C H=51%\r\n"]);
    assert_eq!(log.pending(), 0);
}

#[test]
fn test_log_reports_dropped_entries() {
    let slot = LatestSlot::new();
    let transport = SharedTransport::new(MemoryTransport::new());
    let log: LogStream = LogStream::new();

    for n in 0..40u32 {
        envsense::rt_error!(&log, n, "fault {}", n);
    }
    let mut task = LogTask::new(&slot, &transport, &log, LogLevel::Info);
    task.drain_diagnostics();

    let out = writes(&transport);
    assert_eq!(out.len(), 33);
    assert_eq!(out[32], "[WARN] Dropped: 8\r\n");
}

#[test]
fn test_log_counts_transport_failures() {
    let slot = LatestSlot::new();
    let transport = SharedTransport::new(MemoryTransport::new());
    transport.with(|t| t.set_failing(true));
    let log: LogStream = LogStream::new();
    let mut task = LogTask::new(&slot, &transport, &log, LogLevel::Info);

    task.step();
    task.step();
    assert_eq!(task.write_failures(), 2);
}

// ============================================================================
// Whole pipeline
// ============================================================================

#[test]
fn test_one_reading_reaches_every_consumer() {
    let scheduler = CountingScheduler::new();
    let clock = ManualClock::new(2000);
    let slot = LatestSlot::new();
    let log: LogStream = LogStream::new();
    let transport = SharedTransport::new(MemoryTransport::new());

    let mut acquisition =
        AcquisitionTask::new(make_sensor(frame_wave(72, 29)), &scheduler, &clock, &slot, &log);
    let mut alert = AlertTask::new(&slot, &transport, AlertThresholds::DEFAULT, 0);
    let mut logger = LogTask::new(&slot, &transport, &log, LogLevel::Info);
    let mut display = DisplayTask::new(&slot, RecordingDisplay::new());

    acquisition.cycle();
    assert!(alert.step());
    logger.step();
    display.step();

    assert_eq!(
        writes(&transport),
        vec!["ALERT! T=29C H=72%\r\n", "[t=2000] T=29C H=72%\r\n"]
    );
    assert_eq!(display.display().printed(), vec!["Temp: 29 C", "Hum : 72 %"]);

    // Display took it; later peeks find nothing
    assert!(!alert.step());
    assert_eq!(slot.peek(Wait::NoWait), None);
}
