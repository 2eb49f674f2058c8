//! envsense - Main entry point
//!
//! On ESP-IDF: DHT11 on GPIO1, log output on UART1 TX (GPIO6), display
//! mirrored to the console.
//! On a desktop: the same pipeline against a simulated sensor.

use envsense::config::AppConfig;
use envsense::hal::display::ConsoleDisplay;
use envsense::runtime::{App, Board};

#[cfg(target_os = "espidf")]
fn main() {
    use envsense::hal::counter::EspTimerCounter;
    use envsense::hal::line::OpenDrainLine;
    use envsense::hal::scheduler::FreeRtosScheduler;
    use envsense::hal::transport::{init_uart_transport, LogTransport, UartTransportConfig};
    use esp_idf_svc::hal::peripherals::Peripherals;

    static SCHEDULER: FreeRtosScheduler = FreeRtosScheduler;

    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();

    let peripherals = match Peripherals::take() {
        Ok(p) => p,
        Err(e) => {
            println!("[FATAL] peripherals: {:?}", e);
            return;
        }
    };

    let mut transport = match init_uart_transport(
        peripherals.uart1,
        peripherals.pins.gpio6,
        &UartTransportConfig::default(),
    ) {
        Ok(t) => t,
        Err(e) => {
            println!("[FATAL] uart: {:?}", e);
            return;
        }
    };

    let line = match OpenDrainLine::new(peripherals.pins.gpio1) {
        Ok(l) => l,
        Err(e) => {
            println!("[FATAL] data line: {:?}", e);
            return;
        }
    };

    let banner = format!("\r\n=== {} ===\r\n", envsense::VERSION);
    let _ = transport.write(banner.as_bytes());

    let board = Board {
        line,
        counter: EspTimerCounter,
        display: ConsoleDisplay::new(),
        transport,
        scheduler: &SCHEDULER,
    };

    match App::start(AppConfig::DEFAULT, board) {
        // Tasks run on; the main task can end
        Ok(app) => println!("[INIT] {} tasks started", app.tasks()),
        Err(e) => println!("[FATAL] {}", e),
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    use envsense::dht11::Frame;
    use envsense::hal::scheduler::HostScheduler;
    use envsense::hal::transport::{LogTransport, StdoutTransport};
    use envsense::sim::{PulseShape, SimCounter, SimLine, SimTime, Waveform};

    static SCHEDULER: HostScheduler = HostScheduler;

    let time = SimTime::default();
    // Slow drift through the alert range, with a corrupted frame every
    // tenth transaction and a missing sensor every seventeenth.
    let line = SimLine::scripted(time.clone(), |n| {
        if n % 17 == 16 {
            return Waveform::silent();
        }
        let temperature = 22 + (n % 12) as u8;
        let humidity = 45 + (n % 30) as u8;
        let mut frame = Frame::from_values(humidity, temperature);
        if n % 10 == 9 {
            frame.0[4] ^= 0x01;
        }
        Waveform::frame(&frame, &PulseShape::TYPICAL)
    });

    let mut transport = StdoutTransport;
    let banner = format!("=== {} (simulated sensor) ===\r\n", envsense::VERSION);
    let _ = transport.write(banner.as_bytes());

    let board = Board {
        line,
        counter: SimCounter::new(time),
        display: ConsoleDisplay::new(),
        transport,
        scheduler: &SCHEDULER,
    };

    match App::start(AppConfig::DEFAULT, board) {
        Ok(app) => app.park(),
        Err(e) => eprintln!("[FATAL] {}", e),
    }
}
