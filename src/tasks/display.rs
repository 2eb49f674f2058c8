//! Display task: one render per fresh reading.
//!
//! Uses the destructive `take`, so a reading is rendered exactly once and
//! the task sleeps until the next one arrives.

use core::fmt::Write;

use crate::hal::display::TextDisplay;
use crate::logging::LineBuf;
use crate::reading::Reading;
use crate::slot::LatestSlot;

/// Display line width budget.
pub const DISPLAY_LINE_CAPACITY: usize = 32;

pub type DisplayLine = LineBuf<DISPLAY_LINE_CAPACITY>;

/// The two lines shown for `reading`.
///
/// Error readings show the status code and never any numeric values.
pub fn render_lines(reading: &Reading) -> [DisplayLine; 2] {
    let mut top = DisplayLine::new();
    let mut bottom = DisplayLine::new();

    match reading.measurement() {
        Some((temperature, humidity)) => {
            let _ = write!(top, "Temp: {} C", temperature);
            let _ = write!(bottom, "Hum : {} %", humidity);
        }
        None => {
            let _ = write!(top, "Sensor Error");
            let _ = write!(bottom, "Status: {}", reading.status.code());
        }
    }

    [top, bottom]
}

pub struct DisplayTask<'a, D: TextDisplay> {
    slot: &'a LatestSlot,
    display: D,
}

impl<'a, D: TextDisplay> DisplayTask<'a, D> {
    pub fn new(slot: &'a LatestSlot, display: D) -> Self {
        Self { slot, display }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Clear, print both lines, flush.
    pub fn render(&mut self, reading: &Reading) {
        let [top, bottom] = render_lines(reading);
        self.display.clear();
        self.display.print_line(0, top.as_str());
        self.display.print_line(1, bottom.as_str());
        self.display.update();
    }

    /// Block for the next reading and render it.
    pub fn step(&mut self) -> Reading {
        let reading = self.slot.take();
        self.render(&reading);
        reading
    }

    pub fn run(mut self) -> ! {
        loop {
            self.step();
        }
    }
}
