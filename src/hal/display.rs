//! Text display collaborator.

/// A small line-addressed text display.
///
/// The rendering driver owns its framebuffer; the core only hands it
/// pre-formatted short lines and asks it to push them out.
pub trait TextDisplay {
    fn clear(&mut self);
    fn print_line(&mut self, line: u8, text: &str);
    fn update(&mut self);
}

/// Display that mirrors its frame to the console.
///
/// Stands in for the panel driver on boards without one attached.
#[cfg(feature = "std")]
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    lines: [heapless::String<32>; 2],
}

#[cfg(feature = "std")]
impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "std")]
impl TextDisplay for ConsoleDisplay {
    fn clear(&mut self) {
        for line in self.lines.iter_mut() {
            line.clear();
        }
    }

    fn print_line(&mut self, line: u8, text: &str) {
        if let Some(slot) = self.lines.get_mut(line as usize) {
            slot.clear();
            for c in text.chars() {
                if slot.push(c).is_err() {
                    break;
                }
            }
        }
    }

    fn update(&mut self) {
        println!("| {:<16} | {:<16} |", self.lines[0].as_str(), self.lines[1].as_str());
    }
}
