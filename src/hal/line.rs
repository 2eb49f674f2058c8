//! Bidirectional single-wire data line.

/// Logic level on the data line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    #[inline]
    pub const fn from_high(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Pin direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineMode {
    /// Released: the pull-up and the sensor own the level.
    Input,
    /// Host drives the level.
    Output,
}

/// Line driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    /// L01: Could not change pin direction
    Mode,
    /// L02: Could not drive the requested level
    Drive,
}

impl LineError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Mode => "L01",
            Self::Drive => "L02",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::Mode => "pin mode change failed",
            Self::Drive => "pin drive failed",
        }
    }
}

impl core::fmt::Display for LineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// The sensor data pin.
///
/// Reading the level is infallible: on every supported target it is a
/// register read. Direction and drive changes may fail in the driver.
pub trait DataLine {
    fn set_mode(&mut self, mode: LineMode) -> Result<(), LineError>;
    fn set_level(&mut self, level: Level) -> Result<(), LineError>;
    fn level(&self) -> Level;
}

impl<L: DataLine + ?Sized> DataLine for &mut L {
    fn set_mode(&mut self, mode: LineMode) -> Result<(), LineError> {
        (**self).set_mode(mode)
    }

    fn set_level(&mut self, level: Level) -> Result<(), LineError> {
        (**self).set_level(level)
    }

    fn level(&self) -> Level {
        (**self).level()
    }
}

#[cfg(target_os = "espidf")]
pub use esp::OpenDrainLine;

#[cfg(target_os = "espidf")]
mod esp {
    use super::{DataLine, Level, LineError, LineMode};
    use esp_idf_svc::hal::gpio::{InputOutput, InputPin, OutputPin, PinDriver, Pull};
    use esp_idf_svc::hal::peripheral::Peripheral;
    use esp_idf_svc::sys::EspError;

    /// Open-drain GPIO with internal pull-up.
    ///
    /// "Input" is the released state: the driver stops sinking current and
    /// the pull-up (or the sensor) sets the level. The input buffer stays
    /// enabled in both modes, so no reconfiguration happens mid-transaction.
    pub struct OpenDrainLine<'d, T: InputPin + OutputPin> {
        pin: PinDriver<'d, T, InputOutput>,
    }

    impl<'d, T: InputPin + OutputPin> OpenDrainLine<'d, T> {
        pub fn new(pin: impl Peripheral<P = T> + 'd) -> Result<Self, EspError> {
            let mut pin = PinDriver::input_output_od(pin)?;
            pin.set_pull(Pull::Up)?;
            pin.set_high()?;
            Ok(Self { pin })
        }
    }

    impl<T: InputPin + OutputPin> DataLine for OpenDrainLine<'_, T> {
        fn set_mode(&mut self, mode: LineMode) -> Result<(), LineError> {
            match mode {
                LineMode::Input => self.pin.set_high().map_err(|_| LineError::Mode),
                LineMode::Output => Ok(()),
            }
        }

        fn set_level(&mut self, level: Level) -> Result<(), LineError> {
            match level {
                Level::Low => self.pin.set_low(),
                Level::High => self.pin.set_high(),
            }
            .map_err(|_| LineError::Drive)
        }

        fn level(&self) -> Level {
            Level::from_high(self.pin.is_high())
        }
    }
}
