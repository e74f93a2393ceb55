//! Hardware backend for the Raspberry Pi's GPIO block, via rppal.

use std::collections::HashMap;

use rppal::gpio::{Gpio, InputPin, OutputPin};

use super::{GpioDriver, HardwareError};
use crate::pin::{Direction, Level, Pull};

/// Lines are addressed by BCM number, never by physical position.
#[derive(Debug, Default)]
pub struct RppalDriver {
  gpio: Option<Gpio>,
  lines: HashMap<u8, Line>,
}

#[derive(Debug)]
enum Line {
  Input(InputPin),
  Output(OutputPin),
}

impl RppalDriver {
  pub fn new() -> RppalDriver {
    RppalDriver::default()
  }

  fn gpio(&self) -> Result<&Gpio, HardwareError> {
    self
      .gpio
      .as_ref()
      .ok_or_else(|| HardwareError::Unavailable("driver was not opened".to_string()))
  }
}

impl GpioDriver for RppalDriver {
  fn open(&mut self) -> Result<(), HardwareError> {
    self.gpio = Some(Gpio::new()?);
    Ok(())
  }

  fn configure(&mut self, pin: u8, direction: Direction, pull: Pull) -> Result<(), HardwareError> {
    // drop any previous claim so rppal lets us re-acquire the line
    let _ = self.lines.remove(&pin);

    let line = self.gpio()?.get(pin)?;
    let line = match direction {
      Direction::Output => Line::Output(line.into_output()),
      Direction::Input => Line::Input(match pull {
        Pull::None => line.into_input(),
        Pull::Up => line.into_input_pullup(),
        Pull::Down => line.into_input_pulldown(),
      }),
    };
    let _ = self.lines.insert(pin, line);
    Ok(())
  }

  fn write(&mut self, pin: u8, level: Level) -> Result<(), HardwareError> {
    match self.lines.get_mut(&pin) {
      Some(Line::Output(out)) => {
        match level {
          Level::High => out.set_high(),
          Level::Low => out.set_low(),
        }
        Ok(())
      }
      Some(Line::Input(_)) => Err(HardwareError::WrongMode(pin)),
      None => Err(HardwareError::Unclaimed(pin)),
    }
  }

  fn read(&mut self, pin: u8) -> Result<Level, HardwareError> {
    match self.lines.get(&pin) {
      Some(Line::Input(input)) => Ok(match input.read() {
        rppal::gpio::Level::High => Level::High,
        rppal::gpio::Level::Low => Level::Low,
      }),
      Some(Line::Output(_)) => Err(HardwareError::WrongMode(pin)),
      None => Err(HardwareError::Unclaimed(pin)),
    }
  }

  fn release_all(&mut self) -> Result<(), HardwareError> {
    // rppal resets each pin when its handle drops
    self.lines.clear();
    Ok(())
  }

  fn describe(&self) -> &'static str {
    "Raspberry Pi GPIO"
  }
}
