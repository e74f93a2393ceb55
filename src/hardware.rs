//! GPIO backends behind a common capability trait.
//!
//! The session only ever talks to a [`GpioDriver`]; whether that driver moves
//! real silicon or a map in memory is decided by the `arm` feature.

use std::collections::HashMap;

use thiserror::Error;

use crate::pin::{Direction, Level, Pull};

#[cfg(feature = "arm")]
pub mod raspi;

#[derive(Debug, Error)]
pub enum HardwareError {
  /// The GPIO peripheral itself could not be reached.
  #[error("GPIO peripheral unavailable: {0}")]
  Unavailable(String),
  /// The driver holds no claimed line for this pin.
  #[error("GPIO{0} is not claimed by the driver")]
  Unclaimed(u8),
  /// The line is claimed, but not in a mode that allows the operation.
  #[error("GPIO{0} is claimed in the wrong mode")]
  WrongMode(u8),
  #[cfg(feature = "arm")]
  #[error(transparent)]
  Rppal(#[from] rppal::gpio::Error),
}

/// The primitive pin operations the session builds on.
pub trait GpioDriver {
  /// Acquire the GPIO peripheral. Called once at session start.
  fn open(&mut self) -> Result<(), HardwareError>;

  /// Claim `pin` with the given direction, applying `pull` to inputs.
  ///
  /// Reclaiming an already-claimed pin replaces its previous mode.
  fn configure(&mut self, pin: u8, direction: Direction, pull: Pull) -> Result<(), HardwareError>;

  /// Drive a claimed output line.
  fn write(&mut self, pin: u8, level: Level) -> Result<(), HardwareError>;

  /// Sample a claimed input line.
  fn read(&mut self, pin: u8) -> Result<Level, HardwareError>;

  /// Release every claimed line back to its power-on state.
  fn release_all(&mut self) -> Result<(), HardwareError>;

  /// Short backend name for the banner.
  fn describe(&self) -> &'static str;
}

/// Software backend holding line state in an owned map.
///
/// Reads return the last written level, LOW until something is written. Each
/// instance is fully independent, so tests can run any number of sessions
/// side by side.
#[derive(Debug, Default)]
pub struct SimDriver {
  lines: HashMap<u8, SimLine>,
}

#[derive(Debug)]
struct SimLine {
  direction: Direction,
  pull: Pull,
  level: Level,
}

impl SimDriver {
  pub fn new() -> SimDriver {
    SimDriver::default()
  }
}

impl GpioDriver for SimDriver {
  fn open(&mut self) -> Result<(), HardwareError> {
    Ok(())
  }

  fn configure(&mut self, pin: u8, direction: Direction, pull: Pull) -> Result<(), HardwareError> {
    let _ = self.lines.insert(
      pin,
      SimLine {
        direction,
        pull,
        level: Level::Low,
      },
    );
    Ok(())
  }

  // the simulator is not a direction cop: writes land on any claimed line,
  // which doubles as a way to feed simulated signals into inputs
  fn write(&mut self, pin: u8, level: Level) -> Result<(), HardwareError> {
    match self.lines.get_mut(&pin) {
      Some(line) => {
        line.level = level;
        Ok(())
      }
      None => Err(HardwareError::Unclaimed(pin)),
    }
  }

  fn read(&mut self, pin: u8) -> Result<Level, HardwareError> {
    match self.lines.get(&pin) {
      Some(line) => Ok(line.level),
      None => Err(HardwareError::Unclaimed(pin)),
    }
  }

  fn release_all(&mut self) -> Result<(), HardwareError> {
    self.lines.clear();
    Ok(())
  }

  fn describe(&self) -> &'static str {
    "simulated GPIO"
  }
}
