use std::fmt;

use serde::{Deserialize, Serialize};

/// Binary electrical state of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Low,
  High,
}

impl Level {
  /// The opposite level, used to toggle outputs.
  pub fn toggled(self) -> Level {
    match self {
      Level::Low => Level::High,
      Level::High => Level::Low,
    }
  }
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Level::Low => write!(f, "LOW"),
      Level::High => write!(f, "HIGH"),
    }
  }
}

/// Whether a pin drives its line or listens to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
  #[serde(rename = "input")]
  Input,
  #[serde(rename = "output")]
  Output,
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Direction::Input => write!(f, "INPUT"),
      Direction::Output => write!(f, "OUTPUT"),
    }
  }
}

/// Passive bias applied to an input line when nothing actively drives it.
///
/// Ignored for outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Pull {
  #[default]
  #[serde(rename = "none")]
  None,
  #[serde(rename = "up")]
  Up,
  #[serde(rename = "down")]
  Down,
}

impl fmt::Display for Pull {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Pull::None => write!(f, "none"),
      Pull::Up => write!(f, "up"),
      Pull::Down => write!(f, "down"),
    }
  }
}
