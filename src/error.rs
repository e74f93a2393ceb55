use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{hardware::HardwareError, pin::Direction};

pub type PanelResult<T> = Result<T, PanelError>;

#[derive(Debug, Error)]
pub enum PanelError {
  #[error("GPIO{0} is not a GPIO line on this header")]
  UnknownPin(u8),
  #[error("GPIO{0} has not been set up")]
  NotConfigured(u8),
  #[error("GPIO{pin} is configured as {direction}")]
  WrongDirection { pin: u8, direction: Direction },
  #[error(transparent)]
  Hardware(#[from] HardwareError),
  #[error("config file {} is corrupt: {source}", .path.display())]
  ConfigCorrupt { path: PathBuf, source: serde_json::Error },
  #[error("could not write config file {}: {source}", .path.display())]
  ConfigPersist { path: PathBuf, source: io::Error },
}
