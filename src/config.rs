//! The persisted pin-configuration snapshot and its on-disk home.

use std::{
  collections::BTreeMap,
  env, fs, io,
  path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
  error::{PanelError, PanelResult},
  pin::{Direction, Pull},
};

/// The persisted subset of a pin's configuration.
///
/// There is deliberately no level field: outputs always restart LOW, and an
/// input's level belongs to the wire, not the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPin {
  pub direction: Direction,
  #[serde(default)]
  pub pull: Pull,
  #[serde(default)]
  pub name: String,
}

/// Every configured pin, keyed and ordered by BCM number.
///
/// Serialized as a JSON object whose keys are the numbers as text.
pub type Snapshot = BTreeMap<u8, SavedPin>;

/// Reads and rewrites the snapshot file.
///
/// The file always reflects the last successful mutation; the session calls
/// [`ConfigStore::save`] inline after every change.
#[derive(Debug)]
pub struct ConfigStore {
  path: PathBuf,
}

impl ConfigStore {
  pub fn new(path: PathBuf) -> ConfigStore {
    ConfigStore { path }
  }

  /// Store at the canonical per-user location.
  pub fn default_location() -> ConfigStore {
    ConfigStore::new(default_path())
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load the snapshot. A missing file is an empty snapshot; a file that
  /// exists but does not parse is [`PanelError::ConfigCorrupt`].
  pub fn load(&self) -> PanelResult<Snapshot> {
    let raw = match fs::read_to_string(&self.path) {
      Ok(raw) => raw,
      Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Snapshot::new()),
      Err(err) => {
        return Err(PanelError::ConfigCorrupt {
          path: self.path.clone(),
          source: serde_json::Error::io(err),
        })
      }
    };
    serde_json::from_str(&raw).map_err(|source| PanelError::ConfigCorrupt {
      path: self.path.clone(),
      source,
    })
  }

  /// Rewrite the snapshot in full, creating parent directories on first use.
  pub fn save(&self, snapshot: &Snapshot) -> PanelResult<()> {
    let persist_err = |source: io::Error| PanelError::ConfigPersist {
      path: self.path.clone(),
      source,
    };

    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).map_err(persist_err)?;
    }
    let raw = serde_json::to_string_pretty(snapshot).map_err(|source| persist_err(source.into()))?;
    fs::write(&self.path, raw).map_err(persist_err)
  }

  /// Adopt a snapshot from `old_path` if the canonical file does not exist
  /// yet. Returns whether anything was moved.
  ///
  /// Falls back to copy + remove when a rename crosses filesystems. Purely
  /// deployment glue for installs that predate the XDG location.
  pub fn migrate_legacy(&self, old_path: &Path) -> io::Result<bool> {
    if !old_path.exists() || self.path.exists() {
      return Ok(false);
    }
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    if fs::rename(old_path, &self.path).is_err() {
      let _ = fs::copy(old_path, &self.path)?;
      let _ = fs::remove_file(old_path);
    }
    Ok(true)
  }
}

/// `$XDG_CONFIG_HOME/gpio-panel/gpio_config.json`, falling back to
/// `~/.config` when XDG is not set.
pub fn default_path() -> PathBuf {
  let config_home = env::var_os("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .filter(|path| !path.as_os_str().is_empty())
    .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
    .unwrap_or_else(|| PathBuf::from(".config"));
  config_home.join("gpio-panel").join("gpio_config.json")
}

/// Where the config lived before it moved under XDG: the working directory.
pub fn legacy_path() -> PathBuf {
  PathBuf::from("gpio_config.json")
}
