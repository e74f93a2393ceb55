//! The in-memory authority over configured pins.
//!
//! The session owns the configuration map, mediates every driver call and
//! rewrites the persisted snapshot after each mutation. Nothing else in the
//! crate touches the driver or the store.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::{
  config::{self, ConfigStore, SavedPin, Snapshot},
  error::{PanelError, PanelResult},
  hardware::{GpioDriver, HardwareError},
  header,
  pin::{Direction, Level, Pull},
};

/// How a configured pin currently behaves.
///
/// The shape encodes two invariants: only outputs carry a cached level, and
/// only inputs carry a bias setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinState {
  /// Drives the line; `level` is whatever was last written.
  Output { name: String, level: Level },
  /// Listens to the line; its level is read live, never cached.
  Input { name: String, pull: Pull },
}

impl PinState {
  pub fn direction(&self) -> Direction {
    match self {
      PinState::Output { .. } => Direction::Output,
      PinState::Input { .. } => Direction::Input,
    }
  }

  pub fn name(&self) -> &str {
    match self {
      PinState::Output { name, .. } | PinState::Input { name, .. } => name,
    }
  }

  fn saved(&self) -> SavedPin {
    match self {
      PinState::Output { name, .. } => SavedPin {
        direction: Direction::Output,
        pull: Pull::None,
        name: name.clone(),
      },
      PinState::Input { name, pull } => SavedPin {
        direction: Direction::Input,
        pull: *pull,
        name: name.clone(),
      },
    }
  }
}

/// What the header diagram should show for one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Unconfigured,
  OutHigh,
  OutLow,
  InHigh,
  InLow,
  ReadError,
}

/// One row of the configured-pin listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinDetail {
  pub bcm: u8,
  pub direction: Direction,
  /// `None` when a live input probe failed.
  pub level: Option<Level>,
  /// `None` for outputs, where a bias resistor has no effect.
  pub pull: Option<Pull>,
  pub name: String,
}

pub struct Session {
  driver: Box<dyn GpioDriver>,
  store: ConfigStore,
  pins: BTreeMap<u8, PinState>,
}

impl Session {
  /// Open the driver, adopt any legacy config file, load the snapshot and
  /// restore it to the hardware.
  ///
  /// None of that is fatal: a machine without GPIO hardware or with an
  /// unreadable config still gets a working (empty) session.
  pub fn start(mut driver: Box<dyn GpioDriver>, store: ConfigStore) -> Session {
    if let Err(err) = driver.open() {
      warn!("GPIO hardware unavailable, continuing without it: {err}");
    }

    match store.migrate_legacy(&config::legacy_path()) {
      Ok(true) => info!("migrated legacy config file to {}", store.path().display()),
      Ok(false) => {}
      Err(err) => warn!("could not migrate legacy config file: {err}"),
    }

    let saved = match store.load() {
      Ok(saved) => saved,
      Err(err) => {
        warn!("ignoring unreadable config, starting empty: {err}");
        Snapshot::new()
      }
    };

    let mut session = Session {
      driver,
      store,
      pins: BTreeMap::new(),
    };
    session.restore(saved);
    session
  }

  /// Re-apply a persisted snapshot to the hardware.
  ///
  /// Every restored output is driven LOW as soon as it is claimed — outputs
  /// never resume a pre-restart HIGH. A pin the driver rejects is left
  /// unconfigured and does not stop the rest from restoring.
  fn restore(&mut self, saved: Snapshot) {
    for (bcm, entry) in saved {
      let claimed = self.driver.configure(bcm, entry.direction, entry.pull).and_then(|()| {
        match entry.direction {
          Direction::Output => self.driver.write(bcm, Level::Low),
          Direction::Input => Ok(()),
        }
      });

      match claimed {
        Ok(()) => {
          let state = match entry.direction {
            Direction::Output => PinState::Output {
              name: entry.name,
              level: Level::Low,
            },
            Direction::Input => PinState::Input {
              name: entry.name,
              pull: entry.pull,
            },
          };
          self.pins.insert(bcm, state);
        }
        Err(err) => warn!("could not restore GPIO{bcm}: {err}"),
      }
    }

    if !self.pins.is_empty() {
      info!("restored {} pin(s) from {}", self.pins.len(), self.store.path().display());
    }
  }

  /// Claim `bcm` as an input or output. Outputs start LOW; `pull` only
  /// matters for inputs.
  ///
  /// Reconfiguring replaces the pin's previous role. If the driver refuses,
  /// the previous role is kept untouched.
  pub fn configure(&mut self, bcm: u8, direction: Direction, pull: Pull, name: String) -> PanelResult<()> {
    if !header::is_valid_bcm(bcm) {
      return Err(PanelError::UnknownPin(bcm));
    }

    self.driver.configure(bcm, direction, pull)?;
    let state = match direction {
      Direction::Output => {
        self.driver.write(bcm, Level::Low)?;
        PinState::Output { name, level: Level::Low }
      }
      Direction::Input => PinState::Input { name, pull },
    };
    debug!("GPIO{bcm} configured as {direction}");
    self.pins.insert(bcm, state);
    self.persist()
  }

  /// Drive a configured output to `level`.
  pub fn write(&mut self, bcm: u8, level: Level) -> PanelResult<()> {
    let state = self.pins.get_mut(&bcm).ok_or(PanelError::NotConfigured(bcm))?;
    match state {
      PinState::Input { .. } => Err(PanelError::WrongDirection {
        pin: bcm,
        direction: Direction::Input,
      }),
      PinState::Output { level: cached, .. } => {
        self.driver.write(bcm, level)?;
        *cached = level;
        debug!("GPIO{bcm} -> {level}");
        self.persist()
      }
    }
  }

  /// Flip a configured output, returning the level it now drives.
  pub fn toggle(&mut self, bcm: u8) -> PanelResult<Level> {
    let level = self.driven_level(bcm)?.toggled();
    self.write(bcm, level)?;
    Ok(level)
  }

  /// Sample a configured input's live level.
  pub fn read(&mut self, bcm: u8) -> PanelResult<Level> {
    match self.pins.get(&bcm) {
      None => Err(PanelError::NotConfigured(bcm)),
      Some(PinState::Output { .. }) => Err(PanelError::WrongDirection {
        pin: bcm,
        direction: Direction::Output,
      }),
      Some(PinState::Input { .. }) => Ok(self.driver.read(bcm)?),
    }
  }

  /// The level an output currently drives, from the session's own cache.
  ///
  /// The session is the line's only writer, so the cache is authoritative;
  /// outputs are never read back from the hardware.
  pub fn driven_level(&self, bcm: u8) -> PanelResult<Level> {
    match self.pins.get(&bcm) {
      None => Err(PanelError::NotConfigured(bcm)),
      Some(PinState::Input { .. }) => Err(PanelError::WrongDirection {
        pin: bcm,
        direction: Direction::Input,
      }),
      Some(PinState::Output { level, .. }) => Ok(*level),
    }
  }

  /// Drive every configured output to `level`, in ascending BCM order, best
  /// effort: a pin the driver refuses keeps its cached level and the rest are
  /// still driven. The snapshot is persisted once at the end.
  pub fn set_all_outputs(&mut self, level: Level) -> PanelResult<Vec<(u8, Result<(), HardwareError>)>> {
    let mut results = Vec::new();
    for bcm in self.outputs() {
      let result = self.driver.write(bcm, level);
      if result.is_ok() {
        if let Some(PinState::Output { level: cached, .. }) = self.pins.get_mut(&bcm) {
          *cached = level;
        }
      }
      results.push((bcm, result));
    }
    self.persist()?;
    Ok(results)
  }

  /// Set or clear a configured pin's label. An empty name clears it.
  pub fn rename(&mut self, bcm: u8, new_name: String) -> PanelResult<()> {
    let state = self.pins.get_mut(&bcm).ok_or(PanelError::NotConfigured(bcm))?;
    match state {
      PinState::Output { name, .. } | PinState::Input { name, .. } => *name = new_name,
    }
    self.persist()
  }

  /// Release every line and forget the whole configuration.
  ///
  /// This is the only way a pin returns to unconfigured; there is no
  /// single-pin teardown.
  pub fn cleanup(&mut self) -> PanelResult<()> {
    self.driver.release_all()?;
    self.pins.clear();
    self.persist()
  }

  /// What the header diagram should show for `bcm`.
  ///
  /// Outputs are judged from the cache, inputs from a live probe — only the
  /// hardware knows what an input's wire is doing. A failed probe becomes
  /// [`Status::ReadError`] rather than an error return.
  pub fn status(&mut self, bcm: u8) -> Status {
    match self.pins.get(&bcm) {
      None => Status::Unconfigured,
      Some(PinState::Output { level: Level::High, .. }) => Status::OutHigh,
      Some(PinState::Output { level: Level::Low, .. }) => Status::OutLow,
      Some(PinState::Input { .. }) => match self.driver.read(bcm) {
        Ok(Level::High) => Status::InHigh,
        Ok(Level::Low) => Status::InLow,
        Err(_) => Status::ReadError,
      },
    }
  }

  /// Ordered listing of every configured pin, with input levels probed live.
  pub fn details(&mut self) -> Vec<PinDetail> {
    let pins: Vec<(u8, PinState)> = self.pins.iter().map(|(bcm, state)| (*bcm, state.clone())).collect();
    pins
      .into_iter()
      .map(|(bcm, state)| match state {
        PinState::Output { name, level } => PinDetail {
          bcm,
          direction: Direction::Output,
          level: Some(level),
          pull: None,
          name,
        },
        PinState::Input { name, pull } => PinDetail {
          bcm,
          direction: Direction::Input,
          level: self.driver.read(bcm).ok(),
          pull: Some(pull),
          name,
        },
      })
      .collect()
  }

  pub fn state(&self, bcm: u8) -> Option<&PinState> {
    self.pins.get(&bcm)
  }

  /// BCM numbers of configured inputs, ascending.
  pub fn inputs(&self) -> Vec<u8> {
    self
      .pins
      .iter()
      .filter(|(_, state)| matches!(state, PinState::Input { .. }))
      .map(|(bcm, _)| *bcm)
      .collect()
  }

  /// BCM numbers of configured outputs, ascending.
  pub fn outputs(&self) -> Vec<u8> {
    self
      .pins
      .iter()
      .filter(|(_, state)| matches!(state, PinState::Output { .. }))
      .map(|(bcm, _)| *bcm)
      .collect()
  }

  pub fn is_empty(&self) -> bool {
    self.pins.is_empty()
  }

  /// Backend name for the banner.
  pub fn backend(&self) -> &'static str {
    self.driver.describe()
  }

  /// Best-effort exit path: persist the snapshot, then release the hardware.
  /// Each step runs even if the other fails.
  pub fn shutdown(&mut self) {
    if let Err(err) = self.persist() {
      warn!("could not persist config on exit: {err}");
    }
    if let Err(err) = self.driver.release_all() {
      warn!("could not release GPIO lines on exit: {err}");
    }
  }

  /// Rewrite the on-disk snapshot from the in-memory map.
  fn persist(&self) -> PanelResult<()> {
    let snapshot: Snapshot = self.pins.iter().map(|(bcm, state)| (*bcm, state.saved())).collect();
    self.store.save(&snapshot)
  }
}

#[cfg(test)]
mod tests {
  use std::{
    cell::RefCell,
    collections::HashSet,
    env, fs,
    path::{Path, PathBuf},
    rc::Rc,
  };

  use super::*;
  use crate::hardware::SimDriver;

  /// A simulator that the test keeps a handle on, so external signals can be
  /// fed into input lines and faults injected per pin.
  #[derive(Debug, Default, Clone)]
  struct SharedSim {
    inner: Rc<RefCell<SimDriver>>,
    fail_configure: Rc<HashSet<u8>>,
    fail_writes: Rc<HashSet<u8>>,
  }

  impl SharedSim {
    fn failing(configure: &[u8], writes: &[u8]) -> SharedSim {
      SharedSim {
        inner: Rc::default(),
        fail_configure: Rc::new(configure.iter().copied().collect()),
        fail_writes: Rc::new(writes.iter().copied().collect()),
      }
    }

    /// Simulate an external signal on an input line.
    fn feed(&self, pin: u8, level: Level) {
      self.inner.borrow_mut().write(pin, level).unwrap();
    }

    /// Pull the rug out: drop every claimed line behind the session's back.
    fn lose_lines(&self) {
      self.inner.borrow_mut().release_all().unwrap();
    }
  }

  impl GpioDriver for SharedSim {
    fn open(&mut self) -> Result<(), HardwareError> {
      self.inner.borrow_mut().open()
    }

    fn configure(&mut self, pin: u8, direction: Direction, pull: Pull) -> Result<(), HardwareError> {
      if self.fail_configure.contains(&pin) {
        return Err(HardwareError::Unclaimed(pin));
      }
      self.inner.borrow_mut().configure(pin, direction, pull)
    }

    fn write(&mut self, pin: u8, level: Level) -> Result<(), HardwareError> {
      if self.fail_writes.contains(&pin) {
        return Err(HardwareError::Unclaimed(pin));
      }
      self.inner.borrow_mut().write(pin, level)
    }

    fn read(&mut self, pin: u8) -> Result<Level, HardwareError> {
      self.inner.borrow_mut().read(pin)
    }

    fn release_all(&mut self) -> Result<(), HardwareError> {
      self.inner.borrow_mut().release_all()
    }

    fn describe(&self) -> &'static str {
      "shared simulated GPIO"
    }
  }

  /// A fresh per-test config directory.
  fn temp_dir(test: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("gpio-panel-session-{test}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
  }

  fn store_in(dir: &Path) -> ConfigStore {
    ConfigStore::new(dir.join("gpio_config.json"))
  }

  fn session(test: &str) -> Session {
    Session::start(Box::new(SimDriver::new()), store_in(&temp_dir(test)))
  }

  fn snapshot_on_disk(session: &Session) -> Snapshot {
    store_in(session.store.path().parent().unwrap()).load().unwrap()
  }

  #[test]
  fn configured_outputs_start_low() {
    let mut session = session("output-starts-low");
    session
      .configure(17, Direction::Output, Pull::None, "relay".to_string())
      .unwrap();

    assert_eq!(session.driven_level(17).unwrap(), Level::Low);
    assert_eq!(session.status(17), Status::OutLow);

    let saved = snapshot_on_disk(&session);
    assert_eq!(saved[&17].direction, Direction::Output);
    assert_eq!(saved[&17].name, "relay");
  }

  #[test]
  fn unknown_pins_are_rejected_before_any_side_effect() {
    let mut session = session("unknown-pin");
    let result = session.configure(99, Direction::Input, Pull::None, String::new());

    assert!(matches!(result, Err(PanelError::UnknownPin(99))));
    assert!(session.is_empty());
    assert!(!session.store.path().exists());
  }

  #[test]
  fn outputs_reset_to_low_across_a_restart() {
    let dir = temp_dir("restart-resets-low");
    let mut session = Session::start(Box::new(SimDriver::new()), store_in(&dir));
    session
      .configure(17, Direction::Output, Pull::None, "relay".to_string())
      .unwrap();
    session.write(17, Level::High).unwrap();
    assert_eq!(session.driven_level(17).unwrap(), Level::High);

    // the snapshot keeps the pin but not its level
    let mut restarted = Session::start(Box::new(SimDriver::new()), store_in(&dir));
    assert_eq!(restarted.driven_level(17).unwrap(), Level::Low);
    assert_eq!(restarted.state(17).unwrap().name(), "relay");
    assert_eq!(restarted.status(17), Status::OutLow);
  }

  #[test]
  fn wrong_direction_is_caught_before_the_driver_is_touched() {
    // writes on 23 and 17 would fail loudly if they reached the driver
    let driver = SharedSim::failing(&[], &[17, 23]);
    let mut session = Session::start(Box::new(driver), store_in(&temp_dir("wrong-direction")));
    session.configure(23, Direction::Input, Pull::Up, String::new()).unwrap();

    let before = snapshot_on_disk(&session);
    let result = session.write(23, Level::High);
    assert!(matches!(
      result,
      Err(PanelError::WrongDirection {
        pin: 23,
        direction: Direction::Input
      })
    ));
    assert_eq!(snapshot_on_disk(&session), before);

    // reading an output goes through the cache, never the hardware
    let driver = SharedSim::failing(&[], &[]);
    let mut session = Session::start(Box::new(driver.clone()), store_in(&temp_dir("wrong-direction-read")));
    session
      .configure(17, Direction::Output, Pull::None, String::new())
      .unwrap();
    driver.lose_lines();
    assert!(matches!(
      session.read(17),
      Err(PanelError::WrongDirection {
        pin: 17,
        direction: Direction::Output
      })
    ));
    assert_eq!(session.driven_level(17).unwrap(), Level::Low);
  }

  #[test]
  fn writing_the_same_level_twice_is_idempotent() {
    let mut session = session("idempotent-write");
    session
      .configure(17, Direction::Output, Pull::None, String::new())
      .unwrap();

    session.write(17, Level::High).unwrap();
    let after_first = snapshot_on_disk(&session);
    session.write(17, Level::High).unwrap();

    assert_eq!(session.driven_level(17).unwrap(), Level::High);
    assert_eq!(snapshot_on_disk(&session), after_first);
  }

  #[test]
  fn toggle_flips_the_cached_level() {
    let mut session = session("toggle");
    session
      .configure(17, Direction::Output, Pull::None, String::new())
      .unwrap();

    assert_eq!(session.toggle(17).unwrap(), Level::High);
    assert_eq!(session.toggle(17).unwrap(), Level::Low);
    assert_eq!(session.driven_level(17).unwrap(), Level::Low);
  }

  #[test]
  fn set_all_outputs_keeps_going_past_a_faulty_pin() {
    let driver = SharedSim::failing(&[], &[3]);
    let mut session = Session::start(Box::new(driver), store_in(&temp_dir("bulk-partial")));
    session.configure(2, Direction::Output, Pull::None, String::new()).unwrap();
    session.configure(3, Direction::Output, Pull::None, String::new()).unwrap();
    session.configure(4, Direction::Input, Pull::None, String::new()).unwrap();

    let results = session.set_all_outputs(Level::High).unwrap();
    assert_eq!(results.len(), 2);
    assert!(matches!(results[0], (2, Ok(()))));
    assert!(matches!(results[1], (3, Err(_))));

    assert_eq!(session.driven_level(2).unwrap(), Level::High);
    assert_eq!(session.driven_level(3).unwrap(), Level::Low);

    // persistence still happened, covering both pins, with no level stored
    let saved = snapshot_on_disk(&session);
    assert_eq!(saved.len(), 3);
    assert_eq!(saved[&2].direction, Direction::Output);
    assert_eq!(saved[&3].direction, Direction::Output);
  }

  #[test]
  fn configure_failure_is_surfaced_and_nothing_is_recorded() {
    let driver = SharedSim::failing(&[17], &[]);
    let mut session = Session::start(Box::new(driver), store_in(&temp_dir("configure-fault")));

    let result = session.configure(17, Direction::Output, Pull::None, String::new());
    assert!(matches!(result, Err(PanelError::Hardware(_))));
    assert!(session.is_empty());
  }

  #[test]
  fn restore_skips_pins_the_driver_rejects() {
    let dir = temp_dir("restore-skips");
    let mut first = Session::start(Box::new(SimDriver::new()), store_in(&dir));
    first.configure(5, Direction::Output, Pull::None, String::new()).unwrap();
    first.configure(6, Direction::Input, Pull::Down, String::new()).unwrap();

    let driver = SharedSim::failing(&[5], &[]);
    let mut restarted = Session::start(Box::new(driver), store_in(&dir));

    assert!(matches!(restarted.read(5), Err(PanelError::NotConfigured(5))));
    assert_eq!(restarted.state(6).unwrap().direction(), Direction::Input);
  }

  #[test]
  fn rename_updates_the_label_and_the_snapshot() {
    let mut session = session("rename");
    session
      .configure(17, Direction::Output, Pull::None, "old".to_string())
      .unwrap();

    session.rename(17, "new".to_string()).unwrap();
    assert_eq!(session.state(17).unwrap().name(), "new");
    assert_eq!(snapshot_on_disk(&session)[&17].name, "new");

    // an empty name clears the label
    session.rename(17, String::new()).unwrap();
    assert_eq!(snapshot_on_disk(&session)[&17].name, "");

    assert!(matches!(
      session.rename(4, "x".to_string()),
      Err(PanelError::NotConfigured(4))
    ));
  }

  #[test]
  fn cleanup_is_the_only_way_back_to_unconfigured() {
    let mut session = session("cleanup");
    session.configure(2, Direction::Output, Pull::None, String::new()).unwrap();
    session.configure(3, Direction::Input, Pull::Up, String::new()).unwrap();
    session.configure(4, Direction::Output, Pull::None, String::new()).unwrap();

    session.cleanup().unwrap();
    assert!(session.is_empty());
    assert_eq!(snapshot_on_disk(&session), Snapshot::new());

    for bcm in [2, 3, 4] {
      assert!(matches!(session.read(bcm), Err(PanelError::NotConfigured(_))));
      assert!(matches!(session.write(bcm, Level::High), Err(PanelError::NotConfigured(_))));
      assert_eq!(session.status(bcm), Status::Unconfigured);
    }
  }

  #[test]
  fn input_status_tracks_the_wire_not_the_session() {
    let driver = SharedSim::failing(&[], &[]);
    let mut session = Session::start(Box::new(driver.clone()), store_in(&temp_dir("input-status")));
    session.configure(23, Direction::Input, Pull::Down, String::new()).unwrap();

    assert_eq!(session.status(23), Status::InLow);
    driver.feed(23, Level::High);
    assert_eq!(session.status(23), Status::InHigh);

    driver.lose_lines();
    assert_eq!(session.status(23), Status::ReadError);
  }

  #[test]
  fn details_lists_pins_in_ascending_order() {
    let driver = SharedSim::failing(&[], &[]);
    let mut session = Session::start(Box::new(driver.clone()), store_in(&temp_dir("details")));
    session.configure(27, Direction::Output, Pull::None, "led".to_string()).unwrap();
    session.configure(4, Direction::Input, Pull::Up, String::new()).unwrap();
    session.write(27, Level::High).unwrap();
    driver.feed(4, Level::High);

    let details = session.details();
    assert_eq!(
      details,
      vec![
        PinDetail {
          bcm: 4,
          direction: Direction::Input,
          level: Some(Level::High),
          pull: Some(Pull::Up),
          name: String::new(),
        },
        PinDetail {
          bcm: 27,
          direction: Direction::Output,
          level: Some(Level::High),
          pull: None,
          name: "led".to_string(),
        },
      ]
    );

    assert_eq!(session.inputs(), vec![4]);
    assert_eq!(session.outputs(), vec![27]);
  }

  #[test]
  fn corrupt_config_starts_an_empty_session() {
    let dir = temp_dir("corrupt-config");
    let store = store_in(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(store.path(), "definitely not json").unwrap();

    let session = Session::start(Box::new(SimDriver::new()), store);
    assert!(session.is_empty());
  }

  #[test]
  fn shutdown_releases_the_hardware_after_persisting() {
    let driver = SharedSim::failing(&[], &[]);
    let dir = temp_dir("shutdown");
    let mut session = Session::start(Box::new(driver.clone()), store_in(&dir));
    session.configure(17, Direction::Output, Pull::None, String::new()).unwrap();

    session.shutdown();
    assert!(matches!(driver.inner.borrow_mut().read(17), Err(HardwareError::Unclaimed(17))));
    // the configuration survives for the next session
    assert_eq!(store_in(&dir).load().unwrap().len(), 1);
  }
}
