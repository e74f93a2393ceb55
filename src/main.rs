#![warn(rust_2018_idioms)]

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

#[cfg(feature = "arm")]
use gpio_panel::hardware::raspi::RppalDriver;
#[cfg(not(feature = "arm"))]
use gpio_panel::hardware::SimDriver;
use gpio_panel::{config::ConfigStore, menu::Menu, session::Session};
use simple_logger::SimpleLogger;

fn main() {
  SimpleLogger::new()
    .with_level(log::LevelFilter::Info)
    .init()
    .unwrap();

  // the prompt loop polls this after every read; the exit path then still
  // persists the config and releases the pins
  let interrupted = Arc::new(AtomicBool::new(false));
  let flag = Arc::clone(&interrupted);
  if let Err(err) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
    log::warn!("could not install interrupt handler: {err}");
  }

  #[cfg(feature = "arm")]
  let driver = Box::new(RppalDriver::new());
  #[cfg(not(feature = "arm"))]
  let driver = Box::new(SimDriver::new());

  let session = Session::start(driver, ConfigStore::default_location());
  Menu::new(session, interrupted).run();
}
