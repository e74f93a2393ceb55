//! Interactive terminal front end.
//!
//! Owns every prompt, color and box-drawing character. The session only ever
//! sees parsed operator intent and hands back data and outcomes.

use std::{
  io::{self, Write},
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use crossterm::{
  cursor::MoveTo,
  execute,
  style::Stylize,
  terminal::{Clear, ClearType},
};

use crate::{
  error::PanelError,
  header::{self, HeaderPin},
  pin::{Direction, Level, Pull},
  session::{PinState, Session, Status},
};

const BANNER: &str = "Raspberry Pi GPIO Panel (Terminal Mode)";

pub struct Menu {
  session: Session,
  interrupted: Arc<AtomicBool>,
}

impl Menu {
  pub fn new(session: Session, interrupted: Arc<AtomicBool>) -> Menu {
    Menu { session, interrupted }
  }

  /// The main loop: draw, prompt, dispatch, until the operator quits or the
  /// process is interrupted. The exit path persists and releases either way.
  pub fn run(&mut self) {
    loop {
      self.draw();
      let Some(choice) = self.prompt("\nEnter your choice: ") else {
        break;
      };
      match choice.to_lowercase().as_str() {
        "1" => self.setup_pin(),
        "2" => self.control_pin(),
        "3" => self.read_all_inputs(),
        "4" => self.set_all(Level::High),
        "5" => self.set_all(Level::Low),
        "6" => self.show_details(),
        "7" => self.rename_pin(),
        "8" => self.cleanup_all(),
        "0" => continue, // redraw
        "q" => break,
        _ => println!("{}", "Invalid choice!".red()),
      }
      if !self.pause() {
        break;
      }
    }

    println!("\n{}", "Saving configuration and releasing pins...".cyan());
    self.session.shutdown();
  }

  fn draw(&mut self) {
    let _ = execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0));

    println!("{}", format!("╔{}╗", "═".repeat(BANNER.len() + 14)).cyan().bold());
    println!("{}", format!("║       {BANNER}       ║").cyan().bold());
    println!("{}", format!("╚{}╝", "═".repeat(BANNER.len() + 14)).cyan().bold());

    let backend = format!("[{}]", self.session.backend());
    if cfg!(feature = "arm") {
      println!("{}\n", backend.green());
    }
    else {
      println!("{}\n", backend.yellow());
    }

    for row in 0u8..20 {
      let left = header::entry(row * 2 + 1).map(|pin| self.cell(pin, false)).unwrap_or_default();
      let right = header::entry(row * 2 + 2).map(|pin| self.cell(pin, true)).unwrap_or_default();
      println!("{left}  {right}");
    }

    println!(
      "\n{} {} OUT-HIGH  {} OUT-LOW  {} IN-HIGH  {} IN-LOW  {} Read error  {} Not configured",
      "Legend:".bold(),
      "●".green(),
      "●".red(),
      "●".blue(),
      "●".dark_grey(),
      "○".red(),
      "○".dark_grey(),
    );

    println!("\n{}", "Main Menu:".bold());
    println!("  1. Setup pin (configure as input/output)");
    println!("  2. Control pin (read/write)");
    println!("  3. Read all inputs");
    println!("  4. Set all outputs HIGH");
    println!("  5. Set all outputs LOW");
    println!("  6. Show pin details");
    println!("  7. Rename pin");
    println!("  8. Cleanup all pins");
    println!("  0. Refresh display");
    println!("  q. Exit");
  }

  /// One socket of the diagram. Both columns render the same fixed-width
  /// fields so the styled text stays aligned; the right column is mirrored.
  fn cell(&mut self, pin: &HeaderPin, mirrored: bool) -> String {
    let Some(bcm) = pin.bcm else {
      let core = if mirrored {
        format!("{:<14} {:<5} ({:>10}) {:>7} [{:02}]  ", "", "", pin.function, pin.label, pin.position)
      }
      else {
        format!("  [{:02}] {:<7} ({:<10}) {:<5} {:<14}", pin.position, pin.label, pin.function, "", "")
      };
      let styled = match pin.function {
        "Ground" => core.dark_grey(),
        _ if pin.label == "5V" => core.red(),
        _ => core.yellow(),
      };
      return styled.to_string();
    };

    let symbol = match self.session.status(bcm) {
      Status::Unconfigured => "○".dark_grey(),
      Status::OutHigh => "●".green(),
      Status::OutLow => "●".red(),
      Status::InHigh => "●".blue(),
      Status::InLow => "●".dark_grey(),
      Status::ReadError => "○".red(),
    };

    let (tag, name) = match self.session.state(bcm) {
      None => ("     ".to_string(), " ".repeat(14)),
      Some(state) => {
        let tag = match state.direction() {
          Direction::Output => "[OUT]",
          Direction::Input => "[IN] ",
        };
        let name = if state.name().is_empty() {
          " ".repeat(14)
        }
        else {
          let short: String = state.name().chars().take(12).collect();
          format!("{:<14}", format!("'{short}'")).magenta().to_string()
        };
        (tag.cyan().to_string(), name)
      }
    };

    if mirrored {
      format!(
        "{name} {tag} ({:>10}) {:>7} [{:02}] {symbol}",
        pin.function, pin.label, pin.position
      )
    }
    else {
      format!(
        "{symbol} [{:02}] {:<7} ({:<10}) {tag} {name}",
        pin.position, pin.label, pin.function
      )
    }
  }

  fn setup_pin(&mut self) {
    let Some(bcm) = self.prompt_pin("\nEnter BCM pin number to set up: ") else {
      return;
    };
    if !header::is_valid_bcm(bcm) {
      println!("{}", format!("GPIO{bcm} is not a GPIO line on this header!").red());
      return;
    }

    let Some(name) = self.prompt("Custom name for this pin (optional, Enter to skip): ") else {
      return;
    };

    println!("\n{}", format!("Configure GPIO{bcm}:").bold());
    println!("  1. Output");
    println!("  2. Input (no pull)");
    println!("  3. Input (pull-up)");
    println!("  4. Input (pull-down)");
    let Some(choice) = self.prompt("Select option: ") else {
      return;
    };

    let (direction, pull) = match choice.as_str() {
      "1" => (Direction::Output, Pull::None),
      "2" => (Direction::Input, Pull::None),
      "3" => (Direction::Input, Pull::Up),
      "4" => (Direction::Input, Pull::Down),
      _ => {
        println!("{}", "Invalid option!".red());
        return;
      }
    };

    match self.session.configure(bcm, direction, pull, name) {
      Ok(()) => {
        match direction {
          Direction::Output => {
            println!("{}", format!("✓ GPIO{bcm} configured as OUTPUT (initialized to LOW)").green())
          }
          Direction::Input => println!("{}", format!("✓ GPIO{bcm} configured as INPUT (pull-{pull})").green()),
        }
        println!("{}", "✓ Configuration saved".cyan());
      }
      Err(err) => self.report(&err),
    }
  }

  fn control_pin(&mut self) {
    let Some(bcm) = self.prompt_pin("\nEnter BCM pin number to control: ") else {
      return;
    };

    match self.session.state(bcm) {
      None => println!("{}", "Pin not configured! Set it up first.".red()),
      Some(PinState::Input { .. }) => {
        println!("\n{}", format!("Read GPIO{bcm} (INPUT):").bold());
        match self.session.read(bcm) {
          Ok(Level::High) => println!("Current state: {}", "HIGH (1)".green()),
          Ok(Level::Low) => println!("Current state: {}", "LOW (0)".red()),
          Err(err) => self.report(&err),
        }
      }
      Some(PinState::Output { .. }) => {
        println!("\n{}", format!("Control GPIO{bcm} (OUTPUT):").bold());
        println!("  1. Set HIGH");
        println!("  2. Set LOW");
        println!("  3. Toggle");
        let Some(choice) = self.prompt("Select option: ") else {
          return;
        };

        let result = match choice.as_str() {
          "1" => self.session.write(bcm, Level::High).map(|()| Level::High),
          "2" => self.session.write(bcm, Level::Low).map(|()| Level::Low),
          "3" => self.session.toggle(bcm),
          _ => {
            println!("{}", "Invalid option!".red());
            return;
          }
        };
        match result {
          Ok(level) => println!("{}", format!("✓ GPIO{bcm} set to {level}").green()),
          Err(err) => self.report(&err),
        }
      }
    }
  }

  fn read_all_inputs(&mut self) {
    let inputs = self.session.inputs();
    if inputs.is_empty() {
      println!("\n{}", "No input pins configured!".yellow());
      return;
    }

    println!("\n{}", "Input pin states:".bold());
    for bcm in inputs {
      match self.session.read(bcm) {
        Ok(Level::High) => println!("  GPIO{bcm:2}: {}", "HIGH".green()),
        Ok(Level::Low) => println!("  GPIO{bcm:2}: {}", "LOW".red()),
        Err(err) => println!("  GPIO{bcm:2}: {}", format!("{err}").red()),
      }
    }
  }

  fn set_all(&mut self, level: Level) {
    if self.session.outputs().is_empty() {
      println!("\n{}", "No output pins configured!".yellow());
      return;
    }

    println!("\n{}", format!("Setting all outputs to {level}...").bold());
    match self.session.set_all_outputs(level) {
      Ok(results) => {
        for (bcm, result) in results {
          match result {
            Ok(()) => println!("  GPIO{bcm:2}: {}", "✓".green()),
            Err(err) => println!("  GPIO{bcm:2}: {}", format!("{err}").red()),
          }
        }
        println!("{}", "Done!".green());
      }
      Err(err) => self.report(&err),
    }
  }

  fn show_details(&mut self) {
    let details = self.session.details();
    if details.is_empty() {
      println!("\n{}", "No pins configured yet!".yellow());
      return;
    }

    println!("\n{}", "Configured pins:".bold());
    println!("{:>4} | {:^15} | {:^10} | {:^10} | {:^10}", "BCM", "Name", "Direction", "State", "Pull");
    println!("{}", "-".repeat(60));
    for detail in details {
      let name = if detail.name.is_empty() {
        "-".to_string()
      }
      else {
        detail.name.chars().take(15).collect()
      };
      let state = detail.level.map_or_else(|| "ERROR".to_string(), |level| level.to_string());
      let pull = detail
        .pull
        .map_or_else(|| "N/A".to_string(), |pull| pull.to_string().to_uppercase());
      println!(
        "{:>4} | {:^15} | {:^10} | {:^10} | {:^10}",
        detail.bcm,
        name,
        detail.direction.to_string(),
        state,
        pull
      );
    }
  }

  fn rename_pin(&mut self) {
    let Some(bcm) = self.prompt_pin("\nEnter BCM pin number to rename: ") else {
      return;
    };

    match self.session.state(bcm) {
      None => {
        println!("{}", "Pin not configured! Set it up first.".red());
        return;
      }
      Some(state) if state.name().is_empty() => println!("Current name: (none)"),
      Some(state) => println!("Current name: {}", format!("'{}'", state.name()).magenta()),
    }

    let Some(new_name) = self.prompt("Enter new name (or press Enter to remove name): ") else {
      return;
    };
    let cleared = new_name.is_empty();
    match self.session.rename(bcm, new_name.clone()) {
      Ok(()) if cleared => println!("{}", format!("✓ GPIO{bcm} name removed").green()),
      Ok(()) => println!("{}", format!("✓ GPIO{bcm} renamed to '{new_name}'").green()),
      Err(err) => self.report(&err),
    }
  }

  fn cleanup_all(&mut self) {
    let Some(confirm) = self.prompt(&format!("\n{}", "Reset all GPIO pins to default state? (yes/no): ".yellow()))
    else {
      return;
    };
    if !matches!(confirm.to_lowercase().as_str(), "yes" | "y") {
      println!("Cancelled.");
      return;
    }

    match self.session.cleanup() {
      Ok(()) => println!("{}", "✓ All GPIO pins cleaned up!".green()),
      Err(err) => self.report(&err),
    }
  }

  fn report(&self, err: &PanelError) {
    println!("{}", format!("Error: {err}").red());
  }

  /// Read one trimmed line. `None` means the operator is gone (end of input
  /// or interrupt), which the caller treats as "leave".
  fn prompt(&self, text: &str) -> Option<String> {
    if self.interrupted.load(Ordering::SeqCst) {
      return None;
    }
    print!("{}", text.bold());
    io::stdout().flush().ok()?;

    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
      Ok(0) => None,
      Ok(_) if self.interrupted.load(Ordering::SeqCst) => None,
      Ok(_) => Some(line.trim().to_string()),
      Err(_) => None,
    }
  }

  fn prompt_pin(&self, text: &str) -> Option<u8> {
    let line = self.prompt(text)?;
    match line.parse() {
      Ok(bcm) => Some(bcm),
      Err(_) => {
        println!("{}", "Invalid pin number!".red());
        None
      }
    }
  }

  /// Returns false when the operator is gone.
  fn pause(&self) -> bool {
    self.prompt(&format!("\n{}", "Press Enter to continue...".dark_grey())).is_some()
  }
}
