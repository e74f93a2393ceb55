//! Static layout of the 40-pin J8 header.
//!
//! See: https://pinout.xyz/

/// One socket of the physical header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPin {
  /// Physical position, 1..=40. Odd positions sit in the left column.
  pub position: u8,
  /// BCM number of the GPIO line behind this socket; `None` for power and
  /// ground rails, which can never be configured.
  pub bcm: Option<u8>,
  pub label: &'static str,
  /// Default function of the line.
  pub function: &'static str,
}

const fn gpio(position: u8, bcm: u8, label: &'static str, function: &'static str) -> HeaderPin {
  HeaderPin {
    position,
    bcm: Some(bcm),
    label,
    function,
  }
}

const fn rail(position: u8, label: &'static str, function: &'static str) -> HeaderPin {
  HeaderPin {
    position,
    bcm: None,
    label,
    function,
  }
}

/// The full header, ordered by physical position.
pub static PINS: [HeaderPin; 40] = [
  rail(1, "3.3V", "Power"),
  rail(2, "5V", "Power"),
  gpio(3, 2, "GPIO2", "I2C SDA"),
  rail(4, "5V", "Power"),
  gpio(5, 3, "GPIO3", "I2C SCL"),
  rail(6, "GND", "Ground"),
  gpio(7, 4, "GPIO4", "GPCLK0"),
  gpio(8, 14, "GPIO14", "UART TX"),
  rail(9, "GND", "Ground"),
  gpio(10, 15, "GPIO15", "UART RX"),
  gpio(11, 17, "GPIO17", "GPIO"),
  gpio(12, 18, "GPIO18", "PWM0"),
  gpio(13, 27, "GPIO27", "GPIO"),
  rail(14, "GND", "Ground"),
  gpio(15, 22, "GPIO22", "GPIO"),
  gpio(16, 23, "GPIO23", "GPIO"),
  rail(17, "3.3V", "Power"),
  gpio(18, 24, "GPIO24", "GPIO"),
  gpio(19, 10, "GPIO10", "SPI MOSI"),
  rail(20, "GND", "Ground"),
  gpio(21, 9, "GPIO9", "SPI MISO"),
  gpio(22, 25, "GPIO25", "GPIO"),
  gpio(23, 11, "GPIO11", "SPI SCLK"),
  gpio(24, 8, "GPIO8", "SPI CE0"),
  rail(25, "GND", "Ground"),
  gpio(26, 7, "GPIO7", "SPI CE1"),
  gpio(27, 0, "GPIO0", "ID_SD"),
  gpio(28, 1, "GPIO1", "ID_SC"),
  gpio(29, 5, "GPIO5", "GPIO"),
  rail(30, "GND", "Ground"),
  gpio(31, 6, "GPIO6", "GPIO"),
  gpio(32, 12, "GPIO12", "PWM0"),
  gpio(33, 13, "GPIO13", "PWM1"),
  rail(34, "GND", "Ground"),
  gpio(35, 19, "GPIO19", "SPI MISO"),
  gpio(36, 16, "GPIO16", "GPIO"),
  gpio(37, 26, "GPIO26", "GPIO"),
  gpio(38, 20, "GPIO20", "SPI MOSI"),
  rail(39, "GND", "Ground"),
  gpio(40, 21, "GPIO21", "SPI SCLK"),
];

/// Look up a socket by physical position. `None` only for positions outside
/// the header, which is a caller bug rather than a runtime condition.
pub fn entry(position: u8) -> Option<&'static HeaderPin> {
  position.checked_sub(1).and_then(|index| PINS.get(usize::from(index)))
}

/// Whether `bcm` names a GPIO line present on this header.
pub fn is_valid_bcm(bcm: u8) -> bool {
  PINS.iter().any(|pin| pin.bcm == Some(bcm))
}
