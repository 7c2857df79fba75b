//! Bus transport: start/stop framing, byte transfers and acknowledgement
//! signalling on a SPI or I2C bus.
//!
//! The transport only moves bytes; which bytes to send and how to react to
//! a NACK is decided by `crate::transaction`.
//!
//! On SPI there is no acknowledgement, `get_ack` always reports `Ack` and
//! the ack mode is ignored.

use std::fmt;
use std::io;
use std::time::Duration;

pub mod bitbang;
mod hardware;
#[cfg(test)]
pub mod mock;
pub mod sysfs;

pub use self::bitbang::BitBang;
pub use self::hardware::{
	Hardware,
	OutPins,
	reliable_sleep,
};
pub use self::sysfs::{
	GpioPinout,
	SysfsGpio,
};

pub const ONE_MHZ: u32 = 1_000_000;
pub const FOUR_HUNDRED_KHZ: u32 = 400_000;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Ack {
	Ack,
	Nack,
}

/// What to answer after each byte received by `read`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AckMode {
	AckAll,
	NackAll,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Mode {
	Spi0,
	Spi1,
	Spi2,
	Spi3,
	I2c,
}

impl Mode {
	pub fn is_i2c(self) -> bool {
		self == Mode::I2c
	}

	// CPOL: clock level while idle
	pub fn clock_idle_high(self) -> bool {
		match self {
			Mode::Spi2 | Mode::Spi3 | Mode::I2c => true,
			Mode::Spi0 | Mode::Spi1 => false,
		}
	}

	// CPHA: sample on the trailing clock edge
	pub fn sample_on_trailing_edge(self) -> bool {
		match self {
			Mode::Spi1 | Mode::Spi3 => true,
			Mode::Spi0 | Mode::Spi2 | Mode::I2c => false,
		}
	}
}

impl fmt::Display for Mode {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Mode::Spi0 => write!(f, "SPI mode 0"),
			Mode::Spi1 => write!(f, "SPI mode 1"),
			Mode::Spi2 => write!(f, "SPI mode 2"),
			Mode::Spi3 => write!(f, "SPI mode 3"),
			Mode::I2c => write!(f, "I2C"),
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BitOrder {
	Msb,
	Lsb,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TransportConfig {
	pub mode: Mode,
	pub clock_hz: u32,
	pub bit_order: BitOrder,
	/// level of the chip select line outside of transactions (SPI only)
	pub chip_select_idle_high: bool,
}

impl TransportConfig {
	pub fn i2c(clock_hz: u32) -> Self {
		TransportConfig {
			mode: Mode::I2c,
			clock_hz,
			bit_order: BitOrder::Msb,
			chip_select_idle_high: true,
		}
	}

	pub fn spi(mode: Mode, clock_hz: u32, bit_order: BitOrder) -> Self {
		TransportConfig {
			mode,
			clock_hz,
			bit_order,
			chip_select_idle_high: true,
		}
	}

	pub fn with_clock(mut self, clock_hz: u32) -> Self {
		self.clock_hz = clock_hz;
		self
	}

	/// time between two clock edges
	pub fn half_period(&self) -> Duration {
		let clock_hz = u64::from(self.clock_hz.max(1));
		Duration::from_nanos(1_000_000_000 / (2 * clock_hz))
	}
}

impl fmt::Display for TransportConfig {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{} at {}Hz, {}", self.mode, self.clock_hz, match self.bit_order {
			BitOrder::Msb => "MSB first",
			BitOrder::Lsb => "LSB first",
		})
	}
}

#[derive(Debug, Fail)]
#[fail(display = "bus transport unavailable ({}): {}", what, cause)]
pub struct TransportUnavailable {
	pub what: String,
	#[cause]
	pub cause: io::Error,
}

pub trait BusTransport {
	fn description(&self) -> String;

	/// configured bus clock in Hz
	fn clock(&self) -> u32;

	fn start(&mut self) -> io::Result<()>;

	fn write(&mut self, data: &[u8]) -> io::Result<()>;

	fn read(&mut self, count: usize) -> io::Result<Vec<u8>>;

	/// acknowledgement for the bytes sent by the last `write`
	fn get_ack(&mut self) -> Ack;

	fn set_ack_mode(&mut self, mode: AckMode);

	fn stop(&mut self) -> io::Result<()>;

	/// release the underlying device; no other call is valid afterwards
	fn close(&mut self) -> io::Result<()>;
}
