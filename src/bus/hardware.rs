use std::io;
use std::thread;
use std::time::{
	Duration,
	Instant,
};

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Output line levels.
///
/// For I2C `clock` is SCL and `data` is SDA; a high `data` level releases
/// the open-drain line instead of driving it. `chip_select` is the raw line
/// level (SPI only).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct OutPins {
	pub chip_select: bool,
	pub clock: bool,
	pub data: bool,
}

pub trait Hardware {
	fn description(&self) -> String;

	fn set_pins(&mut self, pins: OutPins) -> io::Result<()>;

	// level of the data input line
	fn read_pin(&mut self) -> io::Result<bool>;

	// give the lines back to the system
	fn release(&mut self) -> io::Result<()> {
		Ok(())
	}
}
