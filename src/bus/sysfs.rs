use std::fmt;
use std::fs;
use std::io::{
	self,
	Write,
};
use std::os::unix::fs::FileExt;
use std::path::{
	Path,
	PathBuf,
};

use super::{
	Hardware,
	Mode,
	OutPins,
};

pub const SYSFS_GPIO: &str = "/sys/class/gpio";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Direction {
	In,
	Out,
}

/// One GPIO line exported through `/sys/class/gpio`
pub struct GpioLine {
	root: PathBuf,
	number: u32,
	value: fs::File,
	direction: Option<Direction>,
	// unexport on drop if we exported it
	exported: bool,
}

impl GpioLine {
	pub fn open_in(root: &Path, number: u32) -> io::Result<Self> {
		let dir = root.join(format!("gpio{}", number));
		let exported = if dir.exists() {
			false
		} else {
			// need to write in one syscall for export/unexport
			fs::OpenOptions::new().write(true).open(root.join("export"))?.write_all(number.to_string().as_bytes())?;
			true
		};

		let value = match fs::OpenOptions::new().read(true).write(true).open(dir.join("value")) {
			Ok(v) => v,
			Err(e) => {
				if exported {
					if let Err(e) = unexport(root, number) {
						error!("GPIO {}: Failed to unexport line: {}", number, e);
					}
				}
				return Err(e);
			}
		};

		Ok(GpioLine {
			root: root.to_path_buf(),
			number,
			value,
			direction: None,
			exported,
		})
	}

	fn write_direction(&mut self, direction: &[u8]) -> io::Result<()> {
		let path = self.root.join(format!("gpio{}", self.number)).join("direction");
		fs::OpenOptions::new().write(true).truncate(true).open(path)?.write_all(direction)
	}

	/// Drive the line; switching to output sets the level in the same step.
	pub fn drive(&mut self, level: bool) -> io::Result<()> {
		if self.direction != Some(Direction::Out) {
			let direction: &[u8] = if level { b"high" } else { b"low" };
			self.write_direction(direction)?;
			self.direction = Some(Direction::Out);
			return Ok(());
		}
		let buf: &[u8] = if level { b"1" } else { b"0" };
		let l = self.value.write_at(buf, 0)?;
		if l != buf.len() {
			return Err(io::Error::new(io::ErrorKind::Other, "failed to write GPIO value"));
		}
		Ok(())
	}

	/// Stop driving the line (external pull-up makes it read high)
	pub fn release(&mut self) -> io::Result<()> {
		if self.direction != Some(Direction::In) {
			self.write_direction(b"in")?;
			self.direction = Some(Direction::In);
		}
		Ok(())
	}

	pub fn read(&mut self) -> io::Result<bool> {
		let mut buf = [0u8];
		let l = self.value.read_at(&mut buf, 0)?;
		if l != buf.len() {
			return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "failed to read GPIO value"));
		}
		match buf[0] {
			b'0' => Ok(false),
			b'1' => Ok(true),
			c => Err(io::Error::new(io::ErrorKind::InvalidData, format!("invalid GPIO value {:?}", c as char))),
		}
	}
}

fn unexport(root: &Path, number: u32) -> io::Result<()> {
	fs::OpenOptions::new().write(true).open(root.join("unexport"))?.write_all(number.to_string().as_bytes())
}

impl Drop for GpioLine {
	fn drop(&mut self) {
		if self.exported {
			if let Err(e) = unexport(&self.root, self.number) {
				error!("GPIO {}: Failed to unexport line: {}", self.number, e);
			}
		}
	}
}

/// GPIO numbers of the bus lines.
///
/// Without a separate `data_in` line the data line is shared: it is driven
/// open-drain (high = released) and read back, as I2C SDA or a 3-wire SPI
/// I/O line needs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GpioPinout {
	pub clock: u32,
	pub data_out: u32,
	pub data_in: Option<u32>,
	pub chip_select: Option<u32>,
}

impl fmt::Display for GpioPinout {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "clock={} data={}", self.clock, self.data_out)?;
		if let Some(data_in) = self.data_in { write!(f, " in={}", data_in)?; }
		if let Some(chip_select) = self.chip_select { write!(f, " cs={}", chip_select)?; }
		Ok(())
	}
}

pub struct SysfsGpio {
	clock: GpioLine,
	data_out: GpioLine,
	data_in: Option<GpioLine>,
	chip_select: Option<GpioLine>,
	open_drain: bool,
	description: String,
}

impl SysfsGpio {
	pub fn open(pinout: &GpioPinout, mode: Mode) -> io::Result<Self> {
		Self::open_in(Path::new(SYSFS_GPIO), pinout, mode)
	}

	pub fn open_in(root: &Path, pinout: &GpioPinout, mode: Mode) -> io::Result<Self> {
		if mode.is_i2c() && pinout.data_in.is_some() {
			return Err(io::Error::new(io::ErrorKind::InvalidInput, "I2C needs a single shared data line"));
		}
		let clock = GpioLine::open_in(root, pinout.clock)?;
		let data_out = GpioLine::open_in(root, pinout.data_out)?;
		let data_in = match pinout.data_in {
			None => None,
			Some(n) => Some(GpioLine::open_in(root, n)?),
		};
		let chip_select = match pinout.chip_select {
			None => None,
			Some(n) => Some(GpioLine::open_in(root, n)?),
		};
		Ok(SysfsGpio {
			clock,
			data_out,
			data_in,
			chip_select,
			open_drain: pinout.data_in.is_none(),
			description: format!("sysfs GPIO {}", pinout),
		})
	}
}

impl Hardware for SysfsGpio {
	fn description(&self) -> String {
		self.description.clone()
	}

	fn set_pins(&mut self, pins: OutPins) -> io::Result<()> {
		if let Some(ref mut cs) = self.chip_select {
			cs.drive(pins.chip_select)?;
		}
		if self.open_drain && pins.data {
			self.data_out.release()?;
		} else {
			self.data_out.drive(pins.data)?;
		}
		self.clock.drive(pins.clock)
	}

	fn read_pin(&mut self) -> io::Result<bool> {
		match self.data_in {
			Some(ref mut line) => line.read(),
			None => self.data_out.read(),
		}
	}

	fn release(&mut self) -> io::Result<()> {
		self.data_out.release()?;
		self.clock.release()?;
		if let Some(ref mut cs) = self.chip_select {
			cs.release()?;
		}
		Ok(())
	}
}
