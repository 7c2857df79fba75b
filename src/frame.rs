use std::fmt;
use std::ops::Deref;

use chrono::{
	Datelike,
	Local,
	Timelike,
};

use crate::bcd;

/// Clock chips with a known register layout
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Clock {
	Ds1302,
	Ds3231,
}

pub const DS1302_CLOCK_BURST: u8 = 0xbf;
pub const DS3231_WRITE_ADDRESS: u8 = 0xd0;
pub const DS3231_FIRST_REGISTER: u8 = 0x00;

// alarm 1/2, control, status and aging offset registers (0x07 - 0x10)
const DS3231_TRAILING_REGISTERS: usize = 10;

/// Wall-clock time split into the fields the clock chips store.
///
/// The chips only keep a two-digit year; the century is lost on write and
/// assumed to be 20xx when decoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TimeValue {
	pub second: u8,
	pub minute: u8,
	pub hour: u8,
	/// ISO weekday, Monday = 1 .. Sunday = 7
	pub weekday: u8,
	pub day: u8,
	pub month: u8,
	pub year: i32,
}

impl TimeValue {
	pub fn from_datetime<T: Datelike + Timelike>(t: &T) -> Self {
		TimeValue {
			second: t.second().min(59) as u8,
			minute: t.minute() as u8,
			hour: t.hour() as u8,
			weekday: t.weekday().number_from_monday() as u8,
			day: t.day() as u8,
			month: t.month() as u8,
			year: t.year(),
		}
	}

	/// Local system time.
	///
	/// Repeats if the second changed while converting, so the result is
	/// accurate within a second.
	pub fn capture() -> Self {
		loop {
			let now = Local::now();
			let value = Self::from_datetime(&now);
			if Local::now().timestamp() == now.timestamp() {
				return value;
			}
		}
	}

	/// Weekday in the chips' 1..7 numbering
	pub fn device_weekday(&self) -> u8 {
		device_weekday(self.weekday)
	}

	/// Decode the first 7 registers of a DS1302 clock burst read.
	pub fn from_ds1302_registers(regs: &[u8]) -> crate::AResult<Self> {
		ensure!(regs.len() >= 7, "DS1302 clock burst too short: {} bytes", regs.len());
		ensure!(regs[2] & 0x80 == 0, "DS1302 runs in 12-hour mode (hour register 0x{:02x})", regs[2]);
		Ok(TimeValue {
			// bit 7: clock halt
			second: decode_field("second", regs[0] & 0x7f)?,
			minute: decode_field("minute", regs[1] & 0x7f)?,
			hour: decode_field("hour", regs[2] & 0x3f)?,
			day: decode_field("date", regs[3] & 0x3f)?,
			month: decode_field("month", regs[4] & 0x1f)?,
			weekday: iso_weekday(regs[5] & 0x07)?,
			year: 2000 + i32::from(decode_field("year", regs[6])?),
		})
	}

	/// Decode the first 7 registers of a DS3231 register dump.
	pub fn from_ds3231_registers(regs: &[u8]) -> crate::AResult<Self> {
		ensure!(regs.len() >= 7, "DS3231 register dump too short: {} bytes", regs.len());
		ensure!(regs[2] & 0x40 == 0, "DS3231 runs in 12-hour mode (hour register 0x{:02x})", regs[2]);
		Ok(TimeValue {
			second: decode_field("second", regs[0] & 0x7f)?,
			minute: decode_field("minute", regs[1] & 0x7f)?,
			hour: decode_field("hour", regs[2] & 0x3f)?,
			weekday: iso_weekday(regs[3] & 0x07)?,
			day: decode_field("date", regs[4] & 0x3f)?,
			// bit 7: century
			month: decode_field("month", regs[5] & 0x1f)?,
			year: 2000 + i32::from(decode_field("year", regs[6])?),
		})
	}
}

impl fmt::Display for TimeValue {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{:04}-{:02}-{:02} {:02}:{:02}:{:02} (weekday {})",
			self.year, self.month, self.day,
			self.hour, self.minute, self.second,
			self.weekday,
		)
	}
}

fn decode_field(name: &str, byte: u8) -> crate::AResult<u8> {
	bcd::try_decode(byte).ok_or_else(|| format_err!("Invalid BCD in {} register: 0x{:02x}", name, byte))
}

/// Map an ISO weekday (Monday = 1) to the chips' day register: `(iso % 7) + 1`
pub fn device_weekday(iso_weekday: u8) -> u8 {
	(iso_weekday % 7) + 1
}

/// Inverse of `device_weekday`
pub fn iso_weekday(device_weekday: u8) -> crate::AResult<u8> {
	match device_weekday {
		1 => Ok(7),
		2..=7 => Ok(device_weekday - 1),
		d => bail!("Invalid day register: {}", d),
	}
}

/// Bytes for one register burst write, command byte(s) first.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct RegisterFrame(Vec<u8>);

impl RegisterFrame {
	pub fn build(clock: Clock, time: &TimeValue) -> Self {
		let mut bytes = Vec::with_capacity(21);
		match clock {
			Clock::Ds1302 => {
				bytes.push(DS1302_CLOCK_BURST);
				bytes.push(bcd::encode(time.second.into()));
				bytes.push(bcd::encode(time.minute.into()));
				bytes.push(bcd::encode(time.hour.into()));
				bytes.push(bcd::encode(time.day.into()));
				bytes.push(bcd::encode(time.month.into()));
				bytes.push(time.device_weekday());
				bytes.push(bcd::encode(time.year.into()));
				// control register: write protect off
				bytes.push(0);
			},
			Clock::Ds3231 => {
				bytes.push(DS3231_WRITE_ADDRESS);
				bytes.push(DS3231_FIRST_REGISTER);
				bytes.push(bcd::encode(time.second.into()));
				bytes.push(bcd::encode(time.minute.into()));
				bytes.push(bcd::encode(time.hour.into()));
				bytes.push(time.device_weekday());
				bytes.push(bcd::encode(time.day.into()));
				bytes.push(bcd::encode(time.month.into()));
				bytes.push(bcd::encode(time.year.into()));
				bytes.extend_from_slice(&[0u8; DS3231_TRAILING_REGISTERS]);
			},
		}
		RegisterFrame(bytes)
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// Register values without the leading command / device address byte
	pub fn payload(&self) -> &[u8] {
		&self.0[1..]
	}
}

impl Deref for RegisterFrame {
	type Target = [u8];

	fn deref(&self) -> &[u8] {
		&self.0
	}
}
