//! Maxim DS3231 I2C real-time clock
//!
//! DataSheet: https://www.analog.com/media/en/technical-documentation/data-sheets/DS3231.pdf
//!
//! Registers 0x00 - 0x12: time (7), alarm 1 (4), alarm 2 (3), control,
//! status, aging offset, temperature MSB/LSB.

use crate::bus::{
	BusTransport,
	FOUR_HUNDRED_KHZ,
	TransportConfig,
};
use crate::frame::{
	Clock,
	DS3231_FIRST_REGISTER,
	DS3231_WRITE_ADDRESS,
	RegisterFrame,
	TimeValue,
};
use crate::session::DeviceSession;
use crate::transaction::{
	Operation,
	TransactionError,
};

pub const WRITE_ADDRESS: u8 = DS3231_WRITE_ADDRESS;
pub const READ_ADDRESS: u8 = 0xd1;
pub const FIRST_REGISTER: u8 = DS3231_FIRST_REGISTER;
pub const REGISTER_COUNT: usize = 19;

/// Set the register pointer to 0, then read all registers
pub const READ_REGISTERS: Operation<'static> = Operation::WriteThenRead {
	command: &[WRITE_ADDRESS, FIRST_REGISTER],
	read_address: Some(READ_ADDRESS),
	count: REGISTER_COUNT,
};

pub fn transport_config() -> TransportConfig {
	TransportConfig::i2c(FOUR_HUNDRED_KHZ)
}

/// Set the clock; alarms, control and status registers are cleared.
///
/// A NACK here means the chip is not present (or not answering), which is
/// reported before any polling starts.
pub fn write_time<T: BusTransport>(session: &mut DeviceSession<T>, time: &TimeValue) -> Result<RegisterFrame, TransactionError> {
	let frame = RegisterFrame::build(Clock::Ds3231, time);
	info!("Initializing time: {}", time);
	session.execute(&Operation::WriteOnly { data: &frame })?;
	Ok(frame)
}

pub fn read_registers<T: BusTransport>(session: &mut DeviceSession<T>) -> Result<Vec<u8>, TransactionError> {
	session.execute(&READ_REGISTERS)
}
