//! Maxim DS1302 trickle-charge timekeeping chip (3-wire serial interface)
//!
//! DataSheet: https://www.analog.com/media/en/technical-documentation/data-sheets/DS1302.pdf
//!
//! Driven as SPI mode 3, LSB first, with the chip enable line idling low.
//! Commands:
//! - 0x8F: read control register (1 byte)
//! - 0x8E: write control register (1 byte), bit 7 = write protect
//! - 0xBF: clock burst, 8 registers (sec, min, hour, date, month, day, year, control)

use crate::bus::{
	BitOrder,
	BusTransport,
	Mode,
	ONE_MHZ,
	TransportConfig,
};
use crate::frame::{
	Clock,
	DS1302_CLOCK_BURST,
	RegisterFrame,
	TimeValue,
};
use crate::session::DeviceSession;
use crate::transaction::{
	Operation,
	TransactionError,
};

pub const CONTROL_READ: u8 = 0x8f;
pub const CONTROL_WRITE: u8 = 0x8e;
pub const CLOCK_BURST: u8 = DS1302_CLOCK_BURST;
pub const WRITE_PROTECT: u8 = 0x80;
pub const CLOCK_REGISTERS: usize = 8;

pub const READ_CLOCK: Operation<'static> = Operation::WriteThenRead {
	command: &[CLOCK_BURST],
	read_address: None,
	count: CLOCK_REGISTERS,
};

pub fn transport_config() -> TransportConfig {
	let mut config = TransportConfig::spi(Mode::Spi3, ONE_MHZ, BitOrder::Lsb);
	// chip enable is active high
	config.chip_select_idle_high = false;
	config
}

pub fn read_control<T: BusTransport>(session: &mut DeviceSession<T>) -> Result<u8, TransactionError> {
	let data = session.execute(&Operation::WriteThenRead {
		command: &[CONTROL_READ],
		read_address: None,
		count: 1,
	})?;
	Ok(data[0])
}

pub fn write_control<T: BusTransport>(session: &mut DeviceSession<T>, control: u8) -> Result<(), TransactionError> {
	session.execute(&Operation::WriteOnly { data: &[CONTROL_WRITE, control] })?;
	Ok(())
}

pub fn write_time<T: BusTransport>(session: &mut DeviceSession<T>, time: &TimeValue) -> Result<RegisterFrame, TransactionError> {
	let frame = RegisterFrame::build(Clock::Ds1302, time);
	session.execute(&Operation::WriteOnly { data: &frame })?;
	Ok(frame)
}

/// Clear write protection and set the clock; returns the frame written.
///
/// While the write-protect bit is set the chip ignores writes to all other
/// registers.
pub fn init<T: BusTransport>(session: &mut DeviceSession<T>, time: &TimeValue) -> Result<RegisterFrame, TransactionError> {
	info!("Reading control register.");
	let control = read_control(session)?;
	debug!("DS1302 control register: 0x{:02x}", control);

	info!("Writing control register.");
	write_control(session, control & !WRITE_PROTECT)?;

	info!("Initializing time: {}", time);
	write_time(session, time)
}
