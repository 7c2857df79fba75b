//! 24xx-style I2C serial EEPROM with 16-bit word addresses
//!
//! Sequential read: write the start address (dummy write), repeated start
//! with the read address, then clock out bytes until NACK + stop.

use std::path::Path;
use std::sync::atomic::{
	AtomicBool,
	Ordering,
};

use crate::bus::{
	BusTransport,
	FOUR_HUNDRED_KHZ,
	TransportConfig,
};
use crate::output::write_dump;
use crate::session::DeviceSession;
use crate::transaction::{
	Operation,
	TransactionError,
};

pub const DEVICE_ADDRESS: u8 = 0xa0;
pub const READ_COMMAND: u8 = 0xa1;
/// 24C256
pub const DEFAULT_SIZE: usize = 0x8000;
pub const DEFAULT_OUTPUT: &str = "eeprom.bin";

pub fn transport_config() -> TransportConfig {
	TransportConfig::i2c(FOUR_HUNDRED_KHZ)
}

fn address_command(start: u16) -> [u8; 3] {
	[DEVICE_ADDRESS, (start >> 8) as u8, start as u8]
}

pub fn read<T: BusTransport>(session: &mut DeviceSession<T>, start: u16, size: usize) -> Result<Vec<u8>, TransactionError> {
	let command = address_command(start);
	session.execute(&Operation::WriteThenRead {
		command: &command,
		read_address: Some(READ_COMMAND),
		count: size,
	})
}

/// Read `size` bytes starting at `start` and store them as flat binary file.
///
/// Returns the number of bytes written, or `None` if `cancel` was set while
/// reading; no file is written then.
pub fn dump<T, P>(session: &mut DeviceSession<T>, start: u16, size: usize, path: P, cancel: &AtomicBool) -> crate::AResult<Option<usize>>
where
	T: BusTransport,
	P: AsRef<Path>,
{
	let path = path.as_ref();
	ensure!(size > 0, "EEPROM dump needs at least one byte");
	info!("Reading {} bytes from EEPROM address 0x{:04x}", size, start);
	let data = read(session, start, size)?;
	if cancel.load(Ordering::SeqCst) {
		info!("Cancelled, not writing {}", path.display());
		return Ok(None);
	}
	write_dump(path, &data)?;
	info!("Dumped {} bytes to {}", data.len(), path.display());
	Ok(Some(data.len()))
}

#[cfg(test)]
mod test {
	use std::fs;
	use std::path::PathBuf;
	use std::sync::Arc;

	use super::*;
	use crate::bus::{
		Ack,
		AckMode,
	};
	use crate::bus::mock::{
		Call,
		MockTransport,
	};

	#[test]
	fn sequential_read_from_zero() {
		let mut session = DeviceSession::new(MockTransport::new());
		let data = read(&mut session, 0, 64).unwrap();
		assert_eq!(data.len(), 64);
		let t = session.transport();
		assert_eq!(t.calls[1], Call::Write(vec![0xa0, 0x00, 0x00]));
		assert!(t.calls.contains(&Call::Write(vec![0xa1])));
		assert_eq!(t.acked_bytes, 63);
		assert_eq!(t.nacked_bytes, 1);
		assert_eq!(t.calls.last(), Some(&Call::Stop));
		assert_eq!(t.calls[t.calls.len() - 2], Call::Read(1, AckMode::NackAll));
	}

	#[test]
	fn start_address_big_endian() {
		assert_eq!(address_command(0x1234), [0xa0, 0x12, 0x34]);
	}

	fn dump_path(tag: &str) -> PathBuf {
		std::env::temp_dir().join(format!("serial-bus-rtc-eeprom-{}-{}.bin", tag, std::process::id()))
	}

	#[test]
	fn dump_writes_exactly_size_bytes() {
		let path = dump_path("full");
		let mut mock = MockTransport::new();
		mock.data.extend(0u8..100);
		let mut session = DeviceSession::new(mock);

		assert_eq!(dump(&mut session, 0, 100, &path, &AtomicBool::new(false)).unwrap(), Some(100));
		let written = fs::read(&path).unwrap();
		assert_eq!(written, (0u8..100).collect::<Vec<u8>>());
		let _ = fs::remove_file(&path);
	}

	#[test]
	fn nack_on_read_command_writes_no_file() {
		let path = dump_path("nack");
		let _ = fs::remove_file(&path);
		let mut session = DeviceSession::new(MockTransport::with_acks(&[Ack::Ack, Ack::Nack]));

		let err = dump(&mut session, 0, 16, &path, &AtomicBool::new(false)).unwrap_err();
		match err.downcast_ref::<TransactionError>() {
			Some(TransactionError::ReadRejected) => (),
			e => panic!("expected ReadRejected, got {:?}", e),
		}
		assert!(!path.exists());
		assert_eq!(session.transport().reads(), 0);
	}

	#[test]
	fn cancel_during_read_finishes_transaction_and_skips_file() {
		let path = dump_path("cancel");
		let _ = fs::remove_file(&path);
		let cancel = Arc::new(AtomicBool::new(false));
		let flag = cancel.clone();
		let mut mock = MockTransport::new();
		mock.on_read = Some(Box::new(move || flag.store(true, Ordering::SeqCst)));
		let mut session = DeviceSession::new(mock);

		assert_eq!(dump(&mut session, 0, 32, &path, &cancel).unwrap(), None);
		assert!(!path.exists());
		let t = session.transport();
		assert_eq!(t.nacked_bytes, 1);
		assert_eq!(t.calls.last(), Some(&Call::Stop));
	}

	#[test]
	fn empty_dump_is_refused() {
		let path = dump_path("empty");
		let mut session = DeviceSession::new(MockTransport::new());
		assert!(dump(&mut session, 0, 0, &path, &AtomicBool::new(false)).is_err());
		assert!(session.transport().calls.is_empty());
		assert!(!path.exists());
	}
}
