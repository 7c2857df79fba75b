use std::io;

use crate::bus::{
	self,
	BitBang,
	BusTransport,
	GpioPinout,
	SysfsGpio,
	TransportConfig,
	TransportUnavailable,
};
use crate::transaction::{
	self,
	Operation,
	TransactionError,
};

/// Exclusive owner of an open bus transport.
///
/// The transport is closed exactly once: by `close`, or when the session is
/// dropped on an error / cancellation path.
pub struct DeviceSession<T: BusTransport> {
	transport: T,
	closed: bool,
}

impl<T: BusTransport> DeviceSession<T> {
	pub fn new(transport: T) -> Self {
		info!("{} initialized at {}Hz", transport.description(), transport.clock());
		DeviceSession {
			transport,
			closed: false,
		}
	}

	pub fn execute(&mut self, op: &Operation) -> Result<Vec<u8>, TransactionError> {
		transaction::execute(&mut self.transport, op)
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	pub fn close(mut self) -> io::Result<()> {
		self.closed = true;
		debug!("Closing {}", self.transport.description());
		self.transport.close()
	}
}

impl<T: BusTransport> Drop for DeviceSession<T> {
	fn drop(&mut self) {
		if !self.closed {
			self.closed = true;
			if let Err(e) = self.transport.close() {
				error!("Failed to close {}: {}", self.transport.description(), e);
			}
		}
	}
}

/// Bit-banged bus on sysfs GPIO lines
pub fn open_sysfs(config: &TransportConfig, pinout: &GpioPinout) -> Result<DeviceSession<BitBang<SysfsGpio>>, TransportUnavailable> {
	debug!("Opening {} on {}", config, pinout);
	Ok(DeviceSession::new(bus::bitbang::open_sysfs(config, pinout)?))
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::bus::mock::{
		Call,
		MockTransport,
	};

	#[test]
	fn close_releases_once() {
		let mut session = DeviceSession::new(MockTransport::new());
		session.execute(&Operation::WriteOnly { data: &[0x8e, 0x00] }).unwrap();
		assert_eq!(session.transport().count(&Call::Close), 0);
		session.close().unwrap();
	}

	#[test]
	fn drop_releases_transport() {
		use std::cell::Cell;
		use std::rc::Rc;

		struct Closing(MockTransport, Rc<Cell<usize>>);

		impl BusTransport for Closing {
			fn description(&self) -> String { self.0.description() }
			fn clock(&self) -> u32 { self.0.clock() }
			fn start(&mut self) -> io::Result<()> { self.0.start() }
			fn write(&mut self, data: &[u8]) -> io::Result<()> { self.0.write(data) }
			fn read(&mut self, count: usize) -> io::Result<Vec<u8>> { self.0.read(count) }
			fn get_ack(&mut self) -> bus::Ack { self.0.get_ack() }
			fn set_ack_mode(&mut self, mode: bus::AckMode) { self.0.set_ack_mode(mode) }
			fn stop(&mut self) -> io::Result<()> { self.0.stop() }
			fn close(&mut self) -> io::Result<()> {
				self.1.set(self.1.get() + 1);
				self.0.close()
			}
		}

		let closed = Rc::new(Cell::new(0));
		{
			let mut session = DeviceSession::new(Closing(MockTransport::with_acks(&[bus::Ack::Nack]), closed.clone()));
			assert!(session.execute(&Operation::WriteOnly { data: &[0xd0] }).is_err());
		}
		assert_eq!(closed.get(), 1);

		let session = DeviceSession::new(Closing(MockTransport::new(), closed.clone()));
		session.close().unwrap();
		assert_eq!(closed.get(), 2);
	}
}
