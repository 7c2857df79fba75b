//! Generic bus transaction sequencing.
//!
//! Every operation is framed by start/stop:
//!
//! - start
//! - write command/address bytes, check acknowledgement
//! - optionally: repeated start, write read address, check acknowledgement
//! - optionally: read N bytes (ACK all but the last, NACK the last one)
//! - stop
//!
//! A NACK aborts the transaction; stop is sent exactly once on every path
//! so the shared bus is never left in an open transaction.

use std::fmt;
use std::io;

use crate::bus::{
	Ack,
	AckMode,
	BusTransport,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Step {
	Start,
	Command,
	ReadAddress,
	Data,
	Stop,
}

impl fmt::Display for Step {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(match self {
			Step::Start => "start",
			Step::Command => "command",
			Step::ReadAddress => "read address",
			Step::Data => "data",
			Step::Stop => "stop",
		})
	}
}

#[derive(Debug, Fail)]
pub enum TransactionError {
	#[fail(display = "Received write command NACK")]
	CommandRejected,
	#[fail(display = "Received read command NACK")]
	ReadRejected,
	/// I2C reads need at least one byte to NACK before the stop condition
	#[fail(display = "Empty read after read address")]
	EmptyRead,
	#[fail(display = "Bus I/O failed in {} phase: {}", step, cause)]
	Io {
		step: Step,
		#[cause]
		cause: io::Error,
	},
}

impl TransactionError {
	fn io(step: Step) -> impl FnOnce(io::Error) -> TransactionError {
		move |cause| TransactionError::Io { step, cause }
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Operation<'a> {
	/// write `data` (command/address byte(s) followed by payload) in one frame
	WriteOnly {
		data: &'a [u8],
	},
	/// write `command`, then read `count` bytes.
	///
	/// With a `read_address` the direction is switched by a repeated start
	/// and the read address (I2C); without one the device answers in the
	/// same frame (SPI).
	WriteThenRead {
		command: &'a [u8],
		read_address: Option<u8>,
		count: usize,
	},
	/// read `count` bytes from the device's current register pointer (I2C)
	ReadOnly {
		read_address: u8,
		count: usize,
	},
}

// start/stop framing; the bus is stopped when this goes out of scope
struct Frame<'a, T: ?Sized + BusTransport + 'a> {
	bus: &'a mut T,
	open: bool,
}

impl<'a, T: ?Sized + BusTransport> Frame<'a, T> {
	fn begin(bus: &'a mut T) -> Result<Self, TransactionError> {
		let mut frame = Frame { bus, open: true };
		frame.bus.start().map_err(TransactionError::io(Step::Start))?;
		Ok(frame)
	}

	fn restart(&mut self) -> Result<(), TransactionError> {
		self.bus.start().map_err(TransactionError::io(Step::ReadAddress))
	}

	fn send(&mut self, data: &[u8], step: Step, rejected: TransactionError) -> Result<(), TransactionError> {
		self.bus.write(data).map_err(TransactionError::io(step))?;
		match self.bus.get_ack() {
			Ack::Ack => Ok(()),
			Ack::Nack => {
				debug!("NACK in {} phase after writing {:02x?}", step, data);
				Err(rejected)
			}
		}
	}

	fn receive(&mut self, count: usize) -> Result<Vec<u8>, TransactionError> {
		if 0 == count {
			return Ok(Vec::new());
		}
		// all received bytes, except the last one, must be acknowledged
		let mut data = if count > 1 {
			self.bus.set_ack_mode(AckMode::AckAll);
			self.bus.read(count - 1).map_err(TransactionError::io(Step::Data))?
		} else {
			Vec::with_capacity(1)
		};
		// NACK on the last byte tells the device to stop sending
		self.bus.set_ack_mode(AckMode::NackAll);
		data.extend(self.bus.read(1).map_err(TransactionError::io(Step::Data))?);

		if data.len() != count {
			return Err(TransactionError::Io {
				step: Step::Data,
				cause: io::Error::new(io::ErrorKind::UnexpectedEof, format!("read {} of {} bytes", data.len(), count)),
			});
		}
		Ok(data)
	}

	fn finish(mut self) -> Result<(), TransactionError> {
		self.open = false;
		self.bus.stop().map_err(TransactionError::io(Step::Stop))
	}
}

impl<'a, T: ?Sized + BusTransport> Drop for Frame<'a, T> {
	fn drop(&mut self) {
		if self.open {
			if let Err(e) = self.bus.stop() {
				error!("Failed to stop aborted bus transaction: {}", e);
			}
		}
	}
}

/// Run one operation; returns the bytes read (empty for writes).
pub fn execute<T>(bus: &mut T, op: &Operation) -> Result<Vec<u8>, TransactionError>
where
	T: ?Sized + BusTransport,
{
	trace!("bus transaction: {:02x?}", op);
	match *op {
		Operation::WriteThenRead { read_address: Some(_), count: 0, .. }
		| Operation::ReadOnly { count: 0, .. } => return Err(TransactionError::EmptyRead),
		_ => (),
	}
	let mut frame = Frame::begin(bus)?;
	let data = match *op {
		Operation::WriteOnly { data } => {
			frame.send(data, Step::Command, TransactionError::CommandRejected)?;
			Vec::new()
		},
		Operation::WriteThenRead { command, read_address, count } => {
			frame.send(command, Step::Command, TransactionError::CommandRejected)?;
			if let Some(address) = read_address {
				frame.restart()?;
				frame.send(&[address], Step::ReadAddress, TransactionError::ReadRejected)?;
			}
			frame.receive(count)?
		},
		Operation::ReadOnly { read_address, count } => {
			frame.send(&[read_address], Step::ReadAddress, TransactionError::ReadRejected)?;
			frame.receive(count)?
		},
	};
	frame.finish()?;
	Ok(data)
}
