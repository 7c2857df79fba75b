//! Simulated transport recording every primitive call.

use std::collections::VecDeque;
use std::io;

use super::{
	Ack,
	AckMode,
	BusTransport,
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Call {
	Start,
	Write(Vec<u8>),
	Read(usize, AckMode),
	GetAck,
	SetAckMode(AckMode),
	Stop,
	Close,
}

pub struct MockTransport {
	pub calls: Vec<Call>,
	// answers for get_ack, in order; ACK once empty
	pub acks: VecDeque<Ack>,
	// bytes handed out by read; counting pattern once empty
	pub data: VecDeque<u8>,
	pub fail_writes: bool,
	pub on_read: Option<Box<dyn FnMut()>>,
	ack_mode: AckMode,
	counter: u8,
	pub acked_bytes: usize,
	pub nacked_bytes: usize,
}

impl MockTransport {
	pub fn new() -> Self {
		MockTransport {
			calls: Vec::new(),
			acks: VecDeque::new(),
			data: VecDeque::new(),
			fail_writes: false,
			on_read: None,
			ack_mode: AckMode::AckAll,
			counter: 0,
			acked_bytes: 0,
			nacked_bytes: 0,
		}
	}

	pub fn with_acks(acks: &[Ack]) -> Self {
		let mut mock = Self::new();
		mock.acks.extend(acks.iter().cloned());
		mock
	}

	pub fn count(&self, call: &Call) -> usize {
		self.calls.iter().filter(|c| *c == call).count()
	}

	pub fn reads(&self) -> usize {
		self.calls.iter().filter(|c| match c { Call::Read(..) => true, _ => false }).count()
	}
}

impl BusTransport for MockTransport {
	fn description(&self) -> String {
		"mock transport".into()
	}

	fn clock(&self) -> u32 {
		400_000
	}

	fn start(&mut self) -> io::Result<()> {
		self.calls.push(Call::Start);
		Ok(())
	}

	fn write(&mut self, data: &[u8]) -> io::Result<()> {
		self.calls.push(Call::Write(data.to_vec()));
		if self.fail_writes {
			return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
		}
		Ok(())
	}

	fn read(&mut self, count: usize) -> io::Result<Vec<u8>> {
		self.calls.push(Call::Read(count, self.ack_mode));
		if let Some(ref mut hook) = self.on_read {
			hook();
		}
		match self.ack_mode {
			AckMode::AckAll => self.acked_bytes += count,
			AckMode::NackAll => self.nacked_bytes += count,
		}
		let mut result = Vec::with_capacity(count);
		for _ in 0..count {
			let byte = match self.data.pop_front() {
				Some(b) => b,
				None => {
					self.counter = self.counter.wrapping_add(1);
					self.counter
				}
			};
			result.push(byte);
		}
		Ok(result)
	}

	fn get_ack(&mut self) -> Ack {
		self.calls.push(Call::GetAck);
		self.acks.pop_front().unwrap_or(Ack::Ack)
	}

	fn set_ack_mode(&mut self, mode: AckMode) {
		self.calls.push(Call::SetAckMode(mode));
		self.ack_mode = mode;
	}

	fn stop(&mut self) -> io::Result<()> {
		self.calls.push(Call::Stop);
		Ok(())
	}

	fn close(&mut self) -> io::Result<()> {
		self.calls.push(Call::Close);
		Ok(())
	}
}
