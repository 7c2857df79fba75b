use std::sync::atomic::{
	AtomicBool,
	Ordering,
};
use std::thread;
use std::time::Duration;

use crate::bus::BusTransport;
use crate::session::DeviceSession;
use crate::transaction::Operation;

/// Receives the bytes of every completed read
pub trait Sink {
	fn consume(&mut self, data: &[u8]) -> crate::AResult<()>;
}

impl<F> Sink for F
where
	F: FnMut(&[u8]) -> crate::AResult<()>,
{
	fn consume(&mut self, data: &[u8]) -> crate::AResult<()> {
		self(data)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PollConfig {
	pub interval: Duration,
	/// log failed reads and wait for the next tick instead of returning the error
	pub keep_going: bool,
}

impl Default for PollConfig {
	fn default() -> Self {
		PollConfig {
			interval: Duration::from_secs(1),
			keep_going: false,
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct PollOutcome {
	pub reads: u64,
	pub failures: u64,
}

/// Run `op` once per interval until `cancel` is set.
///
/// `cancel` is only checked between transactions; a running transaction
/// always completes (including its stop) first.
pub fn poll<T, S>(
	session: &mut DeviceSession<T>,
	op: &Operation,
	config: &PollConfig,
	cancel: &AtomicBool,
	sink: &mut S,
) -> crate::AResult<PollOutcome>
where
	T: BusTransport,
	S: Sink + ?Sized,
{
	let mut outcome = PollOutcome::default();
	loop {
		if cancel.load(Ordering::SeqCst) { break; }
		thread::sleep(config.interval);
		if cancel.load(Ordering::SeqCst) { break; }

		match session.execute(op) {
			Ok(data) => {
				outcome.reads += 1;
				sink.consume(&data)?;
			},
			Err(e) => {
				outcome.failures += 1;
				if !config.keep_going {
					return Err(e.into());
				}
				warn!("Read failed, retrying on next tick: {}", e);
			},
		}
	}
	debug!("Polling cancelled after {} reads ({} failed)", outcome.reads, outcome.failures);
	Ok(outcome)
}
