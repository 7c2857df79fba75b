use std::io;
use std::sync::atomic::{
	AtomicBool,
	Ordering,
};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_signal: libc::c_int) {
	// only async-signal-safe work in here
	INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Route Ctrl+C (SIGINT) into a cancellation flag.
///
/// After this the process no longer terminates on SIGINT; the returned flag
/// has to be polled.
pub fn install() -> io::Result<&'static AtomicBool> {
	let handler = handle_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
	let previous = unsafe { libc::signal(libc::SIGINT, handler) };
	if previous == libc::SIG_ERR {
		return Err(io::Error::last_os_error());
	}
	Ok(&INTERRUPTED)
}
