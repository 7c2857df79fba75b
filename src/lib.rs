#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

macro_rules! with_context {
	(( $fmt:tt $($t:tt)* ), $e:expr) => {{
		use failure::Error;

		match (|| { $e })() {
			Ok(v) => Ok(v),
			Err(e) => {
				let e: Error = e;
				let msg = format!(concat!($fmt, ": {}") $($t)*, e);
				Err(Error::from(e.context(msg)))
			}
		}
	}};

	($msg:expr, $e:expr) => {
		with_context!(("{}", $msg), $e)
	};
}

pub type AResult<T> = Result<T, failure::Error>;

pub mod bcd;
pub mod bus;
pub mod devices;
pub mod frame;
pub mod interrupt;
pub mod output;
pub mod poll;
pub mod session;
pub mod transaction;
pub mod usb;

pub use self::bus::{
	BusTransport,
	TransportConfig,
	TransportUnavailable,
};
pub use self::session::DeviceSession;
pub use self::transaction::{
	Operation,
	TransactionError,
};
