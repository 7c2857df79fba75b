#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate serial_bus_rtc;
use serial_bus_rtc::*;

use std::process::exit;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use serial_bus_rtc::bus::GpioPinout;
use serial_bus_rtc::devices::{
	ds1302,
	ds3231,
	eeprom,
};
use serial_bus_rtc::frame::TimeValue;
use serial_bus_rtc::output::{
	hex_line,
	HexPrinter,
};
use serial_bus_rtc::poll::{
	poll,
	PollConfig,
};

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	match get_optional_param(matches, name)? {
		Some(p) => Ok(p),
		None => bail!("missing parameter {}", name),
	}
}

fn get_optional_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<Option<T>>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => return Ok(None),
	};
	param.parse::<T>().map(Some).map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

// decimal or 0x-prefixed hex
fn get_number(matches: &clap::ArgMatches, name: &str) -> AResult<Option<u64>> {
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => return Ok(None),
	};
	let parsed = if param.starts_with("0x") || param.starts_with("0X") {
		u64::from_str_radix(&param[2..], 16)
	} else {
		param.parse::<u64>()
	};
	match parsed {
		Ok(n) => Ok(Some(n)),
		Err(e) => bail!("invalid parameter {}: {:?}: {}", name, param, e),
	}
}

fn transport_config(sub_m: &clap::ArgMatches, default: TransportConfig) -> AResult<TransportConfig> {
	Ok(match get_number(sub_m, "clock")? {
		Some(0) => bail!("clock rate must not be 0"),
		Some(hz) if hz > u64::from(u32::max_value()) => bail!("clock rate too high: {}", hz),
		Some(hz) => default.with_clock(hz as u32),
		None => default,
	})
}

fn poll_config(sub_m: &clap::ArgMatches) -> AResult<PollConfig> {
	let mut config = PollConfig::default();
	if let Some(ms) = get_number(sub_m, "interval")? {
		config.interval = Duration::from_millis(ms);
	}
	config.keep_going = sub_m.is_present("keep_going");
	Ok(config)
}

fn decoding_sink(decode: fn(&[u8]) -> AResult<TimeValue>) -> impl FnMut(&[u8]) -> AResult<()> {
	move |data: &[u8]| -> AResult<()> {
		match decode(data) {
			Ok(time) => println!("{} {}", hex_line(data), time),
			Err(e) => {
				println!("{}", hex_line(data));
				warn!("Couldn't decode clock registers: {}", e);
			},
		}
		Ok(())
	}
}

fn run_poll<T: BusTransport>(
	session: &mut DeviceSession<T>,
	op: &Operation,
	config: &PollConfig,
	cancel: &AtomicBool,
	decode: Option<fn(&[u8]) -> AResult<TimeValue>>,
) -> AResult<()> {
	info!("Reading time in {:?} intervals (stop with Ctrl+C):", config.interval);
	let outcome = match decode {
		Some(decode) => poll(session, op, config, cancel, &mut decoding_sink(decode))?,
		None => poll(session, op, config, cancel, &mut HexPrinter::stdout())?,
	};
	debug!("{} reads, {} failed", outcome.reads, outcome.failures);
	info!("Exiting...");
	Ok(())
}

fn run_ds1302(sub_m: &clap::ArgMatches) -> AResult<()> {
	let pinout = GpioPinout {
		clock: get_param(sub_m, "clk")?,
		data_out: get_param(sub_m, "io")?,
		data_in: get_optional_param(sub_m, "miso")?,
		chip_select: Some(get_param(sub_m, "ce")?),
	};
	let config = transport_config(sub_m, ds1302::transport_config())?;
	let poll_config = poll_config(sub_m)?;
	let decode = if sub_m.is_present("decode") {
		Some(TimeValue::from_ds1302_registers as fn(&[u8]) -> AResult<TimeValue>)
	} else {
		None
	};

	let cancel = interrupt::install()?;
	let mut session = session::open_sysfs(&config, &pinout)?;
	let frame = ds1302::init(&mut session, &TimeValue::capture())?;
	println!("{}", hex_line(frame.payload()));

	run_poll(&mut session, &ds1302::READ_CLOCK, &poll_config, cancel, decode)?;
	session.close()?;
	Ok(())
}

fn run_ds3231(sub_m: &clap::ArgMatches) -> AResult<()> {
	let pinout = GpioPinout {
		clock: get_param(sub_m, "scl")?,
		data_out: get_param(sub_m, "sda")?,
		data_in: None,
		chip_select: None,
	};
	let config = transport_config(sub_m, ds3231::transport_config())?;
	let poll_config = poll_config(sub_m)?;
	let decode = if sub_m.is_present("decode") {
		Some(TimeValue::from_ds3231_registers as fn(&[u8]) -> AResult<TimeValue>)
	} else {
		None
	};

	let cancel = interrupt::install()?;
	let mut session = session::open_sysfs(&config, &pinout)?;
	let frame = ds3231::write_time(&mut session, &TimeValue::capture()).map_err(ds3231_init_error)?;
	println!("{}", hex_line(&frame));

	run_poll(&mut session, &ds3231::READ_REGISTERS, &poll_config, cancel, decode)?;
	info!("Closing I2C connection");
	session.close()?;
	Ok(())
}

// keeps the transaction error in the chain for the exit code
fn ds3231_init_error(e: TransactionError) -> failure::Error {
	match e {
		TransactionError::CommandRejected => {
			failure::Error::from(e).context("Received initial write command NACK (is the DS3231 connected?)").into()
		},
		e => e.into(),
	}
}

fn run_eeprom_dump(sub_m: &clap::ArgMatches) -> AResult<()> {
	let pinout = GpioPinout {
		clock: get_param(sub_m, "scl")?,
		data_out: get_param(sub_m, "sda")?,
		data_in: None,
		chip_select: None,
	};
	let config = transport_config(sub_m, eeprom::transport_config())?;
	let size = get_number(sub_m, "size")?.unwrap_or(eeprom::DEFAULT_SIZE as u64);
	let start = get_number(sub_m, "start")?.unwrap_or(0);
	ensure!(start <= 0xffff, "start address out of range: 0x{:x}", start);
	ensure!(size > 0, "size must not be 0");
	let output = sub_m.value_of("output").unwrap_or(eeprom::DEFAULT_OUTPUT);

	let cancel = interrupt::install()?;
	let mut session = session::open_sysfs(&config, &pinout)?;
	if eeprom::dump(&mut session, start as u16, size as usize, output, cancel)?.is_none() {
		info!("Exiting...");
	}
	session.close()?;
	Ok(())
}

fn list_usb() -> AResult<()> {
	for device in usb::list_devices()? {
		println!("{}", device);
	}
	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@subcommand ds1302 =>
			(about: "set DS1302 clock to system time, then print its registers every interval")
			(@arg clk: --clk +takes_value +required "GPIO number of SCLK")
			(@arg io: --io +takes_value +required "GPIO number of I/O (driven, and read back without --miso)")
			(@arg miso: --miso +takes_value "GPIO number of a separate input wired to I/O")
			(@arg ce: --ce +takes_value +required "GPIO number of CE")
			(@arg clock: --clock +takes_value "bus clock in Hz (default 1000000)")
			(@arg interval: --interval +takes_value "poll interval in ms (default 1000)")
			(@arg keep_going: -k --("keep-going") "keep polling after failed reads")
			(@arg decode: -d --decode "decode registers after the hex dump")
		)
		(@subcommand ds3231 =>
			(about: "set DS3231 clock to system time, then print its registers every interval")
			(@arg scl: --scl +takes_value +required "GPIO number of SCL")
			(@arg sda: --sda +takes_value +required "GPIO number of SDA")
			(@arg clock: --clock +takes_value "bus clock in Hz (default 400000)")
			(@arg interval: --interval +takes_value "poll interval in ms (default 1000)")
			(@arg keep_going: -k --("keep-going") "keep polling after failed reads")
			(@arg decode: -d --decode "decode registers after the hex dump")
		)
		(@subcommand eeprom_dump =>
			(about: "dump I2C EEPROM as binary file")
			(@arg scl: --scl +takes_value +required "GPIO number of SCL")
			(@arg sda: --sda +takes_value +required "GPIO number of SDA")
			(@arg clock: --clock +takes_value "bus clock in Hz (default 400000)")
			(@arg size: --size +takes_value "number of bytes to read (default 0x8000)")
			(@arg start: --start +takes_value "start address (default 0)")
			(@arg output: -o --output +takes_value "output file (default eeprom.bin)")
		)
		(@subcommand list_usb =>
			(about: "list USB devices")
		)
	).get_matches();

	match matches.subcommand() {
		("ds1302", Some(sub_m)) => {
			run_ds1302(sub_m)
		}
		("ds3231", Some(sub_m)) => {
			run_ds3231(sub_m)
		}
		("eeprom_dump", Some(sub_m)) => {
			run_eeprom_dump(sub_m)
		}
		("list_usb", _) => {
			list_usb()
		}
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn exit_code(e: &failure::Error) -> i32 {
	for cause in e.iter_chain() {
		if cause.downcast_ref::<TransportUnavailable>().is_some() {
			return 2;
		}
		if cause.downcast_ref::<TransactionError>().is_some() {
			return 3;
		}
	}
	1
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(exit_code(&e));
	}
}
