use std::fs;
use std::io::{
	self,
	Write,
};
use std::path::Path;

use crate::poll::Sink;

/// `"09 05 14 "`: lowercase two-digit hex, every byte followed by a space
pub fn hex_line(data: &[u8]) -> String {
	let mut line = String::with_capacity(3 * data.len());
	for b in data {
		line.push_str(&format!("{:02x} ", b));
	}
	line
}

/// Writes one hex line per read
pub struct HexPrinter<W: Write> {
	out: W,
}

impl<W: Write> HexPrinter<W> {
	pub fn new(out: W) -> Self {
		HexPrinter { out }
	}

	pub fn into_inner(self) -> W {
		self.out
	}
}

impl HexPrinter<io::Stdout> {
	pub fn stdout() -> Self {
		Self::new(io::stdout())
	}
}

impl<W: Write> Sink for HexPrinter<W> {
	fn consume(&mut self, data: &[u8]) -> crate::AResult<()> {
		writeln!(self.out, "{}", hex_line(data))?;
		self.out.flush()?;
		Ok(())
	}
}

/// Raw dump: exactly the bytes read, no header
pub fn write_dump<P: AsRef<Path>>(path: P, data: &[u8]) -> crate::AResult<()> {
	let path = path.as_ref();
	with_context!(("couldn't write dump to {}", path.display()), {
		let mut f = fs::File::create(path)?;
		f.write_all(data)?;
		f.sync_all()?;
		Ok(())
	})
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn hex_line_format() {
		assert_eq!(hex_line(&[0x09, 0x05, 0x14, 0xbf]), "09 05 14 bf ");
		assert_eq!(hex_line(&[]), "");
	}

	#[test]
	fn printer_writes_one_line_per_read() {
		let mut printer = HexPrinter::new(Vec::new());
		printer.consume(&[0x00, 0x59]).unwrap();
		printer.consume(&[0xab]).unwrap();
		assert_eq!(String::from_utf8(printer.into_inner()).unwrap(), "00 59 \nab \n");
	}

	#[test]
	fn dump_is_flat_binary() {
		let path = std::env::temp_dir().join(format!("serial-bus-rtc-dump-{}.bin", std::process::id()));
		let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
		write_dump(&path, &data).unwrap();
		assert_eq!(fs::read(&path).unwrap(), data);
		let _ = fs::remove_file(&path);
	}
}
