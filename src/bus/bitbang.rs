use std::io;
use std::time::Duration;

use super::{
	Ack,
	AckMode,
	BitOrder,
	BusTransport,
	GpioPinout,
	Hardware,
	OutPins,
	SysfsGpio,
	TransportConfig,
	TransportUnavailable,
	reliable_sleep,
};

/// SPI / I2C master clocked by toggling the lines of a `Hardware`.
///
/// The clock rate only sets the minimum time between two edges; the real
/// rate depends on how fast the pins can be switched.
pub struct BitBang<H: Hardware> {
	hardware: H,
	config: TransportConfig,
	half_period: Duration,
	pins: OutPins,
	ack_mode: AckMode,
	last_ack: Ack,
	// I2C: a start condition was sent and no stop yet
	in_frame: bool,
}

impl<H: Hardware> BitBang<H> {
	pub fn new(hardware: H, config: TransportConfig) -> io::Result<Self> {
		let mut bus = BitBang {
			hardware,
			config,
			half_period: config.half_period(),
			pins: OutPins {
				chip_select: config.chip_select_idle_high,
				clock: config.mode.clock_idle_high(),
				data: true,
			},
			ack_mode: AckMode::AckAll,
			last_ack: Ack::Ack,
			in_frame: false,
		};
		let idle = bus.pins;
		bus.set(idle)?;
		Ok(bus)
	}

	fn delay(&mut self) {
		reliable_sleep(self.half_period);
	}

	fn set(&mut self, pins: OutPins) -> io::Result<()> {
		self.pins = pins;
		self.hardware.set_pins(pins)
	}

	fn set_clock(&mut self, clock: bool) -> io::Result<()> {
		let pins = OutPins { clock, ..self.pins };
		self.set(pins)
	}

	fn set_data(&mut self, clock: bool, data: bool) -> io::Result<()> {
		let pins = OutPins { clock, data, ..self.pins };
		self.set(pins)
	}

	fn bits(&self) -> Box<dyn Iterator<Item = u32>> {
		match self.config.bit_order {
			BitOrder::Msb => Box::new((0..8).rev()),
			BitOrder::Lsb => Box::new(0..8),
		}
	}

	// SPI: shift one bit out and one bit in
	fn spi_transfer_bit(&mut self, out: bool) -> io::Result<bool> {
		let idle = self.config.mode.clock_idle_high();
		if self.config.mode.sample_on_trailing_edge() {
			// data changes on the leading edge, sampled on the trailing edge
			self.set_data(!idle, out)?;
			self.delay();
			self.set_clock(idle)?;
			let bit = self.hardware.read_pin()?;
			self.delay();
			Ok(bit)
		} else {
			// data must be valid before the leading edge
			self.set_data(idle, out)?;
			self.delay();
			self.set_clock(!idle)?;
			let bit = self.hardware.read_pin()?;
			self.delay();
			self.set_clock(idle)?;
			Ok(bit)
		}
	}

	fn spi_transfer_byte(&mut self, out: u8) -> io::Result<u8> {
		let mut result = 0u8;
		for bit in self.bits() {
			let bit_mask = 1u8 << bit;
			if self.spi_transfer_bit(0 != (out & bit_mask))? {
				result |= bit_mask;
			}
		}
		Ok(result)
	}

	// I2C: clock one bit while SCL is low before and after
	fn i2c_send_bit(&mut self, data: bool) -> io::Result<()> {
		self.set_data(false, data)?;
		self.delay();
		self.set_clock(true)?;
		self.delay();
		self.set_clock(false)
	}

	fn i2c_receive_bit(&mut self) -> io::Result<bool> {
		self.set_data(false, true)?;
		self.delay();
		self.set_clock(true)?;
		self.delay();
		let bit = self.hardware.read_pin()?;
		self.set_clock(false)?;
		Ok(bit)
	}

	// returns the acknowledgement of the receiver
	fn i2c_send_byte(&mut self, byte: u8) -> io::Result<Ack> {
		for bit in self.bits() {
			self.i2c_send_bit(0 != (byte & (1u8 << bit)))?;
		}
		// receiver pulls SDA low to acknowledge
		Ok(if self.i2c_receive_bit()? { Ack::Nack } else { Ack::Ack })
	}

	fn i2c_receive_byte(&mut self, ack: Ack) -> io::Result<u8> {
		let mut result = 0u8;
		for bit in self.bits() {
			if self.i2c_receive_bit()? {
				result |= 1u8 << bit;
			}
		}
		self.i2c_send_bit(ack == Ack::Nack)?;
		self.set_data(false, true)?;
		Ok(result)
	}
}

impl<H: Hardware> BusTransport for BitBang<H> {
	fn description(&self) -> String {
		format!("{} ({})", self.hardware.description(), self.config.mode)
	}

	fn clock(&self) -> u32 {
		self.config.clock_hz
	}

	fn start(&mut self) -> io::Result<()> {
		self.last_ack = Ack::Ack;
		if self.config.mode.is_i2c() {
			if self.in_frame {
				// repeated start: release SDA while SCL is low
				self.set_data(false, true)?;
				self.delay();
			}
			self.set_data(true, true)?;
			self.delay();
			// SDA falling while SCL is high
			self.set_data(true, false)?;
			self.delay();
			self.set_clock(false)?;
			self.delay();
			self.in_frame = true;
		} else {
			let pins = OutPins {
				chip_select: !self.config.chip_select_idle_high,
				clock: self.config.mode.clock_idle_high(),
				data: self.pins.data,
			};
			self.set(pins)?;
			self.delay();
		}
		Ok(())
	}

	fn write(&mut self, data: &[u8]) -> io::Result<()> {
		self.last_ack = Ack::Ack;
		for &byte in data {
			if self.config.mode.is_i2c() {
				if Ack::Nack == self.i2c_send_byte(byte)? {
					trace!("NACK after writing 0x{:02x}", byte);
					self.last_ack = Ack::Nack;
					break;
				}
			} else {
				self.spi_transfer_byte(byte)?;
			}
		}
		Ok(())
	}

	fn read(&mut self, count: usize) -> io::Result<Vec<u8>> {
		let mut data = Vec::with_capacity(count);
		for _ in 0..count {
			let byte = if self.config.mode.is_i2c() {
				let ack = match self.ack_mode {
					AckMode::AckAll => Ack::Ack,
					AckMode::NackAll => Ack::Nack,
				};
				self.i2c_receive_byte(ack)?
			} else {
				// keep MOSI high (released on a shared I/O line) while reading
				self.spi_transfer_byte(0xff)?
			};
			data.push(byte);
		}
		Ok(data)
	}

	fn get_ack(&mut self) -> Ack {
		self.last_ack
	}

	fn set_ack_mode(&mut self, mode: AckMode) {
		self.ack_mode = mode;
	}

	fn stop(&mut self) -> io::Result<()> {
		if self.config.mode.is_i2c() {
			self.set_data(false, false)?;
			self.delay();
			self.set_clock(true)?;
			self.delay();
			// SDA rising while SCL is high
			self.set_data(true, true)?;
			self.delay();
			self.in_frame = false;
		} else {
			let pins = OutPins {
				chip_select: self.config.chip_select_idle_high,
				clock: self.config.mode.clock_idle_high(),
				data: true,
			};
			self.set(pins)?;
			self.delay();
		}
		Ok(())
	}

	fn close(&mut self) -> io::Result<()> {
		self.hardware.release()
	}
}

pub fn open_sysfs(config: &TransportConfig, pinout: &GpioPinout) -> Result<BitBang<SysfsGpio>, TransportUnavailable> {
	let gpio = SysfsGpio::open(pinout, config.mode).map_err(|cause| TransportUnavailable {
		what: format!("GPIO lines {}", pinout),
		cause,
	})?;
	BitBang::new(gpio, *config).map_err(|cause| TransportUnavailable {
		what: format!("idle levels on GPIO lines {}", pinout),
		cause,
	})
}

#[cfg(test)]
mod test {
	use std::cell::RefCell;
	use std::collections::VecDeque;
	use std::rc::Rc;

	use super::*;
	use crate::bus::Mode;

	#[derive(Default)]
	struct Wires {
		history: Vec<OutPins>,
		// levels returned by read_pin, in order; high once empty
		input: VecDeque<bool>,
	}

	struct FakePins(Rc<RefCell<Wires>>);

	impl Hardware for FakePins {
		fn description(&self) -> String {
			"fake pins".into()
		}

		fn set_pins(&mut self, pins: OutPins) -> io::Result<()> {
			self.0.borrow_mut().history.push(pins);
			Ok(())
		}

		fn read_pin(&mut self) -> io::Result<bool> {
			Ok(self.0.borrow_mut().input.pop_front().unwrap_or(true))
		}
	}

	fn fast(mut config: TransportConfig) -> TransportConfig {
		// keep the bit-bang delays short in tests
		config.clock_hz = 500_000_000;
		config
	}

	fn bus(config: TransportConfig) -> (BitBang<FakePins>, Rc<RefCell<Wires>>) {
		let wires = Rc::new(RefCell::new(Wires::default()));
		let bus = BitBang::new(FakePins(wires.clone()), fast(config)).unwrap();
		wires.borrow_mut().history.clear();
		(bus, wires)
	}

	// data levels present at each rising SCL edge
	fn sampled_bits(history: &[OutPins]) -> Vec<bool> {
		history.windows(2)
			.filter(|w| !w[0].clock && w[1].clock)
			.map(|w| w[1].data)
			.collect()
	}

	#[test]
	fn i2c_start_and_stop_conditions() {
		let (mut bus, wires) = bus(TransportConfig::i2c(400_000));
		bus.start().unwrap();
		bus.stop().unwrap();
		let history = wires.borrow().history.clone();
		// start: SDA falls while SCL high
		assert!(history.windows(2).any(|w| w[0].clock && w[1].clock && w[0].data && !w[1].data));
		// stop: ends with both lines released
		let last = history.last().unwrap();
		assert!(last.clock && last.data);
	}

	#[test]
	fn i2c_write_sends_msb_first_and_reads_ack() {
		let (mut bus, wires) = bus(TransportConfig::i2c(400_000));
		bus.start().unwrap();
		wires.borrow_mut().history.clear();
		// slave pulls SDA low for the ack bit
		wires.borrow_mut().input.push_back(false);
		bus.write(&[0xd0]).unwrap();
		assert_eq!(bus.get_ack(), Ack::Ack);

		let bits = sampled_bits(&wires.borrow().history);
		// eight data bits plus the released ack bit
		assert_eq!(bits, vec![true, true, false, true, false, false, false, false, true]);
	}

	#[test]
	fn i2c_write_stops_after_nack() {
		let (mut bus, wires) = bus(TransportConfig::i2c(400_000));
		bus.start().unwrap();
		wires.borrow_mut().history.clear();
		// nobody pulls SDA low: NACK on the first byte
		bus.write(&[0xa0, 0x00, 0x00]).unwrap();
		assert_eq!(bus.get_ack(), Ack::Nack);
		assert_eq!(sampled_bits(&wires.borrow().history).len(), 9);

		// a new start clears the state
		bus.start().unwrap();
		assert_eq!(bus.get_ack(), Ack::Ack);
	}

	#[test]
	fn i2c_read_answers_with_ack_mode() {
		let (mut bus, wires) = bus(TransportConfig::i2c(400_000));
		bus.start().unwrap();
		wires.borrow_mut().input.extend(vec![false, true, false, true, true, false, false, true]);
		bus.set_ack_mode(AckMode::NackAll);
		wires.borrow_mut().history.clear();
		assert_eq!(bus.read(1).unwrap(), vec![0x59]);

		let bits = sampled_bits(&wires.borrow().history);
		assert_eq!(bits.len(), 9);
		// NACK keeps SDA high on the ninth clock
		assert_eq!(bits[8], true);

		bus.set_ack_mode(AckMode::AckAll);
		wires.borrow_mut().input.extend(vec![false; 8]);
		wires.borrow_mut().history.clear();
		assert_eq!(bus.read(1).unwrap(), vec![0x00]);
		assert_eq!(sampled_bits(&wires.borrow().history)[8], false);
	}

	#[test]
	fn spi_lsb_first_with_chip_select_idle_low() {
		let mut config = TransportConfig::spi(Mode::Spi3, 1_000_000, BitOrder::Lsb);
		config.chip_select_idle_high = false;
		let (mut bus, wires) = bus(config);

		bus.start().unwrap();
		assert!(wires.borrow().history.last().unwrap().chip_select);
		wires.borrow_mut().history.clear();

		bus.write(&[0x8f]).unwrap();
		assert_eq!(bus.get_ack(), Ack::Ack);
		// mode 3: data is presented while the clock is low and sampled on the rising edge
		let bits = sampled_bits(&wires.borrow().history);
		assert_eq!(bits, vec![true, true, true, true, false, false, false, true]);

		wires.borrow_mut().input.extend(vec![true, false, false, false, false, false, false, false]);
		assert_eq!(bus.read(1).unwrap(), vec![0x01]);

		bus.stop().unwrap();
		let last = *wires.borrow().history.last().unwrap();
		assert!(!last.chip_select);
		assert!(last.clock);
	}
}
