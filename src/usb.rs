use std::fmt;
use std::fs;
use std::io::{
	self,
	Read,
};
use std::path::{
	Path,
	PathBuf,
};

const SYSFS_USB_DEVICES: &str = "/sys/bus/usb/devices";

/// A USB device (not interface) as seen in sysfs
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct UsbDevice {
	/// sysfs name, e.g. `1-1.4`
	pub name: String,
	pub vendor: u16,
	pub product: u16,
	pub bus_number: u16,
	pub device_number: u16,
	pub device_node: Option<PathBuf>,
}

impl fmt::Display for UsbDevice {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "VID: {:04x}, PID: {:04x}\tBus Number: {:2}, Device Number: {:2}\tDevice Node Path: ",
			self.vendor, self.product, self.bus_number, self.device_number)?;
		match self.device_node {
			Some(ref node) => write!(f, "{}", node.display()),
			None => f.write_str("(none)"),
		}
	}
}

fn read_trimmed_attribute(dir: &Path, name: &str) -> crate::AResult<String> {
	with_context!(("couldn't read attribute {} of USB device {}", name, dir.display()), {
		let mut f = fs::File::open(dir.join(name))?;
		let mut result = String::new();
		f.read_to_string(&mut result)?;
		Ok(result.trim().into())
	})
}

fn read_number_attribute(dir: &Path, name: &str, radix: u32) -> crate::AResult<u16> {
	let value = read_trimmed_attribute(dir, name)?;
	with_context!(("couldn't parse attribute {} of USB device {}: {:?}", name, dir.display(), value), {
		Ok(u16::from_str_radix(&value, radix)?)
	})
}

fn read_device_node(dir: &Path) -> crate::AResult<Option<PathBuf>> {
	let uevent = read_trimmed_attribute(dir, "uevent")?;
	Ok(uevent.lines()
		.map(str::trim)
		.find(|line| line.starts_with("DEVNAME="))
		.map(|line| Path::new("/dev").join(&line["DEVNAME=".len()..])))
}

impl UsbDevice {
	/// Read device attributes; `Ok(None)` for entries without vendor/product
	/// ids (interfaces).
	pub fn from_sysfs(dir: &Path) -> crate::AResult<Option<Self>> {
		if !dir.join("idVendor").exists() || !dir.join("idProduct").exists() {
			return Ok(None);
		}
		let name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
		Ok(Some(UsbDevice {
			name,
			vendor: read_number_attribute(dir, "idVendor", 16)?,
			product: read_number_attribute(dir, "idProduct", 16)?,
			bus_number: read_number_attribute(dir, "busnum", 10)?,
			device_number: read_number_attribute(dir, "devnum", 10)?,
			device_node: read_device_node(dir)?,
		}))
	}
}

pub fn list_devices() -> crate::AResult<Vec<UsbDevice>> {
	list_devices_in(SYSFS_USB_DEVICES)
}

/// All devices below a sysfs `devices` directory, sorted by bus and device number
pub fn list_devices_in<P: AsRef<Path>>(root: P) -> crate::AResult<Vec<UsbDevice>> {
	let root = root.as_ref();
	let entries = fs::read_dir(root).map_err(|e| {
		io::Error::new(e.kind(), format!("couldn't list USB devices in {}: {}", root.display(), e))
	})?;

	let mut list = Vec::new();
	for entry in entries {
		let entry = entry?;
		match UsbDevice::from_sysfs(&entry.path()) {
			Ok(Some(device)) => list.push(device),
			Ok(None) => (),
			// devices can disappear while we look at them
			Err(e) => warn!("Skipping USB device {}: {}", entry.path().display(), e),
		}
	}
	list.sort_by_key(|d| (d.bus_number, d.device_number));
	Ok(list)
}
