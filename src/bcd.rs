//! Packed binary-coded decimal: tens digit in the high nibble, units in the
//! low nibble.

/// Encode the last two decimal digits of `value`.
pub fn encode(value: i64) -> u8 {
	let v = value.rem_euclid(100) as u8;
	((v / 10) << 4) | (v % 10)
}

/// Only meaningful if both nibbles are decimal digits; see `try_decode`.
pub fn decode(byte: u8) -> u8 {
	10 * (byte >> 4) + (byte & 0x0f)
}

pub fn is_valid(byte: u8) -> bool {
	(byte >> 4) < 10 && (byte & 0x0f) < 10
}

pub fn try_decode(byte: u8) -> Option<u8> {
	if is_valid(byte) {
		Some(decode(byte))
	} else {
		None
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn known_values() {
		assert_eq!(encode(5), 0x05);
		assert_eq!(encode(59), 0x59);
		assert_eq!(encode(0), 0x00);
		assert_eq!(encode(99), 0x99);
		assert_eq!(decode(0x59), 59);
		assert_eq!(decode(0x00), 0);
	}

	#[test]
	fn decode_inverts_encode() {
		for v in 0..100 {
			assert_eq!(decode(encode(v)) as i64, v, "value {}", v);
		}
	}

	#[test]
	fn encode_reduces_modulo_100() {
		for v in -250..350i64 {
			assert_eq!(encode(v), encode(v.rem_euclid(100)), "value {}", v);
		}
		assert_eq!(encode(2024), 0x24);
		assert_eq!(encode(124), 0x24);
		assert_eq!(encode(-1), 0x99);
	}

	#[test]
	fn validity() {
		assert!(is_valid(0x59));
		assert!(!is_valid(0x5a));
		assert!(!is_valid(0xa0));
		assert_eq!(try_decode(0x31), Some(31));
		assert_eq!(try_decode(0x3f), None);
	}
}
