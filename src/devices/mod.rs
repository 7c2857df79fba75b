//! Register-level protocols of the supported chips.

pub mod ds1302;
pub mod ds3231;
pub mod eeprom;
