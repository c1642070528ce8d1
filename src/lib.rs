#![no_std]

#[macro_use]
mod fmt;

/// Checksum used to validate data read from 1-Wire devices.
pub mod crc;
/// Driver for DS18B20 digital thermometers.
///
/// Refer to [this datasheet](https://datasheets.maximintegrated.com/en/ds/DS18B20.pdf) for more
/// information about these devices.
pub mod ds18b20;
/// The 1-Wire bus primitives: reset, byte writes, and byte reads.
pub mod onewire;
/// A DS18B20 driver that splits the conversion wait out of the read, for callers that poll.
pub mod polled;
/// A sensor interface shared by temperature and humidity sensors.
pub mod sensor;
