#![deny(missing_docs)]

//! # w1-therm
//!
//! Driver for DS18B20 and DS18S20 thermometers sharing a multi-drop 1-Wire bus.
//!
//! [`W1Therm`] keeps the state of every sensor on one bus (ROM, power mode,
//! resolution) and sequences the device's function commands over any
//! [`OneWire`](onewire_bus::OneWire) bus master: temperature conversion,
//! scratchpad reads and writes, EEPROM copy and recall, power supply probing.
//! All traffic goes through a [`BusLock`], so sensors on the same bus can be
//! used from several threads without their transactions interleaving.
//!
//! ```ignore
//! let therm = W1Therm::new(SharedBus::new(bridge));
//! let sensor = therm.on_sensor_added(rom)?;
//! therm.set_resolution(sensor, 10, &mut delay)?;
//! let reading = therm.convert_and_read(sensor, &mut delay)?;
//! println!("{}: {} °C", rom, reading.temperature);
//! ```

mod bus;
mod commands;
mod config;
mod error;
mod family;
mod registry;
mod resolution;
mod scratchpad;
mod sensor;
mod session;
mod therm;

#[cfg(test)]
mod mock;

pub use bus::{BusErrorOf, BusGuard, BusLock, SharedBus};
pub use config::{ConversionWait, ThermConfig};
pub use error::ThermError;
pub use family::{DS18B20_FAMILY, DS18S20_FAMILY, Family, Reading, Temperature};
pub use onewire_bus::Rom;
pub use registry::SensorHandle;
pub use resolution::Resolution;
pub use scratchpad::{Alarms, SCRATCHPAD_LEN, Scratchpad, ScratchpadWrite};
pub use sensor::PowerMode;
pub(crate) use sensor::Sensor;
pub use therm::W1Therm;

/// Results of thermometer operations.
pub type ThermResult<T, E> = Result<T, ThermError<E>>;
