#![no_std]
#![deny(missing_docs)]

//! # DS2484
//!
//! Driver for the Analog Devices DS2484 I2C to 1-Wire bridge.
//!
//! [`Ds2484`] implements the [`OneWire`] transport: 1-Wire reset with presence and short
//! detection, byte and single-bit time slots, and the strong pullup used by parasite powered
//! devices. Build one with [`Ds2484Builder`], which resets the bridge and writes its
//! [`DeviceConfiguration`].

pub use onewire_bus::{OneWire, OneWireError, OneWireResult};
mod error;
mod onewire;
mod registers;

pub use error::Ds2484Error;
pub use registers::{DeviceConfiguration, DeviceStatus, Ds2484, Ds2484Builder};

/// Results of DS2484-specific function calls.
pub type Ds2484Result<T, E> = Result<T, Ds2484Error<E>>;
