#![no_std]
#![deny(missing_docs)]
//! # onewire-bus
//! The transport side of a multi-drop 1-Wire bus.
//!
//! The [OneWire] trait is the contract a bus master (a bridge chip, a bit-banged GPIO, ...) fulfills
//! for device drivers: bus reset with presence detection, byte and bit time slots, block transfers,
//! strong pullup control and addressing of exactly one device by its [Rom] with a MATCH ROM sequence.
//!
//! The crate also carries the 1-Wire CRC-8 ([OneWireCrc]) and a ROM search ([OneWireSearch]) for
//! discovering the devices present on a bus.

mod consts;
mod crc;
mod error;
mod rom;
mod search;
mod traits;

pub use consts::*;
pub use crc::OneWireCrc;
pub use error::OneWireError;
pub use rom::{Rom, RomParseError};
pub use search::OneWireSearch;
pub use traits::{OneWire, OneWireStatus};

/// Error type for 1-Wire operations.
pub type OneWireResult<T, E> = Result<T, OneWireError<E>>;
