use onewire_bus::OneWireError;
use thiserror::Error;

/// Errors surfaced by thermometer operations.
///
/// `E` is the error type of the underlying bus master.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThermError<E> {
    /// The bus lock could not be acquired within the retry bound.
    #[error("1-Wire bus busy")]
    BusBusy,
    /// No device answered the bus reset with a presence pulse.
    #[error("no presence pulse after bus reset")]
    NoPresence,
    /// A scratchpad frame or ROM failed its CRC-8 check.
    #[error("CRC mismatch")]
    ChecksumMismatch,
    /// A conversion or EEPROM operation did not complete in its window.
    #[error("device did not complete the operation in time")]
    Timeout,
    /// The request is out of range, nothing was sent to the device.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The sensor family does not support the operation.
    #[error("operation not supported by this sensor family")]
    UnsupportedOperation,
    /// The bus master lacks a feature the operation needs, such as a strong pullup
    /// for a parasite powered sensor.
    #[error("bus master does not support the operation")]
    MasterUnsupported,
    /// The bus master detected a short on the line.
    #[error("1-Wire line shorted")]
    ShortCircuit,
    /// The bus master is not configured.
    #[error("bus master not initialized")]
    BusUninitialized,
    /// The handle does not refer to a registered sensor.
    #[error("unknown or removed sensor")]
    UnknownSensor,
    /// The ROM's family code is not a supported thermometer.
    #[error("unsupported family code {0:#04x}")]
    UnsupportedFamily(u8),
    /// Error reported by the bus master hardware.
    #[error("bus master error: {0:?}")]
    Transport(E),
}

impl<E> From<OneWireError<E>> for ThermError<E> {
    fn from(err: OneWireError<E>) -> Self {
        match err {
            OneWireError::Other(e) => ThermError::Transport(e),
            OneWireError::NoDevicePresent => ThermError::NoPresence,
            OneWireError::ShortCircuit => ThermError::ShortCircuit,
            OneWireError::Unimplemented => ThermError::MasterUnsupported,
            OneWireError::InvalidCrc => ThermError::ChecksumMismatch,
            OneWireError::BusUninitialized => ThermError::BusUninitialized,
        }
    }
}
