/// One wire communication error type.
#[derive(Debug, PartialEq, Eq)]
pub enum OneWireError<E> {
    /// Encapsulates the error type from the underlying hardware.
    Other(E),
    /// Indicates that no device answered the reset with a presence pulse.
    NoDevicePresent,
    /// Indicates that a short circuit was detected on the bus.
    ShortCircuit,
    /// Indicates that the operation is not implemented by the bus master,
    /// such as a strong pullup on a master without one.
    Unimplemented,
    /// Computed CRC of a ROM or data frame is invalid.
    InvalidCrc,
    /// The bus master has been reset and is not configured yet.
    BusUninitialized,
}

impl<E> From<E> for OneWireError<E> {
    fn from(other: E) -> Self {
        Self::Other(other)
    }
}
