use crate::{ONEWIRE_MATCH_ROM_CMD, OneWireError, OneWireResult, Rom};

/// Status reported by a bus reset.
pub trait OneWireStatus {
    /// Whether at least one device answered the reset with a presence pulse.
    fn presence(&self) -> bool;
    /// Whether the bus master detected a short on the line during the reset.
    fn shortcircuit(&self) -> bool;
}

/// Trait for 1-Wire communication.
///
/// This trait defines the operations a bus master provides to device drivers: resetting the bus,
/// writing and reading bytes and bits, driving the strong pullup and addressing a single device.
///
/// Implementations only move bits; exclusive access to a bus shared by several drivers is
/// the caller's business.
pub trait OneWire {
    /// The status type returned by the reset operation.
    /// This type must implement the [OneWireStatus] trait.
    type Status: OneWireStatus;
    /// The error type returned by the operations of this trait.
    /// This type is used to indicate errors in the underlying hardware or communication.
    type BusError;

    /// Resets the 1-Wire bus and returns the status of the bus.
    ///
    /// # Errors
    /// This method returns an error if the reset operation fails. A missing presence pulse is
    /// reported through [OneWireStatus::presence], not as an error.
    fn reset(&mut self) -> OneWireResult<Self::Status, Self::BusError>;

    /// Writes a byte to the 1-Wire bus, least significant bit first.
    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError>;

    /// Reads a byte from the 1-Wire bus.
    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError>;

    /// Generates a single write time slot.
    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError>;

    /// Generates a single read time slot and returns the sampled bit.
    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError>;

    /// Writes every byte of `bytes` in order.
    fn write_bytes(&mut self, bytes: &[u8]) -> OneWireResult<(), Self::BusError> {
        bytes.iter().try_for_each(|&b| self.write_byte(b))
    }

    /// Fills `buf` with bytes read from the bus.
    fn read_bytes(&mut self, buf: &mut [u8]) -> OneWireResult<(), Self::BusError> {
        for b in buf.iter_mut() {
            *b = self.read_byte()?;
        }
        Ok(())
    }

    /// Engages (`true`) or releases (`false`) the strong pullup.
    ///
    /// Once engaged, the strong pullup takes over the line at the end of the next byte written
    /// and holds it high until released, so that parasite powered devices can draw the current
    /// a conversion or an EEPROM write needs.
    ///
    /// # Errors
    /// Masters without a strong pullup return [OneWireError::Unimplemented].
    fn strong_pullup(&mut self, _enable: bool) -> OneWireResult<(), Self::BusError> {
        Err(OneWireError::Unimplemented)
    }

    /// Resets the bus and addresses exactly one device with a MATCH ROM sequence.
    ///
    /// A SKIP ROM shortcut is never taken, even when the bus seems to carry a single device:
    /// during discovery the device count is not reliable, and two devices answering at once
    /// corrupt the line.
    ///
    /// # Errors
    /// [OneWireError::NoDevicePresent] if no presence pulse follows the reset,
    /// [OneWireError::ShortCircuit] if the line is shorted.
    fn select(&mut self, rom: &Rom) -> OneWireResult<(), Self::BusError> {
        let status = self.reset()?;
        if status.shortcircuit() {
            return Err(OneWireError::ShortCircuit);
        }
        if !status.presence() {
            return Err(OneWireError::NoDevicePresent);
        }
        self.write_byte(ONEWIRE_MATCH_ROM_CMD)?;
        self.write_bytes(rom.as_bytes())
    }
}
