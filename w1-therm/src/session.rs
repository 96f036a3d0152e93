//! Reset and select: the handshake every command starts with.

use onewire_bus::{OneWire, Rom};

use crate::{ThermError, ThermResult};

/// Reset the bus and address exactly the sensor with `rom`, using MATCH ROM.
///
/// The bus lock must be held. Failures are returned as-is; whether to retry is
/// up to the command.
pub(crate) fn reset_select<O: OneWire>(bus: &mut O, rom: &Rom) -> ThermResult<(), O::BusError> {
    if !rom.is_valid() {
        return Err(ThermError::ChecksumMismatch);
    }
    bus.select(rom)?;
    log::trace!("selected {rom}");
    Ok(())
}
