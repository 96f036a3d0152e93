//! Function commands of the DS18x20 family.
//!
//! Every command starts with its own reset and MATCH ROM, and runs with the bus
//! lock held by the caller.

use embedded_hal::delay::DelayNs;
use onewire_bus::{OneWire, Rom};

use crate::bus::StrongPullup;
use crate::session::reset_select;
use crate::{
    ConversionWait, Family, PowerMode, SCRATCHPAD_LEN, Scratchpad, ScratchpadWrite, ThermError,
    ThermResult,
};

const CONVERT_T: u8 = 0x44;
const WRITE_SCRATCHPAD: u8 = 0x4e;
const READ_SCRATCHPAD: u8 = 0xbe;
const COPY_SCRATCHPAD: u8 = 0x48;
const RECALL_EEPROM: u8 = 0xb8;
const READ_POWER_SUPPLY: u8 = 0xb4;

/// Interval of the read time slots issued while waiting for a recall.
const RECALL_POLL_US: u32 = 1_000;

/// Ask the sensor how it is powered. Parasite powered devices pull the read
/// time slot low.
pub(crate) fn read_power_mode<O: OneWire>(
    bus: &mut O,
    rom: &Rom,
) -> ThermResult<PowerMode, O::BusError> {
    reset_select(bus, rom)?;
    bus.write_byte(READ_POWER_SUPPLY)?;
    let mode = if bus.read_bit()? {
        PowerMode::External
    } else {
        PowerMode::Parasite
    };
    log::trace!("{rom}: power supply {mode:?}");
    Ok(mode)
}

fn read_scratchpad_once<O: OneWire>(
    bus: &mut O,
    rom: &Rom,
) -> ThermResult<Scratchpad, O::BusError> {
    reset_select(bus, rom)?;
    bus.write_byte(READ_SCRATCHPAD)?;
    let mut bytes = [0; SCRATCHPAD_LEN];
    bus.read_bytes(&mut bytes)?;
    Ok(Scratchpad::decode(bytes))
}

/// Read the scratchpad, making up to `tries` attempts at getting a frame that
/// passes its CRC check.
///
/// A missing presence pulse is retried like a corrupt frame; any other error
/// ends the read.
pub(crate) fn read_scratchpad<O: OneWire>(
    bus: &mut O,
    rom: &Rom,
    tries: u8,
) -> ThermResult<Scratchpad, O::BusError> {
    let tries = tries.max(1);
    let mut last = ThermError::ChecksumMismatch;
    for attempt in 1..=tries {
        match read_scratchpad_once(bus, rom) {
            Ok(scratchpad) if scratchpad.verdict() => return Ok(scratchpad),
            Ok(scratchpad) => {
                log::warn!(
                    "{rom}: scratchpad CRC mismatch {:02x?}, attempt {attempt}/{tries}",
                    scratchpad.as_bytes()
                );
                last = ThermError::ChecksumMismatch;
            }
            Err(ThermError::NoPresence) => {
                log::debug!("{rom}: no presence, attempt {attempt}/{tries}");
                last = ThermError::NoPresence;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last)
}

/// Write TH, TL and, on families that have one, the configuration register to RAM.
pub(crate) fn write_scratchpad<O: OneWire>(
    bus: &mut O,
    rom: &Rom,
    family: Family,
    payload: &ScratchpadWrite,
) -> ThermResult<(), O::BusError> {
    reset_select(bus, rom)?;
    bus.write_byte(WRITE_SCRATCHPAD)?;
    bus.write_bytes(&payload.to_bytes()[..family.eeprom_len()])?;
    log::trace!("{rom}: wrote scratchpad {payload:?}");
    Ok(())
}

/// Start a temperature conversion and wait for it to complete.
///
/// Parasite powered sensors get the strong pullup for the whole conversion
/// time. Externally powered ones either sit out the conversion time or, with
/// [`ConversionWait::Poll`], are polled until they report completion.
pub(crate) fn convert<O: OneWire, D: DelayNs>(
    bus: &mut O,
    rom: &Rom,
    power: PowerMode,
    conversion_us: u32,
    wait: ConversionWait,
    delay: &mut D,
) -> ThermResult<(), O::BusError> {
    reset_select(bus, rom)?;
    match (power, wait) {
        (PowerMode::Parasite, _) => {
            let mut bus = StrongPullup::engage(bus)?;
            bus.write_byte(CONVERT_T)?;
            delay.delay_us(conversion_us);
            bus.release()?;
        }
        (PowerMode::External, ConversionWait::Fixed) => {
            bus.write_byte(CONVERT_T)?;
            delay.delay_us(conversion_us);
        }
        (PowerMode::External, ConversionWait::Poll { interval_ms }) => {
            bus.write_byte(CONVERT_T)?;
            poll_done(bus, delay, interval_ms.saturating_mul(1_000), conversion_us)?;
        }
    }
    log::trace!("{rom}: conversion done");
    Ok(())
}

/// Issue read time slots `interval_us` apart until the device answers with a 1,
/// sleeping no more than `budget_us` in total.
fn poll_done<O: OneWire, D: DelayNs>(
    bus: &mut O,
    delay: &mut D,
    interval_us: u32,
    budget_us: u32,
) -> ThermResult<(), O::BusError> {
    let interval_us = interval_us.max(1);
    let mut waited = 0;
    loop {
        if bus.read_bit()? {
            return Ok(());
        }
        if waited >= budget_us {
            return Err(ThermError::Timeout);
        }
        let step = interval_us.min(budget_us - waited);
        delay.delay_us(step);
        waited += step;
    }
}

/// Copy TH, TL and the configuration register from RAM to EEPROM.
pub(crate) fn copy_scratchpad<O: OneWire, D: DelayNs>(
    bus: &mut O,
    rom: &Rom,
    power: PowerMode,
    settle_ms: u32,
    delay: &mut D,
) -> ThermResult<(), O::BusError> {
    reset_select(bus, rom)?;
    match power {
        PowerMode::Parasite => {
            let mut bus = StrongPullup::engage(bus)?;
            bus.write_byte(COPY_SCRATCHPAD)?;
            delay.delay_ms(settle_ms);
            bus.release()?;
        }
        PowerMode::External => {
            bus.write_byte(COPY_SCRATCHPAD)?;
            delay.delay_ms(settle_ms);
        }
    }
    log::debug!("{rom}: scratchpad copied to EEPROM");
    Ok(())
}

/// Reload TH, TL and the configuration register from EEPROM, waiting at most
/// `window_ms` for the device to report completion.
pub(crate) fn recall_eeprom<O: OneWire, D: DelayNs>(
    bus: &mut O,
    rom: &Rom,
    window_ms: u32,
    delay: &mut D,
) -> ThermResult<(), O::BusError> {
    reset_select(bus, rom)?;
    bus.write_byte(RECALL_EEPROM)?;
    poll_done(bus, delay, RECALL_POLL_US, window_ms.saturating_mul(1_000))?;
    log::debug!("{rom}: EEPROM recalled");
    Ok(())
}
