use crate::{ONEWIRE_SEARCH_CMD, OneWire, OneWireError, OneWireResult, OneWireStatus, Rom};

/// Walks a 1-Wire bus with the SEARCH ROM command and yields every ROM present.
///
/// Implements the [1-Wire search algorithm](https://www.analog.com/en/resources/app-notes/1wire-search-algorithm.html):
/// each pass reads the id bit and its complement for all 64 ROM bits, and at every discrepancy
/// (devices disagreeing on a bit) remembers where to branch on the next pass.
pub struct OneWireSearch<'a, T> {
    onewire: &'a mut T,
    rom: [u8; 8],
    last_discrepancy: u8,
    done: bool,
}

impl<'a, T> OneWireSearch<'a, T> {
    /// Creates a new search over `onewire`, starting from the lowest ROM branch.
    pub fn new(onewire: &'a mut T) -> Self {
        Self {
            onewire,
            rom: [0; 8],
            last_discrepancy: 0,
            done: false,
        }
    }
}

impl<T: OneWire> OneWireSearch<'_, T> {
    /// Runs one search pass.
    ///
    /// Returns `Ok(None)` once every device has been reported, or when no device answers
    /// the reset. The search can not be restarted; create a new one instead.
    ///
    /// # Errors
    /// [OneWireError::InvalidCrc] if the ROM assembled during the pass fails its CRC, which
    /// happens when devices join or leave the bus mid-search.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> OneWireResult<Option<Rom>, T::BusError> {
        if self.done {
            return Ok(None);
        }
        let status = self.onewire.reset()?;
        if status.shortcircuit() {
            return Err(OneWireError::ShortCircuit);
        }
        if !status.presence() {
            self.done = true;
            return Ok(None);
        }
        self.onewire.write_byte(ONEWIRE_SEARCH_CMD)?;

        let mut last_zero = 0u8;
        for bit in 1..=64u8 {
            let idx = ((bit - 1) / 8) as usize;
            let mask = 1u8 << ((bit - 1) % 8);
            let id_bit = self.onewire.read_bit()?;
            let complement = self.onewire.read_bit()?;
            let take = match (id_bit, complement) {
                (true, true) => {
                    // nobody left answering
                    self.done = true;
                    return Ok(None);
                }
                (a, b) if a != b => a,
                _ => {
                    let take = if bit < self.last_discrepancy {
                        self.rom[idx] & mask != 0
                    } else {
                        bit == self.last_discrepancy
                    };
                    if !take {
                        last_zero = bit;
                    }
                    take
                }
            };
            if take {
                self.rom[idx] |= mask;
            } else {
                self.rom[idx] &= !mask;
            }
            self.onewire.write_bit(take)?;
        }

        self.last_discrepancy = last_zero;
        self.done = last_zero == 0;
        let rom = Rom::new(self.rom);
        if !rom.is_valid() {
            self.done = true;
            return Err(OneWireError::InvalidCrc);
        }
        log::trace!("search found {rom}");
        Ok(Some(rom))
    }
}
