//! ROM command constants for 1-Wire communication.

/// Command to match a specific ROM address in 1-Wire communication.
///
/// Followed by the 64-bit ROM, only the device with exactly that ROM stays
/// addressed for the function command that follows.
pub const ONEWIRE_MATCH_ROM_CMD: u8 = 0x55;

/// Command to search for devices on the 1-Wire bus.
pub const ONEWIRE_SEARCH_CMD: u8 = 0xf0;
