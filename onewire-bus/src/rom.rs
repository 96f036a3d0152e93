use core::fmt;
use core::str::FromStr;

use crate::OneWireCrc;

/// The 64-bit ROM code burned into every 1-Wire device.
///
/// | Byte | Description |
/// |------|-------------|
/// | 0 | Family code (e.g., 0x28 for DS18B20) |
/// | 1-6 | Serial number, least significant byte first |
/// | 7 | CRC-8 of bytes 0-6 |
///
/// The textual identity ([`Display`](fmt::Display), [`FromStr`]) is 16 lowercase hex digits:
/// bytes 1 through 7 followed by the family byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rom([u8; 8]);

impl Rom {
    /// Wrap ROM bytes in transmission order.
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Build a ROM from a family code and 48-bit serial, computing the CRC.
    pub fn from_parts(family: u8, serial: [u8; 6]) -> Self {
        let mut bytes = [family, 0, 0, 0, 0, 0, 0, 0];
        bytes[1..7].copy_from_slice(&serial);
        bytes[7] = OneWireCrc::compute(&bytes[..7]);
        Self(bytes)
    }

    /// Family code of the device.
    pub const fn family(&self) -> u8 {
        self.0[0]
    }

    /// 48-bit serial number, least significant byte first.
    pub fn serial(&self) -> [u8; 6] {
        let mut serial = [0; 6];
        serial.copy_from_slice(&self.0[1..7]);
        serial
    }

    /// CRC byte as stored in the ROM.
    pub const fn crc(&self) -> u8 {
        self.0[7]
    }

    /// Whether the CRC byte matches the first seven bytes.
    pub fn is_valid(&self) -> bool {
        OneWireCrc::validate(&self.0)
    }

    /// ROM bytes in transmission order.
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl From<u64> for Rom {
    /// Little-endian ROM value, family code in the low byte.
    fn from(value: u64) -> Self {
        Self(value.to_le_bytes())
    }
}

impl From<Rom> for u64 {
    fn from(rom: Rom) -> Self {
        u64::from_le_bytes(rom.0)
    }
}

impl fmt::Display for Rom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[1..] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "{:02x}", self.0[0])
    }
}

/// Failure to parse a ROM identity string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomParseError {
    /// The identity is not exactly 16 characters long.
    Length,
    /// A character is not a hex digit.
    Digit,
}

impl fmt::Display for RomParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RomParseError::Length => f.write_str("ROM identity must be 16 hex digits"),
            RomParseError::Digit => f.write_str("ROM identity contains a non-hex character"),
        }
    }
}

impl core::error::Error for RomParseError {}

impl FromStr for Rom {
    type Err = RomParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.as_bytes();
        if s.len() != 16 {
            return Err(RomParseError::Length);
        }
        let mut text = [0u8; 8];
        for (byte, pair) in text.iter_mut().zip(s.chunks_exact(2)) {
            *byte = (nibble(pair[0])? << 4) | nibble(pair[1])?;
        }
        // text is bytes 1..=7 then the family code
        let mut bytes = [0u8; 8];
        bytes[0] = text[7];
        bytes[1..].copy_from_slice(&text[..7]);
        Ok(Self(bytes))
    }
}

fn nibble(c: u8) -> Result<u8, RomParseError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(RomParseError::Digit),
    }
}
