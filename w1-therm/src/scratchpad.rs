//! The 9-byte scratchpad of DS18x20 thermometers.
//!
//! | Byte | DS18B20 | DS18S20 |
//! |------|---------|---------|
//! | 0-1 | temperature, LSB first | temperature, LSB first |
//! | 2 | TH alarm / user byte 1 | TH alarm / user byte 1 |
//! | 3 | TL alarm / user byte 2 | TL alarm / user byte 2 |
//! | 4 | configuration | reserved |
//! | 5-7 | reserved | reserved, COUNT REMAIN, COUNT PER °C |
//! | 8 | CRC-8 of bytes 0-7 | CRC-8 of bytes 0-7 |

use onewire_bus::OneWireCrc;

/// Length of a scratchpad frame, CRC included.
pub const SCRATCHPAD_LEN: usize = 9;

/// A scratchpad frame as read from a device.
///
/// The CRC verdict is computed when the frame is decoded; a frame whose
/// verdict is `false` carries no trustworthy field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scratchpad {
    bytes: [u8; SCRATCHPAD_LEN],
    verdict: bool,
}

impl Scratchpad {
    /// Decode a frame and check its CRC.
    pub fn decode(bytes: [u8; SCRATCHPAD_LEN]) -> Self {
        Self {
            bytes,
            verdict: OneWireCrc::validate(&bytes),
        }
    }

    /// Whether the CRC byte matches the CRC of the first 8 bytes.
    pub fn verdict(&self) -> bool {
        self.verdict
    }

    /// Raw temperature register.
    pub fn temperature_raw(&self) -> i16 {
        i16::from_le_bytes([self.bytes[0], self.bytes[1]])
    }

    /// TH register.
    pub fn high_alarm(&self) -> i8 {
        self.bytes[2] as i8
    }

    /// TL register.
    pub fn low_alarm(&self) -> i8 {
        self.bytes[3] as i8
    }

    /// Configuration register (reserved on DS18S20).
    pub fn config(&self) -> u8 {
        self.bytes[4]
    }

    /// Bytes 5 to 7.
    pub fn reserved(&self) -> &[u8] {
        &self.bytes[5..8]
    }

    /// CRC byte as received.
    pub fn crc(&self) -> u8 {
        self.bytes[8]
    }

    /// The frame as received.
    pub fn as_bytes(&self) -> &[u8; SCRATCHPAD_LEN] {
        &self.bytes
    }
}

/// Alarm thresholds in whole degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alarms {
    /// TH: alarm when the temperature is at or above this value.
    pub high: i8,
    /// TL: alarm when the temperature is at or below this value.
    pub low: i8,
}

impl Alarms {
    pub(crate) fn of(scratchpad: &Scratchpad) -> Self {
        Self {
            high: scratchpad.high_alarm(),
            low: scratchpad.low_alarm(),
        }
    }
}

/// Payload of a Write Scratchpad command, in transmission order.
///
/// Families without a configuration register only take the first two bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchpadWrite {
    /// TH
    pub high: i8,
    /// TL
    pub low: i8,
    /// Configuration register
    pub config: u8,
}

impl ScratchpadWrite {
    /// Payload keeping the thresholds and configuration of `current`.
    pub fn from_scratchpad(current: &Scratchpad) -> Self {
        Self {
            high: current.high_alarm(),
            low: current.low_alarm(),
            config: current.config(),
        }
    }

    /// Bytes on the wire.
    pub fn to_bytes(&self) -> [u8; 3] {
        [self.high as u8, self.low as u8, self.config]
    }
}

#[cfg(test)]
pub(crate) fn frame(data: [u8; 8]) -> [u8; SCRATCHPAD_LEN] {
    let mut bytes = [0; SCRATCHPAD_LEN];
    bytes[..8].copy_from_slice(&data);
    bytes[8] = OneWireCrc::compute(&data);
    bytes
}
