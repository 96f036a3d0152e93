use fixed::types::I12F4;

use crate::{Resolution, Scratchpad};

/// Temperature in degrees Celsius, 1/16 °C resolution.
pub type Temperature = I12F4;

/// DS18S20 family code.
pub const DS18S20_FAMILY: u8 = 0x10;
/// DS18B20 family code.
pub const DS18B20_FAMILY: u8 = 0x28;

/// Supported thermometer families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// DS18S20: fixed 9-bit readout refined by the count registers, no configuration register.
    Ds18s20,
    /// DS18B20: 9 to 12 bit readout selected through the configuration register.
    Ds18b20,
}

impl Family {
    /// Family for a ROM family code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            DS18S20_FAMILY => Some(Self::Ds18s20),
            DS18B20_FAMILY => Some(Self::Ds18b20),
            _ => None,
        }
    }

    /// ROM family code.
    pub const fn code(self) -> u8 {
        match self {
            Self::Ds18s20 => DS18S20_FAMILY,
            Self::Ds18b20 => DS18B20_FAMILY,
        }
    }

    /// Part name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ds18s20 => "DS18S20",
            Self::Ds18b20 => "DS18B20",
        }
    }

    /// Whether the resolution can be changed.
    pub const fn configurable_resolution(self) -> bool {
        matches!(self, Self::Ds18b20)
    }

    /// Resolution of families that can not be configured.
    pub const fn fixed_resolution(self) -> Option<Resolution> {
        match self {
            Self::Ds18s20 => Some(Resolution::Bits9),
            Self::Ds18b20 => None,
        }
    }

    /// Maximum conversion time in microseconds.
    pub const fn conversion_time_us(self, resolution: Resolution) -> u32 {
        match self {
            Self::Ds18s20 => 750_000,
            Self::Ds18b20 => resolution.conversion_time_us(),
        }
    }

    /// Number of bytes a Write Scratchpad takes, which is also what Copy Scratchpad
    /// persists: TH, TL and, where present, the configuration register.
    pub const fn eeprom_len(self) -> usize {
        match self {
            Self::Ds18s20 => 2,
            Self::Ds18b20 => 3,
        }
    }

    /// Decode the temperature held in a scratchpad.
    pub fn reading(self, scratchpad: &Scratchpad) -> Reading {
        let raw = scratchpad.temperature_raw();
        let sixteenths = match self {
            Self::Ds18b20 => raw & Resolution::from_config(scratchpad.config()).temperature_mask(),
            Self::Ds18s20 => {
                let count_remain = scratchpad.reserved()[1] as i32;
                let count_per_c = scratchpad.reserved()[2] as i32;
                if count_per_c == 0 {
                    raw.saturating_mul(8)
                } else {
                    // T = TEMP_READ - 0.25 + (COUNT_PER_C - COUNT_REMAIN) / COUNT_PER_C
                    let t = ((raw as i32) >> 1) * 16 - 4
                        + (count_per_c - count_remain) * 16 / count_per_c;
                    t as i16
                }
            }
        };
        Reading {
            raw,
            temperature: Temperature::from_bits(sixteenths),
            verdict: scratchpad.verdict(),
        }
    }
}

/// A decoded temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    /// Temperature register as read from the scratchpad.
    pub raw: i16,
    /// Decoded temperature.
    pub temperature: Temperature,
    /// CRC verdict of the scratchpad the reading came from.
    pub verdict: bool,
}

impl Reading {
    /// Temperature in thousandths of a degree Celsius, truncated toward zero.
    pub fn millicelsius(&self) -> i32 {
        self.temperature.to_bits() as i32 * 125 / 2
    }
}
