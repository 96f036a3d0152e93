/// Readout resolution of a DS18B20, as encoded in its configuration register.
///
/// Bits 5 and 6 of the configuration byte select the resolution; the remaining
/// bits read as `0b0_xx_11111`.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Resolution {
    /// 9 bits, 0.5 °C steps
    Bits9 = 0x1f,
    /// 10 bits, 0.25 °C steps
    Bits10 = 0x3f,
    /// 11 bits, 0.125 °C steps
    Bits11 = 0x5f,
    /// 12 bits, 0.0625 °C steps
    Bits12 = 0x7f,
}

const RESOLUTION_MASK: u8 = 0x60;

impl Resolution {
    /// Every supported resolution, coarsest first.
    pub const ALL: [Resolution; 4] = [
        Resolution::Bits9,
        Resolution::Bits10,
        Resolution::Bits11,
        Resolution::Bits12,
    ];

    /// Resolution in bits, 9 to 12.
    pub const fn bits(self) -> u8 {
        ((self as u8 & RESOLUTION_MASK) >> 5) + 9
    }

    /// Resolution for a bit count, `None` outside 9..=12.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            9 => Some(Self::Bits9),
            10 => Some(Self::Bits10),
            11 => Some(Self::Bits11),
            12 => Some(Self::Bits12),
            _ => None,
        }
    }

    /// Resolution selected by a configuration register value.
    pub const fn from_config(config: u8) -> Self {
        match (config & RESOLUTION_MASK) >> 5 {
            0 => Self::Bits9,
            1 => Self::Bits10,
            2 => Self::Bits11,
            _ => Self::Bits12,
        }
    }

    /// `config` with its resolution bits replaced by this resolution.
    pub const fn apply(self, config: u8) -> u8 {
        (config & !RESOLUTION_MASK) | (self as u8 & RESOLUTION_MASK)
    }

    /// Maximum DS18B20 conversion time at this resolution, in microseconds.
    pub const fn conversion_time_us(self) -> u32 {
        match self {
            Self::Bits9 => 93_750,
            Self::Bits10 => 187_500,
            Self::Bits11 => 375_000,
            Self::Bits12 => 750_000,
        }
    }

    /// Mask of the temperature register bits that are defined at this resolution.
    pub(crate) const fn temperature_mask(self) -> i16 {
        match self {
            Self::Bits9 => !0b111,
            Self::Bits10 => !0b11,
            Self::Bits11 => !0b1,
            Self::Bits12 => !0,
        }
    }
}

impl TryFrom<u8> for Resolution {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_bits(value).ok_or("resolution must be 9 to 12 bits")
    }
}
