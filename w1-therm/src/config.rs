use std::time::Duration;

/// How an externally powered sensor's conversion is waited for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionWait {
    /// Sleep for the full conversion time of the current resolution.
    #[default]
    Fixed,
    /// Issue read time slots every `interval_ms` until the device reports completion,
    /// for no longer than the conversion time. Parasite powered sensors always use
    /// [`ConversionWait::Fixed`].
    Poll {
        /// Delay between read time slots, in milliseconds.
        interval_ms: u32,
    },
}

/// Retry and timing policy of a [`W1Therm`](crate::W1Therm).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThermConfig {
    pub(crate) max_tries: u8,
    pub(crate) retry_delay_ms: u32,
    pub(crate) lock_timeout: Duration,
    pub(crate) eeprom_write_delay_ms: u32,
    pub(crate) conversion: ConversionWait,
}

impl Default for ThermConfig {
    fn default() -> Self {
        Self {
            max_tries: 5,
            retry_delay_ms: 20,
            lock_timeout: Duration::from_secs(2),
            eeprom_write_delay_ms: 10,
            conversion: ConversionWait::Fixed,
        }
    }
}

impl ThermConfig {
    /// Number of attempts at acquiring the bus lock, and at reading a scratchpad
    /// with a valid CRC. At least one attempt is always made.
    pub fn with_max_tries(mut self, tries: u8) -> Self {
        self.max_tries = tries.max(1);
        self
    }

    /// Sleep between two bus lock attempts.
    pub fn with_retry_delay_ms(mut self, ms: u32) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    /// How long a single bus lock attempt blocks before giving up.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Settle time of a Copy Scratchpad, during which the EEPROM is written.
    pub fn with_eeprom_write_delay_ms(mut self, ms: u32) -> Self {
        self.eeprom_write_delay_ms = ms;
        self
    }

    /// Conversion wait strategy for externally powered sensors.
    pub fn with_conversion_wait(mut self, wait: ConversionWait) -> Self {
        self.conversion = wait;
        self
    }

    /// Attempts at acquiring the bus lock.
    pub fn max_tries(&self) -> u8 {
        self.max_tries
    }

    /// Sleep between two bus lock attempts, in milliseconds.
    pub fn retry_delay_ms(&self) -> u32 {
        self.retry_delay_ms
    }

    /// Blocking time of a single bus lock attempt.
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }
}
