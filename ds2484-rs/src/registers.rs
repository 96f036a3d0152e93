use crate::{Ds2484Error, Ds2484Result};
use bitfield_struct::bitfield;
use embedded_hal::{
    delay::DelayNs,
    i2c::{I2c, SevenBitAddress},
};
use onewire_bus::OneWireStatus;

pub(crate) const DS2484_ADDR: u8 = 0x18;
pub(crate) const READ_PTR_CMD: u8 = 0xe1; // Set the read pointer
pub(crate) const DEVICE_STATUS_PTR: u8 = 0xf0; // Device status register
pub(crate) const DEVICE_CONFIG_PTR: u8 = 0xc3; // Device configuration register
pub(crate) const DEVICE_RST_CMD: u8 = 0xf0; // Reset the device
pub(crate) const WRITE_CONFIG_CMD: u8 = 0xd2; // Write the device configuration

/// A DS2484 I2C to 1-Wire bridge device.
///
/// Takes ownership of an I2C bus (implementing [`I2c`](embedded_hal::i2c::I2c) trait)
/// and a timer object implementing the [`DelayNs`](embedded_hal::delay::DelayNs) trait.
pub struct Ds2484<I, D> {
    pub(crate) i2c: I,
    pub(crate) addr: u8,
    pub(crate) delay: D,
    pub(crate) retries: u8,
    pub(crate) reset: bool, // device reset, configuration not written yet
    pub(crate) config: DeviceConfiguration,
}

/// Builder for creating a [`Ds2484`] instance with custom configuration.
pub struct Ds2484Builder {
    pub(crate) retries: u8,
    pub(crate) config: DeviceConfiguration,
}

impl Default for Ds2484Builder {
    fn default() -> Self {
        Ds2484Builder {
            retries: 100,
            config: DeviceConfiguration::new().with_active_pullup(true),
        }
    }
}

impl Ds2484Builder {
    /// Sets the retry count for the device.
    ///
    /// The retry count is used to determine how long
    /// the host waits before operations on the 1-Wire
    /// or I2C bus time out.
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the device configuration.
    ///
    /// The strong pullup bit is ignored here; it is driven through
    /// [`OneWire::strong_pullup`](onewire_bus::OneWire::strong_pullup).
    pub fn with_config(mut self, config: DeviceConfiguration) -> Self {
        self.config = config.with_strong_pullup(false);
        self
    }

    /// Builds a new `Ds2484` instance with the specified configuration.
    pub fn build<I: I2c<SevenBitAddress>, D: DelayNs>(
        self,
        i2c: I,
        delay: D,
    ) -> Ds2484Result<Ds2484<I, D>, I::Error> {
        let mut dev = Ds2484 {
            i2c,
            addr: DS2484_ADDR,
            delay,
            retries: self.retries,
            reset: false,
            config: self.config,
        };
        dev.bus_reset()?;
        dev.write_config(self.config)?;
        Ok(dev)
    }
}

impl<I, D> Ds2484<I, D> {
    /// Give back the I2C bus and the timer.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }

    /// The configuration last written to the device.
    pub fn config(&self) -> DeviceConfiguration {
        self.config
    }
}

impl<I: I2c<SevenBitAddress>, D: DelayNs> Ds2484<I, D> {
    /// Get the status of the device.
    pub fn get_status(&mut self) -> Ds2484Result<DeviceStatus, I::Error> {
        Ok(DeviceStatus::from_bits(
            self.read_register(DEVICE_STATUS_PTR)?,
        ))
    }

    /// Read the configuration register back from the device.
    pub fn read_config(&mut self) -> Ds2484Result<DeviceConfiguration, I::Error> {
        Ok(DeviceConfiguration::from_bits(
            self.read_register(DEVICE_CONFIG_PTR)? & 0x0f,
        ))
    }

    /// Write the configuration register once the 1-Wire side is idle.
    ///
    /// The device echoes the accepted value, which becomes the cached configuration.
    pub(crate) fn write_config(
        &mut self,
        config: DeviceConfiguration,
    ) -> Ds2484Result<DeviceConfiguration, I::Error> {
        self.onewire_wait()?;
        let mut echo = [0u8; 1];
        self.i2c
            .write_read(self.addr, &[WRITE_CONFIG_CMD, config.to_wire()], &mut echo)?;
        self.config = DeviceConfiguration::from_bits(echo[0] & 0x0f);
        self.reset = false;
        Ok(self.config)
    }

    fn read_register(&mut self, ptr: u8) -> Ds2484Result<u8, I::Error> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.addr, &[READ_PTR_CMD, ptr], &mut buf)?;
        Ok(buf[0])
    }

    /// Reset the device.
    ///
    /// Performs a global reset of device state machine logic. Terminates any ongoing 1-Wire
    /// communication. The configuration must be written again before the 1-Wire side is usable.
    pub fn bus_reset(&mut self) -> Ds2484Result<DeviceStatus, I::Error> {
        self.i2c.write(self.addr, &[DEVICE_RST_CMD])?;
        self.reset = true;
        self.poll_status(|s| s.device_reset())
    }

    pub(crate) fn onewire_wait(&mut self) -> Ds2484Result<DeviceStatus, I::Error> {
        self.i2c
            .write(self.addr, &[READ_PTR_CMD, DEVICE_STATUS_PTR])?;
        self.poll_status(|s| !s.onewire_busy())
    }

    /// Reads the status register until `ready` holds, sleeping 1 ms between reads.
    fn poll_status(
        &mut self,
        ready: impl Fn(&DeviceStatus) -> bool,
    ) -> Ds2484Result<DeviceStatus, I::Error> {
        let mut buf = [0u8; 1];
        for tries in 0..=self.retries {
            self.i2c.read(self.addr, &mut buf)?;
            let status = DeviceStatus::from_bits(buf[0]);
            if ready(&status) {
                return Ok(status);
            }
            if tries < self.retries {
                self.delay.delay_ms(1);
            }
        }
        log::warn!("DS2484 status still {:#04x} after {} polls", buf[0], self.retries);
        Err(Ds2484Error::RetriesExceeded)
    }
}

/// Status register for DS2484
///
/// The read-only Status register reports bit-type data from the 1-Wire side,
/// 1-Wire busy status, and the bridge's own reset status. All 1-Wire communication
/// commands and the Device Reset command leave the read pointer at this register.
#[bitfield(u8)]
pub struct DeviceStatus {
    /// 1WB: the 1-Wire line is busy with a command.
    pub(crate) onewire_busy: bool,
    /// PPD: a presence pulse was detected during the last 1-Wire reset.
    present_pulse_detect: bool,
    /// SD: a short was detected during the last 1-Wire reset.
    pub(crate) short_detect: bool,
    /// LL: logic level of the line, sampled when the register is read.
    pub logic_level: bool,
    /// RST: the bridge went through a reset and awaits its configuration.
    pub device_reset: bool,
    /// SBR: line level sampled by the last single bit command.
    pub(crate) single_bit_result: bool,
    /// TSB: second bit of the last triplet command.
    pub triplet_second_bit: bool,
    /// DIR: branch direction taken by the last triplet command.
    pub branch_dir_taken: bool,
}

impl OneWireStatus for DeviceStatus {
    fn presence(&self) -> bool {
        self.present_pulse_detect()
    }

    fn shortcircuit(&self) -> bool {
        self.short_detect()
    }
}

#[bitfield(u8)]
/// # Device configuration register
///
/// Selects the 1-Wire features of the bridge:
/// - Active Pullup (APU)
/// - 1-Wire Power-Down (PDN)
/// - Strong Pullup (SPU)
/// - 1-Wire Speed (1WS)
///
/// SPU must be set immediately before the Write Byte command that puts a device into the
/// state where it needs extra power; the strong pullup then holds the line after that byte
/// until it is cleared again. After a device reset the register reads 00h.
pub struct DeviceConfiguration {
    /// APU: drive low-to-high edges with the active pullup instead of the resistor.
    pub active_pullup: bool,
    /// PDN: remove power from the 1-Wire port.
    pub power_down_1wire: bool,
    /// SPU: strong pullup after the next byte or bit written.
    pub strong_pullup: bool,
    /// 1WS: overdrive speed. Only standard speed is used by this driver.
    pub onewire_speed: bool,
    #[bits(4)]
    __: u8,
}

impl DeviceConfiguration {
    /// Register value as sent on the wire: the upper nibble carries the
    /// one's complement of the lower nibble.
    pub(crate) const fn to_wire(self) -> u8 {
        let cfg = self.into_bits() & 0x0f;
        cfg | ((!cfg & 0x0f) << 4)
    }
}
