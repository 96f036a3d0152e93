use embedded_hal::delay::DelayNs;
use onewire_bus::{OneWire, Rom};

use crate::bus::{self, BusErrorOf, BusLock};
use crate::registry::{Lease, Registry, SensorHandle};
use crate::{
    Alarms, Family, PowerMode, Reading, Resolution, Scratchpad, ScratchpadWrite, Sensor,
    ThermConfig, ThermError, ThermResult, commands,
};

/// Driver for the DS18x20 thermometers on one 1-Wire bus.
///
/// Discovery is external: whoever walks the bus reports the ROMs it finds
/// with [`W1Therm::on_sensor_added`] and the ones that disappear with
/// [`W1Therm::on_sensor_removed`]. Every other operation is addressed by the
/// returned [`SensorHandle`] and may be called from any thread.
///
/// Operations that talk to a sensor take the bus lock for their whole
/// exchange, and a `delay` used for the lock retry sleeps and for the
/// device's own timing.
pub struct W1Therm<L> {
    bus: L,
    registry: Registry,
    config: ThermConfig,
}

type Result<T, L> = ThermResult<T, BusErrorOf<L>>;

impl<L: BusLock> W1Therm<L> {
    /// Driver for the bus behind `bus`, with the default [`ThermConfig`].
    pub fn new(bus: L) -> Self {
        Self {
            bus,
            registry: Registry::default(),
            config: ThermConfig::default(),
        }
    }

    /// Replace the retry and timing policy.
    pub fn with_config(mut self, config: ThermConfig) -> Self {
        self.config = config;
        self
    }

    /// The retry and timing policy in use.
    pub fn config(&self) -> &ThermConfig {
        &self.config
    }

    /// The bus lock, for transactions of its own such as a ROM search.
    pub fn bus(&self) -> &L {
        &self.bus
    }

    /// Register a sensor found on the bus.
    ///
    /// Reporting a ROM that is already registered returns its handle.
    ///
    /// # Errors
    /// [`ThermError::ChecksumMismatch`] if the ROM fails its CRC,
    /// [`ThermError::UnsupportedFamily`] if it is not a DS18x20.
    pub fn on_sensor_added(&self, rom: Rom) -> Result<SensorHandle, L> {
        if !rom.is_valid() {
            return Err(ThermError::ChecksumMismatch);
        }
        let family =
            Family::from_code(rom.family()).ok_or(ThermError::UnsupportedFamily(rom.family()))?;
        let handle = self.registry.insert(rom, family);
        log::debug!("{rom}: registered {}", family.name());
        Ok(handle)
    }

    /// Unregister a sensor that left the bus, once the operations in flight on it are done.
    ///
    /// Blocks until then. Operations started after this call fail with
    /// [`ThermError::UnknownSensor`].
    pub fn on_sensor_removed(&self, sensor: SensorHandle) -> Result<Rom, L> {
        let rom = self
            .registry
            .remove(sensor)
            .ok_or(ThermError::UnknownSensor)?;
        log::debug!("{rom}: unregistered");
        Ok(rom)
    }

    /// Handles of every registered sensor.
    pub fn sensors(&self) -> Vec<SensorHandle> {
        self.registry.handles()
    }

    /// Handle of the sensor with `rom`, if registered.
    pub fn find(&self, rom: &Rom) -> Option<SensorHandle> {
        self.registry.find(rom)
    }

    /// ROM of a sensor.
    pub fn rom(&self, sensor: SensorHandle) -> Result<Rom, L> {
        Ok(self.lease(sensor)?.rom())
    }

    /// Family of a sensor.
    pub fn family(&self, sensor: SensorHandle) -> Result<Family, L> {
        Ok(self.lease(sensor)?.family())
    }

    /// Power mode known for a sensor, without touching the bus.
    pub fn cached_power_mode(&self, sensor: SensorHandle) -> Result<Option<PowerMode>, L> {
        Ok(self.lease(sensor)?.power_mode())
    }

    /// Resolution known for a sensor, without touching the bus.
    pub fn cached_resolution(&self, sensor: SensorHandle) -> Result<Option<Resolution>, L> {
        Ok(self.lease(sensor)?.resolution())
    }

    /// Forget the power mode of a sensor, so that the next operation needing it probes again.
    pub fn invalidate_power_mode<D: DelayNs>(
        &self,
        sensor: SensorHandle,
        delay: &mut D,
    ) -> Result<(), L> {
        self.transact(sensor, delay, |_, sensor, _| {
            sensor.set_power_mode(None);
            Ok(())
        })
    }

    /// Power mode of a sensor, probed on first use and cached from then on.
    ///
    /// A failed probe leaves the sensor's power mode unknown.
    pub fn get_power_mode<D: DelayNs>(
        &self,
        sensor: SensorHandle,
        delay: &mut D,
    ) -> Result<PowerMode, L> {
        if let Some(mode) = self.lease(sensor)?.power_mode() {
            return Ok(mode);
        }
        self.transact(sensor, delay, |bus, sensor, _| power_mode(bus, sensor))
    }

    /// Convert the temperature and read it back.
    ///
    /// The power mode and, on sensors with a configurable resolution, the
    /// resolution are read from the device first if not cached, as the
    /// conversion time and the pullup depend on them.
    pub fn convert_and_read<D: DelayNs>(
        &self,
        sensor: SensorHandle,
        delay: &mut D,
    ) -> Result<Reading, L> {
        self.transact(sensor, delay, |bus, sensor, delay| {
            let power = power_mode(bus, sensor)?;
            let resolution = self.resolution(bus, sensor)?;
            let family = sensor.family();
            let rom = sensor.rom();
            commands::convert(
                bus,
                &rom,
                power,
                family.conversion_time_us(resolution),
                self.config.conversion,
                delay,
            )?;
            let scratchpad = commands::read_scratchpad(bus, &rom, self.config.max_tries)?;
            if family.configurable_resolution() {
                sensor.set_resolution(Some(Resolution::from_config(scratchpad.config())));
            }
            let reading = family.reading(&scratchpad);
            log::debug!("{rom}: {} m°C", reading.millicelsius());
            Ok(reading)
        })
    }

    /// Read the scratchpad of a sensor.
    pub fn read_scratchpad<D: DelayNs>(
        &self,
        sensor: SensorHandle,
        delay: &mut D,
    ) -> Result<Scratchpad, L> {
        self.transact(sensor, delay, |bus, sensor, _| {
            commands::read_scratchpad(bus, &sensor.rom(), self.config.max_tries)
        })
    }

    /// Resolution of a sensor as configured on the device.
    ///
    /// Families with a fixed resolution answer without touching the bus.
    pub fn get_resolution<D: DelayNs>(
        &self,
        sensor: SensorHandle,
        delay: &mut D,
    ) -> Result<Resolution, L> {
        if let Some(fixed) = self.lease(sensor)?.family().fixed_resolution() {
            return Ok(fixed);
        }
        self.transact(sensor, delay, |bus, sensor, _| {
            let scratchpad = commands::read_scratchpad(bus, &sensor.rom(), self.config.max_tries)?;
            let resolution = Resolution::from_config(scratchpad.config());
            sensor.set_resolution(Some(resolution));
            Ok(resolution)
        })
    }

    /// Set the resolution of a sensor to `bits`, 9 to 12.
    ///
    /// Only the device's RAM is written; [`W1Therm::eeprom_write`] makes the
    /// change survive a power cycle.
    ///
    /// # Errors
    /// [`ThermError::UnsupportedOperation`] for families with a fixed
    /// resolution, whatever `bits`, and [`ThermError::InvalidArgument`] for
    /// `bits` outside 9 to 12. Neither touches the bus.
    pub fn set_resolution<D: DelayNs>(
        &self,
        sensor: SensorHandle,
        bits: u8,
        delay: &mut D,
    ) -> Result<(), L> {
        if !self.lease(sensor)?.family().configurable_resolution() {
            return Err(ThermError::UnsupportedOperation);
        }
        let resolution = Resolution::try_from(bits).map_err(ThermError::InvalidArgument)?;
        self.transact(sensor, delay, |bus, sensor, _| {
            let rom = sensor.rom();
            let current = commands::read_scratchpad(bus, &rom, self.config.max_tries)?;
            let mut payload = ScratchpadWrite::from_scratchpad(&current);
            payload.config = resolution.apply(payload.config);
            commands::write_scratchpad(bus, &rom, sensor.family(), &payload)?;
            sensor.set_resolution(Some(resolution));
            log::debug!("{rom}: resolution set to {} bits", resolution.bits());
            Ok(())
        })
    }

    /// Alarm thresholds of a sensor, from its RAM.
    pub fn get_alarms<D: DelayNs>(&self, sensor: SensorHandle, delay: &mut D) -> Result<Alarms, L> {
        self.transact(sensor, delay, |bus, sensor, _| {
            let scratchpad = commands::read_scratchpad(bus, &sensor.rom(), self.config.max_tries)?;
            Ok(Alarms::of(&scratchpad))
        })
    }

    /// Set the alarm thresholds of a sensor in its RAM, keeping its configuration.
    ///
    /// # Errors
    /// [`ThermError::InvalidArgument`] without touching the bus if `low` is above `high`.
    pub fn set_alarms<D: DelayNs>(
        &self,
        sensor: SensorHandle,
        alarms: Alarms,
        delay: &mut D,
    ) -> Result<(), L> {
        if alarms.low > alarms.high {
            return Err(ThermError::InvalidArgument("low alarm above high alarm"));
        }
        self.transact(sensor, delay, |bus, sensor, _| {
            let rom = sensor.rom();
            let family = sensor.family();
            let config = if family.configurable_resolution() {
                let current = commands::read_scratchpad(bus, &rom, self.config.max_tries)?;
                sensor.set_resolution(Some(Resolution::from_config(current.config())));
                current.config()
            } else {
                0
            };
            let payload = ScratchpadWrite {
                high: alarms.high,
                low: alarms.low,
                config,
            };
            commands::write_scratchpad(bus, &rom, family, &payload)
        })
    }

    /// Persist the sensor's RAM settings to its EEPROM.
    pub fn eeprom_write<D: DelayNs>(&self, sensor: SensorHandle, delay: &mut D) -> Result<(), L> {
        self.transact(sensor, delay, |bus, sensor, delay| {
            let power = power_mode(bus, sensor)?;
            commands::copy_scratchpad(
                bus,
                &sensor.rom(),
                power,
                self.config.eeprom_write_delay_ms,
                delay,
            )
        })
    }

    /// Reload the sensor's RAM settings from its EEPROM.
    ///
    /// The cached resolution is dropped, the next use reads it from the device.
    pub fn eeprom_read<D: DelayNs>(&self, sensor: SensorHandle, delay: &mut D) -> Result<(), L> {
        self.transact(sensor, delay, |bus, sensor, delay| {
            commands::recall_eeprom(
                bus,
                &sensor.rom(),
                self.config.eeprom_write_delay_ms,
                delay,
            )?;
            if sensor.family().configurable_resolution() {
                sensor.set_resolution(None);
            }
            Ok(())
        })
    }

    fn lease(&self, sensor: SensorHandle) -> Result<Lease, L> {
        self.registry
            .checkout(sensor)
            .ok_or(ThermError::UnknownSensor)
    }

    /// Run `op` on a sensor with the bus lock held.
    fn transact<T, D: DelayNs>(
        &self,
        sensor: SensorHandle,
        delay: &mut D,
        op: impl FnOnce(&mut L::Bus, &Sensor, &mut D) -> Result<T, L>,
    ) -> Result<T, L> {
        let sensor = self.lease(sensor)?;
        let mut bus = bus::acquire(&self.bus, &self.config, delay)?;
        op(&mut *bus, &*sensor, delay)
    }

    /// Cached resolution, read from the device when unset.
    fn resolution(&self, bus: &mut L::Bus, sensor: &Sensor) -> Result<Resolution, L> {
        if let Some(resolution) = sensor.resolution() {
            return Ok(resolution);
        }
        let scratchpad = commands::read_scratchpad(bus, &sensor.rom(), self.config.max_tries)?;
        let resolution = Resolution::from_config(scratchpad.config());
        sensor.set_resolution(Some(resolution));
        log::debug!("{}: resolution {} bits", sensor.rom(), resolution.bits());
        Ok(resolution)
    }
}

/// Cached power mode, probed when unknown.
fn power_mode<O: OneWire>(bus: &mut O, sensor: &Sensor) -> ThermResult<PowerMode, O::BusError> {
    if let Some(mode) = sensor.power_mode() {
        return Ok(mode);
    }
    let mode = commands::read_power_mode(bus, &sensor.rom())?;
    sensor.set_power_mode(Some(mode));
    log::debug!("{}: {mode:?} powered", sensor.rom());
    Ok(mode)
}
