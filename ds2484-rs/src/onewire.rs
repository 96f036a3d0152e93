use crate::{
    DeviceStatus, Ds2484, Ds2484Error,
    registers::READ_PTR_CMD,
};
use embedded_hal::{
    delay::DelayNs,
    i2c::{I2c, SevenBitAddress},
};
use onewire_bus::{OneWire, OneWireError, OneWireResult};

pub(crate) const ONEWIRE_RESET_CMD: u8 = 0xb4;
pub(crate) const ONEWIRE_WRITE_BYTE: u8 = 0xa5;
pub(crate) const ONEWIRE_READ_BYTE: u8 = 0x96;
pub(crate) const ONEWIRE_READ_DATA_PTR: u8 = 0xe1;
pub(crate) const ONEWIRE_SINGLE_BIT: u8 = 0x87;

impl<I2C: I2c<SevenBitAddress>, D: DelayNs> Ds2484<I2C, D> {
    fn ready(&mut self) -> OneWireResult<DeviceStatus, Ds2484Error<I2C::Error>> {
        if self.reset {
            return Err(OneWireError::BusUninitialized);
        }
        Ok(self.onewire_wait()?)
    }
}

impl<I2C: I2c<SevenBitAddress>, D: DelayNs> OneWire for Ds2484<I2C, D> {
    type Status = DeviceStatus;

    type BusError = Ds2484Error<I2C::Error>;

    fn reset(&mut self) -> OneWireResult<Self::Status, Self::BusError> {
        self.ready()?;
        self.i2c
            .write(self.addr, &[ONEWIRE_RESET_CMD])
            .map_err(Ds2484Error::from)?;
        let status = self.onewire_wait()?;
        log::trace!("1-Wire reset, status {:#04x}", status.into_bits());
        Ok(status)
    }

    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError> {
        self.ready()?;
        self.i2c
            .write(self.addr, &[ONEWIRE_WRITE_BYTE, byte])
            .map_err(Ds2484Error::from)?;
        Ok(())
    }

    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError> {
        self.ready()?;
        self.i2c
            .write(self.addr, &[ONEWIRE_READ_BYTE])
            .map_err(Ds2484Error::from)?;
        self.onewire_wait()?;
        let mut val = [0; 1];
        self.i2c
            .write_read(self.addr, &[READ_PTR_CMD, ONEWIRE_READ_DATA_PTR], &mut val)
            .map_err(Ds2484Error::from)?;
        Ok(val[0])
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError> {
        self.ready()?;
        self.i2c
            .write(
                self.addr,
                &[ONEWIRE_SINGLE_BIT, if bit { 0x80 } else { 0x0 }],
            )
            .map_err(Ds2484Error::from)?;
        Ok(())
    }

    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
        self.write_bit(true)?;
        Ok(self.onewire_wait()?.single_bit_result())
    }

    fn strong_pullup(&mut self, enable: bool) -> OneWireResult<(), Self::BusError> {
        if self.reset {
            return Err(OneWireError::BusUninitialized);
        }
        let config = self.write_config(self.config.with_strong_pullup(enable))?;
        // SPU reads back as set while armed; the cached copy tracks the request
        self.config = config.with_strong_pullup(enable);
        log::trace!("strong pullup {}", if enable { "armed" } else { "released" });
        Ok(())
    }
}
