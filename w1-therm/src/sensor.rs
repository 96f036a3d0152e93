use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

use onewire_bus::Rom;

use crate::{Family, Resolution};

/// How a sensor is powered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    /// Powered from the data line; conversions and EEPROM writes need the strong pullup.
    Parasite,
    /// Powered through its VDD pin.
    External,
}

const POWER_UNKNOWN: u8 = 0;
const POWER_PARASITE: u8 = 1;
const POWER_EXTERNAL: u8 = 2;

const RESOLUTION_UNSET: u8 = 0;

/// State kept for one sensor between discovery and removal.
///
/// The cached fields are only written while the bus lock is held, right after
/// the round trip that produced them, so readers without the lock may see a
/// stale value but never a torn one.
#[derive(Debug)]
pub struct Sensor {
    rom: Rom,
    family: Family,
    power_mode: AtomicU8,
    resolution: AtomicU8,
    in_flight: AtomicUsize,
    removed: AtomicBool,
    idle: Mutex<()>,
    idle_cv: Condvar,
}

impl Sensor {
    pub(crate) fn new(rom: Rom, family: Family) -> Self {
        Self {
            rom,
            family,
            power_mode: AtomicU8::new(POWER_UNKNOWN),
            resolution: AtomicU8::new(RESOLUTION_UNSET),
            in_flight: AtomicUsize::new(0),
            removed: AtomicBool::new(false),
            idle: Mutex::new(()),
            idle_cv: Condvar::new(),
        }
    }

    /// ROM of the sensor.
    pub fn rom(&self) -> Rom {
        self.rom
    }

    /// Family of the sensor.
    pub fn family(&self) -> Family {
        self.family
    }

    /// Cached power mode, `None` until probed.
    pub fn power_mode(&self) -> Option<PowerMode> {
        match self.power_mode.load(Ordering::Acquire) {
            POWER_PARASITE => Some(PowerMode::Parasite),
            POWER_EXTERNAL => Some(PowerMode::External),
            _ => None,
        }
    }

    pub(crate) fn set_power_mode(&self, mode: Option<PowerMode>) {
        let value = match mode {
            None => POWER_UNKNOWN,
            Some(PowerMode::Parasite) => POWER_PARASITE,
            Some(PowerMode::External) => POWER_EXTERNAL,
        };
        self.power_mode.store(value, Ordering::Release);
    }

    /// Cached resolution, `None` until read from or written to the device.
    ///
    /// Families with a fixed resolution always report it.
    pub fn resolution(&self) -> Option<Resolution> {
        self.family
            .fixed_resolution()
            .or_else(|| Resolution::from_bits(self.resolution.load(Ordering::Acquire)))
    }

    pub(crate) fn set_resolution(&self, resolution: Option<Resolution>) {
        let value = resolution.map_or(RESOLUTION_UNSET, Resolution::bits);
        self.resolution.store(value, Ordering::Release);
    }

    /// Number of operations currently holding this sensor.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn is_removed(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_removed(&self) {
        self.removed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn hold(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn unhold(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
            self.idle_cv.notify_all();
        }
    }

    /// Block until no operation holds this sensor.
    pub(crate) fn wait_idle(&self) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        while self.in_flight() > 0 {
            idle = self
                .idle_cv
                .wait(idle)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
