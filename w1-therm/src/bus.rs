//! Exclusive access to a bus shared by every sensor attached to it.

use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use onewire_bus::{OneWire, OneWireResult};

use crate::{ThermConfig, ThermError, ThermResult};

/// Error type of the bus master behind a [`BusLock`].
pub type BusErrorOf<L> = <<L as BusLock>::Bus as OneWire>::BusError;

/// A lock serializing every transaction on one 1-Wire bus.
///
/// Holding the guard is the only way to reach the bus master, so a
/// reset, select, command and response sequence can not interleave
/// with another sensor's.
pub trait BusLock {
    /// The bus master.
    type Bus: OneWire;
    /// Exclusive access to the bus master, released on drop.
    type Guard<'a>: DerefMut<Target = Self::Bus>
    where
        Self: 'a;

    /// Block for at most `timeout` waiting for the bus.
    ///
    /// Returns `None` if the bus is still held by someone else after `timeout`.
    fn acquire(&self, timeout: Duration) -> Option<Self::Guard<'_>>;
}

/// A bus master shared between threads.
pub struct SharedBus<O> {
    bus: Mutex<O>,
    busy: Mutex<bool>,
    released: Condvar,
}

impl<O> SharedBus<O> {
    /// Share `bus`.
    pub fn new(bus: O) -> Self {
        Self {
            bus: Mutex::new(bus),
            busy: Mutex::new(false),
            released: Condvar::new(),
        }
    }

    /// Take the bus master back.
    pub fn into_inner(self) -> O {
        self.bus.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive access to a [`SharedBus`].
pub struct BusGuard<'a, O> {
    bus: MutexGuard<'a, O>,
    owner: &'a SharedBus<O>,
}

impl<O> Deref for BusGuard<'_, O> {
    type Target = O;

    fn deref(&self) -> &O {
        &self.bus
    }
}

impl<O> DerefMut for BusGuard<'_, O> {
    fn deref_mut(&mut self) -> &mut O {
        &mut self.bus
    }
}

impl<O> Drop for BusGuard<'_, O> {
    fn drop(&mut self) {
        *self
            .owner
            .busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = false;
        self.owner.released.notify_one();
    }
}

impl<O: OneWire> BusLock for SharedBus<O> {
    type Bus = O;
    type Guard<'a>
        = BusGuard<'a, O>
    where
        Self: 'a;

    fn acquire(&self, timeout: Duration) -> Option<BusGuard<'_, O>> {
        let busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut busy, _) = self
            .released
            .wait_timeout_while(busy, timeout, |busy| *busy)
            .unwrap_or_else(PoisonError::into_inner);
        if *busy {
            return None;
        }
        *busy = true;
        drop(busy);
        // only the holder of `busy` gets here, the mutex is free or about to be
        let bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
        Some(BusGuard { bus, owner: self })
    }
}

/// Acquire the bus with the bounded retry of `config`: `max_tries` attempts,
/// `retry_delay_ms` apart.
pub(crate) fn acquire<'a, L: BusLock, D: DelayNs>(
    lock: &'a L,
    config: &ThermConfig,
    delay: &mut D,
) -> ThermResult<L::Guard<'a>, BusErrorOf<L>> {
    for attempt in 1..=config.max_tries {
        if let Some(guard) = lock.acquire(config.lock_timeout) {
            return Ok(guard);
        }
        log::debug!("bus busy, attempt {attempt}/{}", config.max_tries);
        if attempt < config.max_tries {
            delay.delay_ms(config.retry_delay_ms);
        }
    }
    Err(ThermError::BusBusy)
}

/// The strong pullup, engaged for as long as this value lives.
///
/// Writes go through the guard, so the command that needs the extra power is
/// the byte the pullup follows. The pullup is released when the guard is
/// dropped, including on error paths.
pub(crate) struct StrongPullup<'a, O: OneWire> {
    bus: &'a mut O,
    engaged: bool,
}

impl<'a, O: OneWire> StrongPullup<'a, O> {
    pub(crate) fn engage(bus: &'a mut O) -> OneWireResult<Self, O::BusError> {
        bus.strong_pullup(true)?;
        Ok(Self { bus, engaged: true })
    }

    /// Release the pullup, reporting a failure to do so.
    pub(crate) fn release(mut self) -> OneWireResult<(), O::BusError> {
        self.engaged = false;
        self.bus.strong_pullup(false)
    }
}

impl<O: OneWire> Deref for StrongPullup<'_, O> {
    type Target = O;

    fn deref(&self) -> &O {
        self.bus
    }
}

impl<O: OneWire> DerefMut for StrongPullup<'_, O> {
    fn deref_mut(&mut self) -> &mut O {
        self.bus
    }
}

impl<O: OneWire> Drop for StrongPullup<'_, O> {
    fn drop(&mut self) {
        if self.engaged && self.bus.strong_pullup(false).is_err() {
            log::warn!("failed to release strong pullup");
        }
    }
}
