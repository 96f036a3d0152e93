//! Per-sensor state, owned by one registry and reached through handles.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock};

use onewire_bus::Rom;

use crate::{Family, Sensor};

/// Generation-checked index of a registered sensor.
///
/// A handle outlives its sensor harmlessly: once the sensor is removed the
/// handle resolves to nothing, even if its slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    sensor: Option<Arc<Sensor>>,
}

#[derive(Debug, Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_rom: HashMap<Rom, u32>,
}

impl Arena {
    fn get(&self, handle: SensorHandle) -> Option<&Arc<Sensor>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.sensor.as_ref())
    }

    fn handle(&self, index: u32) -> SensorHandle {
        SensorHandle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }
}

/// A sensor held by an operation in flight.
///
/// Removal of the sensor waits until every lease is dropped.
pub(crate) struct Lease {
    sensor: Arc<Sensor>,
}

impl Lease {
    fn take(sensor: Arc<Sensor>) -> Option<Self> {
        sensor.hold();
        let lease = Self { sensor };
        // a removal that started before the hold is not waiting for it
        (!lease.sensor.is_removed()).then_some(lease)
    }
}

impl Deref for Lease {
    type Target = Sensor;

    fn deref(&self) -> &Sensor {
        &self.sensor
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.sensor.unhold();
    }
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    arena: RwLock<Arena>,
}

impl Registry {
    /// Register a sensor; a ROM already registered keeps its handle.
    ///
    /// A ROM whose removal is in progress gets a new slot, the old one is
    /// freed when the removal completes.
    pub(crate) fn insert(&self, rom: Rom, family: Family) -> SensorHandle {
        let mut arena = self.arena.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(&index) = arena.by_rom.get(&rom) {
            let live = arena.slots[index as usize]
                .sensor
                .as_ref()
                .is_some_and(|sensor| !sensor.is_removed());
            if live {
                return arena.handle(index);
            }
        }
        let sensor = Some(Arc::new(Sensor::new(rom, family)));
        let index = match arena.free.pop() {
            Some(index) => {
                arena.slots[index as usize].sensor = sensor;
                index
            }
            None => {
                arena.slots.push(Slot {
                    generation: 0,
                    sensor,
                });
                (arena.slots.len() - 1) as u32
            }
        };
        arena.by_rom.insert(rom, index);
        arena.handle(index)
    }

    /// Hold the sensor behind `handle` for the duration of an operation.
    pub(crate) fn checkout(&self, handle: SensorHandle) -> Option<Lease> {
        let sensor = {
            let arena = self.arena.read().unwrap_or_else(PoisonError::into_inner);
            arena.get(handle)?.clone()
        };
        Lease::take(sensor)
    }

    /// Unregister a sensor once the operations holding it are done.
    ///
    /// Blocks until then. New operations on the sensor are refused as soon as
    /// removal starts.
    pub(crate) fn remove(&self, handle: SensorHandle) -> Option<Rom> {
        let sensor = {
            let arena = self.arena.read().unwrap_or_else(PoisonError::into_inner);
            arena.get(handle)?.clone()
        };
        sensor.mark_removed();
        sensor.wait_idle();

        let mut arena = self.arena.write().unwrap_or_else(PoisonError::into_inner);
        arena.get(handle)?;
        let slot = &mut arena.slots[handle.index as usize];
        slot.sensor = None;
        slot.generation = slot.generation.wrapping_add(1);
        // a rediscovery during the removal already owns the ROM
        if arena.by_rom.get(&sensor.rom()) == Some(&handle.index) {
            arena.by_rom.remove(&sensor.rom());
        }
        arena.free.push(handle.index);
        Some(sensor.rom())
    }

    pub(crate) fn find(&self, rom: &Rom) -> Option<SensorHandle> {
        let arena = self.arena.read().unwrap_or_else(PoisonError::into_inner);
        arena.by_rom.get(rom).map(|&index| arena.handle(index))
    }

    pub(crate) fn handles(&self) -> Vec<SensorHandle> {
        let arena = self.arena.read().unwrap_or_else(PoisonError::into_inner);
        let mut handles: Vec<_> = arena.by_rom.values().map(|&i| arena.handle(i)).collect();
        handles.sort_by_key(|h| h.index);
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn rom(serial: u8) -> Rom {
        Rom::from_parts(0x28, [serial, 0, 0, 0, 0, 0])
    }

    #[test]
    fn insert_is_idempotent() {
        let registry = Registry::default();
        let a = registry.insert(rom(1), Family::Ds18b20);
        let b = registry.insert(rom(2), Family::Ds18b20);
        assert_ne!(a, b);
        assert_eq!(registry.insert(rom(1), Family::Ds18b20), a);
        assert_eq!(registry.handles(), vec![a, b]);
        assert_eq!(registry.find(&rom(2)), Some(b));
    }

    #[test]
    fn stale_handle_resolves_to_nothing() {
        let registry = Registry::default();
        let a = registry.insert(rom(1), Family::Ds18b20);
        assert_eq!(registry.remove(a), Some(rom(1)));
        assert!(registry.checkout(a).is_none());
        assert!(registry.remove(a).is_none());
        // slot reuse bumps the generation
        let b = registry.insert(rom(2), Family::Ds18b20);
        assert_ne!(a, b);
        assert!(registry.checkout(a).is_none());
        assert_eq!(registry.checkout(b).unwrap().rom(), rom(2));
    }

    #[test]
    fn lease_counts_in_flight_operations() {
        let registry = Registry::default();
        let a = registry.insert(rom(1), Family::Ds18b20);
        let first = registry.checkout(a).unwrap();
        let second = registry.checkout(a).unwrap();
        assert_eq!(first.in_flight(), 2);
        drop(second);
        assert_eq!(first.in_flight(), 1);
    }

    #[test]
    fn removal_waits_for_leases() {
        let registry = Registry::default();
        let a = registry.insert(rom(1), Family::Ds18b20);
        let lease = registry.checkout(a).unwrap();
        let removed = AtomicBool::new(false);
        std::thread::scope(|s| {
            s.spawn(|| {
                registry.remove(a);
                removed.store(true, Ordering::SeqCst);
            });
            std::thread::sleep(Duration::from_millis(50));
            assert!(!removed.load(Ordering::SeqCst));
            // removal in progress refuses new operations
            while registry.checkout(a).is_some() {
                std::thread::yield_now();
            }
            drop(lease);
        });
        assert!(removed.load(Ordering::SeqCst));
        assert!(registry.find(&rom(1)).is_none());
    }

    #[test]
    fn rediscovery_during_removal_gets_a_live_handle() {
        let registry = Registry::default();
        let a = registry.insert(rom(1), Family::Ds18b20);
        let lease = registry.checkout(a).unwrap();
        let readded = std::thread::scope(|s| {
            let removal = s.spawn(|| registry.remove(a));
            while registry.checkout(a).is_some() {
                std::thread::yield_now();
            }
            let readded = registry.insert(rom(1), Family::Ds18b20);
            drop(lease);
            assert_eq!(removal.join().unwrap(), Some(rom(1)));
            readded
        });
        assert_ne!(readded, a);
        assert!(registry.checkout(a).is_none());
        assert_eq!(registry.find(&rom(1)), Some(readded));
        assert_eq!(registry.checkout(readded).unwrap().rom(), rom(1));
        assert_eq!(registry.handles(), vec![readded]);
    }
}
