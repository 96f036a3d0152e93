//! A simulated 1-Wire bus carrying DS18x20 sensors, and a clock that records
//! sleeps instead of taking them. Both write to one shared event log.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use onewire_bus::{
    ONEWIRE_MATCH_ROM_CMD, OneWire, OneWireCrc, OneWireError, OneWireResult, OneWireStatus, Rom,
};

use crate::{BusLock, Family};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Reset,
    Select(Rom),
    Command(u8),
    Data(u8),
    Read(u8),
    ReadBit(bool),
    Pullup(bool),
    Delay(Duration),
}

pub(crate) type Log = Arc<Mutex<Vec<Event>>>;

pub(crate) fn new_log() -> Log {
    Arc::default()
}

fn push(log: &Log, event: Event) {
    log.lock().unwrap().push(event);
}

/// Function command bytes, in order.
pub(crate) fn command_bytes(log: &Log) -> Vec<u8> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            Event::Command(c) => Some(*c),
            _ => None,
        })
        .collect()
}

pub(crate) fn delays(log: &Log) -> Vec<Duration> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            Event::Delay(d) => Some(*d),
            _ => None,
        })
        .collect()
}

/// Transport events only, sleeps left out.
pub(crate) fn bus_events(log: &Log) -> Vec<Event> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|e| !matches!(e, Event::Delay(_)))
        .copied()
        .collect()
}

/// One simulated thermometer.
#[derive(Debug, Clone)]
pub(crate) struct SimSensor {
    pub rom: Rom,
    pub family: Family,
    pub parasite: bool,
    /// RAM scratchpad without its CRC.
    pub ram: [u8; 8],
    /// TH, TL and configuration.
    pub eeprom: [u8; 3],
    /// Temperature register loaded by the next conversion.
    pub temperature_raw: i16,
    /// Number of upcoming scratchpad reads that come back with a flipped bit.
    pub corrupt_reads: usize,
    /// Read time slots answered with 0 after a conversion or recall starts.
    pub busy_polls: usize,
}

impl SimSensor {
    pub(crate) fn ds18b20(serial: u8) -> Self {
        Self {
            rom: Rom::from_parts(0x28, [serial, 0xa1, 0xb2, 0xc3, 0x00, 0x00]),
            family: Family::Ds18b20,
            parasite: false,
            ram: [0x50, 0x05, 0x4b, 0x46, 0x7f, 0xff, 0x0c, 0x10],
            eeprom: [0x4b, 0x46, 0x7f],
            // 25.0625 °C
            temperature_raw: 0x0191,
            corrupt_reads: 0,
            busy_polls: 0,
        }
    }

    pub(crate) fn ds18s20(serial: u8) -> Self {
        Self {
            rom: Rom::from_parts(0x10, [serial, 0xa1, 0xb2, 0xc3, 0x00, 0x00]),
            family: Family::Ds18s20,
            parasite: false,
            ram: [0xaa, 0x00, 0x4b, 0x46, 0xff, 0xff, 0x0c, 0x10],
            eeprom: [0x4b, 0x46, 0x00],
            // 25.0 °C
            temperature_raw: 0x0032,
            corrupt_reads: 0,
            busy_polls: 0,
        }
    }

    pub(crate) fn parasite(mut self) -> Self {
        self.parasite = true;
        self
    }

    pub(crate) fn corrupt_reads(mut self, n: usize) -> Self {
        self.corrupt_reads = n;
        self
    }

    pub(crate) fn busy_polls(mut self, n: usize) -> Self {
        self.busy_polls = n;
        self
    }

    pub(crate) fn config(&self) -> u8 {
        self.ram[4]
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SimStatus {
    presence: bool,
}

impl OneWireStatus for SimStatus {
    fn presence(&self) -> bool {
        self.presence
    }

    fn shortcircuit(&self) -> bool {
        false
    }
}

#[derive(Debug)]
enum Phase {
    /// No reset since power up, writes are a protocol violation.
    Idle,
    RomCommand,
    MatchRom(Vec<u8>),
    Function,
    WriteScratchpad(usize),
    Reading(VecDeque<u8>),
    PowerSupply,
    Busy(usize),
    Done,
}

/// A bus master wired to simulated sensors.
///
/// Panics on sequences a real device would not accept: a write before any
/// reset, or a ROM command other than MATCH ROM.
#[derive(Debug)]
pub(crate) struct MockBus {
    pub sensors: Vec<SimSensor>,
    /// Number of upcoming resets that see no presence pulse.
    pub no_presence: usize,
    /// Behave like a master without a strong pullup.
    pub no_pullup: bool,
    log: Log,
    phase: Phase,
    selected: Option<usize>,
}

impl MockBus {
    pub(crate) fn new(log: Log, sensors: Vec<SimSensor>) -> Self {
        Self {
            sensors,
            no_presence: 0,
            no_pullup: false,
            log,
            phase: Phase::Idle,
            selected: None,
        }
    }

    fn function(&mut self, command: u8) -> Phase {
        let Some(sensor) = self.selected.map(|i| &mut self.sensors[i]) else {
            return Phase::Done;
        };
        let layout = sensor.family.eeprom_len();
        match command {
            0x44 => {
                sensor.ram[..2].copy_from_slice(&sensor.temperature_raw.to_le_bytes());
                Phase::Busy(sensor.busy_polls)
            }
            0xbe => {
                let mut frame: VecDeque<u8> = sensor.ram.iter().copied().collect();
                frame.push_back(OneWireCrc::compute(&sensor.ram));
                if sensor.corrupt_reads > 0 {
                    sensor.corrupt_reads -= 1;
                    frame[0] ^= 0x01;
                }
                Phase::Reading(frame)
            }
            0x4e => Phase::WriteScratchpad(0),
            0x48 => {
                sensor.eeprom[..layout].copy_from_slice(&sensor.ram[2..2 + layout]);
                Phase::Done
            }
            0xb8 => {
                sensor.ram[2..2 + layout].copy_from_slice(&sensor.eeprom[..layout]);
                Phase::Busy(sensor.busy_polls)
            }
            0xb4 => Phase::PowerSupply,
            other => panic!("unexpected function command {other:#04x}"),
        }
    }
}

impl OneWire for MockBus {
    type Status = SimStatus;
    type BusError = ();

    fn reset(&mut self) -> OneWireResult<SimStatus, ()> {
        push(&self.log, Event::Reset);
        self.selected = None;
        self.phase = Phase::RomCommand;
        let presence = if self.no_presence > 0 {
            self.no_presence -= 1;
            false
        } else {
            !self.sensors.is_empty()
        };
        Ok(SimStatus { presence })
    }

    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), ()> {
        self.phase = match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Idle => panic!("write of {byte:#04x} before any reset"),
            Phase::RomCommand if byte == ONEWIRE_MATCH_ROM_CMD => Phase::MatchRom(Vec::new()),
            Phase::RomCommand => panic!("unexpected ROM command {byte:#04x}"),
            Phase::MatchRom(mut rom) => {
                rom.push(byte);
                if rom.len() < 8 {
                    Phase::MatchRom(rom)
                } else {
                    let mut bytes = [0; 8];
                    bytes.copy_from_slice(&rom);
                    let rom = Rom::new(bytes);
                    push(&self.log, Event::Select(rom));
                    self.selected = self.sensors.iter().position(|s| s.rom == rom);
                    Phase::Function
                }
            }
            Phase::Function => {
                push(&self.log, Event::Command(byte));
                self.function(byte)
            }
            Phase::WriteScratchpad(n) => {
                push(&self.log, Event::Data(byte));
                match self.selected.map(|i| &mut self.sensors[i]) {
                    Some(sensor) if n < sensor.family.eeprom_len() => {
                        sensor.ram[2 + n] = byte;
                        Phase::WriteScratchpad(n + 1)
                    }
                    _ => Phase::Done,
                }
            }
            phase => {
                push(&self.log, Event::Data(byte));
                phase
            }
        };
        Ok(())
    }

    fn read_byte(&mut self) -> OneWireResult<u8, ()> {
        let byte = match &mut self.phase {
            Phase::Reading(frame) => frame.pop_front().unwrap_or(0xff),
            _ => 0xff,
        };
        push(&self.log, Event::Read(byte));
        Ok(byte)
    }

    fn write_bit(&mut self, _bit: bool) -> OneWireResult<(), ()> {
        Ok(())
    }

    fn read_bit(&mut self) -> OneWireResult<bool, ()> {
        let bit = match &mut self.phase {
            Phase::PowerSupply => match self.selected {
                Some(i) => !self.sensors[i].parasite,
                None => true,
            },
            Phase::Busy(0) => true,
            Phase::Busy(n) => {
                *n -= 1;
                false
            }
            _ => true,
        };
        push(&self.log, Event::ReadBit(bit));
        Ok(bit)
    }

    fn strong_pullup(&mut self, enable: bool) -> OneWireResult<(), ()> {
        if self.no_pullup {
            return Err(OneWireError::Unimplemented);
        }
        push(&self.log, Event::Pullup(enable));
        Ok(())
    }
}

/// Records every sleep in the log and yields instead of sleeping.
#[derive(Debug, Clone)]
pub(crate) struct MockClock {
    log: Log,
}

impl MockClock {
    pub(crate) fn new(log: Log) -> Self {
        Self { log }
    }

    fn sleep(&mut self, duration: Duration) {
        push(&self.log, Event::Delay(duration));
        std::thread::yield_now();
    }
}

impl DelayNs for MockClock {
    fn delay_ns(&mut self, ns: u32) {
        self.sleep(Duration::from_nanos(ns.into()));
    }

    fn delay_us(&mut self, us: u32) {
        self.sleep(Duration::from_micros(us.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.sleep(Duration::from_millis(ms.into()));
    }
}

/// A bus lock that is always held by someone else.
#[derive(Debug)]
pub(crate) struct LockedOut {
    pub attempts: AtomicUsize,
}

impl LockedOut {
    pub(crate) fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl BusLock for LockedOut {
    type Bus = MockBus;
    type Guard<'a>
        = &'a mut MockBus
    where
        Self: 'a;

    fn acquire(&self, _timeout: Duration) -> Option<&mut MockBus> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        None
    }
}
